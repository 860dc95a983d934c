use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryFilter {
    #[default]
    All,
    School,
    NonSchool,
}

impl CategoryFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::School => "school",
            CategoryFilter::NonSchool => "non-school",
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCategoryFilterError {
    value: String,
}

impl fmt::Display for ParseCategoryFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid category '{}'; expected all, school or non-school",
            self.value
        )
    }
}

impl Error for ParseCategoryFilterError {}

impl FromStr for CategoryFilter {
    type Err = ParseCategoryFilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "all" => Ok(CategoryFilter::All),
            "school" => Ok(CategoryFilter::School),
            "non-school" | "nonschool" => Ok(CategoryFilter::NonSchool),
            _ => Err(ParseCategoryFilterError {
                value: value.to_string(),
            }),
        }
    }
}

/// Assignee dimension: every agent, or one agent matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AssigneeFilter {
    #[default]
    All,
    Agent(String),
}

pub const ALL_ASSIGNEES: &str = "All";

impl AssigneeFilter {
    pub fn agent(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_ASSIGNEES) {
            AssigneeFilter::All
        } else {
            AssigneeFilter::Agent(trimmed.to_string())
        }
    }

    /// Reads typed input against the agents present in the data. An exact
    /// agent name wins over the `all` keyword, so an agent called "All" can
    /// still be selected on its own.
    pub fn choose(input: &str, agents: &BTreeSet<String>) -> Self {
        let trimmed = input.trim();
        if agents.contains(trimmed) {
            AssigneeFilter::Agent(trimmed.to_string())
        } else {
            AssigneeFilter::agent(trimmed)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssigneeFilter::All => ALL_ASSIGNEES,
            AssigneeFilter::Agent(name) => name,
        }
    }
}

impl fmt::Display for AssigneeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssigneeFilter {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(AssigneeFilter::agent(value))
    }
}

impl Serialize for AssigneeFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The two independent filter dimensions of the dashboard view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub assignee: AssigneeFilter,
}

impl FilterState {
    pub fn is_default(&self) -> bool {
        self.category == CategoryFilter::All && self.assignee == AssigneeFilter::All
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSelection {
    Category(CategoryFilter),
    Assignee(AssigneeFilter),
}
