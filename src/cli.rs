use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::Overrides;
use crate::domain::filter::CategoryFilter;
use crate::domain::record::{CustomerInput, RecordPatch};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "leadsheet")]
#[command(bin_name = "leadsheet")]
#[command(version)]
#[command(about = "Customer lead dashboard backed by a Google Sheets spreadsheet")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "LEADSHEET_CONFIG",
        help = "Path to the config file (defaults to the user config dir)."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_SPREADSHEET_ID",
        help = "Spreadsheet id to read and write."
    )]
    pub spreadsheet_id: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_SHEET",
        help = "Sheet (tab) name holding the customer rows."
    )]
    pub sheet: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_API_KEY",
        hide_env_values = true,
        help = "API key used for reads."
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_ACCESS_TOKEN",
        hide_env_values = true,
        help = "OAuth access token used for writes (and reads without an API key)."
    )]
    pub token: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_BASE_URL",
        help = "Sheets API base URL."
    )]
    pub base_url: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LEADSHEET_ERROR_LOG",
        help = "Path to the JSON lines error log."
    )]
    pub error_log: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = ArgAction::Count,
        help = "Increase log output (-v info, -vv debug)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_name: self.sheet.clone(),
            api_key: self.api_key.clone(),
            access_token: self.token.clone(),
            base_url: self.base_url.clone(),
            error_log: self.error_log.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "List customers with category and agent filters.")]
    Ls(ListArgs),
    #[command(about = "Show one customer by id.")]
    Show(ShowArgs),
    #[command(about = "List agents that have customers assigned.")]
    Agents(AgentsArgs),
    #[command(about = "Show customer counts.")]
    Stats(StatsArgs),
    #[command(about = "Add a customer row.")]
    Add(AddArgs),
    #[command(about = "Update fields of one customer.")]
    Edit(EditArgs),
    #[command(about = "Delete one customer row.")]
    Rm(RemoveArgs),
    #[command(about = "Apply the same field changes to several customers.")]
    Bulk(BulkArgs),
    #[command(about = "Reload rows from the spreadsheet and show them.")]
    Refresh,
    #[command(about = "Check configuration and the spreadsheet connection.")]
    Check,
    #[command(about = "Show or clear the error log.")]
    Errors(ErrorsArgs),
    #[command(about = "Start an interactive session.")]
    Shell,
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(
        short = 'c',
        long,
        default_value = "all",
        help = "Category: all, school or non-school."
    )]
    pub category: CategoryFilter,

    #[arg(short = 'a', long, help = "Only customers of this agent ('all' for every agent).")]
    pub agent: Option<String>,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Customer id as shown by `ls`.")]
    pub id: u32,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AgentsArgs {
    #[arg(long, help = "Include the overview label (the choices offered for --agent).")]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long, help = "Nearest access point (ODP).")]
    pub odp: String,

    #[arg(long, help = "Customer name.")]
    pub name: String,

    #[arg(long, help = "Customer address.")]
    pub address: String,

    #[arg(long, help = "Phone number, 10-13 digits.")]
    pub phone: String,

    #[arg(long, help = "Assigned sales agent.")]
    pub agent: String,

    #[arg(long, help = "Visit state (defaults to the configured value).")]
    pub visit: Option<String>,

    #[arg(long, help = "Free-text note.")]
    pub note: Option<String>,

    #[arg(long, help = "Status (defaults to the configured value).")]
    pub status: Option<String>,

    #[arg(long, help = "Additional note.")]
    pub extra: Option<String>,

    #[arg(long, help = "Date added; stamped with the current time when omitted.")]
    pub date: Option<String>,
}

impl AddArgs {
    pub fn to_input(&self) -> CustomerInput {
        CustomerInput {
            nearest_access_point: self.odp.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            assigned_agent: self.agent.clone(),
            visit_state: self.visit.clone().unwrap_or_default(),
            note: self.note.clone().unwrap_or_default(),
            status: self.status.clone().unwrap_or_default(),
            additional_note: self.extra.clone().unwrap_or_default(),
            date_added: self.date.clone(),
        }
    }
}

#[derive(Debug, Args, Default)]
pub struct PatchArgs {
    #[arg(long, help = "New nearest access point (ODP).")]
    pub odp: Option<String>,

    #[arg(long, help = "New name.")]
    pub name: Option<String>,

    #[arg(long, help = "New address.")]
    pub address: Option<String>,

    #[arg(long, help = "New phone number.")]
    pub phone: Option<String>,

    #[arg(long, help = "New assigned agent.")]
    pub agent: Option<String>,

    #[arg(long, help = "New visit state.")]
    pub visit: Option<String>,

    #[arg(long, help = "New note.")]
    pub note: Option<String>,

    #[arg(long, help = "New status.")]
    pub status: Option<String>,

    #[arg(long, help = "New additional note.")]
    pub extra: Option<String>,
}

impl PatchArgs {
    pub fn to_patch(&self) -> RecordPatch {
        RecordPatch {
            nearest_access_point: self.odp.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            assigned_agent: self.agent.clone(),
            visit_state: self.visit.clone(),
            note: self.note.clone(),
            status: self.status.clone(),
            additional_note: self.extra.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(help = "Customer id as shown by `ls`.")]
    pub id: u32,

    #[command(flatten)]
    pub patch: PatchArgs,

    #[arg(long = "if-match", help = "Only update if the record etag still matches.")]
    pub if_match: Option<String>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[arg(help = "Customer id as shown by `ls`.")]
    pub id: u32,

    #[arg(short = 'y', long, help = "Skip the confirmation prompt.")]
    pub yes: bool,

    #[arg(long = "if-match", help = "Only delete if the record etag still matches.")]
    pub if_match: Option<String>,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    #[arg(required = true, num_args = 1.., help = "Customer ids as shown by `ls`.")]
    pub ids: Vec<u32>,

    #[command(flatten)]
    pub patch: PatchArgs,

    #[arg(short = 'y', long, help = "Skip the confirmation prompt.")]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ErrorsArgs {
    #[arg(long, help = "Delete the error log.")]
    pub clear: bool,

    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate for. Detected from $SHELL if omitted.")]
    pub shell: Option<Shell>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions where bash, zsh or fish load them from."
    )]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
