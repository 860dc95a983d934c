use std::collections::BTreeSet;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::app::CheckReport;
use crate::dashboard::OperationPhase;
use crate::domain::filter::FilterState;
use crate::domain::record::{CustomerRecord, Field};
use crate::errlog::ErrorEntry;
use crate::sink::{DataSource, PresentationSink, ViewSnapshot};
use crate::stats::DashboardStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Table,
    Json,
    /// Mutating commands: only notices and warnings are printed.
    Quiet,
}

/// Terminal implementation of the presentation sink. Tables and notices go
/// to stdout; warnings and prompts go to stderr.
pub struct TerminalSink {
    palette: Palette,
    mode: RenderMode,
    assume_yes: bool,
    interactive: bool,
}

impl TerminalSink {
    pub fn new(mode: RenderMode, assume_yes: bool) -> Self {
        Self {
            palette: Palette::auto(),
            mode,
            assume_yes,
            interactive: io::stdin().is_terminal(),
        }
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }
}

impl PresentationSink for TerminalSink {
    fn render(&mut self, view: &ViewSnapshot<'_>) {
        match self.mode {
            RenderMode::Quiet => {}
            RenderMode::Json => match serde_json::to_string_pretty(view) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("error: failed to render JSON: {err}"),
            },
            RenderMode::Table => print_view(view, &self.palette),
        }
    }

    fn show_assignees(&mut self, _assignees: &BTreeSet<String>) {}

    fn warn(&mut self, message: &str) {
        eprintln!("{}", self.palette.warning(&format!("warning: {message}")));
    }

    fn notify(&mut self, message: &str) {
        if self.mode != RenderMode::Json {
            println!("{}", self.palette.success(message));
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !self.interactive {
            eprintln!("{prompt} not confirmed: stdin is not a terminal; pass --yes");
            return false;
        }
        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_view(view: &ViewSnapshot<'_>, palette: &Palette) {
    let title = match view.source {
        DataSource::Remote => "Customers".to_string(),
        DataSource::Demo => "Customers (demo data)".to_string(),
    };
    println!("{}", palette.heading(&title));
    if let Some(summary) = filter_summary(view.filters) {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if view.records.is_empty() {
        println!("{}", palette.dim("no customers matched"));
    }
    for record in view.records {
        println!("{}", format_record_row(record, palette));
    }
    println!(
        "{}",
        palette.dim(&format!(
            "{} of {} customer(s)",
            view.records.len(),
            view.total
        ))
    );
}

pub fn format_record_row(record: &CustomerRecord, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {}",
        palette.id(&format!("#{:<3}", record.sequence_id)),
        palette.dim(&record.nearest_access_point),
        record.name,
        record.phone
    );
    if !record.assigned_agent.is_empty() {
        line.push(' ');
        line.push_str(&palette.agent(&format!("@{}", record.assigned_agent)));
    }
    if !record.visit_state.is_empty() {
        line.push(' ');
        line.push_str(&palette.visit(&record.visit_state));
    }
    if !record.status.is_empty() {
        line.push(' ');
        line.push_str(&palette.status(&record.status));
    }
    line
}

pub fn filter_summary(filters: &FilterState) -> Option<String> {
    if filters.is_default() {
        return None;
    }
    Some(format!(
        "category={} agent={}",
        filters.category, filters.assignee
    ))
}

pub fn print_record_detail(record: &CustomerRecord) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.id(&format!("#{}", record.sequence_id)),
        palette.heading(&record.name)
    );
    for field in Field::ALL {
        if field == Field::Name {
            continue;
        }
        let value = record.value(field);
        let shown = if value.is_empty() { "-".to_string() } else { value };
        println!("  {:<8} {}", palette.dim(field.as_str()), shown);
    }
    println!("  {:<8} {}", palette.dim("etag"), record.etag);
}

pub fn print_assignees(assignees: &BTreeSet<String>) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Agents"));
    println!("  {}", palette.dim("All"));
    for name in assignees {
        println!("  {}", palette.agent(name));
    }
}

pub fn print_stats(stats: &DashboardStats, source: DataSource) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Stats"));
    println!("  total customers      {}", stats.total);
    println!("  new in last month    {}", stats.new_last_month);
    if source == DataSource::Demo {
        println!("  {}", palette.dim("(demo data)"));
    }
}

pub fn print_session_status(
    source: DataSource,
    filters: &FilterState,
    phase: OperationPhase,
    last_outcome: Option<OperationPhase>,
) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Session"));
    let source = match source {
        DataSource::Remote => "spreadsheet",
        DataSource::Demo => "demo data (read-only)",
    };
    println!("  data          {}", source);
    println!("  category      {}", filters.category);
    println!("  agent         {}", filters.assignee);
    println!("  phase         {}", phase.as_str());
    let last = match last_outcome {
        Some(OperationPhase::Failed) => palette.warning("failed"),
        Some(outcome) => palette.success(outcome.as_str()),
        None => palette.dim("none yet"),
    };
    println!("  last change   {}", last);
}

pub fn print_error_entries(entries: &[ErrorEntry]) {
    let palette = Palette::auto();
    if entries.is_empty() {
        println!("{}", palette.dim("no errors logged"));
        return;
    }
    for entry in entries {
        println!(
            "{} {} {}",
            palette.dim(&entry.occurred_at),
            palette.id(&format!("[{}]", entry.context)),
            entry.message
        );
    }
}

pub fn print_check(report: &CheckReport) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Connection check"));
    println!("  spreadsheet   {}", report.spreadsheet_id);
    println!("  sheet         {} (id {})", report.sheet_name, report.sheet_id);
    println!("  reads         {}", report.read_auth);
    println!("  writes        {}", report.write_auth);
    println!("  data rows     {}", report.data_rows);
    println!("{}", palette.success("ok"));
}

pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn agent(&self, text: &str) -> String {
        self.paint("35", text)
    }

    fn warning(&self, text: &str) -> String {
        self.paint("33", text)
    }

    fn success(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn visit(&self, visit: &str) -> String {
        self.paint(visit_color_code(visit), &format!("[{}]", visit.to_ascii_uppercase()))
    }

    fn status(&self, status: &str) -> String {
        self.paint(status_color_code(status), status)
    }
}

fn visit_color_code(visit: &str) -> &'static str {
    match visit.trim().to_ascii_lowercase().as_str() {
        "visited" => "32",
        "scheduled" => "36",
        "pending" => "33",
        "not visited" => "31",
        _ => "37",
    }
}

fn status_color_code(status: &str) -> &'static str {
    match status.trim().to_ascii_lowercase().as_str() {
        "diterima" => "32",
        "tidak diterima" | "ditolak" => "31",
        "pending" => "33",
        _ => "37",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{AssigneeFilter, CategoryFilter};
    use crate::normalize::normalize;

    fn record() -> CustomerRecord {
        let row: Vec<String> = [
            "ODP-BDG-001",
            "Budi Santoso",
            "Jl. Merdeka",
            "081234567890",
            "Nandi",
            "Visited",
            "",
            "Diterima",
        ]
        .iter()
        .map(|cell| cell.to_string())
        .collect();
        normalize(&[row]).remove(0)
    }

    #[test]
    fn row_format_without_color() {
        assert_eq!(
            format_record_row(&record(), &Palette::plain()),
            "#1   ODP-BDG-001 Budi Santoso 081234567890 @Nandi [VISITED] Diterima"
        );
    }

    #[test]
    fn filter_summary_only_when_narrowed() {
        assert_eq!(filter_summary(&FilterState::default()), None);
        let filters = FilterState {
            category: CategoryFilter::School,
            assignee: AssigneeFilter::agent("Andi"),
        };
        assert_eq!(
            filter_summary(&filters).as_deref(),
            Some("category=school agent=Andi")
        );
    }

    #[test]
    fn visit_and_status_colors() {
        assert_eq!(visit_color_code("Visited"), "32");
        assert_eq!(visit_color_code(" not visited "), "31");
        assert_eq!(visit_color_code("Somewhere"), "37");
        assert_eq!(status_color_code("Tidak Diterima"), "31");
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn quiet_sink_confirms_with_assume_yes() {
        let mut sink = TerminalSink::new(RenderMode::Quiet, true);
        assert!(sink.confirm("delete?"));
    }
}
