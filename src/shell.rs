use std::io::{self, Write};

use time::OffsetDateTime;

use crate::app::AppError;
use crate::dashboard::{Dashboard, Intent, MutationOutcome};
use crate::domain::filter::{CategoryFilter, FilterSelection};
use crate::domain::record::{CustomerInput, Field, RecordPatch};
use crate::sink::PresentationSink;
use crate::store::TabularStore;
use crate::ui;

const HELP: &str = "\
commands:
  ls                          show the current view
  category <all|school|non-school>
  agent <name|all>
  show <id>
  add field=value ...         fields: odp name address phone agent visit note status extra date
  edit <id> field=value ...   fields: odp name address phone agent visit note status extra
  bulk <id> <id> ... field=value ...
  rm <id>
  agents
  stats
  status
  refresh
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Forwarded to the dashboard as-is.
    Dispatch(Intent),
    /// Agent name as typed; resolved against the loaded records.
    SelectAgent(String),
    List,
    Show(u32),
    Agents,
    Stats,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Splits on whitespace; double quotes group words and may start mid-word,
/// so `name="Budi S"` is one argument.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            ch => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn parse_id(raw: Option<&String>) -> Result<u32, String> {
    let raw = raw.ok_or_else(|| "missing customer id".to_string())?;
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("'{}' is not a customer id", raw))
}

fn parse_pair(pair: &str) -> Result<(Field, &str), String> {
    let (name, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", pair))?;
    let field: Field = name.parse().map_err(|err| format!("{}", err))?;
    Ok((field, value))
}

fn parse_patch(pairs: &[String]) -> Result<RecordPatch, String> {
    let mut patch = RecordPatch::default();
    for pair in pairs {
        let (field, value) = parse_pair(pair)?;
        patch
            .set(field, value)
            .map_err(|_| format!("field '{}' cannot be edited", field))?;
    }
    Ok(patch)
}

/// `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let words = split_words(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "ls" | "list" => ShellCommand::List,
        "category" | "cat" => {
            let raw = args.first().ok_or("usage: category <all|school|non-school>")?;
            let category: CategoryFilter = raw.parse().map_err(|err| format!("{}", err))?;
            ShellCommand::Dispatch(Intent::Filter(FilterSelection::Category(category)))
        }
        "agent" => {
            if args.is_empty() {
                return Err("usage: agent <name|all>".to_string());
            }
            ShellCommand::SelectAgent(args.join(" "))
        }
        "show" => ShellCommand::Show(parse_id(args.first())?),
        "add" => {
            if args.is_empty() {
                return Err("usage: add field=value ...".to_string());
            }
            let mut input = CustomerInput::default();
            for pair in args {
                let (field, value) = parse_pair(pair)?;
                input.set(field, value);
            }
            ShellCommand::Dispatch(Intent::Add(input))
        }
        "edit" => {
            let id = parse_id(args.first())?;
            ShellCommand::Dispatch(Intent::Edit {
                sequence_id: id,
                patch: parse_patch(&args[1..])?,
                if_match: None,
            })
        }
        "bulk" => {
            let split = args
                .iter()
                .position(|arg| arg.contains('='))
                .unwrap_or(args.len());
            if split == 0 {
                return Err("usage: bulk <id> <id> ... field=value ...".to_string());
            }
            let sequence_ids = args[..split]
                .iter()
                .map(|raw| parse_id(Some(raw)))
                .collect::<Result<Vec<_>, _>>()?;
            ShellCommand::Dispatch(Intent::BulkEdit {
                sequence_ids,
                patch: parse_patch(&args[split..])?,
            })
        }
        "rm" | "delete" => ShellCommand::Dispatch(Intent::Delete {
            sequence_id: parse_id(args.first())?,
            if_match: None,
        }),
        "agents" => ShellCommand::Agents,
        "stats" => ShellCommand::Stats,
        "status" => ShellCommand::Status,
        "refresh" | "reload" => ShellCommand::Dispatch(Intent::Refresh),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{}'; try 'help'", other)),
    };
    Ok(Some(command))
}

pub async fn execute<S: TabularStore, P: PresentationSink>(
    dashboard: &mut Dashboard<S, P>,
    command: ShellCommand,
) -> Result<Flow, AppError> {
    match command {
        ShellCommand::Dispatch(intent) => {
            if dashboard.handle(intent).await? == MutationOutcome::Cancelled {
                println!("cancelled");
            }
        }
        ShellCommand::SelectAgent(name) => {
            let assignee = dashboard.resolve_assignee(&name);
            dashboard
                .handle(Intent::Filter(FilterSelection::Assignee(assignee)))
                .await?;
        }
        ShellCommand::List => {
            let filters = dashboard.filters().clone();
            dashboard.set_filters(filters);
        }
        ShellCommand::Show(id) => {
            let record = dashboard.record(id).ok_or(AppError::NotFound(id))?;
            ui::print_record_detail(record);
        }
        ShellCommand::Agents => ui::print_assignees(&dashboard.assignees()),
        ShellCommand::Stats => {
            ui::print_stats(&dashboard.stats(OffsetDateTime::now_utc()), dashboard.source());
        }
        ShellCommand::Status => ui::print_session_status(
            dashboard.source(),
            dashboard.filters(),
            dashboard.phase(),
            dashboard.last_outcome(),
        ),
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Reads one line without holding the stdin lock, so confirmation prompts
/// can read stdin too.
fn read_stdin_line() -> Option<io::Result<String>> {
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(Ok(line)),
        Err(err) => Some(Err(err)),
    }
}

pub async fn run<S: TabularStore, P: PresentationSink>(
    dashboard: &mut Dashboard<S, P>,
) -> Result<(), AppError> {
    dashboard.load().await;
    run_lines(dashboard, std::iter::from_fn(read_stdin_line), true).await
}

/// Command loop. A failing command prints its error and the loop goes on;
/// only input errors end the session early.
pub async fn run_lines<S, P, I>(
    dashboard: &mut Dashboard<S, P>,
    lines: I,
    prompt: bool,
) -> Result<(), AppError>
where
    S: TabularStore,
    P: PresentationSink,
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut lines = lines.into_iter();
    loop {
        if prompt {
            print!("leadsheet> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let command = match parse_line(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("error: {}", message);
                continue;
            }
        };
        match execute(dashboard, command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(err) => eprintln!("error: {}", err),
        }
    }
    tracing::debug!("shell session ended");
    Ok(())
}
