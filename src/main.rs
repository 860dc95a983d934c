mod app;
mod cli;
mod completions;
mod config;
mod dashboard;
mod demo;
mod domain;
mod errlog;
mod logging;
mod normalize;
mod shell;
mod sink;
mod stats;
mod store;
mod ui;
mod validate;
mod view;

use clap::Parser;
use time::OffsetDateTime;

use app::{App, AppError};
use cli::{Cli, Commands};
use dashboard::MutationOutcome;
use domain::filter::FilterState;
use ui::RenderMode;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(err) = run(cli).await {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn json_or(json: bool) -> RenderMode {
    if json {
        RenderMode::Json
    } else {
        RenderMode::Table
    }
}

fn print_outcome(outcome: MutationOutcome) {
    if outcome == MutationOutcome::Cancelled {
        println!("cancelled; nothing was changed");
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell, args.install);
    }

    let app = App::load(cli.config.as_deref(), &cli.overrides())?;

    match cli.command {
        Commands::Ls(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            dashboard.load().await;
            dashboard.sink_mut().set_mode(json_or(args.json));
            let assignee = args
                .agent
                .map(|name| dashboard.resolve_assignee(&name))
                .unwrap_or_default();
            dashboard.set_filters(FilterState {
                category: args.category,
                assignee,
            });
        }
        Commands::Show(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            dashboard.load().await;
            let record = dashboard
                .record(args.id)
                .ok_or(AppError::NotFound(args.id))?;
            if args.json {
                print_json(record);
            } else {
                ui::print_record_detail(record);
            }
        }
        Commands::Agents(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            dashboard.load().await;
            if args.all {
                ui::print_assignees(&dashboard.assignee_options());
            } else {
                ui::print_assignees(&dashboard.assignees());
            }
        }
        Commands::Stats(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            let source = dashboard.load().await;
            let stats = dashboard.stats(OffsetDateTime::now_utc());
            if args.json {
                print_json(&serde_json::json!({
                    "total": stats.total,
                    "new_last_month": stats.new_last_month,
                    "source": source,
                }));
            } else {
                ui::print_stats(&stats, source);
            }
        }
        Commands::Add(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            dashboard.add_record(args.to_input()).await?;
        }
        Commands::Edit(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, false)?;
            dashboard.load().await;
            dashboard
                .edit_record(args.id, args.patch.to_patch(), args.if_match.as_deref())
                .await?;
        }
        Commands::Rm(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, args.yes)?;
            dashboard.load().await;
            let outcome = dashboard
                .delete_record(args.id, args.if_match.as_deref())
                .await?;
            print_outcome(outcome);
        }
        Commands::Bulk(args) => {
            let mut dashboard = app.dashboard(RenderMode::Quiet, args.yes)?;
            dashboard.load().await;
            let outcome = dashboard
                .bulk_edit(&args.ids, args.patch.to_patch())
                .await?;
            print_outcome(outcome);
        }
        Commands::Refresh => {
            let mut dashboard = app.dashboard(RenderMode::Table, false)?;
            dashboard.refresh().await;
        }
        Commands::Check => {
            let report = app.check().await?;
            ui::print_check(&report);
        }
        Commands::Errors(args) => {
            let log = app.error_log();
            if args.clear {
                let removed = log.clear()?;
                println!("cleared {} error log entr{}", removed, plural_y(removed));
            } else {
                let entries = log.read_all()?;
                if args.json {
                    print_json(&entries);
                } else {
                    ui::print_error_entries(&entries);
                }
            }
        }
        Commands::Shell => {
            let mut dashboard = app.dashboard(RenderMode::Table, false)?;
            shell::run(&mut dashboard).await?;
        }
        Commands::Completions(_) => {}
    }
    Ok(())
}

fn plural_y(count: usize) -> &'static str {
    if count == 1 {
        "y"
    } else {
        "ies"
    }
}
