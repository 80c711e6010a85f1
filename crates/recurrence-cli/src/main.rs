mod input;
mod render;
mod window;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use recurrence_engine::{
    describe_recurrence, expand_from_store, expand_template, group_by_day, rrule_dates,
    to_ical_lines, to_rrule_set, to_rrule_string, DateRange, EventTemplate, ExpandOptions,
    InMemoryEventStore, DEFAULT_MAX_GENERATED,
};
use rrule::RRuleSet;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::input::InputArgs;
use crate::window::WindowArgs;

#[derive(Parser)]
#[command(name = "recur", version)]
#[command(about = "Expand recurring calendar events into dated occurrences")]
struct Cli {
    /// Cap on generated dates for a series with neither an end date nor a count
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_GENERATED)]
    max_generated: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the occurrences in a window as a JSON array
    Expand {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print a day-by-day agenda for a window
    Agenda {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        input: InputArgs,
    },
    /// Describe each template's recurrence in words
    Describe {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Export each recurring template as an RFC 5545 RRULE
    Rrule {
        #[command(flatten)]
        input: InputArgs,

        /// Print the full DTSTART / RRULE / EXDATE block
        #[arg(long, conflicts_with = "check")]
        ical: bool,

        /// Compare each export's dates in the window with our own expansion
        #[arg(long)]
        check: bool,

        #[command(flatten)]
        window: WindowArgs,
    },
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version also arrive here
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let options = ExpandOptions::default().with_max_generated(cli.max_generated);
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Expand {
            window,
            input,
            pretty,
        } => {
            let range = window.resolve()?;
            let store: InMemoryEventStore = input.load_templates()?.into_iter().collect();
            let occurrences = expand_from_store(&store, &range, &options)?;
            let json = if pretty {
                serde_json::to_string_pretty(&occurrences)
            } else {
                serde_json::to_string(&occurrences)
            }
            .context("failed to serialize occurrences")?;
            writeln!(out, "{json}")?;
        }
        Command::Agenda { window, input } => {
            let range = window.resolve()?;
            let store: InMemoryEventStore = input.load_templates()?.into_iter().collect();
            let occurrences = expand_from_store(&store, &range, &options)?;
            let days = group_by_day(&occurrences, range.start, range.end);
            write!(out, "{}", render::agenda(&days))?;
        }
        Command::Describe { input } => {
            for template in input.load_templates()? {
                writeln!(out, "{}\t{}", template.id, describe_recurrence(&template))?;
            }
        }
        Command::Rrule {
            input,
            ical,
            check,
            window,
        } => {
            let range = if check { Some(window.resolve()?) } else { None };
            let mut mismatched = 0usize;
            for template in input.load_templates()? {
                let Some(rule) = to_rrule_string(&template) else {
                    continue;
                };
                let set = match to_rrule_set(&template) {
                    Ok(set) => set,
                    Err(error) => {
                        warn!(template_id = %template.id, %error, "skipping unexportable template");
                        continue;
                    }
                };
                if ical {
                    writeln!(out, "{}\n{}\n", template.id, to_ical_lines(&template)?)?;
                } else if let Some(range) = &range {
                    let verdict = match disagreement(&template, &set, range) {
                        None => "ok".to_string(),
                        Some(detail) => {
                            mismatched += 1;
                            format!("mismatch: {detail}")
                        }
                    };
                    writeln!(out, "{}\t{rule}\t{verdict}", template.id)?;
                } else {
                    writeln!(out, "{}\t{rule}", template.id)?;
                }
            }
            if mismatched > 0 {
                out.flush()?;
                bail!("{mismatched} template(s) disagree with their RRULE export");
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Where our expansion of `template` and its exported `set` first differ
/// inside `range`. The safety cap is lifted since the export has no
/// counterpart for it.
fn disagreement(template: &EventTemplate, set: &RRuleSet, range: &DateRange) -> Option<String> {
    let uncapped = ExpandOptions::default().with_max_generated(usize::MAX);
    let ours: Vec<_> = expand_template(template, range.start, range.end, &uncapped)
        .into_iter()
        .map(|o| o.occurrence_start_date)
        .collect();
    // At most one date per day
    let limit = u16::try_from(range.days()).unwrap_or(u16::MAX);
    let theirs = rrule_dates(set, range.start, range.end, limit);
    if ours == theirs {
        return None;
    }
    let first_diff = ours
        .iter()
        .zip(&theirs)
        .find(|(a, b)| a != b)
        .map(|(a, b)| format!(", first difference {a} vs {b}"))
        .unwrap_or_default();
    Some(format!("{} dates vs {} from rrule{first_diff}", ours.len(), theirs.len()))
}
