mod display;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use seiatrack_core::{
    AdmissibilityResult, Instrument, ObservationDraft, ResponseDraft, ReviewResult,
    RulingCondition, RulingResult,
};
use seiatrack_service::Tracker;

#[derive(Parser)]
#[command(name = "seiatrack", version, about = "SEIA evaluation process tracker")]
struct Cli {
    /// Data directory holding process aggregates and the audit log.
    #[arg(long, env = "SEIATRACK_DATA", default_value = ".seiatrack")]
    data_dir: PathBuf,

    /// Actor recorded in transition history and audit entries.
    #[arg(long, env = "SEIATRACK_ACTOR", default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a formally submitted project.
    Start {
        #[arg(long)]
        project: String,
        #[arg(long)]
        instrument: Instrument,
        #[arg(long)]
        submitted: NaiveDate,
    },
    /// Record the admissibility decision.
    Admissibility {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        result: AdmissibilityResult,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Open the technical evaluation for an admitted project.
    BeginEvaluation {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Issue an ICSARA round; observations are read from a JSON file.
    IssueRound {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        emitted: NaiveDate,
        #[arg(long)]
        due: NaiveDate,
        /// JSON array of observation drafts.
        #[arg(long)]
        observations: PathBuf,
    },
    /// File the adenda answering a round; responses read from a JSON file.
    FileAdenda {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        round: u32,
        #[arg(long)]
        date: NaiveDate,
        /// JSON array of response drafts.
        #[arg(long)]
        responses: PathBuf,
    },
    /// Record the agency review of a filed adenda.
    Qualify {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        round: u32,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        result: ReviewResult,
    },
    /// Issue the consolidated technical report (ICE).
    Ice {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        date: NaiveDate,
        /// Proceed despite pending critical observations.
        #[arg(long)]
        override_critical: bool,
    },
    /// Convene the evaluation commission.
    Commission {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Register the final ruling (RCA).
    Ruling {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        result: RulingResult,
        #[arg(long)]
        document: String,
        #[arg(long)]
        date: NaiveDate,
        /// Optional JSON array of ruling conditions.
        #[arg(long)]
        conditions: Option<PathBuf>,
    },
    /// Suspend the legal clock.
    Suspend {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        reason: String,
    },
    /// Lift the open suspension.
    Resume {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Withdraw the project from evaluation.
    Withdraw {
        #[arg(long)]
        project: String,
        #[arg(long)]
        rev: u64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        reason: String,
    },
    /// Show the read-only summary card.
    Summary {
        #[arg(long)]
        project: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Emit JSON instead of the card.
        #[arg(long)]
        json: bool,
    },
    /// Show the transition history.
    History {
        #[arg(long)]
        project: String,
    },
    /// Expire overdue unanswered rounds across every process.
    Expire {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// List tracked projects.
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!(data_dir = %cli.data_dir.display(), "opening tracker");
    let service = Tracker::open(&cli.data_dir)?;
    let actor = cli.actor.as_str();

    match cli.command {
        Command::Start {
            project,
            instrument,
            submitted,
        } => {
            let stored = service.start_process(&project, instrument, submitted, actor)?;
            println!("{} started at revision {}", project, stored.revision);
        }
        Command::Admissibility {
            project,
            rev,
            result,
            date,
        } => {
            let stored = service.register_admissibility(&project, rev, result, date, actor)?;
            println!(
                "{} is now {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::BeginEvaluation { project, rev, date } => {
            let stored = service.begin_evaluation(&project, rev, date, actor)?;
            println!(
                "{} is now {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::IssueRound {
            project,
            rev,
            emitted,
            due,
            observations,
        } => {
            let drafts: Vec<ObservationDraft> = read_json(&observations)?;
            let (stored, number) =
                service.issue_round(&project, rev, emitted, due, drafts, actor)?;
            println!(
                "round {} issued for {} (revision {})",
                number, project, stored.revision
            );
        }
        Command::FileAdenda {
            project,
            rev,
            round,
            date,
            responses,
        } => {
            let drafts: Vec<ResponseDraft> = read_json(&responses)?;
            let stored = service.file_adenda(&project, rev, round, date, drafts, actor)?;
            println!(
                "adenda filed for round {} of {} (revision {})",
                round, project, stored.revision
            );
        }
        Command::Qualify {
            project,
            rev,
            round,
            date,
            result,
        } => {
            let stored = service.qualify_adenda(&project, rev, round, date, result, actor)?;
            println!(
                "adenda for round {} reviewed as {} (revision {})",
                round, result, stored.revision
            );
        }
        Command::Ice {
            project,
            rev,
            date,
            override_critical,
        } => {
            let stored = service.issue_ice(&project, rev, date, override_critical, actor)?;
            println!(
                "{} is now {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::Commission { project, rev, date } => {
            let stored = service.enter_commission(&project, rev, date, actor)?;
            println!(
                "{} is now {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::Ruling {
            project,
            rev,
            result,
            document,
            date,
            conditions,
        } => {
            let conditions: Vec<RulingCondition> = match conditions {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let stored = service.register_ruling(
                &project, rev, result, &document, date, conditions, actor,
            )?;
            println!(
                "{} closed as {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::Suspend {
            project,
            rev,
            from,
            to,
            reason,
        } => {
            let stored = service.register_suspension(&project, rev, from, to, &reason)?;
            println!("legal clock suspended for {} (revision {})", project, stored.revision);
        }
        Command::Resume { project, rev, to } => {
            let stored = service.lift_suspension(&project, rev, to)?;
            println!("legal clock resumed for {} (revision {})", project, stored.revision);
        }
        Command::Withdraw {
            project,
            rev,
            date,
            reason,
        } => {
            let stored = service.withdraw(&project, rev, date, &reason, actor)?;
            println!(
                "{} closed as {} (revision {})",
                project, stored.process.status, stored.revision
            );
        }
        Command::Summary {
            project,
            as_of,
            json,
        } => {
            let (revision, summary) = service.get_summary(&project, as_of)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                display::print_summary_card(&summary, revision);
            }
        }
        Command::History { project } => {
            let transitions = service.history(&project)?;
            display::print_history(&project, &transitions);
        }
        Command::Expire { as_of } => {
            let affected = service.expire_unanswered_rounds(as_of)?;
            if affected.is_empty() {
                println!("no rounds expired");
            } else {
                for project in affected {
                    println!("{project}: round(s) expired");
                }
            }
        }
        Command::List => {
            for project in service.list()? {
                println!("{project}");
            }
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
