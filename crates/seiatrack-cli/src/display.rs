//! Vertical card display for process summaries and histories.

use seiatrack_core::{NextAction, ProcessSummary, TransitionRecord};

/// Print a process summary as a vertical card grouped by section.
pub fn print_summary_card(summary: &ProcessSummary, revision: u64) {
    println!("=== {} ===", summary.project_id);
    println!();

    println!("Status");
    println!("  {:<22} {}", "instrument", summary.instrument);
    println!("  {:<22} {}", "status", summary.status);
    println!("  {:<22} {}", "revision", revision);
    println!("  {:<22} {}", "as_of", summary.as_of);
    println!();

    println!("Deadline");
    let d = &summary.deadline;
    println!("  {:<22} {}", "elapsed_days", d.elapsed_days);
    println!("  {:<22} {}", "suspended_days", d.suspended_days);
    println!("  {:<22} {}", "effective_days", d.effective_days);
    println!("  {:<22} {}", "remaining_days", d.remaining_days);
    println!("  {:<22} {:.1}%", "consumed", d.percent_consumed);
    println!("  {:<22} {}", "risk", d.risk);
    println!();

    println!("Rounds");
    println!(
        "  {:<22} {} of {}",
        "icsara_rounds", summary.rounds_used, summary.rounds_cap
    );
    println!();

    if summary.observations.total > 0 {
        println!("Observations ({})", summary.observations.total);
        for (agency, count) in &summary.observations.by_agency {
            println!("  {:<22} {}", agency, count);
        }
        for (resolution, count) in &summary.observations.by_resolution {
            println!("  {:<22} {}", resolution, count);
        }
        if !summary.observations.agencies_with_open_critical.is_empty() {
            println!(
                "  {:<22} {}",
                "open_critical",
                summary.observations.agencies_with_open_critical.join(", ")
            );
        }
        println!();
    }

    println!("Next action");
    println!("  {}", describe_next_action(&summary.next_action));
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings");
        for warning in &summary.warnings {
            println!("  ! {warning}");
        }
        println!();
    }
}

/// Print the transition history, one line per record.
pub fn print_history(project_id: &str, transitions: &[TransitionRecord]) {
    println!("=== {} ({} transitions) ===", project_id, transitions.len());
    for record in transitions {
        println!(
            "  {}  {:<18} -> {:<18} {:<10} {}",
            record.at.format("%Y-%m-%d %H:%M"),
            record.from.as_str(),
            record.to.as_str(),
            record.actor,
            record.reason
        );
    }
}

fn describe_next_action(action: &NextAction) -> String {
    match action {
        NextAction::Submit => "submit the project".to_string(),
        NextAction::ResolveAdmissibility => "resolve admissibility".to_string(),
        NextAction::BeginEvaluation => "open the technical evaluation".to_string(),
        NextAction::IssueRoundOrIce => "issue an icsara round or the ICE".to_string(),
        NextAction::FileAdenda { round, due_on } => {
            format!("file the adenda for round {round} (due {due_on})")
        }
        NextAction::QualifyAdenda { round } => {
            format!("qualify the adenda filed for round {round}")
        }
        NextAction::EnterCommission => "convene the evaluation commission".to_string(),
        NextAction::RegisterRuling => "register the final ruling (RCA)".to_string(),
        NextAction::Closed => "none, the process is closed".to_string(),
    }
}
