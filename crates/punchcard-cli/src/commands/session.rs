//! Session commands: the terminal face of the attendance engine.

use std::io::Write;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use punchcard_core::{
    AttendanceStore, ConfirmTransition, Event, ManualClockOut, SessionEngine, Snapshot,
    TransitionKind,
};

pub enum SessionCommand {
    ClockIn,
    TakeBreak,
    ResumeWork,
    ClockOut,
    Status { json: bool },
    Watch,
    Correct { time: String, reason: String },
}

/// Interactive confirmation over stdin, mirroring the dashboard's
/// "Are you sure you want to ...?" dialogs.
pub struct StdinConfirm;

impl ConfirmTransition for StdinConfirm {
    fn confirm(&self, action: TransitionKind) -> bool {
        print!("Are you sure you want to {action}? [y/N] ");
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

pub async fn run<S: AttendanceStore>(
    engine: SessionEngine<S>,
    command: SessionCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    // Rebuild from the canonical record before doing anything. A fetch
    // failure already leaves the engine on a zeroed offline display; for
    // transitions the store will answer authoritatively anyway.
    let _ = engine.reconcile().await;

    match command {
        SessionCommand::ClockIn => {
            report_transition(engine.clock_in().await?);
        }
        SessionCommand::TakeBreak => {
            report_transition(engine.take_break().await?);
        }
        SessionCommand::ResumeWork => {
            report_transition(engine.resume_work().await?);
        }
        SessionCommand::ClockOut => {
            report_transition(engine.clock_out().await?);
        }
        SessionCommand::Status { json } => {
            let snapshot = engine.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_status(&snapshot);
            }
            if let Some(missed) = engine.missed_clock_out() {
                println!();
                println!(
                    "Missed clock-out: clocked in {} but never clocked out.",
                    local_hms(missed.clock_in)
                );
                println!(
                    "Submit a correction with: punchcard correct --time <when> --reason <why>"
                );
            }
        }
        SessionCommand::Watch => {
            watch(&engine).await?;
        }
        SessionCommand::Correct { time, reason } => {
            let clock_out_time = parse_clock_out_time(&time)?;
            engine
                .submit_manual_clock_out(ManualClockOut {
                    clock_out_time,
                    reason,
                })
                .await?;
            println!("Correction submitted for {}.", local_hms(clock_out_time));
        }
    }
    Ok(())
}

fn report_transition(event: Option<Event>) {
    match event {
        Some(Event::ClockedIn { at }) => println!("Clocked in at {}.", local_hms(at)),
        Some(Event::BreakStarted { at }) => println!("Break started at {}.", local_hms(at)),
        Some(Event::BreakEnded { at, break_secs }) => println!(
            "Back to work at {} after a {} break.",
            local_hms(at),
            punchcard_core::format_hms(break_secs)
        ),
        Some(Event::ClockedOut {
            at,
            worked_secs,
            break_secs,
            overtime_secs,
        }) => {
            println!("Clocked out at {}.", local_hms(at));
            println!(
                "Worked {} (break {}, overtime {}).",
                punchcard_core::format_hms(worked_secs),
                punchcard_core::format_hms(break_secs),
                punchcard_core::format_hms(overtime_secs)
            );
        }
        Some(Event::Reconciled { .. }) => {}
        None => println!("Cancelled."),
    }
}

fn print_status(snapshot: &Snapshot) {
    println!("Status:    {}", snapshot.status_label());
    println!("Total:     {}", punchcard_core::format_hms(snapshot.metrics.total_secs()));
    println!("Worked:    {}", snapshot.metrics.worked_hms());
    println!("Break:     {}", snapshot.metrics.break_hms());
    println!("Overtime:  {}", snapshot.metrics.overtime_hms());
    if snapshot.sync_error {
        println!("Warning:   attendance store unreachable, showing offline state");
    }
}

async fn watch<S: AttendanceStore>(
    engine: &SessionEngine<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = engine.subscribe();
    let mut stdout = std::io::stdout();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        print!(
            "\r{}  worked {}  break {}  overtime {}   ",
            snapshot.status_label(),
            snapshot.metrics.worked_hms(),
            snapshot.metrics.break_hms(),
            snapshot.metrics.overtime_hms()
        );
        stdout.flush()?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    println!();
                    return Ok(());
                }
            }
        }
    }
}

fn local_hms(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Accept RFC 3339, or a local "YYYY-MM-DD HH:MM[:SS]" timestamp.
fn parse_clock_out_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return match Local.from_local_datetime(&naive).earliest() {
                Some(local) => Ok(local.with_timezone(&Utc)),
                None => Err(format!("ambiguous local time: {raw}")),
            };
        }
    }
    Err(format!(
        "unrecognized timestamp '{raw}' (expected RFC 3339 or YYYY-MM-DD HH:MM)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_clock_out_time("2025-03-10T18:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-10T18:00:00+00:00");
    }

    #[test]
    fn parses_local_date_time() {
        assert!(parse_clock_out_time("2025-03-10 18:00").is_ok());
        assert!(parse_clock_out_time("2025-03-10 18:00:30").is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_clock_out_time("yesterday-ish").is_err());
    }
}
