//! Run summaries.

use console::style;

use crate::sync::{RunEnd, RunOutcome};

/// Print what a sync run found.
pub fn print_run_summary(outcome: &RunOutcome) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Sync Summary:").bold());

    match outcome.end {
        RunEnd::NotLoggedIn => {
            println!("  {}", style("Not logged in, scheduled syncs cancelled").yellow());
        }
        RunEnd::ListFetchFailed => {
            println!("  {}", style("Course list unavailable, will retry").yellow());
        }
        RunEnd::StoreFailed => {
            println!("  {}", style("Could not save course list, will retry").yellow());
        }
        RunEnd::AlreadyRunning => {
            println!("  Another sync is already running");
        }
        RunEnd::Completed => {
            println!("  New courses:   {}", outcome.new_courses.len());
            for course in &outcome.new_courses {
                println!("    {} {}", style("+").green(), course.name());
            }
            println!("  New modules:   {}", outcome.added_modules);
            println!("  Notified:      {}", outcome.notified_modules.len());
            if !outcome.failed_courses.is_empty() {
                println!(
                    "  Failed courses: {}",
                    style(outcome.failed_courses.len()).red()
                );
            }
        }
    }

    println!("{}", style("═".repeat(50)).dim());
}
