// src/utils/log.rs

//! Console output helpers for the CLI.
//!
//! Diagnostic logging goes through the `log` facade; these helpers print the
//! human-facing report (headers, indented items, summaries) with the same
//! timestamped layout.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress all console report output.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn enabled() -> bool {
    !QUIET.load(Ordering::Relaxed)
}

/// Format a report line with timestamp and tag.
fn format_line(tag: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, tag, message)
}

/// Print an informational line.
pub fn info(message: &str) {
    if enabled() {
        println!("{}", format_line("INFO", message));
    }
}

/// Print a success line.
pub fn success(message: &str) {
    if enabled() {
        println!("{}", format_line("INFO", &format!("✓ {}", message)));
    }
}

/// Print a failure line. Always shown.
pub fn failure(message: &str) {
    eprintln!("{}", format_line("ERROR", &format!("✗ {}", message)));
}

/// Print a header.
pub fn header(title: &str) {
    if enabled() {
        let border = "═".repeat(60);
        println!("{}", border);
        println!("  {}", title);
        println!("{}", border);
    }
}

/// Print an indented sub-item.
pub fn sub_item(message: &str) {
    if enabled() {
        println!("    {}", message);
    }
}

/// Print a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    if enabled() {
        println!();
        println!("{}", format_line("SUMMARY", title));
        for (key, value) in items {
            println!("    {}: {}", key, value);
        }
    }
}
