//! Default reporting for the rejection tracker.
//!
//! Reports go to a [`Console`] line by line and are mirrored as `warn`
//! tracing events. The console stands in for the host's warning output;
//! [`StderrConsole`] is used unless another one is supplied.

use crate::tracing_compat::warn;
use crate::value::Value;

/// Sink for warning lines.
pub trait Console: Send + Sync {
    /// Writes one warning line.
    fn warn(&self, line: &str);
}

/// Writes warning lines to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrConsole;

impl Console for StderrConsole {
    fn warn(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// Lines of the "possibly unhandled" report: a banner, then the error's
/// diagnostic text indented by two spaces.
#[must_use]
pub fn unhandled_lines(display_id: u64, error: &Value) -> Vec<String> {
    let text = error.diagnostic_text();
    let mut lines = Vec::with_capacity(2);
    lines.push(format!("Possible Unhandled Rejection (id: {display_id}):"));
    lines.extend(text.split('\n').map(|line| format!("  {line}")));
    lines
}

/// Lines of the "handled" notice for an earlier report.
#[must_use]
pub fn handled_lines(display_id: u64) -> [String; 2] {
    [
        format!("Rejection Handled (id: {display_id}):"),
        format!(
            "  This means you can ignore any previous messages of the form \
             \"Possible Unhandled Rejection\" with id {display_id}."
        ),
    ]
}

pub(crate) fn log_unhandled(console: &dyn Console, display_id: u64, error: &Value) {
    warn!(display_id, error = %error, "possible unhandled rejection");
    for line in unhandled_lines(display_id, error) {
        console.warn(&line);
    }
}

pub(crate) fn log_handled(console: &dyn Console, display_id: u64) {
    warn!(display_id, "previously reported rejection handled");
    for line in handled_lines(display_id) {
        console.warn(&line);
    }
}
