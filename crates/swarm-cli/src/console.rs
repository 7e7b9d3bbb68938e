use swarm_core::status::{StatusSink, RESULT_FAILED};
use swarm_core::StatusResult;

/// Prints one line per status update to stderr.
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn update(&self, target: &str, task: &str, step: &str, result: &str) {
        eprintln!("{} [{}] {} | {} | {}", icon(result), target, task, step, result);
    }
}

fn icon(result: &str) -> &'static str {
    if result == StatusResult::Success.to_string() {
        "✅"
    } else if result == RESULT_FAILED || result == StatusResult::Error.to_string() {
        "❌"
    } else {
        "▶"
    }
}
