//! Terminal notification bodies

use crate::execution::ExecutionResult;

/// Longest command output quoted in a failure message, in characters
pub const MAX_OUTPUT_CHARS: usize = 2000;

pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// Cut `output` to [`MAX_OUTPUT_CHARS`] characters, marking the cut
pub fn truncate_output(output: &str) -> String {
    match output.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((cut, _)) => format!("{}{}", &output[..cut], TRUNCATION_MARKER),
        None => output.to_string(),
    }
}

/// Failure body naming the failed command, its error and its output
pub fn failure_message(commit_message: &str, failed: &ExecutionResult) -> String {
    format!(
        "{} (FAILED)\n\nFailure Reason:\nScript: {}\nError: {}\nOutput:\n{}",
        commit_message,
        failed.command(),
        failed.error(),
        truncate_output(failed.output())
    )
}

/// Success body for a repository with no configured commands
pub fn skipped_message(commit_message: &str) -> String {
    format!("{} (skipped - no commands configured)", commit_message)
}
