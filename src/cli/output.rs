//! CLI output formatting

use crate::core::config::RelayConfig;
use crate::persistence::{ExecutionRecord, TriggerRecord};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a stored execution status for display
pub fn format_status(status: &str) -> String {
    match status {
        "success" => style("SUCCESS").green().to_string(),
        "failed" => style("FAILED").red().to_string(),
        other => style(other.to_uppercase()).yellow().to_string(),
    }
}

/// One line per recorded trigger
pub fn format_trigger_record(record: &TriggerRecord) -> String {
    format!(
        "{} #{} {} {} - {}",
        INFO,
        style(record.id).cyan(),
        style(record.time.format(TIME_FORMAT)).dim(),
        style(short_commit(&record.commit_id)).bold(),
        first_line(&record.commit_message)
    )
}

/// One line per execution, plus its output when asked for
pub fn format_execution_record(record: &ExecutionRecord, with_output: bool) -> String {
    let icon = if record.status == "success" { CHECK } else { CROSS };
    let mut line = format!(
        "{} {} {}",
        icon,
        style(&record.script_name).bold(),
        format_status(&record.status)
    );

    if !record.error.is_empty() {
        line.push_str(&format!(" {}", style(&record.error).dim()));
    }
    if with_output && !record.output.is_empty() {
        line.push('\n');
        line.push_str(&format_output(&record.output, 20));
    }
    line
}

/// Summary printed by `validate`
pub fn format_config_summary(config: &RelayConfig) -> Vec<String> {
    let mut lines = vec![
        format!("  Address: {}", style(&config.addr).bold()),
        format!("  Staging branch: {}", style(&config.staging_branch).bold()),
        format!("  Async failure policy: {:?}", config.pipeline.async_failure_policy),
        format!(
            "  Max concurrent runs: {}",
            config
                .pipeline
                .max_concurrent_runs
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        ),
        format!("  Projects: {}", style(config.projects.len()).cyan()),
    ];

    for (name, project) in &config.projects {
        lines.push(format!(
            "    {} {}/{} ({} sequential, {} async)",
            style(name).bold(),
            project.organization,
            project.repo,
            style(project.commands.sequential_commands().count()).cyan(),
            style(project.commands.parallel_commands().count()).cyan()
        ));
    }
    lines
}

/// Format command output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        indent(output)
    } else {
        format!(
            "{}\n    {}... ({} more lines)",
            indent(&lines[..max_lines].join("\n")),
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn short_commit(commit_id: &str) -> &str {
    commit_id.get(..7).unwrap_or(commit_id)
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or_default()
}
