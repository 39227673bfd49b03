//! Interactive card composer
//!
//! Pure mapping from a [`Notification`] to the card JSON the chat bot renders.

use crate::notify::{Notification, NotificationStatus};
use serde_json::{json, Value};

const UNKNOWN_REPO: &str = "unknown/repo";
const UNKNOWN_AUTHOR: &str = "unknown";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header marker, colour template and status label for a status
pub fn card_style(status: NotificationStatus) -> (&'static str, &'static str, &'static str) {
    match status {
        NotificationStatus::Started => ("🚀", "blue", "Workflow Started"),
        NotificationStatus::Success => ("✅", "green", "Success"),
        NotificationStatus::Failure => ("🚨", "red", "Failure"),
    }
}

/// Build the card body for a notification
pub fn build_card(notification: &Notification) -> Value {
    let repo = non_empty_or(&notification.repo, UNKNOWN_REPO);
    let author = non_empty_or(&notification.author, UNKNOWN_AUTHOR);
    let (marker, template, status_text) = card_style(notification.status);

    let title = if notification.branch.is_empty() {
        format!("{} {}", marker, repo)
    } else {
        format!("{} {} - {}", marker, repo, notification.branch)
    };

    json!({
        "config": {
            "wide_screen_mode": true,
            "enable_forward": true,
        },
        "header": {
            "template": template,
            "title": {
                "tag": "plain_text",
                "content": title,
            },
        },
        "elements": [
            markdown(format!(
                "**Status:** {}\n**Author:** {}\n**Branch:** {}",
                status_text, author, notification.branch
            )),
            { "tag": "hr" },
            markdown(format!(
                "**Commit ID:** `{}`\n**Time:** {}",
                notification.commit_id,
                notification.commit_time.format(TIME_FORMAT)
            )),
            { "tag": "hr" },
            markdown(format!("**Commit Message:**\n{}", notification.message)),
        ],
    })
}

fn markdown(content: String) -> Value {
    json!({
        "tag": "div",
        "text": {
            "tag": "lark_md",
            "content": content,
        },
    })
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}
