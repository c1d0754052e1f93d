//! Plain-text rendering for the interactive shell.

use std::fmt::Write;

use chrono::Local;

use tonal_chat::Notice;
use tonal_core::personality::{PersonalityConfig, PersonalityTrait, Preset};
use tonal_core::types::{ChatMessage, Role, SavedChat};

/// One message, prefixed with its 1-based position in the log.
pub fn message(index: usize, msg: &ChatMessage) -> String {
    let who = match msg.role {
        Role::User => "you",
        Role::Assistant => "tonal",
    };
    let mut out = format!("[{}] {}: {}", index + 1, who, msg.content);
    if msg.transcription.is_some() {
        out.push_str(" (voice)");
    }
    if let Some(response) = &msg.response {
        if !response.text_long.is_empty() && response.text_long != response.text_short {
            let _ = write!(out, "\n    {}", response.text_long);
        }
        for action in &response.action {
            let _ = write!(out, "\n    -> {}", action);
        }
    }
    out
}

pub fn messages(msgs: &[ChatMessage]) -> String {
    if msgs.is_empty() {
        return "(no messages yet)".to_string();
    }
    msgs.iter()
        .enumerate()
        .map(|(i, m)| message(i, m))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trait values as `humor 20 | sarcasm 0 | ...`, with the active preset.
pub fn personality(config: &PersonalityConfig, preset: Option<Preset>) -> String {
    let traits = PersonalityTrait::ALL
        .iter()
        .map(|t| format!("{} {}", t, config.get(*t)))
        .collect::<Vec<_>>()
        .join(" | ");
    match preset {
        Some(p) => format!("{}  [{}]", traits, p),
        None => format!("{}  [custom]", traits),
    }
}

pub fn presets(active: Option<Preset>) -> String {
    Preset::ALL
        .iter()
        .map(|p| {
            let marker = if Some(*p) == active { "*" } else { " " };
            format!("{} {:<10} {}", marker, p.name(), p.config())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Saved chats, numbered for `load` and `delete`.
pub fn saved_chats(chats: &[SavedChat]) -> String {
    if chats.is_empty() {
        return "(no saved chats)".to_string();
    }
    chats
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{:>2}. {}  ({} messages, {})",
                i + 1,
                c.name,
                c.messages.len(),
                c.date.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn notice(n: &Notice) -> String {
    if n.destructive {
        format!("! {}", n)
    } else {
        n.to_string()
    }
}
