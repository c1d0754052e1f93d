//! Personality-conditioned prompting.
//!
//! Turns a `PersonalityConfig` into the system prompt sent upstream, and
//! turns the model's raw reply back into an `AiResponse`. Replies that are
//! not the requested JSON object degrade to a plain-text response.

use serde_json::Value;

use tonal_core::personality::{PersonalityConfig, PersonalityTrait};
use tonal_core::types::AiResponse;

fn level(value: u8) -> &'static str {
    match value {
        0..=20 => "very low",
        21..=40 => "low",
        41..=60 => "moderate",
        61..=80 => "high",
        _ => "very high",
    }
}

fn guidance(trait_name: PersonalityTrait) -> &'static str {
    match trait_name {
        PersonalityTrait::Humor => "how playful and joking you are",
        PersonalityTrait::Sarcasm => "how ironic and teasing you are",
        PersonalityTrait::Seriousness => "how formal and matter-of-fact you are",
        PersonalityTrait::Empathy => "how warm and understanding you are",
    }
}

/// System prompt describing the requested tone and the reply format.
pub fn system_prompt(personality: &PersonalityConfig) -> String {
    let mut prompt = String::from(
        "You are a conversational assistant whose tone is tuned by four traits, \
         each on a scale from 0 to 100.\n",
    );
    for trait_name in PersonalityTrait::ALL {
        let value = personality.get(trait_name);
        prompt.push_str(&format!(
            "- {}: {} ({}); this sets {}.\n",
            trait_name,
            value,
            level(value),
            guidance(trait_name)
        ));
    }
    prompt.push_str(
        "Answer in the language the user writes in. Reply with a single JSON object \
         with exactly these fields:\n\
         - text_short: one or two sentences shown on screen;\n\
         - text_long: a complete, detailed answer;\n\
         - speech_text: the answer written to be read aloud, without markdown or lists;\n\
         - tone_summary: an object with integer fields humor, sarcasm, seriousness and \
         empathy (0-100) describing the tone you actually used;\n\
         - action: an array of short suggested follow-ups, possibly empty.",
    );
    prompt
}

/// Remove a surrounding markdown code fence, if present.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn string_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Interpret a raw model reply.
///
/// A JSON object with a non-empty `text_short` is used field by field;
/// missing or invalid fields fall back to sensible values (the requested
/// personality for `tone_summary`). Anything else becomes a plain response
/// whose three texts are the reply itself.
pub fn parse_reply(raw: &str, requested: &PersonalityConfig) -> AiResponse {
    let body = strip_fence(raw);
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        if let Some(text_short) = string_field(&object, "text_short") {
            let text_long = string_field(&object, "text_long").unwrap_or_else(|| text_short.clone());
            let speech_text =
                string_field(&object, "speech_text").unwrap_or_else(|| text_short.clone());
            let tone_summary = object
                .get("tone_summary")
                .and_then(|v| serde_json::from_value::<PersonalityConfig>(v.clone()).ok())
                .filter(|p| p.validate().is_ok())
                .unwrap_or(*requested);
            let action = object
                .get("action")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            return AiResponse {
                text_short,
                text_long,
                speech_text,
                tone_summary,
                action,
            };
        }
    }

    tracing::debug!("Model reply was not structured; using plain text");
    let text = raw.trim().to_string();
    AiResponse {
        text_short: text.clone(),
        text_long: text.clone(),
        speech_text: text,
        tone_summary: *requested,
        action: Vec::new(),
    }
}
