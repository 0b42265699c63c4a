//! Adapters from raw Bot API update JSON (read through teloxide types) to [`manager_core::Update`].

use manager_core::Update;
use serde_json::Value;
use teloxide::types::{Message, UpdateKind};

/// Converts one raw update object. `None` when there is no numeric `update_id`.
///
/// The update type is the payload key next to `update_id`; chat id and content are filled when the
/// payload parses as a typed teloxide update.
pub fn to_core_update(raw: &Value) -> Option<Update> {
    let object = raw.as_object()?;
    let update_id = object.get("update_id")?.as_i64()?;
    let update_type = object
        .keys()
        .find(|key| key.as_str() != "update_id")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let (chat_id, content) = match parse_update(raw) {
        Some(update) => chat_and_content(&update.kind),
        None => (None, None),
    };

    Some(Update {
        update_id,
        update_type,
        chat_id,
        content,
    })
}

/// Typed view of a raw update; `None` if teloxide rejects it.
pub fn parse_update(raw: &Value) -> Option<teloxide::types::Update> {
    serde_json::from_value(raw.clone()).ok()
}

/// Message-like payload of an update (messages, channel posts and their edits).
pub fn update_message(kind: &UpdateKind) -> Option<&Message> {
    match kind {
        UpdateKind::Message(msg)
        | UpdateKind::EditedMessage(msg)
        | UpdateKind::ChannelPost(msg)
        | UpdateKind::EditedChannelPost(msg) => Some(msg),
        _ => None,
    }
}

fn chat_and_content(kind: &UpdateKind) -> (Option<i64>, Option<String>) {
    if let Some(msg) = update_message(kind) {
        return (Some(msg.chat.id.0), Some(message_type(msg).to_string()));
    }
    match kind {
        UpdateKind::InlineQuery(query) => (Some(query.from.id.0 as i64), Some(query.query.clone())),
        UpdateKind::ChosenInlineResult(result) => {
            (Some(result.from.id.0 as i64), Some(result.query.clone()))
        }
        _ => (None, None),
    }
}

/// Content-type tag of a message: `command` for text starting with `/`, then the media kind.
pub fn message_type(msg: &Message) -> &'static str {
    if let Some(text) = msg.text() {
        return if text.starts_with('/') { "command" } else { "text" };
    }
    if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.animation().is_some() {
        "animation"
    } else if msg.document().is_some() {
        "document"
    } else if msg.video().is_some() {
        "video"
    } else if msg.voice().is_some() {
        "voice"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.location().is_some() {
        "location"
    } else if msg.contact().is_some() {
        "contact"
    } else {
        "message"
    }
}
