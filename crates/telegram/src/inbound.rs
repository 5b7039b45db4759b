//! Mapping from teloxide updates to the router's inbound events.

use teloxide::types::{CallbackQuery, MediaKind, Message, MessageKind};

use festa_common::types::{
    ButtonPress, InboundEvent, InboundMessage, MessageContent, MessageHandle,
};

/// Extract text content from a message (text body or media caption).
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            MediaKind::Photo(p) => p.caption.clone(),
            MediaKind::Document(d) => d.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Extract the largest photo's file ID, for relay without downloading.
fn extract_photo(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Photo(p) => p.photo.last().map(|ps| ps.file.id.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn sender_name(msg: &Message) -> Option<String> {
    msg.from.as_ref().map(|u| {
        let last = u.last_name.as_deref().unwrap_or("");
        format!("{} {last}", u.first_name).trim().to_string()
    })
}

/// Map a Telegram message to an inbound unit. Returns `None` for media kinds
/// the bot does not process (stickers, voice, video, …).
pub fn map_message(msg: &Message) -> Option<InboundEvent> {
    let content = match extract_photo(msg) {
        Some(file_id) => MessageContent::Image {
            file_id,
            caption: extract_text(msg),
        },
        None => MessageContent::Text(extract_text(msg)?),
    };

    Some(InboundEvent::Message(InboundMessage {
        chat_id: msg.chat.id.0,
        sender_name: sender_name(msg),
        content,
    }))
}

/// Map a callback query (inline-button press) to an inbound unit.
pub fn map_callback(query: &CallbackQuery) -> Option<InboundEvent> {
    let action = query.data.clone()?;
    let chat_id = query.message.as_ref().map(|m| m.chat().id.0)?;
    let message = query.message.as_ref().map(|m| MessageHandle(m.id().0));

    Some(InboundEvent::Button(ButtonPress {
        chat_id,
        sender_name: Some(query.from.first_name.clone()),
        callback_id: query.id.clone(),
        message,
        action,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).expect("valid telegram message json")
    }

    #[test]
    fn text_message_maps_to_text_content() {
        let msg = message(json!({
            "message_id": 1,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Olena" },
            "from": {
                "id": 42,
                "is_bot": false,
                "first_name": "Olena",
                "last_name": "K"
            },
            "text": "5 latex balloons, tomorrow"
        }));

        let Some(InboundEvent::Message(mapped)) = map_message(&msg) else {
            panic!("text message must map");
        };
        assert_eq!(mapped.chat_id, 42);
        assert_eq!(mapped.sender_name.as_deref(), Some("Olena K"));
        assert_eq!(
            mapped.content,
            MessageContent::Text("5 latex balloons, tomorrow".into())
        );
    }

    #[test]
    fn photo_maps_to_image_with_caption() {
        let msg = message(json!({
            "message_id": 2,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Olena" },
            "from": { "id": 42, "is_bot": false, "first_name": "Olena" },
            "photo": [
                {
                    "file_id": "small",
                    "file_unique_id": "u1",
                    "width": 90,
                    "height": 90,
                    "file_size": 100
                },
                {
                    "file_id": "large",
                    "file_unique_id": "u2",
                    "width": 800,
                    "height": 800,
                    "file_size": 5000
                }
            ],
            "caption": "like this one"
        }));

        let Some(InboundEvent::Message(mapped)) = map_message(&msg) else {
            panic!("photo message must map");
        };
        assert_eq!(
            mapped.content,
            MessageContent::Image {
                file_id: "large".into(),
                caption: Some("like this one".into()),
            }
        );
    }

    #[test]
    fn captionless_photo_maps_with_no_caption() {
        let msg = message(json!({
            "message_id": 3,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Olena" },
            "from": { "id": 42, "is_bot": false, "first_name": "Olena" },
            "photo": [{
                "file_id": "only",
                "file_unique_id": "u1",
                "width": 90,
                "height": 90
            }]
        }));

        let Some(InboundEvent::Message(mapped)) = map_message(&msg) else {
            panic!("photo message must map");
        };
        assert_eq!(
            mapped.content,
            MessageContent::Image {
                file_id: "only".into(),
                caption: None,
            }
        );
    }

    #[test]
    fn unsupported_media_is_ignored() {
        let msg = message(json!({
            "message_id": 4,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Olena" },
            "from": { "id": 42, "is_bot": false, "first_name": "Olena" },
            "sticker": {
                "file_id": "sticker-1",
                "file_unique_id": "u1",
                "type": "regular",
                "width": 512,
                "height": 512,
                "is_animated": false,
                "is_video": false
            }
        }));

        assert!(map_message(&msg).is_none());
    }
}
