//! teloxide updates -> core events.

use teloxide::types::{CallbackQuery, Message};

use pmrelay_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::{CallbackEvent, ConversationKind, MediaKind, MediaRef, NormalizedMessage},
};

pub fn normalize_message(msg: &Message) -> NormalizedMessage {
    let kind = if msg.chat.is_private() {
        ConversationKind::Private
    } else if msg.chat.is_group() || msg.chat.is_supergroup() {
        ConversationKind::Group
    } else {
        ConversationKind::Other
    };

    let sender = msg.from();

    NormalizedMessage {
        kind,
        chat_id: ChatId(msg.chat.id.0),
        sender_id: sender.map(|u| UserId(u.id.0 as i64)),
        sender_name: sender.map(|u| u.full_name()).unwrap_or_default(),
        message_id: MessageId(msg.id.0),
        reply_to: msg.reply_to_message().map(|r| MessageId(r.id.0)),
        text: msg.text().map(str::to_string),
        media: media_of(msg),
    }
}

/// The one attachment we relay. Photos use the largest size Telegram offers.
fn media_of(msg: &Message) -> Option<MediaRef> {
    let mut media = if let Some(sizes) = msg.photo() {
        MediaRef::new(MediaKind::Photo, sizes.last()?.file.id.clone())
    } else if let Some(video) = msg.video() {
        MediaRef::new(MediaKind::Video, video.file.id.clone())
    } else if let Some(doc) = msg.document() {
        let mut media = MediaRef::new(MediaKind::Document, doc.file.id.clone());
        media.file_name = doc.file_name.clone();
        media
    } else {
        return None;
    };
    media.caption = msg.caption().map(str::to_string);
    Some(media)
}

pub fn normalize_callback(q: &CallbackQuery) -> CallbackEvent {
    CallbackEvent {
        callback_id: q.id.clone(),
        chat_id: q.message.as_ref().map(|m| ChatId(m.chat.id.0)),
        sender_id: UserId(q.from.id.0 as i64),
        data: q.data.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmrelay_core::messaging::types::Payload;
    use serde_json::json;

    fn user(id: i64) -> serde_json::Value {
        json!({ "id": id, "is_bot": false, "first_name": "Ann", "last_name": "Lee" })
    }

    fn private_chat(id: i64) -> serde_json::Value {
        json!({ "id": id, "type": "private", "first_name": "Ann" })
    }

    fn message(extra: serde_json::Value) -> Message {
        let mut base = json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": private_chat(42),
            "from": user(42),
        });
        for (k, v) in extra.as_object().unwrap() {
            base[k] = v.clone();
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn private_text_message() {
        let msg = normalize_message(&message(json!({ "text": "hello" })));

        assert_eq!(msg.kind, ConversationKind::Private);
        assert_eq!(msg.chat_id, ChatId(42));
        assert_eq!(msg.sender_id, Some(UserId(42)));
        assert_eq!(msg.sender_name, "Ann Lee");
        assert_eq!(msg.message_id, MessageId(10));
        assert_eq!(msg.reply_to, None);
        assert_eq!(msg.payload(), Payload::Text("hello"));
    }

    #[test]
    fn reply_carries_target_id() {
        let replied = json!({
            "message_id": 7,
            "date": 1_700_000_000,
            "chat": private_chat(42),
            "from": user(42),
            "text": "forwarded copy",
        });
        let msg = normalize_message(&message(json!({
            "text": "answer",
            "reply_to_message": replied,
        })));

        assert_eq!(msg.reply_to, Some(MessageId(7)));
    }

    #[test]
    fn photo_uses_largest_size_and_caption() {
        let msg = normalize_message(&message(json!({
            "photo": [
                { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 90 },
                { "file_id": "large", "file_unique_id": "l", "width": 800, "height": 800 },
            ],
            "caption": "look",
        })));

        let media = msg.media.unwrap();
        assert_eq!(media.kind, MediaKind::Photo);
        assert_eq!(media.file_id, "large");
        assert_eq!(media.caption.as_deref(), Some("look"));
        assert_eq!(msg.text, None);
    }

    #[test]
    fn document_keeps_file_name() {
        let msg = normalize_message(&message(json!({
            "document": { "file_id": "doc1", "file_unique_id": "d", "file_name": "report.pdf" },
        })));

        assert_eq!(msg.summary(), "file: report.pdf");
    }

    #[test]
    fn group_chat_is_not_private() {
        let msg = normalize_message(&message(json!({
            "chat": { "id": -100123, "type": "supergroup", "title": "Team" },
            "text": "hi all",
        })));

        assert_eq!(msg.kind, ConversationKind::Group);
    }

    #[test]
    fn callback_query_maps_chat_and_data() {
        let q: CallbackQuery = serde_json::from_value(json!({
            "id": "cb-9",
            "from": user(42),
            "chat_instance": "ci",
            "data": "tokenLoginDoc",
            "message": {
                "message_id": 11,
                "date": 1_700_000_000,
                "chat": private_chat(42),
                "text": "welcome",
            },
        }))
        .unwrap();

        let cb = normalize_callback(&q);
        assert_eq!(cb.callback_id, "cb-9");
        assert_eq!(cb.chat_id, Some(ChatId(42)));
        assert_eq!(cb.sender_id, UserId(42));
        assert_eq!(cb.data, "tokenLoginDoc");
    }
}
