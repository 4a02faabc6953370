use crate::domain::{ChatId, MessageId, UserId};

/// Normalized inbound update handed to the router.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Message(NormalizedMessage),
    Callback(CallbackEvent),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationKind {
    Private,
    Group,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

/// Platform-native reference to media that already lives on the platform.
///
/// Resending by reference never re-uploads the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
    pub file_name: Option<String>,
    pub caption: Option<String>,
}

impl MediaRef {
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
            file_name: None,
            caption: None,
        }
    }
}

/// One chat message, reduced to what the relay needs.
///
/// `media` holds at most one attachment, so the payload kinds are exclusive by
/// construction. Text wins when both are present.
#[derive(Clone, Debug)]
pub struct NormalizedMessage {
    pub kind: ConversationKind,
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub sender_name: String,
    pub message_id: MessageId,
    pub reply_to: Option<MessageId>,
    pub text: Option<String>,
    pub media: Option<MediaRef>,
}

/// What drives forwarding for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload<'a> {
    Text(&'a str),
    Media(&'a MediaRef),
    Empty,
}

impl NormalizedMessage {
    pub fn payload(&self) -> Payload<'_> {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return Payload::Text(text);
        }
        match &self.media {
            Some(media) => Payload::Media(media),
            None => Payload::Empty,
        }
    }

    /// Text payload, if any.
    pub fn text(&self) -> Option<&str> {
        match self.payload() {
            Payload::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Short human-readable description for the operator console.
    pub fn summary(&self) -> String {
        match self.payload() {
            Payload::Text(t) => t.to_string(),
            Payload::Media(m) => match m.kind {
                MediaKind::Document => {
                    format!("file: {}", m.file_name.as_deref().unwrap_or(&m.file_id))
                }
                MediaKind::Photo => format!("photo: {}", m.file_id),
                MediaKind::Video => format!("video: {}", m.file_id),
            },
            Payload::Empty => "[unsupported message]".to_string(),
        }
    }
}

/// Inline button press.
#[derive(Clone, Debug)]
pub struct CallbackEvent {
    pub callback_id: String,
    /// Chat of the message carrying the button; absent for inline-mode messages.
    pub chat_id: Option<ChatId>,
    pub sender_id: UserId,
    pub data: String,
}

/// Inline keyboard (buttons) attached to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// All buttons side by side on one row.
    pub fn single_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: Option<&str>, media: Option<MediaRef>) -> NormalizedMessage {
        NormalizedMessage {
            kind: ConversationKind::Private,
            chat_id: ChatId(7),
            sender_id: Some(UserId(7)),
            sender_name: "Ann".to_string(),
            message_id: MessageId(1),
            reply_to: None,
            text: text.map(str::to_string),
            media,
        }
    }

    #[test]
    fn text_wins_over_media() {
        let m = message(Some("hi"), Some(MediaRef::new(MediaKind::Photo, "p1")));
        assert_eq!(m.payload(), Payload::Text("hi"));
        assert_eq!(m.summary(), "hi");
    }

    #[test]
    fn empty_text_falls_through_to_media() {
        let m = message(Some(""), Some(MediaRef::new(MediaKind::Video, "v1")));
        assert!(matches!(m.payload(), Payload::Media(_)));
        assert_eq!(m.summary(), "video: v1");
    }

    #[test]
    fn document_summary_uses_file_name() {
        let mut doc = MediaRef::new(MediaKind::Document, "f1");
        doc.file_name = Some("report.pdf".to_string());
        assert_eq!(message(None, Some(doc)).summary(), "file: report.pdf");
        assert_eq!(
            message(None, Some(MediaRef::new(MediaKind::Photo, "p9"))).summary(),
            "photo: p9"
        );
    }

    #[test]
    fn no_payload_is_empty() {
        let m = message(None, None);
        assert_eq!(m.payload(), Payload::Empty);
        assert_eq!(m.text(), None);
    }
}
