//! Decides what every inbound update means and performs the relay.
//!
//! User message  -> forwarded to the admin, forwarded id -> user chat stored.
//! Admin reply   -> stored chat looked up, payload resent there.
//! `*<id> text`  -> admin sends straight to a chat id.
//! `/command`    -> see `commands`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    commands,
    domain::ChatId,
    messaging::types::{ConversationKind, InboundEvent, NormalizedMessage, Payload},
    session::RelaySession,
    store::RouteEntry,
    utils::parse_direct_send,
    Result,
};

pub const REPLY_TO_FORWARD: &str = "reply to forward ...";
pub const FORMAT_INVALID: &str = "format invalid, use: *<chat id> <message>";
pub const PROCESSING_FAILED: &str =
    "An error occurred while processing a message. Check the log for details.";

pub struct Router {
    session: Arc<RelaySession>,
}

impl Router {
    pub fn new(session: Arc<RelaySession>) -> Self {
        Self { session }
    }

    /// Route one event in isolation.
    ///
    /// Runs on its own task so that neither an error nor a panic escapes: both
    /// are logged and the admin gets a generic notice.
    pub async fn dispatch(self: &Arc<Self>, event: InboundEvent) {
        let router = Arc::clone(self);
        match tokio::spawn(async move { router.route(event).await }).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => error!("failed to route update: {e}"),
            Err(join) if join.is_panic() => error!("routing panicked: {join}"),
            Err(join) => {
                warn!("routing task cancelled: {join}");
                return;
            }
        }

        let owner_chat = self.session.owner().private_chat();
        if let Err(e) = self
            .session
            .messenger()
            .send_text(owner_chat, PROCESSING_FAILED)
            .await
        {
            error!("failed to notify admin about routing failure: {e}");
        }
    }

    pub async fn route(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Callback(cb) => commands::handle_callback(&self.session, &cb).await,
            InboundEvent::Message(msg) => self.route_message(&msg).await,
        }
    }

    async fn route_message(&self, msg: &NormalizedMessage) -> Result<()> {
        if msg.kind != ConversationKind::Private {
            debug!(chat = %msg.chat_id, "ignoring non-private chat");
            return Ok(());
        }

        if let Some(text) = msg.text().filter(|t| t.starts_with('/')) {
            return commands::handle_command(&self.session, msg.chat_id, text).await;
        }

        if msg.sender_id == Some(self.session.owner()) {
            self.deliver_outgoing(msg).await
        } else {
            self.deliver_incoming(msg).await
        }
    }

    async fn deliver_incoming(&self, msg: &NormalizedMessage) -> Result<()> {
        let summary = msg.summary();
        info!(chat = %msg.chat_id, name = %msg.sender_name, "received message");
        self.session
            .echo()
            .announce(&format!("({}){}: {}", msg.chat_id, msg.sender_name, summary));
        self.session.set_last_active(msg.chat_id).await;

        let owner_chat = self.session.owner().private_chat();
        let forwarded = self
            .session
            .messenger()
            .forward(owner_chat, msg.chat_id, msg.message_id)
            .await?;

        let entry = RouteEntry::now(forwarded.message_id, msg.chat_id);
        match self.session.store().put(entry) {
            Ok(()) => debug!(
                chat = %msg.chat_id,
                forwarded = %forwarded.message_id,
                "stored route"
            ),
            Err(e) => error!(
                chat = %msg.chat_id,
                forwarded = %forwarded.message_id,
                "failed to store route: {e}"
            ),
        }

        info!(
            chat = %msg.chat_id,
            forwarded = %forwarded.message_id,
            content = %summary,
            "relayed to admin"
        );
        Ok(())
    }

    async fn deliver_outgoing(&self, msg: &NormalizedMessage) -> Result<()> {
        if let Some(text) = msg.text().filter(|t| t.starts_with('*')) {
            return self.direct_send(msg.chat_id, text).await;
        }

        let messenger = self.session.messenger();
        let Some(dest) = self
            .resolve_reply_target(msg)
            .filter(|dest| *dest != msg.chat_id)
        else {
            messenger.send_text(msg.chat_id, REPLY_TO_FORWARD).await?;
            return Ok(());
        };

        match msg.payload() {
            Payload::Text(text) => {
                self.session.echo().announce(&format!("({dest}){text}"));
                messenger.send_text(dest, text).await?;
                info!(chat = %dest, "relayed admin reply");
            }
            Payload::Media(media) => {
                messenger.send_reference(dest, media).await?;
                info!(chat = %dest, kind = ?media.kind, "relayed admin media");
            }
            Payload::Empty => debug!(chat = %dest, "admin reply has nothing to relay"),
        }
        Ok(())
    }

    /// Chat the admin's reply should reach. Store failures count as "unknown".
    fn resolve_reply_target(&self, msg: &NormalizedMessage) -> Option<ChatId> {
        let reply_to = msg.reply_to?;
        match self.session.store().get(reply_to) {
            Ok(entry) => entry.map(|e| e.origin),
            Err(e) => {
                error!(reply_to = %reply_to, "failed to look up route: {e}");
                None
            }
        }
    }

    async fn direct_send(&self, admin_chat: ChatId, text: &str) -> Result<()> {
        let messenger = self.session.messenger();
        match parse_direct_send(text) {
            None => {
                messenger.send_text(admin_chat, FORMAT_INVALID).await?;
            }
            Some((dest, "")) => debug!(chat = %dest, "direct send without body dropped"),
            Some((dest, body)) => {
                messenger.send_text(dest, body).await?;
                info!(chat = %dest, "direct send");
            }
        }
        Ok(())
    }
}
