//! Fakes of the ports, shared by the unit tests of this crate.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    config::Config,
    console::ConsoleEcho,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, MediaRef},
    },
    session::RelaySession,
    store::memory::MemoryRouteStore,
    Result,
};

pub(crate) const OWNER: i64 = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Sent {
    Text(ChatId, String),
    Markdown(ChatId, String, Option<InlineKeyboard>),
    Media(ChatId, MediaRef),
    Forward {
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    },
    Ack(String),
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<Sent>>,
    fail_text: AtomicBool,
    fail_markdown: AtomicBool,
    fail_forward: AtomicBool,
    panic_forward: AtomicBool,
    fail_ack: AtomicBool,
}

impl FakeMessenger {
    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(500 + *guard),
        }
    }

    fn record(&self, s: Sent) {
        self.sent.lock().unwrap().push(s);
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, chat_id: ChatId) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| match s {
                Sent::Text(c, _) | Sent::Markdown(c, _, _) | Sent::Media(c, _) => *c == chat_id,
                Sent::Forward { to, .. } => *to == chat_id,
                Sent::Ack(_) => false,
            })
            .collect()
    }

    pub(crate) fn fail_text_sends(&self) {
        self.fail_text.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_markdown_sends(&self) {
        self.fail_markdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_forwards(&self) {
        self.fail_forward.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_on_forward(&self) {
        self.panic_forward.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_acks(&self) {
        self.fail_ack.store(true, Ordering::SeqCst);
    }
}

fn refused() -> Error {
    Error::Transport("refused by fake".to_string())
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.record(Sent::Text(chat_id, text.to_string()));
        Ok(self.alloc(chat_id))
    }

    async fn send_markdown(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        if self.fail_markdown.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.record(Sent::Markdown(chat_id, text.to_string(), keyboard));
        Ok(self.alloc(chat_id))
    }

    async fn send_reference(&self, chat_id: ChatId, media: &MediaRef) -> Result<MessageRef> {
        self.record(Sent::Media(chat_id, media.clone()));
        Ok(self.alloc(chat_id))
    }

    async fn forward(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<MessageRef> {
        if self.panic_forward.load(Ordering::SeqCst) {
            panic!("fake forward panicked");
        }
        if self.fail_forward.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.record(Sent::Forward {
            to,
            from,
            message_id,
        });
        Ok(self.alloc(to))
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(refused());
        }
        self.record(Sent::Ack(callback_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingEcho {
    printed: Mutex<Vec<String>>,
    announced: Mutex<Vec<String>>,
    prompts: AtomicUsize,
}

impl RecordingEcho {
    pub(crate) fn printed(&self) -> Vec<String> {
        self.printed.lock().unwrap().clone()
    }

    pub(crate) fn announced(&self) -> Vec<String> {
        self.announced.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl ConsoleEcho for RecordingEcho {
    fn print(&self, text: &str) {
        self.printed.lock().unwrap().push(text.to_string());
    }

    fn announce(&self, text: &str) {
        self.announced.lock().unwrap().push(text.to_string());
    }

    fn prompt(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct Harness {
    pub(crate) session: Arc<RelaySession>,
    pub(crate) messenger: Arc<FakeMessenger>,
    pub(crate) store: Arc<MemoryRouteStore>,
    pub(crate) echo: Arc<RecordingEcho>,
}

pub(crate) fn test_config() -> Config {
    Config::parse(&format!("account:\n  token: \"1:test\"\n  owner: {OWNER}\n")).unwrap()
}

pub(crate) fn harness() -> Harness {
    harness_with(test_config(), MemoryRouteStore::default())
}

pub(crate) fn harness_with(cfg: Config, store: MemoryRouteStore) -> Harness {
    let messenger = Arc::new(FakeMessenger::default());
    let store = Arc::new(store);
    let echo = Arc::new(RecordingEcho::default());
    let session = Arc::new(RelaySession::new(
        cfg,
        store.clone(),
        messenger.clone(),
        echo.clone(),
    ));
    Harness {
        session,
        messenger,
        store,
        echo,
    }
}
