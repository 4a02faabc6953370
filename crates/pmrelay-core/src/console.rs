//! Operator console: one-line commands typed on stdin.
//!
//! ```text
//! ! <message>          reply to the chat that wrote last (`0` works too)
//! <chat id> <message>  send to an explicit chat
//! ```

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    thread,
};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{domain::ChatId, session::RelaySession, utils::split_first_token};

pub const PROMPT: &str = ":: ";

/// Where the relay writes operator-facing lines.
pub trait ConsoleEcho: Send + Sync {
    /// Output in answer to an operator command.
    fn print(&self, text: &str);
    /// Output that arrives while the operator sits at the prompt; re-prints it.
    fn announce(&self, text: &str);
    fn prompt(&self);
}

pub struct StdoutEcho;

impl ConsoleEcho for StdoutEcho {
    fn print(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{text}");
    }

    fn announce(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{text}\n{PROMPT}");
        let _ = out.flush();
    }

    fn prompt(&self) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "{PROMPT}");
        let _ = out.flush();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleOutcome {
    Ignored,
    Sent(ChatId),
    Unknown,
    MissingText,
    NoActiveChat,
    Failed(ChatId),
}

pub struct Console {
    session: Arc<RelaySession>,
}

impl Console {
    pub fn new(session: Arc<RelaySession>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, line: &str) -> ConsoleOutcome {
        let echo = self.session.echo();
        let Some((cmd, text)) = split_first_token(line) else {
            return ConsoleOutcome::Ignored;
        };

        let target = if cmd == "!" || cmd == "0" {
            match self.session.last_active().await {
                Some(chat_id) => chat_id,
                None => {
                    echo.print("no active chat yet");
                    return ConsoleOutcome::NoActiveChat;
                }
            }
        } else if let Ok(id) = cmd.parse::<i64>() {
            ChatId(id)
        } else {
            echo.print("unknown command");
            return ConsoleOutcome::Unknown;
        };

        if text.is_empty() {
            echo.print("usage: <chat id | !> <message>");
            return ConsoleOutcome::MissingText;
        }

        echo.print(&format!("({target}){text}"));
        match self.session.messenger().send_text(target, text).await {
            Ok(_) => ConsoleOutcome::Sent(target),
            Err(e) => {
                warn!(chat = %target, "console send failed: {e}");
                echo.print(&format!("send failed: {e}"));
                ConsoleOutcome::Failed(target)
            }
        }
    }

    /// Process lines until the input side closes.
    pub async fn run(self, mut lines: mpsc::UnboundedReceiver<String>) {
        let echo = self.session.echo();
        echo.prompt();
        while let Some(line) = lines.recv().await {
            self.execute(&line).await;
            echo.prompt();
        }
        info!("console input closed");
    }
}

/// Read stdin on a dedicated thread and hand lines to the async side.
///
/// The thread is never joined; process exit ends it.
pub fn spawn_stdin_reader() -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, Sent};

    #[tokio::test]
    async fn bang_sends_whole_line_to_last_active_chat() {
        let h = harness();
        h.session.set_last_active(ChatId(55)).await;
        let console = Console::new(h.session.clone());

        let out = console.execute("! see you   tomorrow").await;

        assert_eq!(out, ConsoleOutcome::Sent(ChatId(55)));
        assert_eq!(
            h.messenger.sent(),
            vec![Sent::Text(ChatId(55), "see you   tomorrow".to_string())]
        );
        assert_eq!(h.echo.printed(), vec!["(55)see you   tomorrow".to_string()]);
    }

    #[tokio::test]
    async fn zero_is_an_alias_for_bang() {
        let h = harness();
        h.session.set_last_active(ChatId(9)).await;
        let console = Console::new(h.session.clone());

        assert_eq!(console.execute("0 hi").await, ConsoleOutcome::Sent(ChatId(9)));
    }

    #[tokio::test]
    async fn numeric_command_targets_literal_chat() {
        let h = harness();
        let console = Console::new(h.session.clone());

        assert_eq!(
            console.execute("-100777 group hello").await,
            ConsoleOutcome::Sent(ChatId(-100777))
        );
        assert_eq!(
            h.messenger.sent(),
            vec![Sent::Text(ChatId(-100777), "group hello".to_string())]
        );
    }

    #[tokio::test]
    async fn rejects_bad_input_without_sending() {
        let h = harness();
        let console = Console::new(h.session.clone());

        assert_eq!(console.execute("").await, ConsoleOutcome::Ignored);
        assert_eq!(console.execute("   ").await, ConsoleOutcome::Ignored);
        assert_eq!(console.execute("hello there").await, ConsoleOutcome::Unknown);
        assert_eq!(console.execute("12345").await, ConsoleOutcome::MissingText);
        assert_eq!(console.execute("! hi").await, ConsoleOutcome::NoActiveChat);

        assert!(h.messenger.sent().is_empty());
        assert!(h.echo.printed().contains(&"unknown command".to_string()));
    }

    #[tokio::test]
    async fn transport_failure_is_reported_not_fatal() {
        let h = harness();
        h.messenger.fail_text_sends();
        let console = Console::new(h.session.clone());

        assert_eq!(console.execute("42 hi").await, ConsoleOutcome::Failed(ChatId(42)));
    }

    #[tokio::test]
    async fn run_prompts_after_each_line() {
        let h = harness();
        let console = Console::new(h.session.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("42 one".to_string()).unwrap();
        tx.send(String::new()).unwrap();
        drop(tx);

        console.run(rx).await;

        assert_eq!(h.echo.prompts(), 3);
        assert_eq!(h.messenger.sent().len(), 1);
    }
}
