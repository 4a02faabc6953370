//! `/start` and the tutorial buttons it offers.

use tracing::{debug, info, warn};

use crate::{
    config::Config,
    domain::ChatId,
    messaging::types::{CallbackEvent, InlineButton, InlineKeyboard},
    session::RelaySession,
    utils::parse_command,
    Result,
};

pub const TOKEN_LOGIN_DOC: &str = "tokenLoginDoc";
pub const TWO_FA_LOGIN_DOC: &str = "2FaLoginDoc";

pub const TUTORIAL_FALLBACK: &str =
    "Sorry, something went wrong while sending the tutorial. Please try again later.";

const DEFAULT_WELCOME: &str = r"*Welcome\!*

1\. Read the login tutorials below before you start\.
2\. Send any message in this chat to reach a human operator\.
3\. Replies from the operator arrive right here\.
4\. Please change your password after your first login\.";

const DEFAULT_TOKEN_TUTORIAL: &str = r"*Auth token login tutorial*

1\. Install a browser extension that can log in with an auth token\.
2\. Open the login page in the same browser\.
3\. Click the extension icon and paste your auth\_token\.
4\. Press login and wait for the page to reload\.";

const DEFAULT_TWO_FA_TUTORIAL: &str = r"*2FA login tutorial*

1\. Open the login page and enter your username and password\.
2\. When asked for a code, open a 2FA generator and enter your 2faCode\.
3\. Type the 6\-digit code it shows into the login page to finish\.";

pub fn welcome_text(cfg: &Config) -> &str {
    cfg.messages.welcome.as_deref().unwrap_or(DEFAULT_WELCOME)
}

/// Tutorial body for a callback id, `None` for ids we never hand out.
pub fn tutorial_for<'a>(cfg: &'a Config, data: &str) -> Option<&'a str> {
    match data {
        TOKEN_LOGIN_DOC => Some(
            cfg.messages
                .token_tutorial
                .as_deref()
                .unwrap_or(DEFAULT_TOKEN_TUTORIAL),
        ),
        TWO_FA_LOGIN_DOC => Some(
            cfg.messages
                .two_fa_tutorial
                .as_deref()
                .unwrap_or(DEFAULT_TWO_FA_TUTORIAL),
        ),
        _ => None,
    }
}

pub fn start_keyboard() -> InlineKeyboard {
    InlineKeyboard::single_row(vec![
        InlineButton::new("Token login tutorial", TOKEN_LOGIN_DOC),
        InlineButton::new("2FA login tutorial", TWO_FA_LOGIN_DOC),
    ])
}

/// Slash commands. Only `/start` exists; anything else is dropped.
pub async fn handle_command(session: &RelaySession, chat_id: ChatId, text: &str) -> Result<()> {
    let (cmd, _args) = parse_command(text);
    match cmd.as_str() {
        "start" => {
            let cfg = session.config();
            session
                .messenger()
                .send_markdown(chat_id, welcome_text(&cfg), Some(start_keyboard()))
                .await?;
            Ok(())
        }
        _ => {
            debug!(command = %cmd, "ignoring unknown command");
            Ok(())
        }
    }
}

/// Button press: always acknowledged, then answered with the matching tutorial.
pub async fn handle_callback(session: &RelaySession, cb: &CallbackEvent) -> Result<()> {
    let messenger = session.messenger();

    if let Err(e) = messenger.answer_callback_query(&cb.callback_id).await {
        warn!("failed to acknowledge callback {}: {e}", cb.callback_id);
    }

    let Some(chat_id) = cb.chat_id else {
        warn!(user = cb.sender_id.0, data = %cb.data, "callback without a chat, nothing to answer");
        return Ok(());
    };

    let cfg = session.config();
    let Some(body) = tutorial_for(&cfg, &cb.data) else {
        warn!(data = %cb.data, "unknown callback data");
        return Ok(());
    };

    info!(chat = %chat_id, user = cb.sender_id.0, data = %cb.data, "sending tutorial");
    if let Err(e) = messenger.send_markdown(chat_id, body, None).await {
        warn!("failed to send tutorial {}: {e}", cb.data);
        messenger.send_text(chat_id, TUTORIAL_FALLBACK).await?;
    }
    Ok(())
}
