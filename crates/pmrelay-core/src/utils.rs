use crate::domain::ChatId;

/// Split a line into its first whitespace-delimited token and the rest.
///
/// The rest keeps its inner whitespace, so multi-word messages survive.
pub fn split_first_token(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => Some((head, rest.trim_start())),
        None => Some((line, "")),
    }
}

/// Telegram sends `/cmd@botname arg1 ...`; returns (`cmd`, `args`).
pub fn parse_command(text: &str) -> (String, String) {
    let (first, rest) = split_first_token(text).unwrap_or(("", ""));
    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    (cmd, rest.to_string())
}

/// Admin shorthand `*<chat id> <text>` that bypasses reply routing.
///
/// `None` when no usable destination can be read. The body may be empty.
pub fn parse_direct_send(text: &str) -> Option<(ChatId, &str)> {
    let rest = text.strip_prefix('*')?;
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (target, body) = split_first_token(rest)?;
    match target.parse::<i64>() {
        Ok(id) if id != 0 => Some((ChatId(id), body)),
        _ => None,
    }
}
