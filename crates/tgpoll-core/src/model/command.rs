//! In-text bot command extraction.
//!
//! Entity offsets and lengths on the wire are UTF-16 code units, so every span
//! is cut on the UTF-16 encoding of the text.

use std::sync::OnceLock;

use regex::Regex;

static COMMAND_RE: OnceLock<Regex> = OnceLock::new();

fn command_re() -> &'static Regex {
    COMMAND_RE.get_or_init(|| Regex::new(r"^(\w+)(?:@(\w+))?$").expect("valid regex"))
}

/// A `/name[@target]` command parsed from a `bot_command` entity span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotCommand {
    /// Command word as written (not lowercased).
    pub name: String,
    /// `@username` suffix without the `@`, if present.
    pub target: Option<String>,
}

impl BotCommand {
    /// True when the command has no target or targets `own_username` (case-insensitive).
    pub fn is_addressed_to(&self, own_username: &str) -> bool {
        match &self.target {
            None => true,
            Some(t) => t.to_lowercase() == own_username.to_lowercase(),
        }
    }
}

/// Parse the span text that follows the leading `/`.
///
/// A non-match is not an error: the entity simply carries no command.
pub fn parse_command(span: &str) -> Option<BotCommand> {
    let caps = command_re().captures(span)?;
    Some(BotCommand {
        name: caps.get(1)?.as_str().to_string(),
        target: caps.get(2).map(|m| m.as_str().to_string()),
    })
}

/// `text[start..end]` in UTF-16 code units. `None` if the range is out of bounds
/// or splits a surrogate pair.
pub fn utf16_slice(text: &str, start: usize, end: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    if start > end || end > units.len() {
        return None;
    }
    String::from_utf16(&units[start..end]).ok()
}

/// Everything after UTF-16 position `start`; empty if `start` is past the end.
pub fn utf16_tail(text: &str, start: usize) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    if start >= units.len() {
        return String::new();
    }
    String::from_utf16_lossy(&units[start..])
}

/// Decode the command carried by a `bot_command` span `[offset, end)` of `text`.
pub fn command_at(text: &str, offset: i64, end: i64) -> Option<BotCommand> {
    let start = usize::try_from(offset).ok()?.checked_add(1)?;
    let end = usize::try_from(end).ok()?;
    parse_command(&utf16_slice(text, start, end)?)
}

/// Arguments following a command whose span ends at `end`: the rest of the text,
/// skipping the one separating character.
pub fn command_args(text: &str, end: i64) -> String {
    let Ok(end) = usize::try_from(end) else {
        return String::new();
    };
    utf16_tail(text, end.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_targeted_commands() {
        assert_eq!(
            parse_command("hello"),
            Some(BotCommand {
                name: "hello".to_string(),
                target: None
            })
        );
        assert_eq!(
            parse_command("Hello@Bot1"),
            Some(BotCommand {
                name: "Hello".to_string(),
                target: Some("Bot1".to_string())
            })
        );
    }

    #[test]
    fn malformed_spans_do_not_match() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("hello@"), None);
        assert_eq!(parse_command("he-llo"), None);
        assert_eq!(parse_command("a@b@c"), None);
    }

    #[test]
    fn target_match_is_case_insensitive() {
        let cmd = parse_command("start@MyBot").unwrap();
        assert!(cmd.is_addressed_to("mybot"));
        assert!(cmd.is_addressed_to("MYBOT"));
        assert!(!cmd.is_addressed_to("otherbot"));
        assert!(parse_command("start").unwrap().is_addressed_to("anything"));
    }

    #[test]
    fn slices_use_utf16_units() {
        // "😀" is two UTF-16 units.
        let text = "😀 /go now";
        assert_eq!(utf16_slice(text, 4, 6).as_deref(), Some("go"));
        assert_eq!(command_at(text, 3, 6).unwrap().name, "go");
        assert_eq!(command_args(text, 6), "now");
        // Splitting the surrogate pair is rejected.
        assert_eq!(utf16_slice(text, 1, 3), None);
    }

    #[test]
    fn out_of_range_spans_yield_nothing() {
        assert_eq!(command_at("/hi", 0, 10), None);
        assert_eq!(command_at("/hi", -1, 3), None);
        assert_eq!(command_args("/hi", 3), "");
        assert_eq!(command_args("/hi", 100), "");
    }
}
