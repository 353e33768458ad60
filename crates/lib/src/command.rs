//! Command parsing for @-mention text.
//!
//! Mention text arrives as `"<@!1234> 北京"`: the mention token first, the command after it.

/// Literal suffix of a greeting: the mention's closing `>` followed by `hello`.
const GREETING_SUFFIX: &str = "> hello";
const GREETING_WORD: &str = "hello";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    /// Weather lookup. `city` is empty when the text had nothing after the mention.
    Weather { city: String },
}

/// Split text on whitespace. Blank text yields no tokens, and runs of whitespace never
/// yield empty tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn parse_intent(text: &str) -> Intent {
    let tokens = tokenize(text);
    if text.trim_end().ends_with(GREETING_SUFFIX) || tokens.get(1) == Some(&GREETING_WORD) {
        return Intent::Greeting;
    }
    let city = tokens.get(1).copied().unwrap_or_default().to_string();
    Intent::Weather { city }
}
