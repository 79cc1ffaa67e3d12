use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use unimsg_core::{Segment, UniMessage};

/// One unit of matcher input: a text word or an opaque segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Seg(Segment),
}

impl Token {
    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            Token::Seg(_) => None,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Token::Seg(seg) => Some(seg),
            Token::Text(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Seg(seg) => write!(f, "{seg}"),
        }
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::Text(text.to_string())
    }
}

impl From<Segment> for Token {
    fn from(seg: Segment) -> Self {
        Token::Seg(seg)
    }
}

/// Shell-like word splitting on `separators`.
///
/// Handles:
/// - Separator-delimited words
/// - Quoted strings (single and double quotes)
/// - Escape sequences within double quotes
pub fn shell_split(input: &str, separators: &[char]) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if separators.contains(&c) && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}

/// Tokenised matcher input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Argv {
    tokens: Vec<Token>,
}

impl Argv {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Tokenises a message.
    ///
    /// Text segments are split shell-style on `separators`; every other
    /// segment becomes a single [`Token::Seg`]. A segment boundary always
    /// breaks a word, so text in separate segments is never concatenated.
    pub fn from_message(msg: &UniMessage, separators: &[char]) -> Self {
        let mut argv = Self::default();
        for seg in msg {
            match seg.as_text() {
                Some(text) => argv.push_text(text, separators),
                None => argv.tokens.push(Token::Seg(seg.clone())),
            }
        }
        argv
    }

    /// Splits `text` and appends the words.
    pub fn push_text(&mut self, text: &str, separators: &[char]) {
        self.tokens
            .extend(shell_split(text, separators).into_iter().map(Token::Text));
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.tokens.extend(tokens);
    }

    /// Inserts `tokens` before `index`, or appends them past the end.
    pub fn insert_at(&mut self, index: usize, tokens: impl IntoIterator<Item = Token>) {
        let index = index.min(self.tokens.len());
        self.tokens.splice(index..index, tokens);
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Stable fingerprint of the tokens, used to skip re-parsing identical input.
    pub fn token_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for token in &self.tokens {
            match token {
                Token::Text(text) => {
                    0u8.hash(&mut hasher);
                    text.hash(&mut hasher);
                }
                Token::Seg(seg) => {
                    1u8.hash(&mut hasher);
                    seg.kind().hash(&mut hasher);
                    seg.to_string().hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }
}

impl From<Vec<Token>> for Argv {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unimsg_core::SegmentKind;

    const SPACE: &[char] = &[' ', '\t', '\n'];

    #[test]
    fn test_shell_split_simple() {
        assert_eq!(shell_split("/echo hello world", SPACE), vec!["/echo", "hello", "world"]);
    }

    #[test]
    fn test_shell_split_quoted() {
        let args = shell_split(r#"/echo "hello world" 'a b' c"#, SPACE);
        assert_eq!(args, vec!["/echo", "hello world", "a b", "c"]);
    }

    #[test]
    fn test_shell_split_mixed_quotes() {
        let args = shell_split(r#"/cmd "double's quote" 'single"s quote'"#, SPACE);
        assert_eq!(args, vec!["/cmd", "double's quote", r#"single"s quote"#]);
    }

    #[test]
    fn test_shell_split_empty_quotes_kept() {
        assert_eq!(shell_split(r#"set name """#, SPACE), vec!["set", "name", ""]);
    }

    #[test]
    fn test_shell_split_custom_separator() {
        assert_eq!(shell_split("a,b c", &[',']), vec!["a", "b c"]);
    }

    #[test]
    fn test_shell_split_whitespace_only() {
        assert!(shell_split("   \t  ", SPACE).is_empty());
    }

    #[test]
    fn test_from_message_mixed() {
        let msg = UniMessage::new()
            .text("/cmd arg1 ")
            .at("user1")
            .text(" ")
            .image_url("pic.png")
            .text(" arg2");
        let argv = Argv::from_message(&msg, SPACE);
        assert_eq!(argv.len(), 5);
        assert_eq!(argv.tokens()[0], Token::text("/cmd"));
        assert!(argv.tokens()[2].as_segment().is_some_and(|s| s.is(&SegmentKind::At)));
        assert!(argv.tokens()[3].as_segment().is_some_and(|s| s.is(&SegmentKind::Image)));
        assert_eq!(argv.tokens()[4], Token::text("arg2"));
    }

    #[test]
    fn test_segment_boundary_breaks_words() {
        let msg = UniMessage::new().text("/echo").at("1").text("hello");
        let argv = Argv::from_message(&msg, SPACE);
        assert_eq!(argv.len(), 3);
    }

    #[test]
    fn test_token_hash() {
        let a = Argv::new(vec!["x".into(), Segment::at("1").into()]);
        let b = Argv::new(vec!["x".into(), Segment::at("1").into()]);
        let c = Argv::new(vec!["x".into(), Segment::at("2").into()]);
        assert_eq!(a.token_hash(), b.token_hash());
        assert_ne!(a.token_hash(), c.token_hash());
    }
}
