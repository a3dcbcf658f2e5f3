//! Lexical analysis.
//!
//! The lexer turns script text into a flat list of [`Token`]s. Tokens do not
//! own any text: each one is a byte span into the source plus a line number,
//! and callers re-slice the source with [`Token::text`] when they need the
//! characters. Compiling many scripts therefore allocates nothing per token,
//! and the token buffer itself is reused between calls to [`Lexer::scan`].
//!
//! ## Surface syntax
//!
//! ```text
//! @machine guard -> idle          keyword, identifier, operator, identifier
//! @state idle                     keyword, identifier
//! @on                             keyword
//! 'seen': -> chase                value, operator, operator, identifier
//! wait ticks: 3  # pause          identifier, identifier, operator, identifier
//! ```
//!
//! - Keywords are `@` followed by one of `machine state enter exit run on`.
//! - Quoted values (`'..'` or `".."`) span one line; the token excludes the quotes.
//! - Bare words are letters, digits, `_`, `.`, `$`, and `-` when it does not
//!   start `->`. A bare word may start with `-` to spell negative numbers.
//! - `#` starts a comment running to the end of the line.
//! - Line breaks collapse: a run of newlines, blank lines and comment-only
//!   lines produces one `NewLine` token, and none is produced before the first
//!   real token.
//!
//! On input it cannot tokenize the lexer stops, keeps the tokens produced so
//! far, and reports the position through [`Lexer::stuck_at`].

/// Reserved words, always written with a leading `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Machine,
    State,
    Enter,
    Exit,
    Run,
    On,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        const KEYWORDS: &[(&str, Keyword)] = &[
            ("machine", Keyword::Machine),
            ("state", Keyword::State),
            ("enter", Keyword::Enter),
            ("exit", Keyword::Exit),
            ("run", Keyword::Run),
            ("on", Keyword::On),
        ];
        KEYWORDS.iter().find(|(text, _)| text.eq_ignore_ascii_case(word)).map(|(_, kw)| *kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Machine => "@machine",
            Keyword::State => "@state",
            Keyword::Enter => "@enter",
            Keyword::Exit => "@exit",
            Keyword::Run => "@run",
            Keyword::On => "@on",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `:`
    Assign,
    /// `->`
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    /// A bare word.
    Identifier,
    /// A quoted literal.
    Value,
    Operator(Operator),
    NewLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    /// Byte offset of the first character.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
    /// 1-based line the token starts on.
    pub line: usize,
    pub kind: TokenKind,
}

impl Token {
    /// The token's characters, sliced out of the source it was scanned from.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.start + self.len).unwrap_or("")
    }

    /// Identifiers and quoted values both carry a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Value)
    }
}

/// Position the lexer could not get past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StuckAt {
    pub offset: usize,
    pub line: usize,
}

/// Reusable tokenizer.
#[derive(Debug, Default)]
pub struct Lexer {
    tokens: Vec<Token>,
    stuck_at: Option<StuckAt>,
}

impl Lexer {
    pub fn new() -> Self {
        Self { tokens: Vec::with_capacity(128), stuck_at: None }
    }

    /// Tokenize `text`, replacing the result of any previous call.
    pub fn scan(&mut self, text: &str) -> &[Token] {
        self.tokens.clear();
        self.stuck_at = None;

        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut line = 1;

        while pos < bytes.len() {
            match bytes[pos] {
                b' ' | b'\t' | b'\r' => pos += 1,
                b'\n' => {
                    self.push_newline(pos, line);
                    line += 1;
                    pos += 1;
                }
                b'#' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                }
                b':' => {
                    self.push(pos, 1, line, TokenKind::Operator(Operator::Assign));
                    pos += 1;
                }
                b'-' if bytes.get(pos + 1) == Some(&b'>') => {
                    self.push(pos, 2, line, TokenKind::Operator(Operator::Transition));
                    pos += 2;
                }
                b'@' => {
                    let end = word_end(bytes, pos + 1);
                    match Keyword::from_word(&text[pos + 1..end]) {
                        Some(kw) => {
                            self.push(pos, end - pos, line, TokenKind::Keyword(kw));
                            pos = end;
                        }
                        None => return self.stop(pos, line),
                    }
                }
                quote @ (b'\'' | b'"') => {
                    let start = pos + 1;
                    let Some(close) = bytes[start..].iter().position(|&b| b == quote || b == b'\n') else {
                        return self.stop(pos, line);
                    };
                    if bytes[start + close] != quote {
                        return self.stop(pos, line);
                    }
                    self.push(start, close, line, TokenKind::Value);
                    pos = start + close + 1;
                }
                b if is_word_byte(b) || b == b'-' => {
                    let end = word_end(bytes, pos + 1);
                    if b == b'-' && end == pos + 1 {
                        return self.stop(pos, line);
                    }
                    self.push(pos, end - pos, line, TokenKind::Identifier);
                    pos = end;
                }
                _ => return self.stop(pos, line),
            }
        }

        tracing::trace!(tokens = self.tokens.len(), lines = line, "lexer reached end of input");
        &self.tokens
    }

    /// Tokens from the last call to [`scan`](Self::scan).
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// `true` when the last scan consumed the whole input.
    pub fn reached_end_of_input(&self) -> bool {
        self.stuck_at.is_none()
    }

    pub fn stuck_at(&self) -> Option<StuckAt> {
        self.stuck_at
    }

    fn push(&mut self, start: usize, len: usize, line: usize, kind: TokenKind) {
        self.tokens.push(Token { start, len, line, kind });
    }

    fn push_newline(&mut self, pos: usize, line: usize) {
        if matches!(self.tokens.last(), Some(last) if last.kind != TokenKind::NewLine) {
            self.push(pos, 1, line, TokenKind::NewLine);
        }
    }

    fn stop(&mut self, offset: usize, line: usize) -> &[Token] {
        tracing::debug!(offset, line, "lexer stuck");
        self.stuck_at = Some(StuckAt { offset, line });
        &self.tokens
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$')
}

/// End of the bare word starting at `pos`; `-` continues a word unless it opens `->`.
fn word_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        let b = bytes[pos];
        if is_word_byte(b) || (b == b'-' && bytes.get(pos + 1) != Some(&b'>')) {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new().scan(input).iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        Lexer::new().scan(input).iter().map(|t| t.text(input).to_string()).collect()
    }

    use super::TokenKind::{Identifier, NewLine, Value};

    #[test]
    fn blank_input_produces_nothing() {
        let mut lexer = Lexer::new();
        assert!(lexer.scan("").is_empty());
        assert!(lexer.reached_end_of_input());
    }

    #[test]
    fn machine_line() {
        let input = "@machine blah -> yar";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Keyword(Keyword::Machine),
                Identifier,
                TokenKind::Operator(Operator::Transition),
                Identifier
            ]
        );
        assert_eq!(texts(input), vec!["@machine", "blah", "->", "yar"]);
    }

    #[test]
    fn transition_without_spaces() {
        assert_eq!(texts("@machine blah->b"), vec!["@machine", "blah", "->", "b"]);
    }

    #[test]
    fn quoted_value_excludes_quotes() {
        let input = "@machine blah -> 'yar'";
        let mut lexer = Lexer::new();
        let tokens = lexer.scan(input);
        assert_eq!(tokens[3].kind, Value);
        assert_eq!(tokens[3].text(input), "yar");
    }

    #[test]
    fn quoted_value_keeps_spaces() {
        let input = "task set:'12341 asdf b'";
        assert_eq!(kinds(input), vec![Identifier, Identifier, TokenKind::Operator(Operator::Assign), Value]);
        assert_eq!(texts(input)[3], "12341 asdf b");
    }

    #[test]
    fn trailing_newline_is_emitted() {
        assert_eq!(kinds("@machine blah -> yar\n").last(), Some(&NewLine));
    }

    #[test]
    fn consecutive_newlines_collapse() {
        let tokens = kinds("@machine blah -> yar\n\n\n");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[4], NewLine);
    }

    #[test]
    fn all_keywords() {
        let tokens = kinds("@machine\n@state\n@enter\n@exit\n@run\n@on");
        assert_eq!(tokens.len(), 11);
        let keywords: Vec<Keyword> = tokens
            .iter()
            .filter_map(|k| match k {
                TokenKind::Keyword(kw) => Some(*kw),
                _ => None,
            })
            .collect();
        assert_eq!(
            keywords,
            vec![Keyword::Machine, Keyword::State, Keyword::Enter, Keyword::Exit, Keyword::Run, Keyword::On]
        );
    }

    #[test]
    fn message_key_tokens() {
        let tokens = kinds("@machine m\n@state s\n@on\n'msg':action");
        assert_eq!(tokens.len(), 11);
        assert_eq!(&tokens[8..], &[Value, TokenKind::Operator(Operator::Assign), Identifier]);
    }

    #[test]
    fn comment_lines_collapse_into_one_newline() {
        assert_eq!(kinds("task\n#task\ntask"), vec![Identifier, NewLine, Identifier]);
        assert_eq!(kinds("task#comment\ntask2"), vec![Identifier, NewLine, Identifier]);
        assert_eq!(kinds("task#Comment"), vec![Identifier]);
        assert!(kinds("#hello").is_empty());
    }

    #[test]
    fn leading_blank_lines_are_dropped() {
        assert_eq!(kinds("\ntask"), vec![Identifier]);
        assert_eq!(kinds("\t \ntask"), vec![Identifier]);
        assert_eq!(kinds("#hello\ntask"), vec![Identifier]);
        assert_eq!(kinds("\r\n\r\ntask\r\n"), vec![Identifier, NewLine]);
    }

    #[test]
    fn line_numbers_follow_physical_lines() {
        let mut lexer = Lexer::new();
        let tokens = lexer.scan("@machine m -> a\n\n# note\n@state a\n");
        let state = tokens.iter().find(|t| t.kind == TokenKind::Keyword(Keyword::State)).unwrap();
        assert_eq!(state.line, 4);
    }

    #[test]
    fn negative_numbers_and_dotted_words() {
        assert_eq!(texts("move by:-2.5 speed:fast.x"), vec!["move", "by", ":", "-2.5", "speed", ":", "fast.x"]);
        assert_eq!(texts("$trans -> b"), vec!["$trans", "->", "b"]);
    }

    #[test]
    fn unknown_keyword_gets_stuck() {
        let mut lexer = Lexer::new();
        let tokens = lexer.scan("@ma ch ine blah").len();
        assert_eq!(tokens, 0);
        assert!(!lexer.reached_end_of_input());
        assert_eq!(lexer.stuck_at(), Some(StuckAt { offset: 0, line: 1 }));
    }

    #[test]
    fn unterminated_quote_gets_stuck() {
        let mut lexer = Lexer::new();
        lexer.scan("@machine m\nlog 'oops\n");
        assert_eq!(lexer.stuck_at().map(|s| s.line), Some(2));
        assert_eq!(lexer.tokens().len(), 4);
    }

    #[test]
    fn lone_dash_gets_stuck() {
        let mut lexer = Lexer::new();
        lexer.scan("a - b");
        assert!(!lexer.reached_end_of_input());
    }

    #[test]
    fn buffers_reset_between_scans() {
        let mut lexer = Lexer::new();
        lexer.scan("@ma");
        assert!(!lexer.reached_end_of_input());
        assert_eq!(lexer.scan("@state s").len(), 2);
        assert!(lexer.reached_end_of_input());
    }
}
