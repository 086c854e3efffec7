use std::{fmt::Display, sync::Arc};

use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // End of input, returned forever once the source is exhausted
    Eof,
    // A malformed token; scanning cannot continue past it
    Error(ScanError),

    // Literals
    Number(f64),
    String(String),
    Identifier(String),
    Uuid(String),

    // Reserved words
    True,
    False,
    Nil,

    // Single-character tokens
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LeftParen,
    RightParen,
    Dot,
    Less,
    Greater,

    // Two-character tokens
    EqualEqual,
    BangEqual,
    LessEqual,
    GreaterEqual,
    Or,
    And,
}

impl TokenType {
    /// Whether this token can end an operand, in which case a following sign
    /// is an operator rather than part of a number.
    fn is_operand(&self) -> bool {
        matches!(
            self,
            TokenType::Number(_)
                | TokenType::String(_)
                | TokenType::Identifier(_)
                | TokenType::Uuid(_)
                | TokenType::True
                | TokenType::False
                | TokenType::Nil
                | TokenType::RightParen
        )
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Eof => write!(f, "end-of-input"),
            TokenType::Error(e) => write!(f, "error: {e}"),
            TokenType::Number(n) => write!(f, "{n}"),
            TokenType::String(s) => write!(f, "{s:?}"),
            TokenType::Identifier(name) => write!(f, "{name}"),
            TokenType::Uuid(uuid) => write!(f, "U:{uuid}"),
            TokenType::True => write!(f, "true"),
            TokenType::False => write!(f, "false"),
            TokenType::Nil => write!(f, "nil"),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Slash => write!(f, "/"),
            TokenType::Percent => write!(f, "%"),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::Dot => write!(f, "."),
            TokenType::Less => write!(f, "<"),
            TokenType::Greater => write!(f, ">"),
            TokenType::EqualEqual => write!(f, "=="),
            TokenType::BangEqual => write!(f, "!="),
            TokenType::LessEqual => write!(f, "<="),
            TokenType::GreaterEqual => write!(f, ">="),
            TokenType::Or => write!(f, "||"),
            TokenType::And => write!(f, "&&"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub span: Span,
    pub token_type: TokenType,
}

impl Token {
    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("Unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Invalid escape sequence: \\{0}")]
    InvalidEscape(char),
    #[error("Invalid unicode escape: {0:?}")]
    InvalidUnicodeEscape(String),
    #[error("Invalid numeric literal: {0}")]
    InvalidNumber(String),
    #[error("Invalid UUID literal: {0}")]
    InvalidUuid(String),
}

/// Scans tokens one at a time from a source string.
pub struct Tokenizer {
    source: Arc<str>,
    position: usize,
    operand_expected: bool,
    failed: Option<Token>,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.into(),
            position: 0,
            operand_expected: true,
            failed: None,
        }
    }

    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    /// Produce the next token. Once the input is exhausted this keeps
    /// returning `Eof`; after a malformed token it keeps returning that error.
    pub fn scan(&mut self) -> Token {
        if let Some(token) = &self.failed {
            return token.clone();
        }

        self.skip_whitespace();
        let start = self.position;
        let token_type = self.token_type().unwrap_or_else(TokenType::Error);
        let token = Token {
            span: Span::new(self.source.clone(), start, self.position - start),
            token_type,
        };

        log::trace!("scanned {} at {}", token.token_type, token.span);

        match &token.token_type {
            TokenType::Error(_) => self.failed = Some(token.clone()),
            token_type => self.operand_expected = !token_type.is_operand(),
        }
        token
    }

    fn current(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.source[self.position..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.position += c.len_utf8();
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.current() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn excerpt_from(&self, start: usize) -> String {
        self.source[start..self.position].to_string()
    }

    fn token_type(&mut self) -> Result<TokenType, ScanError> {
        let Some(c) = self.current() else {
            return Ok(TokenType::Eof);
        };

        match c {
            '0'..='9' => self.number(),
            '+' | '-'
                if self.operand_expected
                    && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) =>
            {
                self.number()
            }
            '"' => self.string(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            c => match operator(&self.source[self.position..]) {
                Some((token_type, len)) => {
                    self.position += len;
                    Ok(token_type)
                }
                None => {
                    self.advance();
                    Err(ScanError::UnexpectedCharacter(c))
                }
            },
        }
    }

    fn number(&mut self) -> Result<TokenType, ScanError> {
        let start = self.position;
        let negative = match self.current() {
            Some('-') => {
                self.advance();
                true
            }
            Some('+') => {
                self.advance();
                false
            }
            _ => false,
        };

        let magnitude = if self.current() == Some('0') && matches!(self.peek_char(1), Some('x' | 'X'))
        {
            self.advance();
            self.advance();
            let digits = self.position;
            self.take_while(|c| c.is_ascii_hexdigit());
            u64::from_str_radix(&self.source[digits..self.position], 16)
                .map(|n| n as f64)
                .map_err(|_| ScanError::InvalidNumber(self.excerpt_from(start)))?
        } else {
            let digits = self.position;
            self.take_while(|c| c.is_ascii_digit());
            let mut is_float = false;

            if self.current() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
                self.take_while(|c| c.is_ascii_digit());
            }

            if matches!(self.current(), Some('e' | 'E')) {
                let exponent = match self.peek_char(1) {
                    Some('+' | '-') => self.peek_char(2).is_some_and(|c| c.is_ascii_digit()),
                    Some(c) => c.is_ascii_digit(),
                    None => false,
                };
                if exponent {
                    is_float = true;
                    self.advance();
                    self.advance();
                    self.take_while(|c| c.is_ascii_digit());
                }
            }

            let text = &self.source[digits..self.position];
            if !is_float && text.len() > 1 && text.starts_with('0') {
                u64::from_str_radix(&text[1..], 8)
                    .map(|n| n as f64)
                    .map_err(|_| ScanError::InvalidNumber(self.excerpt_from(start)))?
            } else {
                text.parse::<f64>()
                    .map_err(|_| ScanError::InvalidNumber(self.excerpt_from(start)))?
            }
        };

        // `12abc` is one malformed literal, not a number followed by a name
        if self
            .current()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return Err(ScanError::InvalidNumber(self.excerpt_from(start)));
        }

        Ok(TokenType::Number(if negative { -magnitude } else { magnitude }))
    }

    fn string(&mut self) -> Result<TokenType, ScanError> {
        self.advance(); // opening quote
        let mut result = String::new();

        loop {
            let Some(c) = self.current() else {
                return Err(ScanError::UnterminatedString);
            };
            self.advance();

            match c {
                '"' => return Ok(TokenType::String(result)),
                '\\' => {
                    let Some(escape) = self.current() else {
                        return Err(ScanError::UnterminatedString);
                    };
                    self.advance();
                    let decoded = match escape {
                        't' => '\t',
                        'n' => '\n',
                        '"' => '"',
                        '\\' => '\\',
                        'u' => self.unicode_escape(4)?,
                        'U' => self.unicode_escape(8)?,
                        other => return Err(ScanError::InvalidEscape(other)),
                    };
                    result.push(decoded);
                }
                c => result.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, digits: usize) -> Result<char, ScanError> {
        let start = self.position;
        for _ in 0..digits {
            match self.current() {
                Some(c) if c.is_ascii_hexdigit() => self.advance(),
                _ => return Err(ScanError::InvalidUnicodeEscape(self.excerpt_from(start))),
            }
        }

        u32::from_str_radix(&self.source[start..self.position], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ScanError::InvalidUnicodeEscape(self.excerpt_from(start)))
    }

    fn identifier(&mut self) -> Result<TokenType, ScanError> {
        let start = self.position;
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

        let uuid_prefix =
            matches!(&self.source[start..self.position], "u" | "U") && self.current() == Some(':');
        if uuid_prefix {
            self.advance();
            return self.uuid();
        }

        Ok(match &self.source[start..self.position] {
            "true" => TokenType::True,
            "false" => TokenType::False,
            "nil" => TokenType::Nil,
            name => TokenType::Identifier(name.to_string()),
        })
    }

    fn uuid(&mut self) -> Result<TokenType, ScanError> {
        let start = self.position;
        self.take_while(|c| c.is_ascii_hexdigit() || c == '-');
        if self
            .current()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            return Err(ScanError::InvalidUuid(self.excerpt_from(start)));
        }

        let text = self.excerpt_from(start);
        if is_uuid(&text) {
            Ok(TokenType::Uuid(text))
        } else {
            Err(ScanError::InvalidUuid(text))
        }
    }
}

fn is_uuid(text: &str) -> bool {
    let groups = text.split('-').map(str::len).collect::<Vec<_>>();
    groups == [8, 4, 4, 4, 12]
}

macro_rules! match_operators {
    ($source:expr, $($text:literal => $token:expr),+ $(,)?) => {
        $(
            if $source.starts_with($text) {
                return Some(($token, $text.len()));
            }
        )+
    };
}

fn operator(source: &str) -> Option<(TokenType, usize)> {
    // two-character operators must be tried before their prefixes
    match_operators! {
        source,
        "==" => TokenType::EqualEqual,
        "!=" => TokenType::BangEqual,
        "<=" => TokenType::LessEqual,
        ">=" => TokenType::GreaterEqual,
        "||" => TokenType::Or,
        "&&" => TokenType::And,
        "+" => TokenType::Plus,
        "-" => TokenType::Minus,
        "*" => TokenType::Star,
        "/" => TokenType::Slash,
        "%" => TokenType::Percent,
        "(" => TokenType::LeftParen,
        ")" => TokenType::RightParen,
        "." => TokenType::Dot,
        "<" => TokenType::Less,
        ">" => TokenType::Greater,
    }
    None
}

/// Scan a whole source string. The returned stream always ends with either
/// an `Eof` or an `Error` token.
pub fn tokens(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = tokenizer.scan();
        let done = matches!(token.token_type, TokenType::Eof | TokenType::Error(_));
        tokens.push(token);
        if done {
            break;
        }
    }

    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    fn scanned(source: &str) -> Vec<(TokenType, &str)> {
        tokens(source)
            .into_iter()
            .map(|token| {
                let Span { offset, length, .. } = token.span;
                (token.token_type, &source[offset..offset + length])
            })
            .collect()
    }

    #[test]
    fn test_number() {
        assert_eq!(
            scanned("123"),
            vec![(TokenType::Number(123.0), "123"), (TokenType::Eof, "")]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(scanned("123.456")[0].0, TokenType::Number(123.456));
        assert_eq!(scanned("0x1F")[0], (TokenType::Number(31.0), "0x1F"));
        assert_eq!(scanned("0XfF")[0].0, TokenType::Number(255.0));
        assert_eq!(scanned("017")[0], (TokenType::Number(15.0), "017"));
        assert_eq!(scanned("0")[0].0, TokenType::Number(0.0));
        assert_eq!(scanned("0.5")[0].0, TokenType::Number(0.5));
        assert_eq!(scanned("1e3")[0].0, TokenType::Number(1000.0));
        assert_eq!(scanned("2.5E-1")[0].0, TokenType::Number(0.25));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            scanned("09")[0].0,
            TokenType::Error(ScanError::InvalidNumber(_))
        ));
        assert!(matches!(
            scanned("0x")[0].0,
            TokenType::Error(ScanError::InvalidNumber(_))
        ));
        assert_eq!(
            scanned("12abc")[0],
            (
                TokenType::Error(ScanError::InvalidNumber("12abc".to_string())),
                "12abc"
            )
        );
    }

    #[test]
    fn test_signed_numbers() {
        assert_eq!(
            scanned("-1 - 2"),
            vec![
                (TokenType::Number(-1.0), "-1"),
                (TokenType::Minus, "-"),
                (TokenType::Number(2.0), "2"),
                (TokenType::Eof, ""),
            ]
        );
        assert_eq!(
            scanned("1 + +2"),
            vec![
                (TokenType::Number(1.0), "1"),
                (TokenType::Plus, "+"),
                (TokenType::Number(2.0), "+2"),
                (TokenType::Eof, ""),
            ]
        );
        assert_eq!(
            scanned("(-5)"),
            vec![
                (TokenType::LeftParen, "("),
                (TokenType::Number(-5.0), "-5"),
                (TokenType::RightParen, ")"),
                (TokenType::Eof, ""),
            ]
        );
        assert_eq!(
            scanned("10 -2"),
            vec![
                (TokenType::Number(10.0), "10"),
                (TokenType::Minus, "-"),
                (TokenType::Number(2.0), "2"),
                (TokenType::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            scanned(r#""\t•""#)[0],
            (TokenType::String("\t\u{2022}".to_string()), r#""\t•""#)
        );
        assert_eq!(
            scanned(r#""say \"hi\"\n\\""#)[0].0,
            TokenType::String("say \"hi\"\n\\".to_string())
        );
        assert_eq!(
            scanned(r#""\U0001F600""#)[0].0,
            TokenType::String("\u{1F600}".to_string())
        );
    }

    #[test]
    fn test_string_errors() {
        assert_eq!(
            scanned(r#""abc"#)[0].0,
            TokenType::Error(ScanError::UnterminatedString)
        );
        assert_eq!(
            scanned(r#""\q""#)[0].0,
            TokenType::Error(ScanError::InvalidEscape('q'))
        );
        assert!(matches!(
            scanned(r#""\u12""#)[0].0,
            TokenType::Error(ScanError::InvalidUnicodeEscape(_))
        ));
        assert!(matches!(
            scanned(r#""\UFFFFFFFF""#)[0].0,
            TokenType::Error(ScanError::InvalidUnicodeEscape(_))
        ));
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(
            scanned("true false nil truely"),
            vec![
                (TokenType::True, "true"),
                (TokenType::False, "false"),
                (TokenType::Nil, "nil"),
                (TokenType::Identifier("truely".to_string()), "truely"),
                (TokenType::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_uuid() {
        let source = "U:0f8fad5b-d9cb-469f-a165-70867728950e == u:7C9E6679-7425-40DE-944B-E07FC1F90AE7";
        assert_eq!(
            scanned(source),
            vec![
                (
                    TokenType::Uuid("0f8fad5b-d9cb-469f-a165-70867728950e".to_string()),
                    "U:0f8fad5b-d9cb-469f-a165-70867728950e"
                ),
                (TokenType::EqualEqual, "=="),
                (
                    TokenType::Uuid("7C9E6679-7425-40DE-944B-E07FC1F90AE7".to_string()),
                    "u:7C9E6679-7425-40DE-944B-E07FC1F90AE7"
                ),
                (TokenType::Eof, ""),
            ]
        );
        assert!(matches!(
            scanned("U:1234")[0].0,
            TokenType::Error(ScanError::InvalidUuid(_))
        ));
    }

    #[test]
    fn test_operators_are_greedy() {
        assert_eq!(
            scanned("a==b!=c<=d>=e<f>g||h&&i.j%k"),
            vec![
                (TokenType::Identifier("a".to_string()), "a"),
                (TokenType::EqualEqual, "=="),
                (TokenType::Identifier("b".to_string()), "b"),
                (TokenType::BangEqual, "!="),
                (TokenType::Identifier("c".to_string()), "c"),
                (TokenType::LessEqual, "<="),
                (TokenType::Identifier("d".to_string()), "d"),
                (TokenType::GreaterEqual, ">="),
                (TokenType::Identifier("e".to_string()), "e"),
                (TokenType::Less, "<"),
                (TokenType::Identifier("f".to_string()), "f"),
                (TokenType::Greater, ">"),
                (TokenType::Identifier("g".to_string()), "g"),
                (TokenType::Or, "||"),
                (TokenType::Identifier("h".to_string()), "h"),
                (TokenType::And, "&&"),
                (TokenType::Identifier("i".to_string()), "i"),
                (TokenType::Dot, "."),
                (TokenType::Identifier("j".to_string()), "j"),
                (TokenType::Percent, "%"),
                (TokenType::Identifier("k".to_string()), "k"),
                (TokenType::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_unexpected_character_stops_scanning() {
        let mut tokenizer = Tokenizer::new("a = b");
        assert_eq!(
            tokenizer.scan().token_type,
            TokenType::Identifier("a".to_string())
        );
        let error = tokenizer.scan();
        assert_eq!(
            error.token_type,
            TokenType::Error(ScanError::UnexpectedCharacter('='))
        );
        assert_eq!(error.span.excerpt(), "=");
        assert_eq!(tokenizer.scan(), error);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut tokenizer = Tokenizer::new("  x  ");
        tokenizer.scan();
        for _ in 0..3 {
            let token = tokenizer.scan();
            assert_eq!(token.token_type, TokenType::Eof);
            assert_eq!(token.span.offset, 5);
            assert_eq!(token.span.length, 0);
        }
    }
}
