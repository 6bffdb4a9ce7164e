use std::fmt;

use kstring::KString;

use super::parser::SyntaxError;
use crate::value::format_number;


#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(KString),
    /// Identifiers and keywords (`true`, `typeof`, ...); may contain `$`.
    Ident(KString),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Question,

    Not,      // !
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,     // ==
    NotEq,    // !=
    EqEqEq,   // ===
    NotEqEq,  // !==
    AndAnd,
    OrOr,
    Nullish,  // ??
}

/// A token with the byte offset where it starts.
pub type Spanned = (Token, usize);

// Longest first.
const PUNCTUATION: &[(&str, Token)] = &[
    ("===", Token::EqEqEq),
    ("!==", Token::NotEqEq),
    ("==", Token::EqEq),
    ("!=", Token::NotEq),
    ("<=", Token::Le),
    (">=", Token::Ge),
    ("&&", Token::AndAnd),
    ("||", Token::OrOr),
    ("??", Token::Nullish),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    ("{", Token::LBrace),
    ("}", Token::RBrace),
    (",", Token::Comma),
    (".", Token::Dot),
    (":", Token::Colon),
    ("?", Token::Question),
    ("!", Token::Not),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("<", Token::Lt),
    (">", Token::Gt),
];

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => f.write_str(&format_number(*n)),
            Token::Str(s) => write!(f, "string {:?}", s.as_str()),
            Token::Ident(s) => write!(f, "'{s}'"),
            t => match PUNCTUATION.iter().find(|(_, p)| p == t) {
                Some((s, _)) => write!(f, "'{s}'"),
                None => write!(f, "{t:?}"),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn error(&self, message: impl Into<KString>) -> SyntaxError {
        SyntaxError { message: message.into(), position: self.cursor }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.remaining();
        let len = rest.find(|c: char| ! pred(c)).unwrap_or(rest.len());
        self.cursor += len;
        &rest[..len]
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());
        if self.remaining().starts_with('.') {
            self.cursor += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        let rest = self.remaining();
        if rest.starts_with('e') || rest.starts_with('E') {
            let sign = rest[1..].starts_with('+') || rest[1..].starts_with('-');
            let digits_at = if sign { 2 } else { 1 };
            if rest[digits_at..].starts_with(|c: char| c.is_ascii_digit()) {
                self.cursor += digits_at;
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        let s = &self.input[start..self.cursor];
        s.parse().map(Token::Number).map_err(
            |_| SyntaxError { message: format!("invalid number {s:?}").into(),
                              position: start })
    }

    fn string(&mut self, quote: char) -> Result<Token, SyntaxError> {
        let start = self.cursor;
        self.cursor += 1;
        let mut s = String::new();
        let mut chars = self.remaining().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.cursor += i + 1;
                    return Ok(Token::Str(KString::from_string(s)))
                }
                '\\' => {
                    let (_, e) = chars.next().ok_or_else(
                        || SyntaxError { message: "unterminated string".into(),
                                         position: start })?;
                    match e {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        'b' => s.push('\u{08}'),
                        'f' => s.push('\u{0C}'),
                        'v' => s.push('\u{0B}'),
                        '0' => s.push('\0'),
                        'u' => {
                            let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                            let c = u32::from_str_radix(&hex, 16).ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| SyntaxError {
                                    message: format!("invalid escape \\u{hex}").into(),
                                    position: start })?;
                            s.push(c);
                        }
                        // also handles \\ \' \"
                        _ => s.push(e)
                    }
                }
                _ => s.push(c)
            }
        }
        Err(SyntaxError { message: "unterminated string".into(), position: start })
    }

    pub fn next_token(&mut self) -> Option<Result<Spanned, SyntaxError>> {
        self.take_while(char::is_whitespace);
        let rest = self.remaining();
        let c = rest.chars().next()?;
        let start = self.cursor;
        let token = if c.is_ascii_digit()
            || (c == '.' && rest[1..].starts_with(|c: char| c.is_ascii_digit()))
        {
            self.number()
        } else if c == '"' || c == '\'' {
            self.string(c)
        } else if is_ident_start(c) {
            self.cursor += c.len_utf8();
            self.take_while(is_ident_char);
            Ok(Token::Ident(KString::from_ref(&self.input[start..self.cursor])))
        } else if let Some((s, t)) = PUNCTUATION.iter().find(|(s, _)| rest.starts_with(s)) {
            self.cursor += s.len();
            Ok(t.clone())
        } else {
            Err(self.error(format!("unexpected character {c:?}")))
        };
        Some(token.map(|t| (t, start)))
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while let Some(t) = tokenizer.next_token() {
        tokens.push(t?);
    }
    Ok(tokens)
}
