//! Proto lexer using the logos crate.
//!
//! Keywords are not tokens of their own: proto allows `message`, `option`
//! and friends as field names, so the parser interprets identifiers in
//! context.

use logos::Logos;
use thiserror::Error;

/// Tokens for proto source files.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Punctuation
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("=")]
    Equals,

    #[token(".")]
    Dot,

    #[token("-")]
    Minus,

    #[token("+")]
    Plus,

    #[token("/")]
    Slash,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unescape(lex.slice()))]
    StringLiteral(String),

    #[regex(r"[0-9]+", |lex| parse_decimal_or_octal(lex.slice()))]
    IntegerLiteral(u64),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    HexLiteral(u64),

    #[regex(
        r"([0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+)",
        |lex| lex.slice().parse::<f64>().ok()
    )]
    FloatLiteral(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),
}

fn parse_decimal_or_octal(text: &str) -> Option<u64> {
    if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse::<u64>().ok()
    }
}

/// Strips the quotes of a string literal and resolves its escapes.
///
/// Hex and octal escapes produce raw bytes, so a multi-byte UTF-8
/// sequence written as escapes decodes back to its character.
fn unescape(quoted: &str) -> String {
    let inner = &quoted.as_bytes()[1..quoted.len() - 1];
    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;

    while i < inner.len() {
        let b = inner[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&escape) = inner.get(i) else {
            out.push(b'\\');
            break;
        };
        i += 1;
        match escape {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'x' | b'X' => {
                let digits = take_digits(&inner[i..], 2, |d| d.is_ascii_hexdigit());
                if digits == 0 {
                    out.extend_from_slice(&[b'\\', escape]);
                } else {
                    out.push(digit_value(&inner[i..i + digits], 16));
                    i += digits;
                }
            }
            b'0'..=b'7' => {
                let start = i - 1;
                let digits = 1 + take_digits(&inner[i..], 2, |d| (b'0'..=b'7').contains(&d));
                out.push(digit_value(&inner[start..start + digits], 8));
                i = start + digits;
            }
            other => out.push(other),
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn take_digits(bytes: &[u8], max: usize, accept: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take(max).take_while(|&&d| accept(d)).count()
}

/// Octal values above 0o377 wrap to a byte.
fn digit_value(digits: &[u8], radix: u32) -> u8 {
    digits.iter().fold(0u32, |acc, &d| {
        acc * radix + char::from(d).to_digit(radix).unwrap_or(0)
    }) as u8
}

/// A token with its span in the source.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

/// Tokenize proto source text.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(SpannedToken {
                token,
                span: lexer.span(),
            }),
            Err(_) => {
                let span = lexer.span();
                return Err(LexError {
                    message: format!(
                        "unexpected input '{}'",
                        &source[span.start..span.end.min(source.len())]
                    ),
                    span,
                });
            }
        }
    }

    Ok(tokens)
}

/// Lexer error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: std::ops::Range<usize>,
    pub message: String,
}
