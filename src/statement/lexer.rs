use std::borrow::Cow;
use std::cell::Cell;
use std::ops::Range;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::LexError;
use crate::statement::header::StringEncoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Open(&'a [u8]),
    Close(&'a [u8]),
    Text(Cow<'a, str>),
    /// Processing instructions, comments and declarations
    Other(&'a [u8]),
}

#[derive(Clone, Copy)]
enum TokenKind {
    Open,
    Close,
    SelfClosing,
    Text,
    Other,
}

const fn count_leading_ascii(buf: &[u8]) -> usize {
    let mut count = 0;
    let mut bytes = buf;
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }

        count += 1;
        bytes = rest;
    }
    count
}

const fn count_trailing_ascii(buf: &[u8]) -> usize {
    let mut count = 0;
    let mut bytes = buf;
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }

        count += 1;
        bytes = rest;
    }
    count
}

fn strip_ascii_range(buf: &[u8], range: Range<usize>) -> Range<usize> {
    let selected = &buf[range.clone()];
    let leading = count_leading_ascii(selected);
    if leading == selected.len() {
        return range.start..range.start;
    }
    let trailing = count_trailing_ascii(selected);
    Range {
        start: range.start + leading,
        end: range.end - trailing,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

struct TokenSearch {
    consumed: usize,
    value_range: Range<usize>,
    kind: TokenKind,
}

fn find_markup(buf: &[u8], base: usize, terminator: &[u8]) -> Result<TokenSearch, LexError> {
    let end = find_subslice(&buf[2..], terminator).ok_or(LexError::UnterminatedTag(base))?
        + 2
        + terminator.len();

    Ok(TokenSearch {
        consumed: end,
        value_range: Range { start: 0, end },
        kind: TokenKind::Other,
    })
}

fn find_tag(buf: &[u8], base: usize, close_idx: usize) -> Result<TokenSearch, LexError> {
    // Do not include '<' or '>' in the tag name
    let mut inner = Range {
        start: 1,
        end: close_idx,
    };
    let kind = if buf[1] == b'/' {
        inner.start += 1;
        TokenKind::Close
    } else if buf[close_idx - 1] == b'/' {
        inner.end -= 1;
        TokenKind::SelfClosing
    } else {
        TokenKind::Open
    };

    // Attributes are ignored
    let name_len = buf[inner.clone()]
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(inner.len());
    let name = Range {
        start: inner.start,
        end: inner.start + name_len,
    };

    if name.is_empty() {
        return Err(LexError::EmptyTagName(base));
    }
    if let Some(idx) = buf[name.clone()].iter().position(|b| *b == b'/') {
        return Err(LexError::SlashInTagName(base + name.start + idx));
    }

    Ok(TokenSearch {
        // Consume '>'
        consumed: close_idx + 1,
        value_range: name,
        kind,
    })
}

fn find_token(buf: &[u8], base: usize) -> Result<TokenSearch, LexError> {
    if buf.first() != Some(&b'<') {
        // Leave '<' for next token
        let end = buf.iter().position(|b| *b == b'<').unwrap_or(buf.len());
        if let Some(idx) = buf[..end].iter().position(|b| *b == b'>') {
            return Err(LexError::UnmatchedTagEnd(base + idx));
        }

        return Ok(TokenSearch {
            consumed: end,
            value_range: Range { start: 0, end },
            kind: TokenKind::Text,
        });
    }

    match buf.get(1) {
        Some(b'?') => return find_markup(buf, base, b"?>"),
        Some(b'!') if buf.starts_with(b"<!--") => return find_markup(buf, base, b"-->"),
        Some(b'!') => return find_markup(buf, base, b">"),
        _ => {}
    }

    for (idx, byte) in buf.iter().enumerate().skip(1) {
        match byte {
            b'<' => return Err(LexError::NestedTagStart(base + idx)),
            b'>' => return find_tag(buf, base, idx),
            _ => {}
        }
    }

    Err(LexError::UnterminatedTag(base))
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Replace entity and character references.
///
/// A bare '&' not followed by a reference is kept as is, SGML files rarely escape it.
fn unescape(text: Cow<'_, str>, offset: usize) -> Result<Cow<'_, str>, LexError> {
    if !text.contains('&') {
        return Ok(text);
    }

    let mut unescaped = String::with_capacity(text.len());
    let mut rest: &str = &text;
    while let Some(idx) = rest.find('&') {
        unescaped.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        let reference = after.find(';').filter(|&end| {
            end > 0 && end <= 10 && after[..end].bytes().all(|b| b.is_ascii_alphanumeric() || b == b'#')
        });
        match reference {
            Some(end) => {
                let entity = &after[..end];
                let ch = resolve_entity(entity).ok_or_else(|| LexError::BadEntity {
                    entity: entity.to_owned(),
                    offset,
                })?;
                unescaped.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                unescaped.push('&');
                rest = after;
            }
        }
    }
    unescaped.push_str(rest);

    Ok(Cow::Owned(unescaped))
}

pub struct Lexer {
    data: Vec<u8>,
    decoder: &'static Encoding,
    // State
    consumed: Cell<usize>,
    pending_close: Cell<Option<Range<usize>>>,
}

impl Lexer {
    pub fn new(data: Vec<u8>, string_encoding: StringEncoding) -> Self {
        let decoder = match string_encoding {
            StringEncoding::Utf8 => UTF_8,
            StringEncoding::Windows1252 => WINDOWS_1252,
        };

        Self {
            data,
            decoder,
            consumed: Cell::new(0),
            pending_close: Cell::new(None),
        }
    }

    /// Read the next token from the document body
    ///
    /// Warning: This must not be called again following an error.
    /// Doing so will return the same error again. Use [`Lexer::tokens`] to stop on the first error.
    pub fn next(&self) -> Result<Option<Token<'_>>, LexError> {
        // Second half of a self closing tag
        if let Some(range) = self.pending_close.take() {
            return Ok(Some(Token::Close(&self.data[range])));
        }

        loop {
            let consumed = self.consumed.get();
            if consumed == self.data.len() {
                return Ok(None);
            }

            let search = find_token(&self.data[consumed..], consumed)?;

            let mut range = search.value_range;
            range.start += consumed;
            range.end += consumed;

            self.consumed.set(consumed + search.consumed);

            let token = match search.kind {
                TokenKind::Open => Token::Open(&self.data[range]),
                TokenKind::Close => Token::Close(&self.data[range]),
                TokenKind::SelfClosing => {
                    self.pending_close.set(Some(range.clone()));
                    Token::Open(&self.data[range])
                }
                TokenKind::Other => Token::Other(&self.data[range]),
                TokenKind::Text => {
                    let range = strip_ascii_range(&self.data, range);
                    if range.is_empty() {
                        continue;
                    }

                    let value = self
                        .decoder
                        .decode_without_bom_handling_and_without_replacement(&self.data[range.clone()])
                        .ok_or(LexError::Undecodable(range.start))?;

                    Token::Text(unescape(value, range.start)?)
                }
            };

            return Ok(Some(token));
        }
    }

    pub fn tokens(&self) -> Tokens<'_> {
        Tokens {
            lexer: self,
            failed: false,
        }
    }
}

/// Token iterator which ends after the first error
pub struct Tokens<'a> {
    lexer: &'a Lexer,
    failed: bool,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.lexer.next() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
