use alloc::string::String;
use core::ops::Range;

use crate::{Error, Result};

#[cfg(test)]
extern crate std;

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
        #[cfg(test)]
        std::eprintln!($($arg)*);
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Ident(&'a str),
    /// Numeric literal as written, including prefixes and suffixes.
    Number(&'a str),
    /// String literal with escapes resolved.
    Str(String),
    /// Character literal as written, quotes included.
    Char(&'a str),
    Punct(char),
}

impl Token<'_> {
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punct(p) if *p == c)
    }

    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => alloc::format!("identifier `{name}`"),
            Token::Number(raw) => alloc::format!("number {raw}"),
            Token::Str(value) => alloc::format!("string {value:?}"),
            Token::Char(raw) => alloc::format!("character {raw}"),
            Token::Punct(c) => alloc::format!("'{c}'"),
        }
    }
}

/// A token together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub span: Range<usize>,
    pub line: usize,
}

/// Splits C source text into tokens, skipping whitespace and comments.
///
/// Characters the lexer does not know are not an error:
/// anything that is not an identifier, number or literal becomes a
/// [`Token::Punct`], so arbitrary header content around a table never
/// stops the scan.
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Lexer {
            text,
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn bytes(&self) -> &'a [u8] {
        &self.text.as_bytes()[self.pos..]
    }

    fn advance(&mut self, len: usize) {
        let skipped = &self.text.as_bytes()[self.pos..self.pos + len];
        self.line += memchr::memchr_iter(b'\n', skipped).count();
        self.pos += len;
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let b = self.bytes();
            match b {
                [c, ..] if c.is_ascii_whitespace() => {
                    let len = b
                        .iter()
                        .position(|c| !c.is_ascii_whitespace())
                        .unwrap_or(b.len());
                    self.advance(len);
                }
                [b'/', b'/', ..] => {
                    let len = memchr::memchr(b'\n', b).unwrap_or(b.len());
                    self.advance(len);
                }
                [b'#', ..] if self.at_line_start() => {
                    let len = directive_len(b);
                    self.advance(len);
                }
                [b'/', b'*', ..] => {
                    let Some(end) = memchr::memmem::find(&b[2..], b"*/") else {
                        return Err(Error::UnterminatedComment { line: self.line });
                    };
                    self.advance(end + 4);
                }
                _ => return Ok(()),
            }
        }
    }

    /// Only blanks precede the current position on its line.
    fn at_line_start(&self) -> bool {
        self.text.as_bytes()[..self.pos]
            .iter()
            .rev()
            .find(|&&c| c != b' ' && c != b'\t')
            .is_none_or(|&c| c == b'\n')
    }

    /// Returns the next token, or `None` at the end of the text.
    pub fn next_token(&mut self) -> Result<Option<Spanned<'a>>> {
        self.skip_trivia()?;
        let start = self.pos;
        let line = self.line;
        let b = self.bytes();
        let Some(&first) = b.first() else {
            return Ok(None);
        };

        let token = if first.is_ascii_alphabetic() || first == b'_' {
            let len = b
                .iter()
                .position(|c| !(c.is_ascii_alphanumeric() || *c == b'_'))
                .unwrap_or(b.len());
            self.advance(len);
            Token::Ident(&self.text[start..self.pos])
        } else if first.is_ascii_digit() {
            let len = number_len(b);
            self.advance(len);
            Token::Number(&self.text[start..self.pos])
        } else if first == b'"' {
            Token::Str(self.string_literal()?)
        } else if first == b'\'' {
            self.char_literal()?;
            Token::Char(&self.text[start..self.pos])
        } else {
            // Multi-byte characters only ever show up as punctuation.
            let c = self.text[start..].chars().next().unwrap_or('\u{FFFD}');
            self.advance(c.len_utf8());
            Token::Punct(c)
        };

        trace!("line {}: {:?}", line, token);
        Ok(Some(Spanned {
            token,
            span: start..self.pos,
            line,
        }))
    }

    fn string_literal(&mut self) -> Result<String> {
        let line = self.line;
        let mut value = String::new();
        let mut chars = self.text[self.pos + 1..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => {
                    self.advance(offset + 2);
                    return Ok(value);
                }
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, '0')) => value.push('\0'),
                    Some((_, '\n')) => {}
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(Error::UnterminatedString { line })
    }

    fn char_literal(&mut self) -> Result<()> {
        let b = self.bytes();
        let mut i = 1;
        while i < b.len() {
            match b[i] {
                b'\'' => {
                    self.advance(i + 1);
                    return Ok(());
                }
                b'\\' => i += 2,
                b'\n' => break,
                _ => i += 1,
            }
        }
        Err(Error::UnterminatedString { line: self.line })
    }
}

/// Length of a numeric literal, C++14 digit separators (`400'000`) included.
fn number_len(b: &[u8]) -> usize {
    let mut len = 0;
    while let Some(&c) = b.get(len) {
        let separator = c == b'\''
            && b.get(len + 1).is_some_and(|n| n.is_ascii_alphanumeric());
        if !(c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || separator) {
            break;
        }
        len += 1;
    }
    len
}

/// Length of a preprocessor line up to its newline, continuations included.
///
/// Directives are skipped whole: `#warning don't` is not a char literal.
fn directive_len(b: &[u8]) -> usize {
    let mut len = 0;
    while let Some(end) = memchr::memchr(b'\n', &b[len..]) {
        let line = &b[len..len + end];
        len += end;
        if !line.trim_ascii_end().ends_with(b"\\") {
            return len;
        }
        len += 1;
    }
    b.len()
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Spanned<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
