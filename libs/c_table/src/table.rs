use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::lexer::{Lexer, Spanned, Token};
use crate::record::{Record, Value, parse_int};
use crate::{Error, Result};

/// The body of a named array definition, between its braces.
#[derive(Debug)]
pub struct Table<'a> {
    name: String,
    text: &'a str,
    body: Vec<Spanned<'a>>,
    line: usize,
    end_line: usize,
}

/// Locates the definition `name[] = { ... };` in `text`.
///
/// Occurrences inside comments and uses such as `name[i]` are skipped.
pub fn find_table<'a>(text: &'a str, name: &str) -> Result<Table<'a>> {
    if memchr::memmem::find(text.as_bytes(), name.as_bytes()).is_none() {
        return Err(Error::TableNotFound(name.to_string()));
    }

    let tokens = Lexer::new(text).collect::<Result<Vec<_>>>()?;
    let start = tokens.iter().enumerate().find_map(|(i, t)| match t.token {
        Token::Ident(ident) if ident == name => {
            definition_len(&tokens[i + 1..]).map(|len| (i + 1 + len, t.line))
        }
        _ => None,
    });
    let Some((start, line)) = start else {
        return Err(Error::TableNotFound(name.to_string()));
    };

    let mut depth = 0usize;
    let mut close = None;
    for (i, t) in tokens.iter().enumerate().skip(start) {
        match t.token {
            Token::Punct('{') => depth += 1,
            Token::Punct('}') if depth == 0 => {
                close = Some(i);
                break;
            }
            Token::Punct('}') => depth -= 1,
            _ => {}
        }
    }
    let Some(close) = close else {
        return Err(Error::UnterminatedTable {
            name: name.to_string(),
            line,
        });
    };
    let end_line = tokens[close].line;
    match tokens.get(close + 1) {
        Some(t) if t.token.is_punct(';') => {}
        Some(t) => {
            return Err(Error::Unexpected {
                expected: "';' after the table",
                found: t.token.describe(),
                line: t.line,
            });
        }
        None => {
            return Err(Error::UnterminatedTable {
                name: name.to_string(),
                line,
            });
        }
    }

    let body = tokens.into_iter().skip(start).take(close - start).collect();
    Ok(Table {
        name: name.to_string(),
        text,
        body,
        line,
        end_line,
    })
}

/// Matches `[ N? ] = {` and returns how many tokens it spans.
fn definition_len(tokens: &[Spanned]) -> Option<usize> {
    let head: Vec<&Token> = tokens.iter().take(5).map(|t| &t.token).collect();
    match head.as_slice() {
        [Token::Punct('['), Token::Punct(']'), Token::Punct('='), Token::Punct('{'), ..] => Some(4),
        [
            Token::Punct('['),
            Token::Number(_) | Token::Ident(_),
            Token::Punct(']'),
            Token::Punct('='),
            Token::Punct('{'),
        ] => Some(5),
        _ => None,
    }
}

impl<'a> Table<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line of the table's name in the source text.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Parses every record of the table.
    ///
    /// Fails on the first malformed record instead of skipping it.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut cursor = Cursor {
            tokens: &self.body,
            pos: 0,
            text: self.text,
            end_line: self.end_line,
        };
        let mut records = Vec::new();
        while cursor.peek().is_some() {
            records.push(cursor.record()?);
            if !cursor.eat_punct(',') && cursor.peek().is_some() {
                return Err(cursor.unexpected("',' between records"));
            }
        }
        Ok(records)
    }
}

struct Cursor<'t, 'a> {
    tokens: &'t [Spanned<'a>],
    pos: usize,
    text: &'a str,
    end_line: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn peek(&self) -> Option<&'t Spanned<'a>> {
        self.tokens.get(self.pos)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        match self.peek() {
            Some(t) if t.token.is_punct(c) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Consumes the punctuation `c` and returns its line.
    fn expect_punct(&mut self, c: char, expected: &'static str) -> Result<usize> {
        match self.peek() {
            Some(t) if t.token.is_punct(c) => {
                self.pos += 1;
                Ok(t.line)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        match self.peek() {
            Some(t) => Error::Unexpected {
                expected,
                found: t.token.describe(),
                line: t.line,
            },
            None => Error::Unexpected {
                expected,
                found: "end of table".to_string(),
                line: self.end_line,
            },
        }
    }

    fn record(&mut self) -> Result<Record> {
        let line = self.expect_punct('{', "'{' starting a record")?;
        let mut record = Record::new(line);
        loop {
            if self.eat_punct('}') {
                return Ok(record);
            }
            let line = self.expect_punct('.', "a designated field such as `.name = ...`")?;
            let field = match self.peek() {
                Some(Spanned {
                    token: Token::Ident(name),
                    ..
                }) => *name,
                _ => return Err(self.unexpected("a field name")),
            };
            self.pos += 1;
            self.expect_punct('=', "'=' after the field name")?;
            let value = self.value()?;
            record.insert(field, value, line)?;
            if !self.eat_punct(',') && !matches!(self.peek(), Some(t) if t.token.is_punct('}')) {
                return Err(self.unexpected("',' or '}' after a value"));
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            match t.token {
                Token::Punct('{' | '(' | '[') => depth += 1,
                Token::Punct('}' | ')' | ']') if depth > 0 => depth -= 1,
                Token::Punct(',' | '}') if depth == 0 => break,
                // A second assignment means a separator is missing.
                Token::Punct('=') if depth == 0 => {
                    return Err(self.unexpected("',' or '}' after a value"));
                }
                _ => {}
            }
            self.pos += 1;
        }
        let tokens = &self.tokens[start..self.pos];
        if tokens.is_empty() {
            return Err(self.unexpected("a value"));
        }
        Ok(self.classify(tokens))
    }

    fn classify(&self, tokens: &[Spanned<'a>]) -> Value {
        if tokens.iter().all(|t| matches!(t.token, Token::Str(_))) {
            // Adjacent literals concatenate, as in C.
            let mut value = String::new();
            for t in tokens {
                if let Token::Str(part) = &t.token {
                    value.push_str(part);
                }
            }
            return Value::Str(value);
        }
        let raw = || {
            let first = &tokens[0].span;
            let last = &tokens[tokens.len() - 1].span;
            Value::Expr(self.text[first.start..last.end].to_string())
        };
        match tokens {
            [single] => match &single.token {
                Token::Number(digits) => parse_int(digits).map(Value::Int).unwrap_or_else(raw),
                Token::Ident("nullptr" | "NULL") => Value::Null,
                Token::Ident("true") => Value::Bool(true),
                Token::Ident("false") => Value::Bool(false),
                Token::Ident(name) => Value::Ident(name.to_string()),
                _ => raw(),
            },
            [sign, number] if sign.token.is_punct('-') => match &number.token {
                Token::Number(digits) => parse_int(digits)
                    .map(|n| Value::Int(-n))
                    .unwrap_or_else(raw),
                _ => raw(),
            },
            _ => raw(),
        }
    }
}
