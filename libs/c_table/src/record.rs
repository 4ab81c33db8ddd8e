use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{Error, Result};

/// The value assigned to a field in a designated initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    /// `nullptr` or `NULL`.
    Null,
    /// A bare identifier such as an enum value or a macro.
    Ident(String),
    /// Anything more complex, kept as written.
    Expr(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Ident(_) => "identifier",
            Value::Expr(_) => "expression",
        }
    }
}

/// One `{ .field = value, ... }` block of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Line of the opening brace.
    pub line: usize,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn new(line: usize) -> Self {
        Record {
            line,
            fields: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, field: &str, value: Value, line: usize) -> Result<()> {
        if self.get(field).is_some() {
            return Err(Error::DuplicateField {
                field: field.to_string(),
                line,
            });
        }
        self.fields.push((field.to_string(), value));
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn require(&self, field: &str) -> Result<&Value> {
        self.get(field).ok_or_else(|| Error::MissingField {
            field: field.to_string(),
            line: self.line,
        })
    }

    fn unexpected(&self, field: &str, expected: &'static str) -> Error {
        Error::UnexpectedValue {
            field: field.to_string(),
            expected,
            line: self.line,
        }
    }

    pub fn string(&self, field: &str) -> Result<&str> {
        match self.require(field)? {
            Value::Str(value) => Ok(value),
            _ => Err(self.unexpected(field, "a string")),
        }
    }

    /// A string that may be left out with a null placeholder.
    ///
    /// The field itself must still be present: only an explicit `nullptr`
    /// maps to `None`.
    pub fn optional_string(&self, field: &str) -> Result<Option<&str>> {
        match self.require(field)? {
            Value::Str(value) => Ok(Some(value)),
            Value::Null => Ok(None),
            _ => Err(self.unexpected(field, "a string or nullptr")),
        }
    }

    pub fn integer(&self, field: &str) -> Result<i64> {
        match self.require(field)? {
            Value::Int(value) => Ok(*value),
            _ => Err(self.unexpected(field, "an integer")),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<bool> {
        match self.require(field)? {
            Value::Bool(value) => Ok(*value),
            _ => Err(self.unexpected(field, "a boolean")),
        }
    }
}

pub(crate) fn parse_int(raw: &str) -> Option<i64> {
    let digits = raw.replace('\'', "");
    let digits = digits.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        i64::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}
