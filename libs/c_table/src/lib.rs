/*!
A no_std reader for designated-initializer array tables in C and C++ headers.

Firmware projects often keep their configuration as a static array of structs:

```c
static const ModeConfig MODE_CONFIGS[] = {
    { .name = "Roll", .icon_file = "rotate-360.png", .rotation = 1 },
};
```

This crate locates such a table by name and returns its records as
field/value lists. Comments are skipped, so a commented-out field never
shadows the live one.

## Usage
```
# use c_table as table;
# fn main() -> Result<(), table::Error> {
let header = r#"
    static const ModeConfig MODE_CONFIGS[] = {
        {
            .name = "Roll",
            // .icon_file = "old.png",
            .icon_file = "rotate-360.png",
            .rotation = 1,
        },
    };
"#;
let table = table::find_table(header, "MODE_CONFIGS")?;
let records = table.records()?;
assert_eq!(records.len(), 1);
assert_eq!(records[0].string("icon_file")?, "rotate-360.png");
assert_eq!(records[0].integer("rotation")?, 1);
# Ok(())
# }
```

## Limitations & non-goals
- UTF-8 only
- no preprocessor: macros are kept as raw identifiers or expressions
- positional (non-designated) initializers are rejected
*/

#![no_std]

extern crate alloc;

mod lexer;
mod record;
mod table;


pub use lexer::{Lexer, Spanned, Token};
pub use record::{Record, Value};
pub use table::{Table, find_table};

use alloc::string::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No `NAME[] = {` definition exists outside of comments.
    TableNotFound(String),
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
    UnterminatedTable { name: String, line: usize },
    Unexpected {
        expected: &'static str,
        found: String,
        line: usize,
    },
    DuplicateField { field: String, line: usize },
    MissingField { field: String, line: usize },
    UnexpectedValue {
        field: String,
        expected: &'static str,
        line: usize,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TableNotFound(name) => write!(f, "could not find table {name}"),
            Error::UnterminatedString { line } => {
                write!(f, "line {line}: unterminated string literal")
            }
            Error::UnterminatedComment { line } => {
                write!(f, "line {line}: unterminated block comment")
            }
            Error::UnterminatedTable { name, line } => {
                write!(f, "line {line}: table {name} is missing its closing '}};'")
            }
            Error::Unexpected {
                expected,
                found,
                line,
            } => write!(f, "line {line}: expected {expected}, found {found}"),
            Error::DuplicateField { field, line } => {
                write!(f, "line {line}: field .{field} is set twice")
            }
            Error::MissingField { field, line } => {
                write!(f, "record at line {line}: missing field .{field}")
            }
            Error::UnexpectedValue {
                field,
                expected,
                line,
            } => write!(f, "record at line {line}: field .{field} must be {expected}"),
        }
    }
}

impl core::error::Error for Error {}
