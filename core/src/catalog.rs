use c_table::Record;
use log::{debug, warn};

use crate::bitmap::Rotation;

pub const MODE_TABLE: &str = "MODE_CONFIGS";
pub const MONITOR_TABLE: &str = "MONITOR_CONFIGS";

/// Button icons shown next to a mode. `None` leaves the button blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonFiles {
    pub up: Option<String>,
    pub mode: Option<String>,
    pub down: Option<String>,
}

/// The three buttons beside the mode panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumIter)]
pub enum Button {
    Up,
    Mode,
    Down,
}

impl Button {
    pub fn name(self) -> &'static str {
        match self {
            Button::Up => "up",
            Button::Mode => "mode",
            Button::Down => "down",
        }
    }
}

impl ButtonFiles {
    pub fn get(&self, button: Button) -> Option<&str> {
        match button {
            Button::Up => self.up.as_deref(),
            Button::Mode => self.mode.as_deref(),
            Button::Down => self.down.as_deref(),
        }
    }
}

/// One row of `MODE_CONFIGS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEntry {
    pub name: String,
    pub icon_file: String,
    pub rotation: Rotation,
    pub buttons: ButtonFiles,
}

/// One row of `MONITOR_CONFIGS`: the status bar icon for each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEntry {
    pub name: String,
    pub true_file: Option<String>,
    pub false_file: Option<String>,
}

impl MonitorEntry {
    /// The icon shown while the monitored value is `state`.
    pub fn file(&self, state: bool) -> Option<&str> {
        if state {
            self.true_file.as_deref()
        } else {
            self.false_file.as_deref()
        }
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Table(c_table::Error),
    InvalidRotation { line: usize, value: i64 },
    EmptyFile { field: String, line: usize },
}

impl From<c_table::Error> for CatalogError {
    fn from(err: c_table::Error) -> Self {
        CatalogError::Table(err)
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Table(err) => write!(f, "{err}"),
            CatalogError::InvalidRotation { line, value } => write!(
                f,
                "record at line {line}: rotation {value} is neither 0-3 quarter turns nor 90/180/270 degrees"
            ),
            CatalogError::EmptyFile { field, line } => {
                write!(f, "record at line {line}: .{field} is empty, use nullptr to leave it out")
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Table(err) => Some(err),
            _ => None,
        }
    }
}

type Result<T> = core::result::Result<T, CatalogError>;

/// Reads the mode table. The mode icons are mandatory, so a missing table is
/// an error.
pub fn parse_mode_table(text: &str) -> Result<Vec<ModeEntry>> {
    let table = c_table::find_table(text, MODE_TABLE)?;
    debug!("Found {} at line {}", MODE_TABLE, table.line());
    table.records()?.iter().map(mode_entry).collect()
}

/// Reads the monitor table. The status bar is optional: without a table
/// there are simply no monitor icons.
pub fn parse_monitor_table(text: &str) -> Result<Vec<MonitorEntry>> {
    let table = match c_table::find_table(text, MONITOR_TABLE) {
        Ok(table) => table,
        Err(c_table::Error::TableNotFound(_)) => {
            warn!("Could not find {MONITOR_TABLE}, no monitor icons will be generated");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };
    debug!("Found {} at line {}", MONITOR_TABLE, table.line());
    table.records()?.iter().map(monitor_entry).collect()
}

fn mode_entry(record: &Record) -> Result<ModeEntry> {
    let value = record.integer("rotation")?;
    let rotation = parse_rotation(value).ok_or(CatalogError::InvalidRotation {
        line: record.line,
        value,
    })?;
    Ok(ModeEntry {
        name: record.string("name")?.to_string(),
        icon_file: file(record, "icon_file")?,
        rotation,
        buttons: ButtonFiles {
            up: optional_file(record, "button_up_file")?,
            mode: optional_file(record, "button_mode_file")?,
            down: optional_file(record, "button_down_file")?,
        },
    })
}

fn monitor_entry(record: &Record) -> Result<MonitorEntry> {
    Ok(MonitorEntry {
        name: record.string("name")?.to_string(),
        true_file: optional_file(record, "icon_true_file")?,
        false_file: optional_file(record, "icon_false_file")?,
    })
}

/// Quarter turns, or the same angle spelled in degrees.
fn parse_rotation(value: i64) -> Option<Rotation> {
    match value {
        0..=3 => Rotation::from_repr(value as u8),
        90 => Some(Rotation::Rotate90),
        180 => Some(Rotation::Rotate180),
        270 => Some(Rotation::Rotate270),
        _ => None,
    }
}

fn file(record: &Record, field: &str) -> Result<String> {
    non_empty(record, field, record.string(field)?)
}

fn optional_file(record: &Record, field: &str) -> Result<Option<String>> {
    record
        .optional_string(field)?
        .map(|name| non_empty(record, field, name))
        .transpose()
}

fn non_empty(record: &Record, field: &str, name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(CatalogError::EmptyFile {
            field: field.to_string(),
            line: record.line,
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
#pragma once

struct MonitorConfig {
    const char* name;              // Monitor name for debugging
    const char* icon_true_file;    // Icon filename when true (null = hide)
    const char* icon_false_file;   // Icon filename when false (null = hide)
};

static const MonitorConfig MONITOR_CONFIGS[] = {
    // DEV_MODE
    {
        .name = "Dev Mode",
        .icon_true_file = "hand-middle-finger.png",
        .icon_false_file = nullptr
    },
    // LOCK
    {
        .name = "Lock",
        .icon_true_file = "lock.png",
        .icon_false_file = "lock-open.png"
    }
};

static const ModeConfig MODE_CONFIGS[] = {
    // Index 0: UP_DOWN
    {
        .name = "Up/Down",
        .icon_file = "arrows-up-down.png",
        .rotation = 0,
        .dev_only = false,
        .button_up_file = "caret-up.png",
        .button_mode_file = "stack.png",
        .button_down_file = "caret-down.png",
        .bg_color = COLOR_BLACK
    },

    // Index 1: LEVEL
    {
        .name = "Level",
        // .icon_file = "atom-2.png",
        .icon_file = "wand.png",
        .rotation = 3,
        .dev_only = false,
        .button_up_file = "sparkles.png",
        .button_mode_file = nullptr,
        .button_down_file = "hand-middle-finger.png",
        .bg_color = COLOR_BLACK
    }
};
"#;

    #[test]
    fn mode_entries() {
        let modes = parse_mode_table(CONFIG).unwrap();
        assert_eq!(modes.len(), 2);
        assert_eq!(
            modes[0],
            ModeEntry {
                name: "Up/Down".to_string(),
                icon_file: "arrows-up-down.png".to_string(),
                rotation: Rotation::Rotate0,
                buttons: ButtonFiles {
                    up: Some("caret-up.png".to_string()),
                    mode: Some("stack.png".to_string()),
                    down: Some("caret-down.png".to_string()),
                },
            }
        );
        assert_eq!(modes[1].icon_file, "wand.png");
        assert_eq!(modes[1].rotation, Rotation::Rotate270);
        assert_eq!(modes[1].buttons.mode, None);
        assert_eq!(modes[1].buttons.get(Button::Up), Some("sparkles.png"));
        assert_eq!(modes[1].buttons.get(Button::Mode), None);
    }

    #[test]
    fn monitor_entries() {
        let monitors = parse_monitor_table(CONFIG).unwrap();
        assert_eq!(
            monitors,
            [
                MonitorEntry {
                    name: "Dev Mode".to_string(),
                    true_file: Some("hand-middle-finger.png".to_string()),
                    false_file: None,
                },
                MonitorEntry {
                    name: "Lock".to_string(),
                    true_file: Some("lock.png".to_string()),
                    false_file: Some("lock-open.png".to_string()),
                },
            ]
        );
        assert_eq!(monitors[0].file(true), Some("hand-middle-finger.png"));
        assert_eq!(monitors[0].file(false), None);
    }

    #[test]
    fn missing_tables() {
        let text = "static const int OTHER[] = { 1, 2 };";
        assert!(matches!(
            parse_mode_table(text),
            Err(CatalogError::Table(c_table::Error::TableNotFound(_)))
        ));
        assert!(parse_monitor_table(text).unwrap().is_empty());
    }

    #[test]
    fn stray_quotes_outside_tables() {
        let text = "#warning don't ship this\nconstexpr uint32_t I2C_FREQ = 400'000;\n// MONITOR_CONFIGS lives in monitors.hpp\n";
        assert!(parse_monitor_table(text).unwrap().is_empty());
    }

    #[test]
    fn broken_monitor_table_is_an_error() {
        let text = "MONITOR_CONFIGS[] = { { \"Lock\", \"lock.png\", nullptr } };";
        assert!(parse_monitor_table(text).is_err());
    }

    #[test]
    fn rotation_in_degrees() {
        assert_eq!(parse_rotation(1), Some(Rotation::Rotate90));
        assert_eq!(parse_rotation(90), Some(Rotation::Rotate90));
        assert_eq!(parse_rotation(270), Some(Rotation::Rotate270));
        assert_eq!(parse_rotation(4), None);
        assert_eq!(parse_rotation(-1), None);
    }

    #[test]
    fn invalid_rotation() {
        let text = r#"MODE_CONFIGS[] = {
            { .name = "A", .icon_file = "a.png", .rotation = 45,
              .button_up_file = nullptr, .button_mode_file = nullptr, .button_down_file = nullptr }
        };"#;
        assert!(matches!(
            parse_mode_table(text),
            Err(CatalogError::InvalidRotation { value: 45, line: 2 })
        ));
    }

    #[test]
    fn blank_file_is_rejected() {
        let text = r#"MONITOR_CONFIGS[] = {
            { .name = "A", .icon_true_file = "", .icon_false_file = nullptr }
        };"#;
        assert!(matches!(
            parse_monitor_table(text),
            Err(CatalogError::EmptyFile { .. })
        ));
    }

    #[test]
    fn missing_field() {
        let text = r#"MODE_CONFIGS[] = {
            { .name = "A", .icon_file = "a.png", .rotation = 0 }
        };"#;
        assert!(matches!(
            parse_mode_table(text),
            Err(CatalogError::Table(c_table::Error::MissingField { .. }))
        ));
    }
}
