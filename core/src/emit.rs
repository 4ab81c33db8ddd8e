use std::collections::HashMap;
use std::path::Path;

use log::{info, trace};

use crate::bitmap::{Bitmap, ConvertOptions, Rotation};

pub const BYTES_PER_LINE: usize = 12;

pub const RULE: &str =
    "// ============================================================================";

/// Where the bytes of an array came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Converted,
    /// Placeholder, the image file does not exist.
    Missing,
    /// Placeholder, the image file could not be read or decoded.
    Unreadable,
}

impl Origin {
    fn note(self) -> &'static str {
        match self {
            Origin::Converted => "",
            Origin::Missing => " (PLACEHOLDER - file not found)",
            Origin::Unreadable => " (PLACEHOLDER - unreadable)",
        }
    }
}

/// One generated `constexpr uint8_t` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconArray {
    pub ident: String,
    pub file: String,
    pub rotation: Rotation,
    pub label: String,
    pub bitmap: Bitmap,
    pub origin: Origin,
}

/// The arrays of one icon category, each source converted once.
///
/// Entries are keyed by file name and rotation and keep insertion order, so
/// the generated header is stable from run to run.
#[derive(Debug, Clone)]
pub struct IconSet {
    prefix: &'static str,
    size: u32,
    arrays: Vec<IconArray>,
    by_key: HashMap<(String, Rotation), usize>,
}

impl IconSet {
    pub fn new(prefix: &'static str, size: u32) -> Self {
        IconSet {
            prefix,
            size,
            arrays: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn arrays(&self) -> &[IconArray] {
        &self.arrays
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.arrays.iter().map(|a| a.bitmap.as_bytes().len()).sum()
    }

    pub fn get(&self, file: &str, rotation: Rotation) -> Option<&IconArray> {
        self.by_key
            .get(&(file.to_string(), rotation))
            .map(|&index| &self.arrays[index])
    }

    /// Adds the array for `file` and returns its identifier.
    ///
    /// Identifiers stay unique even when two file names collapse to the same
    /// C name, for example `a-b.png` and `a_b.png`.
    pub fn insert(
        &mut self,
        file: &str,
        rotation: Rotation,
        label: String,
        bitmap: Bitmap,
        origin: Origin,
    ) -> &IconArray {
        let key = (file.to_string(), rotation);
        if let Some(&index) = self.by_key.get(&key) {
            return &self.arrays[index];
        }
        let base = identifier(self.prefix, file, rotation);
        let mut ident = base.clone();
        let mut n = 2;
        while self.arrays.iter().any(|a| a.ident == ident) {
            ident = format!("{base}_{n}");
            n += 1;
        }
        trace!("{file} ({}) -> {ident}", rotation.repr());
        self.by_key.insert(key, self.arrays.len());
        self.arrays.push(IconArray {
            ident,
            file: file.to_string(),
            rotation,
            label,
            bitmap,
            origin,
        });
        &self.arrays[self.arrays.len() - 1]
    }
}

/// C identifier for an icon file: the lowercased file stem with every other
/// character mapped to `_`, plus a suffix for rotated variants.
pub fn identifier(prefix: &str, file: &str, rotation: Rotation) -> String {
    let stem = Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file);
    let mut ident = String::from(prefix);
    ident.extend(stem.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '_'
        }
    }));
    if rotation != Rotation::Rotate0 {
        ident.push_str(&format!("_r{}", rotation.degrees()));
    }
    ident
}

/// Whether `name` can be used as a C identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn format_bytes(bytes: &[u8], per_line: usize) -> String {
    bytes
        .chunks(per_line.max(1))
        .map(|chunk| {
            let values = chunk
                .iter()
                .map(|b| format!("0x{b:02X}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("    {values}")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn c_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn push_banner(out: &mut String, title: &str) {
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("// {title}\n"));
    out.push_str(RULE);
    out.push_str("\n\n");
}

pub fn push_array(out: &mut String, array: &IconArray) {
    out.push_str(&format!("// {}{}\n", array.label, array.origin.note()));
    out.push_str(&format!("constexpr uint8_t {}[] = {{\n", array.ident));
    out.push_str(&format_bytes(array.bitmap.as_bytes(), BYTES_PER_LINE));
    out.push_str("\n};\n\n");
}

/// `switch` from an index straight to an array.
pub fn push_index_lookup(out: &mut String, comment: &str, function: &str, param: &str, idents: &[&str]) {
    out.push_str(&format!("// {comment}\n"));
    out.push_str(&format!("inline const uint8_t* {function}(int {param}) {{\n"));
    out.push_str(&format!("    switch ({param}) {{\n"));
    for (index, ident) in idents.iter().enumerate() {
        out.push_str(&format!("        case {index}: return {ident};\n"));
    }
    out.push_str("        default: return nullptr;\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");
}

/// Index to file name, then file name to array by string comparison.
pub fn push_file_lookup(
    out: &mut String,
    comment: &str,
    function: &str,
    param: &str,
    files: &[Option<&str>],
    set: &IconSet,
) {
    out.push_str(&format!("// {comment}\n"));
    out.push_str(&format!("inline const uint8_t* {function}(int {param}) {{\n"));
    if files.is_empty() {
        out.push_str(&format!("    (void){param};\n"));
        out.push_str("    return nullptr;\n");
        out.push_str("}\n\n");
        return;
    }
    out.push_str(&format!(
        "    if ({param} < 0 || {param} >= {}) return nullptr;\n",
        files.len()
    ));
    out.push_str("    const char* files[] = {\n");
    for file in files {
        match file {
            Some(file) => out.push_str(&format!("        {},\n", c_string(file))),
            None => out.push_str("        nullptr,\n"),
        }
    }
    out.push_str("    };\n");
    out.push_str(&format!("    const char* file = files[{param}];\n"));
    if files.iter().any(Option::is_none) {
        out.push_str("    if (file == nullptr) return nullptr;\n");
    }
    out.push('\n');
    for array in set.arrays() {
        out.push_str(&format!(
            "    if (strcmp(file, {}) == 0) return {};\n",
            c_string(&array.file),
            array.ident
        ));
    }
    out.push_str("    return nullptr;\n");
    out.push_str("}\n\n");
}

/// Header with a single array, as written by `img2icon`.
pub fn render_single(name: &str, bitmap: &Bitmap, source: &str, options: &ConvertOptions) -> String {
    let upper = name.to_ascii_uppercase();
    let mut out = String::new();
    out.push_str("#pragma once\n\n");
    out.push_str("#include <cstdint>\n\n");
    out.push_str(&format!("// Generated by img2icon from {source}\n"));
    out.push_str(&format!(
        "// {}x{} pixels, 1 bit per pixel = {} bytes, threshold {}{}{}\n",
        bitmap.width(),
        bitmap.height(),
        bitmap.as_bytes().len(),
        options.threshold,
        if options.rotation == Rotation::Rotate0 {
            String::new()
        } else {
            format!(", rotated {}", options.rotation.repr())
        },
        if options.invert { ", inverted" } else { "" },
    ));
    out.push_str("// Format: MSB first, row by row\n");
    out.push_str(&format!("constexpr int {upper}_WIDTH = {};\n", bitmap.width()));
    out.push_str(&format!("constexpr int {upper}_HEIGHT = {};\n\n", bitmap.height()));
    out.push_str(&format!("constexpr uint8_t {name}[] = {{\n"));
    out.push_str(&format_bytes(bitmap.as_bytes(), BYTES_PER_LINE));
    out.push_str("\n};\n");
    out
}

/// Writes a generated file, replacing whatever was there.
pub fn write_output(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)?;
    info!("Wrote {} ({} bytes)", path.display(), text.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_set() -> IconSet {
        let mut set = IconSet::new("icon_monitor_", 8);
        set.insert(
            "lock.png",
            Rotation::Rotate0,
            "Monitor: lock.png".to_string(),
            Bitmap::placeholder(8),
            Origin::Converted,
        );
        set.insert(
            "lock-open.png",
            Rotation::Rotate0,
            "Monitor: lock-open.png".to_string(),
            Bitmap::placeholder(8),
            Origin::Missing,
        );
        set
    }

    #[test]
    fn identifiers() {
        assert_eq!(
            identifier("icon_mode_", "box-align-bottom-right.png", Rotation::Rotate0),
            "icon_mode_box_align_bottom_right"
        );
        assert_eq!(
            identifier("icon_mode_", "Rotate 360.PNG", Rotation::Rotate270),
            "icon_mode_rotate_360_r270"
        );
        assert!(is_identifier("arrow_up2"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn dedup_and_collisions() {
        let mut set = IconSet::new("icon_button_up_", 8);
        let first = set
            .insert("a-b.png", Rotation::Rotate0, "a".into(), Bitmap::placeholder(8), Origin::Converted)
            .ident
            .clone();
        let again = set
            .insert("a-b.png", Rotation::Rotate0, "b".into(), Bitmap::placeholder(8), Origin::Converted)
            .ident
            .clone();
        let other = set
            .insert("a_b.png", Rotation::Rotate0, "c".into(), Bitmap::placeholder(8), Origin::Converted)
            .ident
            .clone();
        assert_eq!(first, "icon_button_up_a_b");
        assert_eq!(again, first);
        assert_eq!(other, "icon_button_up_a_b_2");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a-b.png", Rotation::Rotate0).unwrap().label, "a");
        assert!(set.get("a-b.png", Rotation::Rotate90).is_none());
        assert_eq!(set.total_bytes(), 16);
    }

    #[test]
    fn byte_formatting() {
        let bytes = (0u8..14).collect::<Vec<_>>();
        assert_eq!(
            format_bytes(&bytes, 12),
            "    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,\n    0x0C, 0x0D"
        );
        assert_eq!(format_bytes(&[0xff], 12), "    0xFF");
    }

    #[test]
    fn array_block() {
        let mut out = String::new();
        let set = array_set();
        push_array(&mut out, &set.arrays()[1]);
        assert_eq!(
            out,
            "// Monitor: lock-open.png (PLACEHOLDER - file not found)\n\
             constexpr uint8_t icon_monitor_lock_open[] = {\n    \
             0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00\n};\n\n"
        );
    }

    #[test]
    fn index_lookup() {
        let mut out = String::new();
        push_index_lookup(&mut out, "Get mode icon", "getModeIcon", "mode_index", &["icon_a", "icon_b"]);
        assert_eq!(
            out,
            "// Get mode icon\n\
             inline const uint8_t* getModeIcon(int mode_index) {\n\
             \x20   switch (mode_index) {\n\
             \x20       case 0: return icon_a;\n\
             \x20       case 1: return icon_b;\n\
             \x20       default: return nullptr;\n\
             \x20   }\n\
             }\n\n"
        );
    }

    #[test]
    fn file_lookup() {
        let mut out = String::new();
        let set = array_set();
        push_file_lookup(
            &mut out,
            "Get monitor icon for false state",
            "getMonitorIconFalse",
            "monitor_index",
            &[None, Some("lock-open.png")],
            &set,
        );
        assert!(out.contains("    if (monitor_index < 0 || monitor_index >= 2) return nullptr;\n"));
        assert!(out.contains("        nullptr,\n        \"lock-open.png\",\n"));
        assert!(out.contains("    if (file == nullptr) return nullptr;\n"));
        assert!(out.contains("    if (strcmp(file, \"lock.png\") == 0) return icon_monitor_lock;\n"));
        assert!(out.contains(
            "    if (strcmp(file, \"lock-open.png\") == 0) return icon_monitor_lock_open;\n"
        ));
        assert!(out.ends_with("    return nullptr;\n}\n\n"));
    }

    #[test]
    fn empty_file_lookup() {
        let mut out = String::new();
        push_file_lookup(&mut out, "none", "getNothing", "i", &[], &IconSet::new("x_", 8));
        assert!(!out.contains("files[]"));
        assert!(out.contains("    (void)i;\n    return nullptr;\n"));
    }

    #[test]
    fn escaped_file_names() {
        assert_eq!(c_string(r#"a"b\c.png"#), r#""a\"b\\c.png""#);
        assert_eq!(c_string("tab\there\r\n\0.png"), r#""tab\there\r\n\0.png""#);
    }

    #[test]
    fn single_header() {
        let bitmap = Bitmap::placeholder(10);
        let options = ConvertOptions::new(10).with_invert(true);
        let out = render_single("arrow", &bitmap, "arrow.png", &options);
        assert!(out.starts_with("#pragma once\n"));
        assert!(out.contains("// 10x10 pixels, 1 bit per pixel = 20 bytes, threshold 128, inverted\n"));
        assert!(out.contains("constexpr int ARROW_WIDTH = 10;\n"));
        assert!(out.contains("constexpr int ARROW_HEIGHT = 10;\n"));
        assert!(out.contains("constexpr uint8_t arrow[] = {\n"));
        assert!(out.ends_with("0x00, 0x00\n};\n"));
    }

    #[test]
    fn output_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main/assets/icons.hpp");
        write_output(&path, "old contents that are longer").unwrap();
        write_output(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
