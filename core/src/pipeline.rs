use std::path::{Path, PathBuf};

use log::{info, warn};
use strum::IntoEnumIterator;

use crate::bitmap::{self, Bitmap, ConvertError, ConvertOptions, DEFAULT_THRESHOLD, Rotation};
use crate::catalog::{self, Button, CatalogError, ModeEntry, MonitorEntry};
use crate::emit::{self, IconSet, Origin};

/// Edge length of each icon category in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSizes {
    pub mode: u32,
    pub button: u32,
    pub monitor: u32,
}

impl Default for IconSizes {
    fn default() -> Self {
        IconSizes {
            mode: 64,
            button: 48,
            monitor: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub sizes: IconSizes,
    pub threshold: u8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            sizes: IconSizes::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Where icon images come from.
pub trait IconSource {
    fn load(&self, file: &str, options: &ConvertOptions) -> Result<Bitmap, ConvertError>;
}

/// Icon files in a directory on disk.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: PathBuf) -> Self {
        info!("Reading icons from {}", root.display());
        DirectorySource { root }
    }
}

impl IconSource for DirectorySource {
    fn load(&self, file: &str, options: &ConvertOptions) -> Result<Bitmap, ConvertError> {
        bitmap::load(&self.root.join(file), options)
    }
}

/// Everything needed to render the icon header.
pub struct GeneratedHeader {
    pub sizes: IconSizes,
    pub modes: IconSet,
    /// Array of each mode, by mode index.
    pub mode_idents: Vec<String>,
    pub mode_entries: Vec<ModeEntry>,
    /// Button arrays, indexed by [`Button`].
    pub buttons: [IconSet; 3],
    pub monitors: IconSet,
    pub monitor_entries: Vec<MonitorEntry>,
}

pub struct Generator<S> {
    config: GeneratorConfig,
    source: S,
}

impl<S: IconSource> Generator<S> {
    pub fn new(config: GeneratorConfig, source: S) -> Self {
        Generator { config, source }
    }

    /// Converts every icon referenced by the tables.
    ///
    /// A missing or unreadable image never stops the run; its array is
    /// filled with zeros instead.
    pub fn run(&self, modes: &[ModeEntry], monitors: &[MonitorEntry]) -> GeneratedHeader {
        let sizes = self.config.sizes;
        let mut mode_set = IconSet::new("icon_mode_", sizes.mode);
        let mut buttons = [
            IconSet::new("icon_button_up_", sizes.button),
            IconSet::new("icon_button_mode_", sizes.button),
            IconSet::new("icon_button_down_", sizes.button),
        ];
        let mut monitor_set = IconSet::new("icon_monitor_", sizes.monitor);

        let mut mode_idents = Vec::with_capacity(modes.len());
        for (index, mode) in modes.iter().enumerate() {
            info!("[{index}] Processing: {}", mode.name);
            info!("    Mode icon: {} (rotation {})", mode.icon_file, mode.rotation.repr());
            let ident = self.convert_into(
                &mut mode_set,
                &mode.icon_file,
                mode.rotation,
                || format!("Mode {index}: {}", mode.name),
            );
            mode_idents.push(ident);

            for button in Button::iter() {
                if let Some(file) = mode.buttons.get(button) {
                    self.convert_into(&mut buttons[button as usize], file, Rotation::Rotate0, || {
                        format!("Button {}: {file}", button.name())
                    });
                }
            }
        }

        for (index, monitor) in monitors.iter().enumerate() {
            info!("[Monitor {index}] {}", monitor.name);
            for file in [true, false].into_iter().filter_map(|state| monitor.file(state)) {
                self.convert_into(&mut monitor_set, file, Rotation::Rotate0, || {
                    format!("Monitor: {file}")
                });
            }
        }

        GeneratedHeader {
            sizes,
            modes: mode_set,
            mode_idents,
            mode_entries: modes.to_vec(),
            buttons,
            monitors: monitor_set,
            monitor_entries: monitors.to_vec(),
        }
    }

    /// Converts `file` unless the set already holds it, and returns the
    /// identifier of its array.
    fn convert_into(
        &self,
        set: &mut IconSet,
        file: &str,
        rotation: Rotation,
        label: impl FnOnce() -> String,
    ) -> String {
        if let Some(array) = set.get(file, rotation) {
            info!("    {file}: reusing {}", array.ident);
            return array.ident.clone();
        }
        let options = ConvertOptions::new(set.size())
            .with_rotation(rotation)
            .with_threshold(self.config.threshold);
        let (bitmap, origin) = match self.source.load(file, &options) {
            Ok(bitmap) => {
                info!("    {file}: {} bytes", bitmap.as_bytes().len());
                (bitmap, Origin::Converted)
            }
            Err(err @ ConvertError::NotFound(_)) => {
                warn!("{err}, using an empty placeholder");
                (Bitmap::placeholder(set.size()), Origin::Missing)
            }
            Err(err) => {
                warn!("{err}, using an empty placeholder");
                (Bitmap::placeholder(set.size()), Origin::Unreadable)
            }
        };
        set.insert(file, rotation, label(), bitmap, origin)
            .ident
            .clone()
    }
}

impl GeneratedHeader {
    pub fn button_set(&self, button: Button) -> &IconSet {
        &self.buttons[button as usize]
    }

    pub fn render(&self) -> String {
        let sizes = self.sizes;
        let mut out = String::new();
        out.push_str("#pragma once\n\n");
        out.push_str("#include <cstdint>\n");
        out.push_str("#include <cstring>\n\n");
        out.push_str(emit::RULE);
        out.push_str("\n// Icon Bitmap Data (monochrome)\n");
        out.push_str(emit::RULE);
        out.push_str("\n// Auto-generated by iconforge\n");
        for (kind, size) in [("Mode", sizes.mode), ("Button", sizes.button), ("Monitor", sizes.monitor)] {
            out.push_str(&format!(
                "// {kind} icons: {size}x{size} pixels, 1 bit per pixel = {} bytes\n",
                Bitmap::byte_len(size)
            ));
        }
        out.push_str("// Format: MSB first, row by row, rows padded to whole bytes\n");
        out.push_str("//\n");
        out.push_str("// To draw: gfx->drawBitmap(x, y, icon_data, width, height, foreground_color);\n");
        out.push_str(emit::RULE);
        out.push_str("\n\n");

        emit::push_banner(
            &mut out,
            &format!("Mode Icon Bitmap Data ({0}x{0} monochrome)", sizes.mode),
        );
        for array in self.modes.arrays() {
            emit::push_array(&mut out, array);
        }

        emit::push_banner(
            &mut out,
            &format!("Button Icon Bitmap Data ({0}x{0} monochrome)", sizes.button),
        );
        for array in self.buttons.iter().flat_map(IconSet::arrays) {
            emit::push_array(&mut out, array);
        }

        emit::push_banner(
            &mut out,
            &format!("Monitor Icon Bitmap Data ({0}x{0} monochrome)", sizes.monitor),
        );
        for array in self.monitors.arrays() {
            emit::push_array(&mut out, array);
        }

        emit::push_banner(&mut out, "Icon Lookup Functions");
        let idents = self.mode_idents.iter().map(String::as_str).collect::<Vec<_>>();
        emit::push_index_lookup(
            &mut out,
            "Get mode icon data for a specific mode index",
            "getModeIcon",
            "mode_index",
            &idents,
        );

        for button in Button::iter() {
            let files = self
                .mode_entries
                .iter()
                .map(|m| m.buttons.get(button))
                .collect::<Vec<_>>();
            let function = match button {
                Button::Up => "getButtonUpIcon",
                Button::Mode => "getButtonModeIcon",
                Button::Down => "getButtonDownIcon",
            };
            emit::push_file_lookup(
                &mut out,
                &format!("Get button {} icon for a specific mode index", button.name()),
                function,
                "mode_index",
                &files,
                self.button_set(button),
            );
        }

        for (state, function) in [(true, "getMonitorIconTrue"), (false, "getMonitorIconFalse")] {
            let files = self
                .monitor_entries
                .iter()
                .map(|m| m.file(state))
                .collect::<Vec<_>>();
            emit::push_file_lookup(
                &mut out,
                &format!("Get monitor icon for {state} state"),
                function,
                "monitor_index",
                &files,
                &self.monitors,
            );
        }

        out.push_str("// Icon dimensions\n");
        out.push_str(&format!("constexpr int MODE_ICON_SIZE = {};\n", sizes.mode));
        out.push_str(&format!("constexpr int BUTTON_ICON_SIZE = {};\n", sizes.button));
        out.push_str(&format!("constexpr int MONITOR_ICON_SIZE = {};\n", sizes.monitor));
        out
    }

    pub fn summary(&self) -> Summary {
        let mut rows = vec![SummaryRow::new("Mode icons", &self.modes)];
        for button in Button::iter() {
            let label = match button {
                Button::Up => "Button up icons",
                Button::Mode => "Button mode icons",
                Button::Down => "Button down icons",
            };
            rows.push(SummaryRow::new(label, self.button_set(button)));
        }
        rows.push(SummaryRow::new("Monitor icons", &self.monitors));
        Summary { rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: &'static str,
    pub count: usize,
    pub size: u32,
    pub bytes: usize,
    pub placeholders: usize,
}

impl SummaryRow {
    fn new(label: &'static str, set: &IconSet) -> Self {
        SummaryRow {
            label,
            count: set.len(),
            size: set.size(),
            bytes: set.total_bytes(),
            placeholders: set
                .arrays()
                .iter()
                .filter(|a| a.origin != Origin::Converted)
                .count(),
        }
    }
}

/// Per category array counts and sizes of a generated header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn total_bytes(&self) -> usize {
        self.rows.iter().map(|r| r.bytes).sum()
    }

    pub fn placeholders(&self) -> usize {
        self.rows.iter().map(|r| r.placeholders).sum()
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.rows {
            writeln!(
                f,
                "{}: {} @ {2}x{2} = {3} bytes",
                row.label, row.count, row.size, row.bytes
            )?;
        }
        write!(f, "Total size: {} bytes", self.total_bytes())?;
        if self.placeholders() > 0 {
            write!(f, " ({} placeholders)", self.placeholders())?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Error {
    InvalidSize(u32),
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    Catalog {
        path: PathBuf,
        source: CatalogError,
    },
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidSize(size) => write!(f, "icon size must be at least 1, got {size}"),
            Error::ReadConfig { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Error::Catalog { path, source } => write!(f, "{}: {source}", path.display()),
            Error::WriteOutput { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidSize(_) => None,
            Error::ReadConfig { source, .. } | Error::WriteOutput { source, .. } => Some(source),
            Error::Catalog { source, .. } => Some(source),
        }
    }
}

/// Reads the config header, converts its icons from `icons` and writes the
/// generated header to `output`.
pub fn generate(
    config_path: &Path,
    icons: &Path,
    output: &Path,
    config: GeneratorConfig,
) -> Result<Summary, Error> {
    for size in [config.sizes.mode, config.sizes.button, config.sizes.monitor] {
        if size == 0 {
            return Err(Error::InvalidSize(size));
        }
    }

    info!("Parsing {}", config_path.display());
    let text = std::fs::read_to_string(config_path).map_err(|source| Error::ReadConfig {
        path: config_path.to_path_buf(),
        source,
    })?;
    let catalog_error = |source| Error::Catalog {
        path: config_path.to_path_buf(),
        source,
    };
    let modes = catalog::parse_mode_table(&text).map_err(catalog_error)?;
    info!("Found {} mode configurations", modes.len());
    let monitors = catalog::parse_monitor_table(&text).map_err(catalog_error)?;
    info!("Found {} monitor configurations", monitors.len());

    let generator = Generator::new(config, DirectorySource::new(icons.to_path_buf()));
    let header = generator.run(&modes, &monitors);
    emit::write_output(output, &header.render()).map_err(|source| Error::WriteOutput {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(header.summary())
}
