//! Converts firmware icon images into packed 1-bit bitmaps and emits them as
//! a C++ header of `constexpr` arrays with index based lookup functions.

pub mod bitmap;
pub mod catalog;
pub mod emit;
pub mod pipeline;

pub use bitmap::{Bitmap, ConvertError, ConvertOptions, Rotation};
pub use catalog::{Button, ButtonFiles, CatalogError, ModeEntry, MonitorEntry};
pub use pipeline::{
    DirectorySource, Error, GeneratedHeader, Generator, GeneratorConfig, IconSizes, IconSource,
    Summary, generate,
};
