use std::path::{Path, PathBuf};

use image::{
    DynamicImage, GrayImage, ImageError, Luma, Rgb,
    imageops::{self, FilterType},
};
use log::{debug, trace};

pub const DEFAULT_THRESHOLD: u8 = 128;

/// Icon rotation in quarter turns, counter-clockwise.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumIter,
    strum_macros::FromRepr,
)]
pub enum Rotation {
    #[default]
    Rotate0 = 0,
    Rotate90 = 1,
    Rotate180 = 2,
    Rotate270 = 3,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        self as u32 * 90
    }

    pub fn repr(self) -> &'static str {
        match self {
            Rotation::Rotate0 => "0°",
            Rotation::Rotate90 => "90°",
            Rotation::Rotate180 => "180°",
            Rotation::Rotate270 => "270°",
        }
    }

    /// Rotates the plane in place of its square canvas.
    ///
    /// Quarter turns of a square are exact, nothing is clipped or resampled.
    pub fn apply(self, plane: &GrayImage) -> GrayImage {
        match self {
            Rotation::Rotate0 => plane.clone(),
            Rotation::Rotate90 => imageops::rotate270(plane),
            Rotation::Rotate180 => imageops::rotate180(plane),
            Rotation::Rotate270 => imageops::rotate90(plane),
        }
    }
}

/// Parameters of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Width and height of the output bitmap.
    pub size: u32,
    pub rotation: Rotation,
    /// Pixels strictly brighter than this are set.
    pub threshold: u8,
    /// Flip every pixel after thresholding.
    pub invert: bool,
}

impl ConvertOptions {
    pub fn new(size: u32) -> Self {
        ConvertOptions {
            size,
            rotation: Rotation::Rotate0,
            threshold: DEFAULT_THRESHOLD,
            invert: false,
        }
    }

    pub fn with_rotation(self, rotation: Rotation) -> Self {
        ConvertOptions { rotation, ..self }
    }

    pub fn with_threshold(self, threshold: u8) -> Self {
        ConvertOptions { threshold, ..self }
    }

    pub fn with_invert(self, invert: bool) -> Self {
        ConvertOptions { invert, ..self }
    }
}

/// A 1 bit per pixel image.
///
/// Pixels are packed 8 per byte, MSB first, row by row. Every row starts on a
/// byte boundary; the unused low bits of a row's last byte are always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn row_stride(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    /// Bytes needed for a `size` x `size` bitmap.
    pub fn byte_len(size: u32) -> usize {
        size as usize * Self::row_stride(size)
    }

    /// The all-zero stand-in for an icon that could not be loaded.
    pub fn placeholder(size: u32) -> Self {
        Bitmap {
            width: size,
            height: size,
            data: vec![0u8; Self::byte_len(size)],
        }
    }

    /// Thresholds an intensity plane and packs the result.
    pub fn from_plane(plane: &GrayImage, threshold: u8, invert: bool) -> Self {
        let (width, height) = plane.dimensions();
        let stride = Self::row_stride(width);
        let mut data = vec![0u8; stride * height as usize];
        for (x, y, pixel) in plane.enumerate_pixels() {
            let on = (pixel[0] > threshold) != invert;
            if on {
                let byte_index = y as usize * stride + (x as usize / 8);
                let bit_index = 7 - (x % 8);
                data[byte_index] |= 1 << bit_index;
            }
        }
        Bitmap {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.data[y as usize * Self::row_stride(self.width) + (x as usize / 8)];
        (byte >> (7 - (x % 8))) & 0x01 != 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}

/// Reduces an image to one intensity channel.
///
/// Icons are drawn as opaque shapes on a transparent background, so when the
/// image has an alpha channel the alpha is the intensity: opaque is bright,
/// transparent is dark. Otherwise the ITU-R 601-2 luma of the color is used.
pub fn intensity_plane(image: &DynamicImage) -> GrayImage {
    if image.color().has_alpha() {
        let luma_alpha = image.to_luma_alpha8();
        GrayImage::from_fn(luma_alpha.width(), luma_alpha.height(), |x, y| {
            Luma([luma_alpha.get_pixel(x, y)[1]])
        })
    } else {
        let rgb = image.to_rgb8();
        GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| Luma([luma(rgb.get_pixel(x, y))]))
    }
}

/// `L = R * 299/1000 + G * 587/1000 + B * 114/1000`
fn luma(&Rgb([r, g, b]): &Rgb<u8>) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Converts a decoded image into a `size` x `size` bitmap.
pub fn convert(image: &DynamicImage, options: &ConvertOptions) -> Bitmap {
    let size = options.size;
    if size == 0 {
        return Bitmap::placeholder(0);
    }
    let plane = intensity_plane(image);
    let plane = if plane.dimensions() == (size, size) {
        plane
    } else {
        trace!(
            "Resizing {}x{} -> {size}x{size}",
            plane.width(),
            plane.height()
        );
        imageops::resize(&plane, size, size, FilterType::Lanczos3)
    };
    let plane = options.rotation.apply(&plane);
    Bitmap::from_plane(&plane, options.threshold, options.invert)
}

#[derive(Debug)]
pub enum ConvertError {
    /// The image file does not exist.
    NotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Decode {
        path: PathBuf,
        source: ImageError,
    },
}

impl ConvertError {
    fn from_image_error(path: &Path, error: ImageError) -> Self {
        match error {
            ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ConvertError::NotFound(path.to_path_buf())
            }
            ImageError::IoError(source) => ConvertError::Io {
                path: path.to_path_buf(),
                source,
            },
            source => ConvertError::Decode {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConvertError::NotFound(_))
    }
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::NotFound(path) => write!(f, "icon file not found: {}", path.display()),
            ConvertError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConvertError::Decode { path, source } => {
                write!(f, "failed to decode {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::NotFound(_) => None,
            ConvertError::Io { source, .. } => Some(source),
            ConvertError::Decode { source, .. } => Some(source),
        }
    }
}

/// Opens an image file and converts it.
pub fn load(path: &Path, options: &ConvertOptions) -> Result<Bitmap, ConvertError> {
    let image = image::open(path).map_err(|e| ConvertError::from_image_error(path, e))?;
    debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(convert(&image, options))
}

#[cfg(test)]
mod tests {
    use image::{GrayAlphaImage, LumaA, RgbImage, Rgba, RgbaImage};
    use strum::IntoEnumIterator;

    use super::*;

    fn white(size: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([255, 255, 255])))
    }

    /// A shape without any rotational symmetry.
    fn corner_mark(size: u32) -> DynamicImage {
        let plane = GrayImage::from_fn(size, size, |x, y| {
            if (y == 0 && x < size / 2) || (x == 0 && y < size / 4) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        DynamicImage::ImageLuma8(plane)
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgba([v, 255 - v, v / 2, v])
        }))
    }

    #[test]
    fn white_square_packs_to_ff() {
        let bitmap = convert(&white(8), &ConvertOptions::new(8));
        assert_eq!(bitmap.as_bytes(), &[0xFF; 8]);
    }

    #[test]
    fn byte_len_matches_size() {
        let source = gradient(40, 30);
        for size in 1..=64 {
            for threshold in [0, 64, 128, 255] {
                let options = ConvertOptions::new(size).with_threshold(threshold);
                let bitmap = convert(&source, &options);
                assert_eq!(bitmap.as_bytes().len(), size as usize * (size as usize).div_ceil(8));
                assert_eq!(bitmap.as_bytes().len(), Bitmap::byte_len(size));
            }
        }
    }

    #[test]
    fn row_padding_stays_zero() {
        let bitmap = convert(&white(10), &ConvertOptions::new(10));
        assert_eq!(bitmap.as_bytes().len(), 20);
        for row in bitmap.as_bytes().chunks(2) {
            assert_eq!(row, &[0xFF, 0xC0]);
        }
    }

    #[test]
    fn inverted_padding_stays_zero() {
        let black = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        let options = ConvertOptions::new(10).with_invert(true);
        let bitmap = convert(&black, &options);
        for row in bitmap.as_bytes().chunks(2) {
            assert_eq!(row, &[0xFF, 0xC0]);
        }
        assert!(convert(&white(10), &options).is_blank());
    }

    #[test]
    fn transparent_is_blank() {
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 0])));
        for size in [8, 16, 24, 13] {
            for threshold in [1, 50, 128, 255] {
                let options = ConvertOptions::new(size).with_threshold(threshold);
                assert!(convert(&clear, &options).is_blank());
            }
        }
    }

    #[test]
    fn alpha_is_intensity() {
        // Black but opaque: the alpha channel decides, not the color.
        let opaque_black = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        assert_eq!(convert(&opaque_black, &ConvertOptions::new(8)).as_bytes(), &[0xFF; 8]);

        let luma_alpha = DynamicImage::ImageLumaA8(GrayAlphaImage::from_pixel(8, 8, LumaA([0, 200])));
        assert_eq!(convert(&luma_alpha, &ConvertOptions::new(8)).as_bytes(), &[0xFF; 8]);
    }

    #[test]
    fn color_uses_601_luma() {
        let salmon = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 80, 80])));
        assert!(intensity_plane(&salmon).pixels().all(|p| p[0] == 132));
        assert_eq!(convert(&salmon, &ConvertOptions::new(8)).as_bytes(), &[0xFF; 8]);

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([77])));
        assert!(intensity_plane(&gray).pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn threshold_is_strict() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([128])));
        assert!(convert(&gray, &ConvertOptions::new(8).with_threshold(128)).is_blank());
        assert_eq!(
            convert(&gray, &ConvertOptions::new(8).with_threshold(127)).as_bytes(),
            &[0xFF; 8]
        );
    }

    #[test]
    fn msb_is_leftmost_pixel() {
        let dot = DynamicImage::ImageLuma8(GrayImage::from_fn(8, 2, |x, y| {
            Luma([if x == 0 && y == 1 { 255 } else { 0 }])
        }));
        let bitmap = Bitmap::from_plane(&dot.to_luma8(), 128, false);
        assert_eq!(bitmap.as_bytes(), &[0x00, 0x80]);
        assert!(bitmap.pixel(0, 1));
        assert!(!bitmap.pixel(1, 1));
    }

    #[test]
    fn rotation_zero_is_identity() {
        let source = corner_mark(16);
        let options = ConvertOptions::new(16);
        let plain = Bitmap::from_plane(&source.to_luma8(), 128, false);
        assert_eq!(convert(&source, &options), plain);
        assert_eq!(Rotation::Rotate0.apply(&source.to_luma8()), source.to_luma8());
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        let source = corner_mark(8);
        let options = ConvertOptions::new(8).with_rotation(Rotation::Rotate90);
        let bitmap = convert(&source, &options);
        // The top edge becomes the left edge, read from the bottom up.
        assert!(bitmap.pixel(0, 7));
        assert!(bitmap.pixel(0, 4));
        assert!(!bitmap.pixel(0, 3));
        // Nothing lands in the top right corner.
        assert!(!bitmap.pixel(7, 0));
    }

    #[test]
    fn four_quarter_turns_restore() {
        for size in [8, 12, 16, 24] {
            let mut plane = corner_mark(size).to_luma8();
            for _ in 0..4 {
                plane = Rotation::Rotate90.apply(&plane);
            }
            assert_eq!(plane, corner_mark(size).to_luma8());
        }
    }

    #[test]
    fn packed_rotation_matches_plane_rotation() {
        let source = corner_mark(12);
        for rotation in Rotation::iter() {
            let options = ConvertOptions::new(12).with_rotation(rotation);
            let turned = rotation.apply(&source.to_luma8());
            assert_eq!(
                convert(&source, &options),
                Bitmap::from_plane(&turned, 128, false),
                "{}",
                rotation.repr()
            );
        }
    }

    #[test]
    fn resize_keeps_solid_fill() {
        let bitmap = convert(&white(100), &ConvertOptions::new(24));
        assert_eq!(bitmap.as_bytes(), &[0xFF; 72][..]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let error = load(Path::new("does/not/exist.png"), &ConvertOptions::new(8)).unwrap_err();
        assert!(error.is_not_found(), "{error}");
    }

    #[test]
    fn garbage_file_is_not_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let error = load(&path, &ConvertOptions::new(8)).unwrap_err();
        assert!(!error.is_not_found(), "{error}");
    }

    #[test]
    fn load_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        white(16).save(&path).unwrap();
        let bitmap = load(&path, &ConvertOptions::new(8)).unwrap();
        assert_eq!(bitmap.as_bytes(), &[0xFF; 8]);
    }

    #[test]
    fn rotation_from_repr() {
        assert_eq!(Rotation::from_repr(3), Some(Rotation::Rotate270));
        assert_eq!(Rotation::from_repr(4), None);
        assert_eq!(Rotation::Rotate180.degrees(), 180);
    }
}
