use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use iconforge_core::{ConvertError, ConvertOptions, Rotation, bitmap, emit};
use log::{debug, error};

#[derive(FromArgs)]
/// Converts a single image into a 1-bit bitmap array in a C++ header.
struct Args {
    /// input image path
    #[argh(positional)]
    input: PathBuf,

    /// identifier of the generated array
    #[argh(option, short = 'n')]
    name: String,

    /// width and height of the bitmap in pixels
    #[argh(option, short = 's', default = "32")]
    size: u32,

    /// brightness above which a pixel is set (0-255)
    #[argh(option, short = 't', default = "128")]
    threshold: u8,

    /// counter-clockwise quarter turns (0-3)
    #[argh(option, short = 'r', default = "0")]
    rotation: u8,

    /// output header path, printed to stdout when omitted
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// flip every pixel
    #[argh(switch)]
    invert: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum Error {
    InvalidName(String),
    InvalidSize,
    InvalidRotation(u8),
    InputNotFound(PathBuf),
    Convert(ConvertError),
    Write { path: PathBuf, source: std::io::Error },
}

impl From<ConvertError> for Error {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::NotFound(path) => Error::InputNotFound(path),
            err => Error::Convert(err),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidName(name) => write!(f, "{name:?} is not a valid C identifier"),
            Error::InvalidSize => write!(f, "size must be at least 1"),
            Error::InvalidRotation(steps) => {
                write!(f, "rotation must be 0-3 quarter turns, got {steps}")
            }
            Error::InputNotFound(path) => write!(f, "input file not found: {}", path.display()),
            Error::Convert(err) => write!(f, "{err}"),
            Error::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    if !emit::is_identifier(&args.name) {
        return Err(Error::InvalidName(args.name.clone()));
    }
    if args.size == 0 {
        return Err(Error::InvalidSize);
    }
    let rotation =
        Rotation::from_repr(args.rotation).ok_or(Error::InvalidRotation(args.rotation))?;

    let options = ConvertOptions::new(args.size)
        .with_rotation(rotation)
        .with_threshold(args.threshold)
        .with_invert(args.invert);
    debug!("{options:?}");
    let bitmap = bitmap::load(&args.input, &options)?;

    let source = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());
    let text = emit::render_single(&args.name, &bitmap, &source, &options);
    match &args.output {
        Some(path) => emit::write_output(path, &text).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?,
        None => print!("{text}"),
    }

    let set = bitmap.as_bytes().iter().map(|b| b.count_ones() as u64).sum::<u64>();
    eprintln!(
        "{} -> {}: {}x{}, {} bytes, {} of {} pixels set",
        args.input.display(),
        args.name,
        bitmap.width(),
        bitmap.height(),
        bitmap.as_bytes().len(),
        set,
        pixel_count(bitmap.width(), bitmap.height())
    );
    Ok(())
}

fn pixel_count(width: u32, height: u32) -> u64 {
    width as u64 * height as u64
}
