use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use iconforge_core::{GeneratorConfig, IconSizes};
use log::{error, info};

#[derive(FromArgs)]
/// Converts the icons named in the firmware config header into 1-bit bitmap
/// arrays and writes them to a C++ header.
struct Args {
    /// config header holding MODE_CONFIGS and MONITOR_CONFIGS
    #[argh(option, short = 'c', default = "PathBuf::from(\"main/config.hpp\")")]
    config: PathBuf,

    /// directory the icon file names are relative to
    #[argh(option, short = 'i', default = "PathBuf::from(\"icons\")")]
    icons: PathBuf,

    /// generated header, replaced on every run
    #[argh(option, short = 'o', default = "PathBuf::from(\"main/assets/icons.hpp\")")]
    output: PathBuf,

    /// edge length of mode icons in pixels
    #[argh(option, default = "64")]
    mode_size: u32,

    /// edge length of button icons in pixels
    #[argh(option, default = "48")]
    button_size: u32,

    /// edge length of status bar monitor icons in pixels
    #[argh(option, default = "24")]
    monitor_size: u32,

    /// brightness above which a pixel is set (0-255)
    #[argh(option, short = 't', default = "128")]
    threshold: u8,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let args: Args = argh::from_env();
    let config = GeneratorConfig {
        sizes: IconSizes {
            mode: args.mode_size,
            button: args.button_size,
            monitor: args.monitor_size,
        },
        threshold: args.threshold,
    };

    match iconforge_core::generate(&args.config, &args.icons, &args.output, config) {
        Ok(summary) => {
            for line in summary.to_string().lines() {
                info!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
