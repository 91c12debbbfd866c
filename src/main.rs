use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use phototune::options::Options;
use phototune::viewer::Viewer;

/// Layered photo adjustment viewer.
#[derive(Parser, Debug)]
#[command(name = "phototune", version, about)]
struct Cli {
    /// TOML options file.
    #[arg(short, long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Images to load as layers, bottom first.
    #[arg(value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

impl Cli {
    fn load_options(&self) -> Result<Options, phototune::PhotoTuneError> {
        self.options
            .as_deref()
            .map_or_else(|| Ok(Options::default()), Options::load)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let cli = Cli::parse();
    let options = match cli.load_options() {
        Ok(options) => options,
        Err(e) => {
            log::error!("failed to load options: {e}");
            return ExitCode::FAILURE;
        }
    };

    let viewer = Viewer::builder()
        .with_options(options)
        .with_files(cli.images)
        .build();
    if let Err(e) = viewer.run() {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
