use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use grayhuff::codec::{compress_file, decompress_file};
use grayhuff::raster::{ImageBackend, ImageCrateBackend};

/// Compress an image with a per-image Huffman code, then rebuild it
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
  /// Image to compress (any format the image crate can read)
  #[clap(parse(from_os_str))]
  input: PathBuf,

  /// Where to write the compressed container
  #[clap(parse(from_os_str))]
  compressed: PathBuf,

  /// Where to write the image reconstructed from the container
  #[clap(parse(from_os_str))]
  reconstructed: PathBuf,

  /// Show the original and reconstructed images in the terminal
  #[clap(short = 'd', long = "display")]
  display: bool,

  /// Widest rendering, in terminal columns
  #[clap(long = "max-width", default_value_t = ImageCrateBackend::DEFAULT_MAX_WIDTH)]
  max_width: usize,

  /// Sets verbosity. -v0 is silent, -v5 is chatty
  #[clap(short = 'v', default_value_t = 3)]
  verbosity: u8,
}

fn level_for(verbosity: u8) -> LevelFilter {
  match verbosity {
    0 => LevelFilter::Off,
    1 => LevelFilter::Error,
    2 => LevelFilter::Warn,
    3 => LevelFilter::Info,
    4 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  }
}

fn main() {
  let args = Args::parse();

  if let Err(e) = TermLogger::init(
    level_for(args.verbosity),
    Config::default(),
    TerminalMode::Stderr,
    ColorChoice::Auto,
  ) {
    eprintln!("Could not start logger: {}", e);
  }

  let backend = ImageCrateBackend::new(args.max_width);

  let stats = match compress_file(&backend, &args.input, &args.compressed) {
    Ok(stats) => stats,
    Err(e) => {
      error!("Compressing {} failed: {}", args.input.display(), e);
      process::exit(1);
    }
  };
  info!("Compression summary:\n{}", stats);

  let reconstructed = match decompress_file(&backend, &args.compressed, &args.reconstructed) {
    Ok(raster) => raster,
    Err(e) => {
      error!("Decompressing {} failed: {}", args.compressed.display(), e);
      process::exit(1);
    }
  };

  if args.display {
    match backend.load(&args.input) {
      Ok(original) => {
        println!("Original: {}", args.input.display());
        backend.display(&original);
      }
      Err(e) => error!("Could not reload {}: {}", args.input.display(), e),
    }
    println!("Reconstructed: {}", args.reconstructed.display());
    backend.display(&reconstructed);
  }
}
