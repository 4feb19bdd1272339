use std::env;
use std::process;

use grayhuff::codec::{decompress, read_container, CompressionStats};
use grayhuff::raster::{ImageBackend, ImageCrateBackend};

fn main() {
  let args: Vec<String> = env::args().collect();

  if args.len() < 2 || args.len() > 3 {
    println!("Usage: {} <container> [show]", &args[0]);
    println!("\tDisplays information about a compressed image");
    println!("\t[show] also decodes the image and draws it in the terminal");
    process::exit(1);
  }

  let container = read_container(args[1].as_ref()).unwrap_or_else(|e| {
    println!("{}", e);
    process::exit(1);
  });
  println!("{}", container);

  let tree = container.tree().unwrap_or_else(|e| {
    println!("{}", e);
    process::exit(1);
  });
  println!("Codes:");
  for (sym, code) in tree.codes().iter() {
    let bits: String = code.iter().map(|b| if b { '1' } else { '0' }).collect();
    println!("  {:>3} x{:<8} {}", sym, container.freqs().get(sym), bits);
  }

  match CompressionStats::from_container(&container) {
    Ok(stats) => print!("{}", stats),
    Err(e) => println!("Could not compute statistics: {}", e),
  }

  if args.get(2).map(|x| &x[..]) == Some("show") {
    match decompress(&container) {
      Ok(raster) => ImageCrateBackend::default().display(&raster),
      Err(e) => {
        println!("{}", e);
        process::exit(1);
      }
    }
  }
}
