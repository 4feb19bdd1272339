use std::collections::BTreeMap;
use std::{env, fs, process};

use serde::Serialize;

use grayhuff::codec::{read_container, CodecError, CompressionStats};
use grayhuff::container::Container;

#[derive(Serialize)]
struct Dump<'a> {
  container: &'a Container,
  code_lengths: BTreeMap<u8, usize>,
  stats: CompressionStats,
}

fn dump(container: &Container) -> Result<Dump<'_>, CodecError> {
  let tree = container.tree()?;
  Ok(Dump {
    container,
    code_lengths: tree.codes().lengths(),
    stats: CompressionStats::from_container(container)?,
  })
}

fn main() {
  let args: Vec<String> = env::args().collect();

  if args.len() != 3 {
    println!("Usage: {} <container-in> <json-out>", &args[0]);
    println!("\tDumps a JSON representation of a compressed image for further examination");
    process::exit(1);
  }

  let container = read_container(args[1].as_ref()).unwrap_or_else(|e| {
    println!("{}", e);
    process::exit(1);
  });
  let dumped = dump(&container).unwrap_or_else(|e| {
    println!("{}", e);
    process::exit(1);
  });
  let json_string = serde_json::to_string(&dumped).unwrap_or_else(|e| {
    println!("Could not serialize container: {}", e);
    process::exit(1);
  });

  if let Err(e) = fs::write(&args[2], json_string) {
    println!("Could not write {}: {}", args[2], e);
    process::exit(1);
  }
  println!("Output written to {}", args[2]);
}
