use super::Container;
use crate::bitpack::UnpackError;
use crate::huff_tree::{FrequencyTable, HuffTreeError, Symbol};

use bitstream_io::{BigEndian, ByteRead, ByteReader};
use log::debug;
use std::io::{self, BufReader, ErrorKind, Read};
use thiserror::Error;

/// Everything that makes a container unreadable
#[derive(Error, Debug)]
pub enum ContainerReadError {
  #[error("Container ended while reading the {0} field")]
  Truncated(&'static str),
  #[error("Frequency table must have between 1 and 256 entries, header says {0}")]
  BadEntryCount(u16),
  #[error("Frequency table entry for symbol {0} has a zero count")]
  ZeroCount(Symbol),
  #[error("Frequency table symbols out of order: {found} follows {previous}")]
  UnorderedSymbols { previous: Symbol, found: Symbol },
  #[error("Pixel count mismatch: width x height is {declared} but the frequency table sums to {table}")]
  PixelCountMismatch { declared: usize, table: usize },
  #[error("Payload length mismatch: expected {expected} bytes but container has {actual}")]
  PayloadLengthMismatch { expected: usize, actual: usize },
  #[error("Could not rebuild Huffman tree: {0}")]
  Tree(#[from] HuffTreeError),
  #[error("Payload is corrupt: {0}")]
  Unpack(#[from] UnpackError),
  #[error("File Read Error: {0}")]
  IOError(#[from] io::Error),
}

/// Map an early EOF onto the name of the field being read
fn field_err(field: &'static str) -> impl Fn(io::Error) -> ContainerReadError {
  move |e| {
    if e.kind() == ErrorKind::UnexpectedEof {
      ContainerReadError::Truncated(field)
    } else {
      ContainerReadError::IOError(e)
    }
  }
}

impl Container {
  /// Parse and validate a container from its on-disk bytes
  pub fn new_from_container_data<R: Read>(data: R) -> Result<Self, ContainerReadError> {
    let mut buf_rdr = BufReader::new(data);
    let mut bytes_src = ByteReader::endian(&mut buf_rdr, BigEndian);

    let width = bytes_src.read::<u16>().map_err(field_err("width"))?;
    let height = bytes_src.read::<u16>().map_err(field_err("height"))?;
    let nentry = bytes_src.read::<u16>().map_err(field_err("entry count"))?;
    if nentry == 0 || nentry > 256 {
      return Err(ContainerReadError::BadEntryCount(nentry));
    }

    let mut entries = Vec::with_capacity(usize::from(nentry));
    let mut previous: Option<Symbol> = None;
    for _ in 0..nentry {
      let sym = bytes_src.read::<u8>().map_err(field_err("table symbol"))?;
      let ct = bytes_src.read::<u32>().map_err(field_err("table count"))?;
      if ct == 0 {
        return Err(ContainerReadError::ZeroCount(sym));
      }
      if let Some(prev) = previous {
        if sym <= prev {
          return Err(ContainerReadError::UnorderedSymbols {
            previous: prev,
            found: sym,
          });
        }
      }
      previous = Some(sym);
      entries.push((sym, ct as usize));
    }
    let freqs = FrequencyTable::from_counts(entries);

    // Everything after the table is payload
    let mut payload = Vec::new();
    buf_rdr.read_to_end(&mut payload)?;
    debug!(
      "Read {}x{} container with {} table entries and {} payload bytes",
      width,
      height,
      nentry,
      payload.len()
    );

    let container = Container {
      width,
      height,
      freqs,
      payload,
    };
    container.check_pixel_count()?;
    let tree = container.tree()?;
    container.check_payload(&tree)?;
    Ok(container)
  }
}

#[cfg(test)]
mod tests {
  use super::super::tests::container_for;
  use super::*;

  fn read(bytes: &[u8]) -> Result<Container, ContainerReadError> {
    Container::new_from_container_data(bytes)
  }

  fn scenario_bytes() -> Vec<u8> {
    container_for(2, 2, &[10, 10, 20, 30])
      .write_to(Vec::new())
      .unwrap()
  }

  #[test]
  fn reads_back_what_was_written() {
    let c = container_for(3, 2, &[0, 255, 0, 128, 128, 128]);
    let bytes = c.write_to(Vec::new()).unwrap();
    let rt = read(&bytes).unwrap();
    assert_eq!(rt, c);
    assert_eq!(rt.decode_pixels().unwrap(), vec![0, 255, 0, 128, 128, 128]);
  }

  #[test]
  fn truncation_names_the_field() {
    let bytes = scenario_bytes();
    let cases: &[(usize, &str)] = &[
      (0, "width"),
      (1, "width"),
      (3, "height"),
      (5, "entry count"),
      (6, "table symbol"),
      (8, "table count"),
      (16, "table symbol"),
    ];
    for (len, field) in cases {
      match read(&bytes[..*len]) {
        Err(ContainerReadError::Truncated(f)) => assert_eq!(f, *field, "cut at {}", len),
        other => panic!("cut at {}: expected truncation, got {:?}", len, other),
      }
    }
  }

  #[test]
  fn missing_payload_is_rejected() {
    let bytes = scenario_bytes();
    match read(&bytes[..bytes.len() - 1]) {
      Err(ContainerReadError::PayloadLengthMismatch {
        expected: 1,
        actual: 0,
      }) => {}
      other => panic!("Expected payload length mismatch, got {:?}", other),
    }
  }

  #[test]
  fn trailing_bytes_are_rejected() {
    let mut bytes = scenario_bytes();
    bytes.push(0xff);
    match read(&bytes) {
      Err(ContainerReadError::PayloadLengthMismatch {
        expected: 1,
        actual: 2,
      }) => {}
      other => panic!("Expected payload length mismatch, got {:?}", other),
    }
  }

  #[test]
  fn bad_entry_counts() {
    let mut bytes = scenario_bytes();
    bytes[4] = 0;
    bytes[5] = 0;
    assert!(matches!(read(&bytes), Err(ContainerReadError::BadEntryCount(0))));
    bytes[4] = 1;
    bytes[5] = 1;
    assert!(matches!(read(&bytes), Err(ContainerReadError::BadEntryCount(257))));
  }

  #[test]
  fn zero_count_is_rejected() {
    let mut bytes = scenario_bytes();
    // Count of symbol 20
    bytes[15] = 0;
    assert!(matches!(read(&bytes), Err(ContainerReadError::ZeroCount(20))));
  }

  #[test]
  fn unordered_symbols_are_rejected() {
    let mut bytes = scenario_bytes();
    // Swap symbols 20 and 30
    bytes[11] = 30;
    bytes[16] = 20;
    assert!(matches!(
      read(&bytes),
      Err(ContainerReadError::UnorderedSymbols {
        previous: 30,
        found: 20
      })
    ));
  }

  #[test]
  fn pixel_count_must_match_table() {
    let mut bytes = scenario_bytes();
    // Declare 3x2 instead of 2x2
    bytes[1] = 3;
    assert!(matches!(
      read(&bytes),
      Err(ContainerReadError::PixelCountMismatch {
        declared: 6,
        table: 4
      })
    ));
  }

  #[test]
  fn error_messages_carry_context() {
    let err = ContainerReadError::PixelCountMismatch {
      declared: 6,
      table: 4,
    };
    assert_eq!(
      err.to_string(),
      "Pixel count mismatch: width x height is 6 but the frequency table sums to 4"
    );
    assert_eq!(
      ContainerReadError::Truncated("height").to_string(),
      "Container ended while reading the height field"
    );
  }
}
