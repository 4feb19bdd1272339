pub mod reader;

pub use reader::ContainerReadError;

use crate::bitpack::{unpack, PackedBits};
use crate::huff_tree::{FrequencyTable, HuffmanTree, Symbol};

use bitstream_io::{BigEndian, ByteWrite, ByteWriter};
use serde::Serialize;
use std::convert::TryFrom;
use std::fmt::{self, Write};
use std::io::{self, ErrorKind, Write as IOWrite};

/* On-disk layout, all integers big-endian

   +---+---+---+---+---+---+=============================+=============+
   | WIDTH | HEIGHT| NENTRY|...NENTRY x (SYM, COUNT32)...|...payload...|
   +---+---+---+---+---+---+=============================+=============+

   Each table entry is 5 bytes:

   +---+---+---+---+---+
   |SYM|     COUNT     |
   +---+---+---+---+---+

   Entries are strictly ascending by SYM and COUNT is never zero. The payload
   is the MSB-first concatenation of per-pixel codes in row-major order,
   zero-padded to a whole byte.
*/

/// Size of WIDTH + HEIGHT + NENTRY
pub const FIXED_HEADER_LEN: usize = 6;
/// Size of one (SYM, COUNT) table entry
pub const TABLE_ENTRY_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
  width: u16,
  height: u16,
  freqs: FrequencyTable,
  payload: Vec<u8>,
}

impl Container {
  pub fn new(width: u16, height: u16, freqs: FrequencyTable, packed: PackedBits) -> Self {
    Self {
      width,
      height,
      freqs,
      payload: packed.bytes,
    }
  }

  pub fn width(&self) -> u16 {
    self.width
  }

  pub fn height(&self) -> u16 {
    self.height
  }

  pub fn pixel_count(&self) -> usize {
    usize::from(self.width) * usize::from(self.height)
  }

  pub fn freqs(&self) -> &FrequencyTable {
    &self.freqs
  }

  pub fn payload(&self) -> &[u8] {
    &self.payload
  }

  /// Total size of the serialized container in bytes
  pub fn encoded_len(&self) -> usize {
    FIXED_HEADER_LEN + TABLE_ENTRY_LEN * self.freqs.len() + self.payload.len()
  }

  /// Rebuild the Huffman tree from the stored frequencies
  pub fn tree(&self) -> Result<HuffmanTree, ContainerReadError> {
    Ok(HuffmanTree::build(&self.freqs)?)
  }

  /// Check that width * height agrees with the frequency table
  fn check_pixel_count(&self) -> Result<(), ContainerReadError> {
    let declared = self.pixel_count();
    let table = self.freqs.total();
    if declared != table {
      return Err(ContainerReadError::PixelCountMismatch { declared, table });
    }
    Ok(())
  }

  /// Check that the payload holds exactly the bits the table calls for
  fn check_payload(&self, tree: &HuffmanTree) -> Result<(), ContainerReadError> {
    let nbits = tree.encoded_bit_len(&self.freqs);
    let expected = (nbits + 7) / 8;
    if self.payload.len() != expected {
      return Err(ContainerReadError::PayloadLengthMismatch {
        expected,
        actual: self.payload.len(),
      });
    }
    Ok(())
  }

  /// Decode the payload into width * height pixels in row-major order
  pub fn decode_pixels(&self) -> Result<Vec<Symbol>, ContainerReadError> {
    self.check_pixel_count()?;
    let tree = self.tree()?;
    self.check_payload(&tree)?;
    Ok(unpack(&self.payload, &tree, self.pixel_count())?)
  }

  pub fn write_to<W: IOWrite>(&self, out: W) -> io::Result<W> {
    let mut bytesout: ByteWriter<W, BigEndian> = ByteWriter::new(out);
    bytesout.write(self.width)?;
    bytesout.write(self.height)?;
    bytesout.write(u16::try_from(self.freqs.len()).map_err(invalid_input)?)?;
    for (sym, ct) in self.freqs.iter() {
      bytesout.write(sym)?;
      bytesout.write(u32::try_from(ct).map_err(invalid_input)?)?;
    }
    bytesout.write_bytes(&self.payload[..])?;
    Ok(bytesout.into_writer())
  }

  pub fn fmt_header<W: Write>(&self, f: &mut W) -> fmt::Result {
    write!(
      f,
      r#"Container:
   +---+---+---+---+---+---+
   | WIDTH | HEIGHT| NENTRY|
   +---+---+---+---+---+---+
    {:>6} {:>6}  {:>6}
"#,
      self.width,
      self.height,
      self.freqs.len()
    )?;
    writeln!(f, "Pixels: {}", self.pixel_count())?;
    writeln!(f, "Payload: {} bytes", self.payload.len())
  }

  pub fn fmt_table<W: Write>(&self, f: &mut W) -> fmt::Result {
    let mut i = 0usize;
    write!(f, "Frequencies: [")?;
    for (sym, ct) in self.freqs.iter() {
      if i % 8 == 0 {
        writeln!(f)?;
      }
      write!(f, "{:>3}:{:<8} ", sym, ct)?;
      i += 1;
    }
    writeln!(f)?;
    writeln!(f, "];")
  }
}

fn invalid_input<E: std::error::Error>(e: E) -> io::Error {
  io::Error::new(ErrorKind::InvalidInput, e.to_string())
}

impl fmt::Display for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_header(f)?;
    self.fmt_table(f)
  }
}
