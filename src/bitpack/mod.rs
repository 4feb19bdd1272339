/*! Bit-level packing of prefix codes into bytes, and the tree walk that
undoes it.

Codes are written MSB-first and the final byte is padded with zeros. The
padding is indistinguishable from code bits, so the unpacker is always told
how many symbols to produce and stops there.
*/

use crate::huff_tree::{Code, HuffmanTree, Node, Symbol};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
  #[error("Symbol {0} has no code in the code table")]
  MissingCode(Symbol),
  #[error("Other IO error: {0}")]
  IOError(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UnpackError {
  #[error("Payload ran out of bits: expected {expected} symbols but only decoded {decoded}")]
  PayloadExhausted { expected: usize, decoded: usize },
}

/// Packed code bits together with the number of meaningful bits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBits {
  pub bytes: Vec<u8>,
  pub nbits: usize,
}

impl PackedBits {
  /// Number of zero bits appended to fill the last byte
  pub fn padding(&self) -> usize {
    self.bytes.len() * 8 - self.nbits
  }
}

/// Concatenate the codes and pack them MSB-first. An empty code (the lone
/// symbol of a single-symbol alphabet) is written as one `0` placeholder bit.
pub fn pack<'a, I>(codes: I) -> Result<PackedBits, PackError>
where
  I: IntoIterator<Item = &'a Code>,
{
  let mut bit_sink = BitWriter::endian(Vec::new(), BigEndian);
  let mut nbits = 0usize;
  for code in codes {
    if code.is_empty() {
      bit_sink.write_bit(false)?;
      nbits += 1;
      continue;
    }
    for bit in code.iter() {
      bit_sink.write_bit(bit)?;
    }
    nbits += code.len();
  }
  // Flush the partial byte, or it is lost
  bit_sink.byte_align()?;
  let packed = PackedBits {
    bytes: bit_sink.into_writer(),
    nbits,
  };
  debug!(
    "Packed {} bits into {} bytes with {} bits of padding",
    packed.nbits,
    packed.bytes.len(),
    packed.padding()
  );
  Ok(packed)
}

/// Look up each symbol's code in `tree` and pack the result
pub fn pack_symbols(symbols: &[Symbol], tree: &HuffmanTree) -> Result<PackedBits, PackError> {
  let codes = tree.codes();
  let looked_up = symbols
    .iter()
    .map(|sym| codes.get(*sym).ok_or(PackError::MissingCode(*sym)))
    .collect::<Result<Vec<&Code>, PackError>>()?;
  pack(looked_up)
}

/// Decode exactly `expected` symbols from `bytes` by walking `tree`: 0 goes
/// left, 1 goes right, and reaching a leaf emits its symbol. Bits after the
/// last symbol are ignored.
pub fn unpack(bytes: &[u8], tree: &HuffmanTree, expected: usize) -> Result<Vec<Symbol>, UnpackError> {
  let mut bit_src = BitReader::endian(bytes, BigEndian);
  let mut decoded = Vec::with_capacity(expected);
  let exhausted = |decoded: usize| UnpackError::PayloadExhausted { expected, decoded };

  // A leaf root is the single-symbol alphabet, where each placeholder bit
  // is one symbol
  let root = tree.root();
  let mut node = root;
  while decoded.len() < expected {
    let bit = bit_src.read_bit().map_err(|_| exhausted(decoded.len()))?;
    if let Node::Internal { left, right, .. } = node {
      node = if bit { &**right } else { &**left };
    }
    if let Node::Leaf { sym, .. } = node {
      decoded.push(*sym);
      node = root;
    }
  }
  Ok(decoded)
}
