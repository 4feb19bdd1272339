/*! Compression and decompression of whole images.

Compress: grayscale conversion, frequency count, tree, per-pixel code lookup,
packing, container. Decompress runs the container back through the tree that
its stored frequency table rebuilds.
*/

use crate::bitpack::{pack_symbols, PackError};
use crate::container::{Container, ContainerReadError};
use crate::huff_tree::{FrequencyTable, HuffTreeError, HuffmanTree};
use crate::raster::{ImageBackend, Raster, RasterError};

use log::{debug, info, warn};
use serde::Serialize;
use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
  #[error("Image {field} of {value} does not fit the container's 16-bit field")]
  DimensionTooLarge { field: &'static str, value: u32 },
  #[error("Grayscale conversion produced a {0:?} raster")]
  NotGrayscale(crate::raster::PixelLayout),
  #[error("{0}")]
  Tree(#[from] HuffTreeError),
  #[error("Could not pack codes: {0}")]
  Pack(#[from] PackError),
  #[error("Corrupt container: {0}")]
  Container(#[from] ContainerReadError),
  #[error("{0}")]
  Raster(#[from] RasterError),
  #[error("Other IO error: {0}")]
  IOError(#[from] io::Error),
}

fn dimension(field: &'static str, value: u32) -> Result<u16, CodecError> {
  u16::try_from(value).map_err(|_| CodecError::DimensionTooLarge { field, value })
}

/// Compress a raster into a container. The raster is converted to grayscale
/// by `backend` first.
pub fn compress<B>(backend: &B, raster: Raster) -> Result<Container, CodecError>
where
  B: ImageBackend + ?Sized,
{
  let gray = backend.convert_to_grayscale(raster)?;
  if !gray.is_grayscale() {
    return Err(CodecError::NotGrayscale(gray.layout()));
  }
  let width = dimension("width", gray.width())?;
  let height = dimension("height", gray.height())?;

  let pixels = gray.into_data();
  let freqs = FrequencyTable::count(&pixels);
  let tree = HuffmanTree::build(&freqs)?;
  let packed = pack_symbols(&pixels, &tree)?;
  if tree.is_degenerate() {
    debug!("Single intensity image, one placeholder bit per pixel");
  }
  debug!(
    "Compressed {}x{} pixels over {} symbols into {} bits",
    width,
    height,
    freqs.len(),
    packed.nbits
  );
  Ok(Container::new(width, height, freqs, packed))
}

/// Recover the grayscale raster stored in a container
pub fn decompress(container: &Container) -> Result<Raster, CodecError> {
  let pixels = container.decode_pixels()?;
  let raster = Raster::from_luma(
    u32::from(container.width()),
    u32::from(container.height()),
    pixels,
  )?;
  Ok(raster)
}

/// Size and coding-efficiency figures for one container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionStats {
  pub pixels: usize,
  pub distinct_symbols: usize,
  pub payload_bytes: usize,
  pub container_bytes: usize,
  /// Average code length actually used
  pub bits_per_pixel: f64,
  /// Shannon entropy of the pixel distribution, the bound no prefix code beats
  pub entropy: f64,
}

impl CompressionStats {
  pub fn from_container(container: &Container) -> Result<Self, CodecError> {
    let freqs = container.freqs();
    let tree = HuffmanTree::build(freqs)?;
    let pixels = container.pixel_count();
    let bits = tree.encoded_bit_len(freqs);
    let bits_per_pixel = if pixels == 0 {
      0.0
    } else {
      bits as f64 / pixels as f64
    };
    Ok(Self {
      pixels,
      distinct_symbols: freqs.len(),
      payload_bytes: container.payload().len(),
      container_bytes: container.encoded_len(),
      bits_per_pixel,
      entropy: freqs.entropy(),
    })
  }

  /// Container size relative to one byte per pixel
  pub fn ratio(&self) -> f64 {
    if self.pixels == 0 {
      return 0.0;
    }
    self.container_bytes as f64 / self.pixels as f64
  }
}

impl fmt::Display for CompressionStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Pixels:           {}", self.pixels)?;
    writeln!(f, "Distinct values:  {}", self.distinct_symbols)?;
    writeln!(f, "Payload:          {} bytes", self.payload_bytes)?;
    writeln!(f, "Container:        {} bytes", self.container_bytes)?;
    writeln!(f, "Ratio:            {:.3}", self.ratio())?;
    writeln!(f, "Bits per pixel:   {:.4}", self.bits_per_pixel)?;
    writeln!(f, "Entropy bound:    {:.4}", self.entropy)
  }
}

/// Parse a container file
pub fn read_container(path: &Path) -> Result<Container, CodecError> {
  let file = File::open(path)?;
  Ok(Container::new_from_container_data(file)?)
}

/// Serialize a container to a file
pub fn write_container(container: &Container, path: &Path) -> Result<(), CodecError> {
  let file = File::create(path)?;
  let mut writer = container.write_to(BufWriter::new(file))?;
  // Surface write errors that would otherwise be swallowed on drop
  writer.flush()?;
  Ok(())
}

/// Load an image, compress it and write the container to `output`
pub fn compress_file<B>(backend: &B, input: &Path, output: &Path) -> Result<CompressionStats, CodecError>
where
  B: ImageBackend + ?Sized,
{
  let raster = backend.load(input)?;
  let container = compress(backend, raster)?;
  write_container(&container, output)?;

  let stats = CompressionStats::from_container(&container)?;
  info!(
    "Wrote {} ({} bytes, {:.4} bits/pixel, entropy {:.4})",
    output.display(),
    stats.container_bytes,
    stats.bits_per_pixel,
    stats.entropy
  );
  if stats.container_bytes > stats.pixels {
    warn!(
      "Container is larger than the raw grayscale image ({} > {} bytes)",
      stats.container_bytes, stats.pixels
    );
  }
  Ok(stats)
}

/// Read a container, decompress it and save the raster as an image at `output`
pub fn decompress_file<B>(backend: &B, input: &Path, output: &Path) -> Result<Raster, CodecError>
where
  B: ImageBackend + ?Sized,
{
  let container = read_container(input)?;
  let raster = decompress(&container)?;
  backend.save(&raster, output)?;
  info!(
    "Reconstructed {}x{} image to {}",
    raster.width(),
    raster.height(),
    output.display()
  );
  Ok(raster)
}
