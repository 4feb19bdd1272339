/*! Image acquisition and display.

The codec only ever sees `Raster`s. Decoding and encoding of actual image
file formats, color conversion and display all sit behind `ImageBackend`,
so the compression core never touches a file format itself.
*/

use std::io::{self, Write};
use std::path::Path;

use ansi_term::Colour;
use image::{
  ColorType, DynamicImage, GenericImageView, GrayAlphaImage, GrayImage, RgbImage, RgbaImage,
};
use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
  #[error("Unsupported pixel format: {0}")]
  UnsupportedFormat(String),
  #[error("Pixel buffer size mismatch: {layout:?} {width}x{height} needs {expected} bytes, got {actual}")]
  BufferSizeMismatch {
    layout: PixelLayout,
    width: u32,
    height: u32,
    expected: usize,
    actual: usize,
  },
  #[error("Image codec error: {0}")]
  Image(#[from] image::ImageError),
  #[error("Other IO error: {0}")]
  IOError(#[from] io::Error),
}

/// Channel arrangement of an 8-bit raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
  Luma8,
  LumaA8,
  Rgb8,
  Rgba8,
}

impl PixelLayout {
  pub fn channels(self) -> usize {
    match self {
      PixelLayout::Luma8 => 1,
      PixelLayout::LumaA8 => 2,
      PixelLayout::Rgb8 => 3,
      PixelLayout::Rgba8 => 4,
    }
  }

  fn color_type(self) -> ColorType {
    match self {
      PixelLayout::Luma8 => ColorType::L8,
      PixelLayout::LumaA8 => ColorType::La8,
      PixelLayout::Rgb8 => ColorType::Rgb8,
      PixelLayout::Rgba8 => ColorType::Rgba8,
    }
  }
}

/// A row-major, channel-interleaved 8-bit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
  width: u32,
  height: u32,
  layout: PixelLayout,
  data: Vec<u8>,
}

impl Raster {
  pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Result<Self, RasterError> {
    let expected = width as usize * height as usize * layout.channels();
    if data.len() != expected {
      return Err(RasterError::BufferSizeMismatch {
        layout,
        width,
        height,
        expected,
        actual: data.len(),
      });
    }
    Ok(Self {
      width,
      height,
      layout,
      data,
    })
  }

  /// A single-channel raster from row-major intensities
  pub fn from_luma(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
    Self::new(width, height, PixelLayout::Luma8, pixels)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn layout(&self) -> PixelLayout {
    self.layout
  }

  pub fn pixel_count(&self) -> usize {
    self.width as usize * self.height as usize
  }

  pub fn is_grayscale(&self) -> bool {
    self.layout == PixelLayout::Luma8
  }

  /// Raw interleaved samples
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  pub fn into_data(self) -> Vec<u8> {
    self.data
  }

  fn rgb_at(&self, x: usize, y: usize) -> (u8, u8, u8) {
    let nch = self.layout.channels();
    let i = (y * self.width as usize + x) * nch;
    match self.layout {
      PixelLayout::Luma8 | PixelLayout::LumaA8 => (self.data[i], self.data[i], self.data[i]),
      PixelLayout::Rgb8 | PixelLayout::Rgba8 => (self.data[i], self.data[i + 1], self.data[i + 2]),
    }
  }

  fn from_dynamic(img: DynamicImage) -> Result<Self, RasterError> {
    let (width, height) = img.dimensions();
    let (layout, data) = match img {
      DynamicImage::ImageLuma8(buf) => (PixelLayout::Luma8, buf.into_raw()),
      DynamicImage::ImageLumaA8(buf) => (PixelLayout::LumaA8, buf.into_raw()),
      DynamicImage::ImageRgb8(buf) => (PixelLayout::Rgb8, buf.into_raw()),
      DynamicImage::ImageRgba8(buf) => (PixelLayout::Rgba8, buf.into_raw()),
      other => {
        return Err(RasterError::UnsupportedFormat(format!(
          "{:?} samples are not 8 bits wide",
          other.color()
        )))
      }
    };
    Self::new(width, height, layout, data)
  }

  fn into_dynamic(self) -> Result<DynamicImage, RasterError> {
    let (width, height, layout) = (self.width, self.height, self.layout);
    let actual = self.data.len();
    let img = match layout {
      PixelLayout::Luma8 => GrayImage::from_raw(width, height, self.data).map(DynamicImage::ImageLuma8),
      PixelLayout::LumaA8 => {
        GrayAlphaImage::from_raw(width, height, self.data).map(DynamicImage::ImageLumaA8)
      }
      PixelLayout::Rgb8 => RgbImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgb8),
      PixelLayout::Rgba8 => RgbaImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgba8),
    };
    img.ok_or(RasterError::BufferSizeMismatch {
      layout,
      width,
      height,
      expected: width as usize * height as usize * layout.channels(),
      actual,
    })
  }
}

/// The boundary between the codec and the outside world of image files
pub trait ImageBackend {
  /// Decode an image file into a raster
  fn load(&self, path: &Path) -> Result<Raster, RasterError>;
  /// Reduce a raster to one 8-bit intensity channel with the same dimensions
  fn convert_to_grayscale(&self, raster: Raster) -> Result<Raster, RasterError>;
  /// Encode a raster into an image file, with the format chosen by extension
  fn save(&self, raster: &Raster, path: &Path) -> Result<(), RasterError>;
  /// Show a raster to the user
  fn display(&self, raster: &Raster);
}

/// `ImageBackend` built on the `image` crate, displaying to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCrateBackend {
  max_width: usize,
}

impl ImageCrateBackend {
  pub const DEFAULT_MAX_WIDTH: usize = 80;

  pub fn new(max_width: usize) -> Self {
    Self {
      max_width: max_width.max(1),
    }
  }
}

impl Default for ImageCrateBackend {
  fn default() -> Self {
    Self::new(Self::DEFAULT_MAX_WIDTH)
  }
}

impl ImageBackend for ImageCrateBackend {
  fn load(&self, path: &Path) -> Result<Raster, RasterError> {
    let img = image::open(path)?;
    let raster = Raster::from_dynamic(img)?;
    debug!(
      "Loaded {} as {:?} {}x{}",
      path.display(),
      raster.layout,
      raster.width,
      raster.height
    );
    Ok(raster)
  }

  fn convert_to_grayscale(&self, raster: Raster) -> Result<Raster, RasterError> {
    if raster.is_grayscale() {
      return Ok(raster);
    }
    let luma = raster.into_dynamic()?.to_luma8();
    Raster::from_luma(luma.width(), luma.height(), luma.into_raw())
  }

  fn save(&self, raster: &Raster, path: &Path) -> Result<(), RasterError> {
    image::save_buffer(
      path,
      &raster.data,
      raster.width,
      raster.height,
      raster.layout.color_type(),
    )?;
    Ok(())
  }

  fn display(&self, raster: &Raster) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = render(raster, self.max_width, &mut handle) {
      warn!("Could not display image: {}", e);
    }
  }
}

/** Draw a raster as rows of half-block characters: the foreground colour is
the upper pixel and the background is the one below it. Rasters wider than
`max_width` are sampled every `step` pixels in both directions. */
pub fn render<W: Write>(raster: &Raster, max_width: usize, out: &mut W) -> io::Result<()> {
  let (w, h) = (raster.width as usize, raster.height as usize);
  let max_width = max_width.max(1);
  let step = (w + max_width - 1) / max_width;
  if step == 0 || h == 0 {
    return Ok(());
  }

  for y in (0..h).step_by(2 * step) {
    for x in (0..w).step_by(step) {
      let (r, g, b) = raster.rgb_at(x, y);
      let upper = Colour::RGB(r, g, b);
      let cell = if y + step < h {
        let (r2, g2, b2) = raster.rgb_at(x, y + step);
        upper.on(Colour::RGB(r2, g2, b2)).paint("\u{2580}")
      } else {
        upper.paint("\u{2580}")
      };
      write!(out, "{}", cell)?;
    }
    writeln!(out)?;
  }
  Ok(())
}
