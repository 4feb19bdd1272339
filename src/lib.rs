/*! Lossless Huffman compression of 8-bit grayscale images.

```no_run
use grayhuff::codec::{compress_file, decompress_file};
use grayhuff::raster::ImageCrateBackend;
use std::path::Path;

let backend = ImageCrateBackend::default();
compress_file(&backend, Path::new("in.png"), Path::new("in.ghf"))?;
decompress_file(&backend, Path::new("in.ghf"), Path::new("out.png"))?;
# Ok::<(), grayhuff::codec::CodecError>(())
```
*/

pub mod bitpack;
pub mod codec;
pub mod container;
pub mod huff_tree;
pub mod raster;

pub use codec::{compress, decompress, CodecError};
pub use container::Container;
pub use huff_tree::{FrequencyTable, HuffmanTree};
pub use raster::{ImageBackend, Raster};
