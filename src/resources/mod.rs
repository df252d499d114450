//! Resource management
//!
//! CPU-side model input, texture decoding, and the GPU-resident meshes the
//! uploader produces.

mod material;
mod mesh;
mod source;
mod texture;

pub use material::*;
pub use mesh::*;
pub use source::*;
pub use texture::*;
