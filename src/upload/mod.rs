//! The upload pipeline
//!
//! A mesh travels through four stages: [`interleave_mesh`] flattens its
//! attributes, [`stage_buffer`] copies the bytes into host-visible staging
//! memory, [`UploadBatch`] records and submits the GPU copies and waits for
//! them, and [`bind_texture`] gives textured meshes their descriptor set.
//! [`ModelUploader`] runs the stages for every mesh of a model.

mod assembler;
mod binder;
mod interleave;
mod scoped;
mod staging;
mod sync;

pub use assembler::ModelUploader;
pub use binder::{bind_texture, DescriptorContext, DIFFUSE_TEXTURE_BINDING};
pub use interleave::{
    interleave_mesh, IndexBlock, InterleavedVertex, InterleavedVertexBlock, VertexAttribute,
    FLOATS_PER_VERTEX,
};
pub use scoped::Scoped;
pub use staging::{stage_buffer, BufferIntent, StagedTransfer};
pub use sync::UploadBatch;
