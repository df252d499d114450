//! Common utilities for upload integration tests.
//!
//! Builds dummy backends with their descriptor resources and the source
//! models the tests upload.

#![allow(dead_code)]

use glam::{Vec2, Vec3};

use model_upload::backend::dummy::{
    DummyDescriptorPool, DummyDescriptorSetLayout, DummyEvent, DummyFaults, DummySampler,
};
use model_upload::{
    AttributePool, DescriptorContext, DummyBackend, Material, ModelUploader, SourceMesh,
    SourceModel, TextureData, UploadConfig,
};

pub const BRICK_TEXTURE: &str = "textures/brick.png";
pub const GRASS_TEXTURE: &str = "textures/grass.png";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Test Context
// ============================================================================

/// A dummy backend plus the descriptor resources a renderer would own.
pub struct TestContext {
    pub backend: DummyBackend,
    pub pool: DummyDescriptorPool,
    pub layout: DummyDescriptorSetLayout,
    pub sampler: DummySampler,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_faults(DummyFaults::default())
    }

    pub fn with_faults(faults: DummyFaults) -> Self {
        Self::from_backend(
            DummyBackend::new()
                .with_texture(BRICK_TEXTURE, TextureData::checkerboard(16, [200, 60, 40, 255], [90, 30, 20, 255]))
                .with_texture(GRASS_TEXTURE, TextureData::solid_color([40, 160, 40, 255], "grass"))
                .with_faults(faults),
            16,
        )
    }

    pub fn from_backend(backend: DummyBackend, descriptor_capacity: usize) -> Self {
        init_logging();
        let pool = backend.create_descriptor_pool(descriptor_capacity);
        let layout = backend.create_descriptor_set_layout();
        let sampler = backend.create_sampler();
        Self {
            backend,
            pool,
            layout,
            sampler,
        }
    }

    pub fn descriptors(&self) -> DescriptorContext<'_, DummyBackend> {
        DescriptorContext::new(&self.pool, &self.layout, &self.sampler)
    }

    pub fn uploader(&self) -> ModelUploader<'_, DummyBackend> {
        self.uploader_with(UploadConfig::default())
    }

    pub fn uploader_with(&self, config: UploadConfig) -> ModelUploader<'_, DummyBackend> {
        ModelUploader::new(&self.backend, self.descriptors(), config)
    }

    /// Count events matching `predicate`.
    pub fn count_events(&self, predicate: impl Fn(&DummyEvent) -> bool) -> usize {
        self.backend.events().iter().filter(|e| predicate(e)).count()
    }
}

// ============================================================================
// Source Models
// ============================================================================

/// One untextured triangle with a white material.
pub fn triangle_model() -> SourceModel {
    SourceModel {
        meshes: vec![SourceMesh::new("triangle", 0, 0, 3)],
        materials: vec![Material::new("white")],
        textured: AttributePool::default(),
        untextured: AttributePool {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            texcoords: Vec::new(),
        },
    }
}

/// Two textured quads sharing the textured pool and one colored untextured
/// strip, interleaved in source order.
pub fn mixed_model() -> SourceModel {
    let quad = |z: f32| {
        [
            Vec3::new(-1.0, -1.0, z),
            Vec3::new(1.0, -1.0, z),
            Vec3::new(1.0, 1.0, z),
            Vec3::new(-1.0, 1.0, z),
        ]
    };
    let quad_uv = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];

    SourceModel {
        meshes: vec![
            SourceMesh::new("wall", 1, 0, 4).textured(),
            SourceMesh::new("trim", 0, 0, 5),
            SourceMesh::new("floor", 2, 4, 4).textured(),
        ],
        materials: vec![
            Material::new("paint").with_diffuse_color(Vec3::new(0.2, 0.4, 0.8)),
            Material::new("brick").with_diffuse_texture(BRICK_TEXTURE),
            Material::new("grass").with_diffuse_texture(GRASS_TEXTURE),
        ],
        textured: AttributePool {
            positions: quad(0.0).into_iter().chain(quad(-1.0)).collect(),
            texcoords: quad_uv.into_iter().chain(quad_uv).collect(),
        },
        untextured: AttributePool {
            positions: (0..5).map(|i| Vec3::new(i as f32, 0.5, 0.0)).collect(),
            texcoords: Vec::new(),
        },
    }
}

/// Interpret device buffer bytes as `f32`s.
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Interpret device buffer bytes as `u32` indices.
pub fn indices(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
