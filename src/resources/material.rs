//! Material definitions

use glam::Vec3;
use std::path::{Path, PathBuf};

/// Flat-shaded material: one diffuse color, optionally a diffuse texture
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Vec3,
    pub diffuse_texture_path: Option<PathBuf>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse_color: Vec3::ONE,
            diffuse_texture_path: None,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_diffuse_color(mut self, color: Vec3) -> Self {
        self.diffuse_color = color;
        self
    }

    pub fn with_diffuse_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.diffuse_texture_path = Some(path.into());
        self
    }

    pub fn diffuse_texture(&self) -> Option<&Path> {
        self.diffuse_texture_path.as_deref()
    }
}
