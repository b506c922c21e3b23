//! File-based mesh loader for native platforms.

use super::{AssetError, AssetResult, BoxFuture, MeshLoader};
use crate::mesh::TransformMesh;
use crate::object::Mesh;
use glam::DQuat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which model set to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    #[default]
    Full,
    /// Lower-detail models for large scenes.
    Simplified,
}

impl ModelVariant {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Full => "models",
            Self::Simplified => "simplified",
        }
    }
}

/// Model metadata stored next to the geometry as `<code>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshDescriptor {
    pub bounding_radius: f64,
    /// Yaw applied once so the model faces the catalog's junction angles.
    pub orientation_deg: f64,
    pub scale: [f64; 3],
}

impl Default for MeshDescriptor {
    fn default() -> Self {
        Self {
            bounding_radius: 1.0,
            orientation_deg: 0.0,
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl MeshDescriptor {
    pub fn to_mesh(&self) -> TransformMesh {
        TransformMesh {
            rotation: DQuat::from_rotation_y(self.orientation_deg.to_radians()),
            scale: self.scale.into(),
            radius: self.bounding_radius,
            ..TransformMesh::default()
        }
    }
}

/// Reads mesh descriptors from `<base>/<variant>/<code>.json`.
pub struct FileMeshLoader {
    /// Base directory holding the model folders.
    base_path: PathBuf,
    variant: ModelVariant,
}

impl FileMeshLoader {
    pub fn new(base_path: PathBuf, variant: ModelVariant) -> AssetResult<Self> {
        if !base_path.is_dir() {
            return Err(AssetError::Io(format!("Model directory not found: {}", base_path.display())));
        }
        Ok(Self { base_path, variant })
    }

    /// Get the file path for a catalog code.
    fn model_path(&self, code: &str) -> PathBuf {
        // Sanitize code to be safe for filenames
        let safe_code: String = code
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path
            .join(self.variant.dir_name())
            .join(format!("{}.json", safe_code))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl MeshLoader for FileMeshLoader {
    fn load(&self, code: &str) -> BoxFuture<'_, AssetResult<Mesh>> {
        let path = self.model_path(code);
        let code = code.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(AssetError::NotFound(code));
            }

            let json = fs::read_to_string(&path)
                .map_err(|e| AssetError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

            let descriptor: MeshDescriptor = serde_json::from_str(&json).map_err(|e| {
                AssetError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            log::debug!("Loaded model {} from {}", code, path.display());
            Ok(descriptor.to_mesh().boxed())
        })
    }

    fn exists(&self, code: &str) -> BoxFuture<'_, AssetResult<bool>> {
        let path = self.model_path(code);
        Box::pin(async move { Ok(path.exists()) })
    }
}
