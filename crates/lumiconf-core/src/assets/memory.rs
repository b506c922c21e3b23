//! In-memory mesh loader.

use super::{AssetError, AssetResult, BoxFuture, MeshLoader};
use crate::mesh::TransformMesh;
use crate::object::Mesh;
use std::collections::HashMap;
use std::sync::RwLock;

/// Hands out copies of registered template meshes. Used in tests and headless runs.
#[derive(Default)]
pub struct MemoryMeshLoader {
    templates: RwLock<HashMap<String, TransformMesh>>,
    /// Template returned for unregistered codes, if any.
    fallback: Option<TransformMesh>,
}

impl MemoryMeshLoader {
    /// Create a new empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader that returns a default mesh for every code.
    pub fn with_fallback(fallback: TransformMesh) -> Self {
        Self {
            templates: RwLock::default(),
            fallback: Some(fallback),
        }
    }

    pub fn insert(&self, code: &str, template: TransformMesh) -> AssetResult<()> {
        let mut templates = self
            .templates
            .write()
            .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
        templates.insert(code.to_string(), template);
        Ok(())
    }
}

impl MeshLoader for MemoryMeshLoader {
    fn load(&self, code: &str) -> BoxFuture<'_, AssetResult<Mesh>> {
        let code = code.to_string();
        Box::pin(async move {
            let templates = self
                .templates
                .read()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            templates
                .get(&code)
                .or(self.fallback.as_ref())
                .cloned()
                .map(TransformMesh::boxed)
                .ok_or(AssetError::NotFound(code))
        })
    }

    fn exists(&self, code: &str) -> BoxFuture<'_, AssetResult<bool>> {
        let code = code.to_string();
        Box::pin(async move {
            let templates = self
                .templates
                .read()
                .map_err(|e| AssetError::Other(format!("Lock error: {}", e)))?;
            Ok(templates.contains_key(&code) || self.fallback.is_some())
        })
    }
}
