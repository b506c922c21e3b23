//! Mesh loading for catalog codes.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryMeshLoader;

#[cfg(not(target_arch = "wasm32"))]
pub use file::{FileMeshLoader, MeshDescriptor, ModelVariant};

use crate::object::Mesh;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Asset errors.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Asset error: {0}")]
    Other(String),
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Source of meshes for catalog codes.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MeshLoader: Send + Sync {
    /// Load a fresh mesh for a catalog code.
    fn load(&self, code: &str) -> BoxFuture<'_, AssetResult<Mesh>>;

    /// Check if a model exists for a catalog code.
    fn exists(&self, code: &str) -> BoxFuture<'_, AssetResult<bool>>;
}

/// Source of meshes for catalog codes (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait MeshLoader {
    fn load(&self, code: &str) -> BoxFuture<'_, AssetResult<Mesh>>;

    fn exists(&self, code: &str) -> BoxFuture<'_, AssetResult<bool>>;
}
