//! Lumiconf Core Library
//!
//! Junction-based assembly engine for the lumiconf lighting configurator:
//! catalog model, placeable objects, attachment math, light placement,
//! handle picking and the scene container that ties them together.

pub mod assets;
pub mod camera;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod curve;
pub mod error;
pub mod handles;
pub mod lights;
pub mod math;
pub mod mesh;
pub mod object;
pub mod scene;

pub use assets::{AssetError, AssetResult, MemoryMeshLoader, MeshLoader};
pub use camera::{Camera, Projection};
pub use catalog::{Catalog, CatalogEntry, CatalogError, Junction, LineJunction, ObjectCategory, SegmentRole};
pub use composite::{CompositeProfileConfig, ProfileSegment, calculate_profile_composition};
pub use config::{EngineConfig, HandleScale};
pub use curve::QuadBezier3;
pub use error::{EngineError, EngineResult};
pub use handles::{HandleError, HandleManager, HandleRef, Hover};
pub use lights::{LightModel, LightTable};
pub use math::{Ray, angle_helper, normalize360};
pub use mesh::{Positionable, TransformMesh};
pub use object::{LineSlot, ObjectId, PlaceableObject};
pub use scene::{ObjectSnapshot, Scene, SceneContainer, SceneKind, SceneSnapshot};

#[cfg(not(target_arch = "wasm32"))]
pub use assets::FileMeshLoader;
