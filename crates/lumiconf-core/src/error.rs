//! Engine-wide error type.

use crate::assets::AssetError;
use crate::catalog::CatalogError;
use crate::object::ObjectId;
use thiserror::Error;

/// Errors raised by attachment, light placement and scene operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),
    #[error("No compatible junction found")]
    NoCompatibleJunction,
    #[error("Object must be attached to exactly one neighbour")]
    RequiresSingleAttachment,
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
    #[error("Object {0} is not a light")]
    NotALight(ObjectId),
    #[error("No profile available for light placement")]
    NoProfileAvailable,
    #[error("Light {0} could not be moved")]
    LightMoveFailed(ObjectId),
    #[error("No valid light position on the profile")]
    NoValidLightPosition,
    #[error("Handle is disabled")]
    DisabledHandle,
    #[error("No handle is hovered")]
    NothingHovered,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
