//! Attachment handles: candidate connection points shown while placing an object.

mod handle;
mod manager;

pub use handle::{
    AngleArrow, CurvePreview, HandleTarget, LineHandle, PointHandle,
    CURVE_PREVIEW_POINTS, DISABLED_COLOR, ENABLED_COLOR, HANDLE_RADIUS, HOVER_COLOR,
    LINE_HANDLE_RADIUS, LINE_HANDLE_SEGMENTS,
};
pub use manager::{HandleManager, HandleRef, Hover};

use thiserror::Error;

/// Handle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("Unknown handle index: {0}")]
    UnknownHandle(usize),
}
