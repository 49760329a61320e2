//! Unified error types for VRT

use thiserror::Error;

/// Unified error type for all VRT operations
#[derive(Error, Debug)]
pub enum VrtError {
    // Authorization errors
    #[error("Access denied: {0}")]
    AccessDenied(String),

    // Capture errors
    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    // Diff errors
    #[error("Snapshot dimensions do not match: baseline {baseline_width}x{baseline_height}, post-fix {post_fix_width}x{post_fix_height}")]
    DimensionMismatch {
        baseline_width: u32,
        baseline_height: u32,
        post_fix_width: u32,
        post_fix_height: u32,
    },

    #[error("Image decode failed: {0}")]
    Decode(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Test suite errors
    #[error("Assertion error: {0}")]
    Assertion(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using VrtError
pub type Result<T> = std::result::Result<T, VrtError>;
