//! Error types for shell loading, resolution and compositing

use crate::models::Side;
use thiserror::Error;

/// What went wrong, independent of which character side it happened on.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Nothing could ever render: the surface has no definitions at all,
    /// or a referenced image belongs to an encrypted family this crate
    /// does not decode. Fatal for this shell/side.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Definitions exist but a referenced file is missing. Recoverable by
    /// fixing the shell's assets.
    #[error("missing asset: {0}")]
    MissingAsset(String),

    /// Malformed or out-of-range caller input (explicit face-crop
    /// coordinates). Never silently clamped or defaulted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An image pair that must agree in shape does not (a `.pna` mask
    /// sized differently from its base image).
    #[error("illegal image format: {0}")]
    IllegalFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ErrorKind {
    /// Attach a character side, producing the tagged error the public API
    /// reports. Errors are built tagged rather than retagged after the
    /// fact.
    pub fn on_side(self, side: Side) -> ShellError {
        ShellError { side: Some(side), kind: self }
    }

    pub fn untagged(self) -> ShellError {
        ShellError { side: None, kind: self }
    }
}

/// A resolution/compositing error tagged with the character side that
/// produced it, so a caller can report per-side failure while still
/// rendering the unaffected side.
#[derive(Debug, Error)]
pub struct ShellError {
    pub side: Option<Side>,
    #[source]
    pub kind: ErrorKind,
}

impl ShellError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsupported(_))
    }
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.side {
            Some(side) => write!(f, "[{} (side {})] {}", side, side.index(), self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl From<ErrorKind> for ShellError {
    fn from(kind: ErrorKind) -> Self {
        kind.untagged()
    }
}
