use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the map library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// Every variant here aborts the operation that produced it. Problems that only
/// affect a single item (a missing template, an out-of-range origin) are
/// [`ItemIssue`]s instead and never stop a sector.
#[derive(Debug, Error)]
pub enum Error {
    /// A read ran past the end of the sector buffer.
    #[error("read of {len} bytes at offset {offset:#x} exceeds buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// No record layout is known for the sector's format version.
    #[error("unsupported map format version {version} for record at offset {offset:#x}")]
    UnsupportedFormatVersion { version: u32, offset: usize },

    /// The record header does not describe the item type the caller asked for.
    #[error("expected a prefab record at offset {offset:#x}, found item type {found:#x}")]
    UnexpectedItemType { found: u32, offset: usize },

    /// A length field in the record is negative.
    #[error("invalid element count {count} at offset {offset:#x}")]
    InvalidCount { count: i64, offset: usize },

    /// A record inside a run of consecutive records failed to decode.
    #[error("record #{index} at offset {offset:#x} failed to decode: {source}")]
    SectorRecord {
        index: usize,
        offset: usize,
        #[source]
        source: Box<Error>,
    },

    /// A prefab template failed validation while being added to the catalog.
    #[error("invalid prefab template {token}: {message}")]
    InvalidTemplate { token: String, message: String },

    /// Raised when a query names an item that is not part of the world.
    #[error("unknown item {uid:#x}")]
    UnknownItem { uid: u64 },

    /// Raised when the export directory cannot be used.
    #[error("export target {path} is not a directory")]
    ExportTarget { path: PathBuf },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Non-fatal problem attached to a single item.
///
/// The item stays in the world and can be inspected, but is excluded from
/// geometry and navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemIssue {
    /// The prefab token does not resolve to a loaded template.
    #[error("prefab template '{token}' ({raw:#x}) not found at offset {offset:#x}")]
    TemplateNotFound {
        token: String,
        raw: u64,
        offset: usize,
    },

    /// The origin index does not address a node of the template.
    #[error("origin {origin} is out of range for a template with {node_count} nodes")]
    OriginOutOfRange { origin: u8, node_count: usize },

    /// The item references a world node that is not loaded.
    #[error("node {node:#x} is not loaded")]
    NodeNotFound { node: u64 },

    /// The item has no nodes at all.
    #[error("item has no nodes")]
    NoNodes,
}
