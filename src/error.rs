//! Error taxonomy for the PoC store and its build pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the record codec, the store, and the build-directory
/// materializer. Everything is terminal for the current invocation; callers
/// report and exit non-zero.
#[derive(Debug, Error)]
pub enum PocError {
    /// The embedded metadata comment is missing or its markers are corrupt.
    #[error("PoC metadata comment not found: {0}")]
    MalformedRecord(String),

    /// A required metadata key is absent. Validation is deferred to the
    /// point of use, so this names the full field path.
    #[error("missing required metadata field `{0}`")]
    MissingField(&'static str),

    /// Two record files resolve to the same 4-digit id prefix.
    #[error("duplicate PoC id {id}: `{first}` and `{second}`")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },

    /// The given id does not map to any record file.
    #[error("no PoC with id `{0}`")]
    UnknownId(String),

    /// Every id in 0000..=9999 is already allocated.
    #[error("all 10000 PoC ids are allocated")]
    StoreFull,

    /// A filesystem error while producing the throwaway build project.
    #[error("failed to materialize `{path}`")]
    MaterializationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata block is well-delimited but is not valid TOML.
    #[error("invalid metadata TOML: {0}")]
    MetadataToml(#[from] toml::de::Error),

    /// Metadata could not be re-serialized (should not happen for values
    /// that came from `parse`).
    #[error("failed to serialize metadata: {0}")]
    MetadataSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
