//! Image reference parse errors

use thiserror::Error;

/// Errors that can occur when parsing a container image reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The reference string was empty
    #[error("image reference is empty")]
    Empty,

    /// A tag or digest was given without a repository name
    #[error("image reference has no repository name")]
    MissingRepository,

    /// Repository (below the registry) is shorter than 2 or longer than 255 characters
    #[error("repository must be between 2 and 255 characters (got {0})")]
    RepositoryLength(usize),

    /// Repository contains characters outside `[a-z0-9_./-]`
    #[error("invalid repository: {0:?}")]
    InvalidRepository(String),

    /// Registry is not a valid URI authority (`host[:port]`)
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    /// Tag contains forbidden characters or is too long
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    /// Digest is malformed, or more than one `@` was given
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// Digest algorithm is not sha256
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),
}
