//! Container Image Reference Validation
//!
//! Parses container image references into their structured parts (registry,
//! namespace, repository, tag, digest) and exposes the predicate used by the
//! `Application` admission check.
//!
//! # Example
//!
//! ```
//! use image_reference::{ImageReference, is_valid_image_reference};
//!
//! assert!(is_valid_image_reference("registry.example.com/app:1.0"));
//! assert!(!is_valid_image_reference("not a valid ref!!"));
//!
//! let reference: ImageReference = "ghcr.io/microscaler/dcops:v0.1.0".parse().unwrap();
//! assert_eq!(reference.registry(), "ghcr.io");
//! assert_eq!(reference.namespace(), Some("microscaler"));
//! assert_eq!(reference.repository(), "dcops");
//! assert_eq!(reference.tag(), Some("v0.1.0"));
//! ```

pub mod error;
pub mod reference;

pub use error::ParseError;
pub use reference::{
    DEFAULT_NAMESPACE, DEFAULT_REGISTRY, DEFAULT_TAG, DIGEST_ALGORITHM, Digest, ImageReference,
};

/// Returns `true` when `image` parses as a complete image reference.
///
/// Any parse error makes the reference invalid.
pub fn is_valid_image_reference(image: &str) -> bool {
    image.parse::<ImageReference>().is_ok()
}
