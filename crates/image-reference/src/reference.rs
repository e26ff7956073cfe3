//! Structured image reference
//!
//! A reference takes one of two forms:
//!
//! ```text
//! tagged   := name [ ":" tag ]
//! digested := name [ ":" tag ] "@" "sha256:" hex{64}
//! name     := [ registry "/" ] repository
//! ```
//!
//! The first `/`-separated segment is a registry only when it contains `.`
//! or `:`, so `localhost/app` is a repository on the default registry.
//! An empty tag (`app:`) is treated as no tag.

use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;

/// Registry used when the reference does not name one
pub const DEFAULT_REGISTRY: &str = "index.docker.io";

/// Namespace prepended to single-component repositories on the default registry
pub const DEFAULT_NAMESPACE: &str = "library";

/// Tag implied when neither a tag nor a digest is given
pub const DEFAULT_TAG: &str = "latest";

/// The only accepted digest algorithm
pub const DIGEST_ALGORITHM: &str = "sha256";

const LEGACY_DEFAULT_REGISTRY: &str = "docker.io";
const DIGEST_HEX_LENGTH: usize = 64;
const REPOSITORY_LENGTH_MIN: usize = 2;
const REPOSITORY_LENGTH_MAX: usize = 255;
const TAG_LENGTH_MAX: usize = 128;

/// A parsed container image reference.
///
/// Defaults are resolved during parsing: `nginx` becomes
/// `index.docker.io/library/nginx`, and [`ImageReference::effective_tag`]
/// reports `latest` when neither tag nor digest was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    registry: String,
    path: String,
    tag: Option<String>,
    digest: Option<Digest>,
}

impl ImageReference {
    /// Registry host (with port, if any)
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Full repository path below the registry, e.g. `library/nginx`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Everything before the last path component, if present
    pub fn namespace(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(namespace, _)| namespace)
    }

    /// Last path component
    pub fn repository(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map_or(self.path.as_str(), |(_, repository)| repository)
    }

    /// Tag exactly as written
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Tag to pull by when no digest pins the image
    pub fn effective_tag(&self) -> Option<&str> {
        match (&self.tag, &self.digest) {
            (Some(tag), _) => Some(tag),
            (None, Some(_)) => None,
            (None, None) => Some(DEFAULT_TAG),
        }
    }

    /// Content digest, if pinned
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.path)?;
        if let Some(tag) = self.effective_tag() {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        // '@' is legal in neither a tag, a repository nor a registry,
        // so only the digested form can match
        match s.split_once('@') {
            Some((name, digest)) => parse_digested(name, digest),
            None => parse_tagged(s),
        }
    }
}

fn parse_tagged(s: &str) -> Result<ImageReference, ParseError> {
    let (name, tag) = split_tag(s);
    let tag = tag.filter(|tag| !tag.is_empty());
    if let Some(tag) = tag {
        validate_tag(tag)?;
    }

    let (registry, path) = parse_name(name)?;

    Ok(ImageReference {
        registry,
        path,
        tag: tag.map(str::to_string),
        digest: None,
    })
}

fn parse_digested(name: &str, digest: &str) -> Result<ImageReference, ParseError> {
    if digest.contains('@') {
        return Err(ParseError::InvalidDigest(format!(
            "expected exactly one '@' separator in {name}@{digest}"
        )));
    }
    let digest: Digest = digest.parse()?;

    Ok(ImageReference {
        digest: Some(digest),
        ..parse_tagged(name)?
    })
}

/// Splits `name[:tag]`. A colon followed by a `/` belongs to a registry port.
fn split_tag(s: &str) -> (&str, Option<&str>) {
    match s.rfind(':') {
        Some(idx) if !s[idx + 1..].contains('/') => (&s[..idx], Some(&s[idx + 1..])),
        _ => (s, None),
    }
}

/// Resolves `[registry/]repository` into a registry and a repository path.
fn parse_name(name: &str) -> Result<(String, String), ParseError> {
    if name.is_empty() {
        return Err(ParseError::MissingRepository);
    }

    let (registry, repository) = match name.split_once('/') {
        Some((first, rest)) if first.contains(['.', ':']) => (Some(first), rest),
        _ => (None, name),
    };

    validate_repository(repository)?;
    if let Some(registry) = registry {
        validate_registry(registry)?;
    }

    let registry = match registry {
        None | Some(LEGACY_DEFAULT_REGISTRY) => DEFAULT_REGISTRY,
        Some(registry) => registry,
    };
    let path = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
        format!("{DEFAULT_NAMESPACE}/{repository}")
    } else {
        repository.to_string()
    };

    Ok((registry.to_string(), path))
}

fn validate_repository(repository: &str) -> Result<(), ParseError> {
    let length = repository.chars().count();
    if !(REPOSITORY_LENGTH_MIN..=REPOSITORY_LENGTH_MAX).contains(&length) {
        return Err(ParseError::RepositoryLength(length));
    }

    let valid = repository.bytes().all(|b| {
        b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'.' | b'/')
    });
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidRepository(repository.to_string()))
    }
}

fn validate_tag(tag: &str) -> Result<(), ParseError> {
    let valid = tag.chars().count() <= TAG_LENGTH_MAX
        && tag
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidTag(tag.to_string()))
    }
}

/// A registry must be a URI authority: `host[:port]` or `[ipv6][:port]`,
/// without userinfo, path, query or fragment.
fn validate_registry(registry: &str) -> Result<(), ParseError> {
    let invalid = || ParseError::InvalidRegistry(registry.to_string());

    let (host, port) = match registry.strip_prefix('[') {
        Some(bracketed) => bracketed.rsplit_once(']').ok_or_else(invalid)?,
        None => match registry.rfind(':') {
            Some(idx) => (&registry[..idx], &registry[idx..]),
            None => (registry, ""),
        },
    };

    let port_valid = port.is_empty()
        || port
            .strip_prefix(':')
            .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_digit()));

    if port_valid && host.bytes().all(is_host_byte) {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Unreserved and sub-delimiter characters of RFC 3986, `:` and non-ASCII
fn is_host_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || !b.is_ascii() || b"-._~!$&'()*+,;=:".contains(&b)
}

/// A sha256 content digest (`sha256:hex`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    hex: String,
}

impl Digest {
    /// Hash algorithm, always [`DIGEST_ALGORITHM`]
    pub fn algorithm(&self) -> &str {
        DIGEST_ALGORITHM
    }

    /// Lowercase hex-encoded hash
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", DIGEST_ALGORITHM, self.hex)
    }
}

impl FromStr for Digest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidDigest(s.to_string()))?;
        if algorithm != DIGEST_ALGORITHM {
            return Err(ParseError::UnsupportedDigestAlgorithm(algorithm.to_string()));
        }

        let lowercase_hex = hex
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if hex.len() != DIGEST_HEX_LENGTH || !lowercase_hex {
            return Err(ParseError::InvalidDigest(s.to_string()));
        }

        Ok(Self {
            hex: hex.to_string(),
        })
    }
}
