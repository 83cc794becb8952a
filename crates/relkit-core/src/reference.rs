//! Image references and generated tags.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

const DEFAULT_REGISTRY: &str = "docker.io";
const MAX_TAG_LEN: usize = 128;

/// A tag unique per second: `<prefix>-<unix seconds>`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use relkit_core::ImageTag;
///
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let tag = ImageTag::timestamped("test", now).unwrap();
/// assert_eq!(tag.to_string(), "test-1700000000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag(String);

impl ImageTag {
    pub fn timestamped(prefix: &str, now: DateTime<Utc>) -> crate::Result<Self> {
        let tag = format!("{prefix}-{}", now.timestamp());
        validate_tag(&tag)?;
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_tag(tag: &str) -> crate::Result<()> {
    let invalid = |reason| crate::Error::InvalidReference {
        value: tag.to_owned(),
        reason,
    };
    if tag.len() > MAX_TAG_LEN {
        return Err(invalid("tag longer than 128 characters"));
    }
    if tag.starts_with(['.', '-']) {
        return Err(invalid("tag must start with a letter, digit or underscore"));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(invalid("tag may only contain [A-Za-z0-9_.-]"));
    }
    Ok(())
}

/// A fully-qualified pointer to an image: registry host, repository path,
/// and a tag and/or digest.
///
/// # Examples
///
/// ```
/// use relkit_core::ImageReference;
///
/// let r: ImageReference = "cgr.dev/chainguard/static:latest".parse().unwrap();
/// assert_eq!(r.registry, "cgr.dev");
/// assert_eq!(r.repository, "chainguard/static");
/// assert_eq!(r.tag.as_deref(), Some("latest"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    /// Reference for `name` under a destination like `localhost:5000` or
    /// `ghcr.io/org/images`.
    pub fn in_repo(target_repo: &str, name: &str, tag: &ImageTag) -> crate::Result<Self> {
        let target_repo = target_repo.trim_end_matches('/');
        let (registry, prefix) = split_registry(target_repo);
        let repository = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{name}"),
            _ => name.to_owned(),
        };
        let repository = repository.to_ascii_lowercase();
        validate_repository(&repository, target_repo)?;

        Ok(Self {
            registry: registry.unwrap_or(DEFAULT_REGISTRY).to_owned(),
            repository,
            tag: Some(tag.as_str().to_owned()),
            digest: None,
        })
    }

    /// Same reference pinned to a manifest digest.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// `registry/repository:tag`, ignoring any digest.
    pub fn tagged(&self) -> String {
        format!(
            "{}/{}:{}",
            self.registry,
            self.repository,
            self.tag.as_deref().unwrap_or("latest")
        )
    }
}

impl fmt::Display for ImageReference {
    /// Digest form when a digest is known, tag form otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.digest {
            Some(digest) => write!(f, "{}/{}@{digest}", self.registry, self.repository),
            None => f.write_str(&self.tagged()),
        }
    }
}

impl FromStr for ImageReference {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            return Err(crate::Error::InvalidReference {
                value: s.to_owned(),
                reason: "empty reference",
            });
        }

        let (rest, digest) = match s.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest.to_owned())),
            None => (s, None),
        };

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let last_slash = rest.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match rest[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&rest[..split], Some(rest[split + 1..].to_owned()))
            }
            None => (rest, None),
        };

        if let Some(tag) = &tag {
            validate_tag(tag)?;
        }

        let (registry, repository) = match split_registry(name) {
            (Some(registry), Some(path)) => (registry.to_owned(), path.to_owned()),
            (Some(_), None) => {
                return Err(crate::Error::InvalidReference {
                    value: s.to_owned(),
                    reason: "missing repository",
                });
            }
            (None, _) if !name.contains('/') => {
                (DEFAULT_REGISTRY.to_owned(), format!("library/{name}"))
            }
            (None, _) => (DEFAULT_REGISTRY.to_owned(), name.to_owned()),
        };
        validate_repository(&repository, s)?;

        Ok(Self {
            registry,
            repository,
            tag: if digest.is_none() && tag.is_none() {
                Some("latest".to_owned())
            } else {
                tag
            },
            digest,
        })
    }
}

/// Split a leading registry host off a path. The first component is a
/// registry when it contains `.` or `:`, or is `localhost`.
fn split_registry(path: &str) -> (Option<&str>, Option<&str>) {
    let (first, rest) = match path.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    };
    if first.contains(['.', ':']) || first == "localhost" {
        (Some(first), rest)
    } else {
        (None, Some(path))
    }
}

fn validate_repository(repository: &str, value: &str) -> crate::Result<()> {
    let valid = !repository.is_empty()
        && repository.split('/').all(|component| {
            !component.is_empty()
                && component
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
        });
    if valid {
        Ok(())
    } else {
        Err(crate::Error::InvalidReference {
            value: value.to_owned(),
            reason: "repository must be lowercase [a-z0-9._-] path components",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn tag_has_prefix_and_seconds() {
        let tag = ImageTag::timestamped("test", at(1_650_000_000)).unwrap();
        assert_eq!(tag.as_str(), "test-1650000000");
    }

    #[test]
    fn tags_one_second_apart_differ() {
        let a = ImageTag::timestamped("test", at(1_650_000_000)).unwrap();
        let b = ImageTag::timestamped("test", at(1_650_000_001)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tags_within_same_second_collide() {
        let a = ImageTag::timestamped("test", Utc.timestamp_opt(10, 1).unwrap()).unwrap();
        let b = ImageTag::timestamped("test", Utc.timestamp_opt(10, 999_000_000).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tag_prefix_with_invalid_chars_rejected() {
        assert!(ImageTag::timestamped("has space", at(1)).is_err());
        assert!(ImageTag::timestamped("-dash", at(1)).is_err());
    }

    #[test]
    fn parse_registry_with_port() {
        let r: ImageReference = "localhost:5000/hello:test-1".parse().unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "hello");
        assert_eq!(r.tag.as_deref(), Some("test-1"));
    }

    #[test]
    fn parse_docker_hub_shorthand() {
        let r: ImageReference = "alpine".parse().unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.tag.as_deref(), Some("latest"));
    }

    #[test]
    fn parse_digest_keeps_no_default_tag() {
        let digest = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let r: ImageReference = format!("ghcr.io/org/app@{digest}").parse().unwrap();
        assert_eq!(r.digest.as_deref(), Some(digest));
        assert!(r.tag.is_none());
        assert_eq!(r.to_string(), format!("ghcr.io/org/app@{digest}"));
    }

    #[test]
    fn parse_rejects_registry_only() {
        assert!("localhost:5000".parse::<ImageReference>().is_err());
        assert!("".parse::<ImageReference>().is_err());
    }

    #[test]
    fn in_repo_bare_registry() {
        let tag = ImageTag::timestamped("test", at(42)).unwrap();
        let r = ImageReference::in_repo("localhost:5000", "hello", &tag).unwrap();
        assert_eq!(r.tagged(), "localhost:5000/hello:test-42");
    }

    #[test]
    fn in_repo_with_prefix_and_uppercase_name() {
        let tag = ImageTag::timestamped("test", at(42)).unwrap();
        let r = ImageReference::in_repo("ghcr.io/org/images/", "Hello", &tag).unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "org/images/hello");
    }

    #[test]
    fn display_prefers_digest() {
        let tag = ImageTag::timestamped("test", at(42)).unwrap();
        let r = ImageReference::in_repo("localhost:5000", "hello", &tag)
            .unwrap()
            .with_digest("sha256:abc");
        assert_eq!(r.to_string(), "localhost:5000/hello@sha256:abc");
        assert_eq!(r.tagged(), "localhost:5000/hello:test-42");
    }
}
