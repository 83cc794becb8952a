use std::fmt;
use std::str::FromStr;

/// An image platform in `os/architecture[/variant]` form.
///
/// # Examples
///
/// ```
/// use relkit_core::Platform;
///
/// let platform: Platform = "linux/arm64".parse().unwrap();
/// assert_eq!(platform.architecture, "arm64");
/// assert_eq!(platform.rust_target().unwrap(), "aarch64-unknown-linux-musl");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl Platform {
    /// The Rust target triple producing a static binary for this platform.
    pub fn rust_target(&self) -> crate::Result<&'static str> {
        let triple = match (
            self.os.as_str(),
            self.architecture.as_str(),
            self.variant.as_deref(),
        ) {
            ("linux", "amd64", None) => "x86_64-unknown-linux-musl",
            ("linux", "arm64", None | Some("v8")) => "aarch64-unknown-linux-musl",
            ("linux", "arm", Some("v7")) => "armv7-unknown-linux-musleabihf",
            ("linux", "arm", Some("v6")) => "arm-unknown-linux-musleabihf",
            ("linux", "386", None) => "i686-unknown-linux-musl",
            _ => return Err(crate::Error::UnsupportedPlatform(self.to_string())),
        };
        Ok(triple)
    }

    /// Whether an index entry's platform fields select this platform.
    ///
    /// An entry without a variant matches when this platform has none, or
    /// when the variant is the implied default (`arm64/v8`).
    pub fn matches(&self, os: &str, architecture: &str, variant: Option<&str>) -> bool {
        if self.os != os || self.architecture != architecture {
            return false;
        }
        match (self.variant.as_deref(), variant) {
            (None, None) => true,
            (Some(want), Some(have)) => want == have,
            (Some("v8"), None) | (None, Some("v8")) => self.architecture == "arm64",
            _ => false,
        }
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let invalid = |reason| crate::Error::InvalidPlatform {
            value: s.to_owned(),
            reason,
        };

        let mut parts = s.split('/');
        let os = parts.next().filter(|p| !p.is_empty());
        let architecture = parts.next().filter(|p| !p.is_empty());
        let variant = parts.next();

        if parts.next().is_some() {
            return Err(invalid("expected os/arch[/variant]"));
        }
        let (Some(os), Some(architecture)) = (os, architecture) else {
            return Err(invalid("expected os/arch[/variant]"));
        };
        if variant.is_some_and(str::is_empty) {
            return Err(invalid("empty variant"));
        }

        Ok(Self {
            os: os.to_owned(),
            architecture: architecture.to_owned(),
            variant: variant.map(str::to_owned),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}
