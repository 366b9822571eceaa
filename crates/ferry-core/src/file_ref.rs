//! File references.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An ordered list of file references.
///
/// Order matters for pairwise operations (`sources[i]` pairs with
/// `targets[i]`) and duplicates are allowed.
pub type FileList = Vec<FileRef>;

/// Identity of a filesystem entry.
///
/// A reference is either a local path or a URI on some other backend.
/// Only local references can be operated on directly; remote ones exist so
/// that callers can hand in whatever their views hold and get a proper
/// "unsupported" error back instead of a silent misinterpretation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileRef {
    /// A path on a locally mounted filesystem.
    Local(PathBuf),
    /// A URI with a non-`file` scheme, e.g. `sftp://host/dir`.
    Remote(String),
}

impl FileRef {
    /// Create a reference to a local path.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// Parse a path or URI.
    ///
    /// `file://` URIs become local paths, any other `scheme://` becomes a
    /// remote reference and everything else is taken as a path.
    pub fn parse(input: &str) -> Self {
        if let Some(path) = input.strip_prefix("file://") {
            return Self::Local(PathBuf::from(path));
        }

        match input.split_once("://") {
            Some((scheme, _)) if is_uri_scheme(scheme) => Self::Remote(input.to_string()),
            _ => Self::Local(PathBuf::from(input)),
        }
    }

    /// The local path, if this reference has one.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// Check if this is a local reference.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// The last component of the reference, if any.
    pub fn basename(&self) -> Option<String> {
        match self {
            Self::Local(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Remote(uri) => uri
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && !s.ends_with(':'))
                .map(str::to_string),
        }
    }

    /// A human readable name for messages.
    ///
    /// Uses the basename and falls back to the full reference for entries
    /// that have none (such as `/`).
    pub fn display_name(&self) -> String {
        self.basename().unwrap_or_else(|| self.to_string())
    }

    /// Check if this reference names a filesystem root.
    pub fn is_root(&self) -> bool {
        match self {
            Self::Local(path) => path.has_root() && path.parent().is_none(),
            Self::Remote(_) => false,
        }
    }

    /// The parent reference, if any.
    pub fn parent(&self) -> Option<FileRef> {
        match self {
            Self::Local(path) => path.parent().map(|p| Self::Local(p.to_path_buf())),
            Self::Remote(uri) => {
                let trimmed = uri.trim_end_matches('/');
                let (head, _) = trimmed.rsplit_once('/')?;
                if head.ends_with('/') || head.ends_with(':') {
                    None
                } else {
                    Some(Self::Remote(head.to_string()))
                }
            }
        }
    }

    /// Append a child name to this reference.
    pub fn join(&self, name: impl AsRef<str>) -> FileRef {
        match self {
            Self::Local(path) => Self::Local(path.join(name.as_ref())),
            Self::Remote(uri) => {
                Self::Remote(format!("{}/{}", uri.trim_end_matches('/'), name.as_ref()))
            }
        }
    }
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`.
fn is_uri_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(uri) => write!(f, "{uri}"),
        }
    }
}

impl From<PathBuf> for FileRef {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}

impl From<&Path> for FileRef {
    fn from(path: &Path) -> Self {
        Self::Local(path.to_path_buf())
    }
}

impl FromStr for FileRef {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
