use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

/// Segment that steps one level up from the current node.
pub const PARENT: &str = "^";

/// Leading character that marks a key holding expression text.
pub const EXPRESSION_MARKER: char = '.';

/// Reserved key carrying per-node context overrides.
pub const CONTEXT_KEY: &str = "$context";

/// A path that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path '{0}'")]
pub struct PathError(pub String);

/// A `^` segment climbed above the document root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path '{0}' walks above the document root")]
pub struct AncestorError(pub String);

/// A dot-separated path into the document tree.
///
/// Segments are kept exactly as written, so a segment may carry the
/// expression marker (`.greet`) or a variant suffix (`greet:es`). Relative
/// paths may contain [`PARENT`] segments until they are joined onto a base.
///
/// Because `.` separates segments, the expression marker is written as a
/// doubled dot inside a path (`user..greet`) or a leading dot at its start
/// (`.greet`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<String>);

impl Path {
    /// The empty path addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a textual path.
    ///
    /// # Example
    ///
    /// ```
    /// use lazyschema::Path;
    ///
    /// let path = Path::parse("user..greet").unwrap();
    /// assert_eq!(path.segments(), ["user", ".greet"]);
    /// assert_eq!(path.to_string(), "user..greet");
    /// ```
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        let mut marked = false;
        for part in text.split('.') {
            if part.is_empty() {
                if marked {
                    return Err(PathError(text.to_string()));
                }
                marked = true;
                continue;
            }
            if marked {
                segments.push(format!("{EXPRESSION_MARKER}{part}"));
                marked = false;
            } else {
                segments.push(part.to_string());
            }
        }
        if marked {
            return Err(PathError(text.to_string()));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Path {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Append one segment.
    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Resolve `relative` against this path, consuming `^` segments.
    pub fn join(&self, relative: &Path) -> Result<Path, AncestorError> {
        let mut segments = self.0.clone();
        for segment in &relative.0 {
            if segment == PARENT {
                if segments.pop().is_none() {
                    return Err(AncestorError(relative.to_string()));
                }
            } else {
                segments.push(segment.clone());
            }
        }
        Ok(Self(segments))
    }

    /// The path with expression markers and variant suffixes removed.
    ///
    /// Two paths with the same logical form name the same slot of the
    /// document, whichever variant or expression currently fills it.
    pub fn logical(&self) -> Path {
        Self(self.0.iter().map(|s| logical_segment(s).to_string()).collect())
    }

    /// Every prefix from the root (inclusive) up to this path (inclusive).
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (0..=self.0.len()).map(|len| self.prefix(len))
    }

    /// True if `self` is a prefix of `other` (or equal to it).
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }
}

/// Strip the expression marker and variant suffix from one segment.
pub fn logical_segment(segment: &str) -> &str {
    let unmarked = segment
        .strip_prefix(EXPRESSION_MARKER)
        .unwrap_or(segment);
    match unmarked.split_once(':') {
        Some((base, _)) => base,
        None => unmarked,
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
