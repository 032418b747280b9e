//! Related-data inclusion paths

use std::fmt;
use std::str::FromStr;

use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Dotted path naming related data to attach to each result
///
/// Segments are non-empty and made of ASCII letters, digits and `_`, so
/// `category` and `category.parent` are valid while `category..parent` is not.
///
/// # Example
///
/// ```rust
/// use acton_query::specification::IncludePath;
///
/// let path = IncludePath::parse("category.parent").unwrap();
/// assert_eq!(path.segments().collect::<Vec<_>>(), vec!["category", "parent"]);
/// assert_eq!(path.root(), "category");
/// assert!(IncludePath::parse("category..parent").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncludePath(String);

impl IncludePath {
    /// Validate and wrap a dotted path
    pub fn parse(path: impl AsRef<str>) -> RepositoryResult<Self> {
        let path = path.as_ref().trim();
        let valid = !path.is_empty()
            && path.split('.').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if valid {
            Ok(Self(path.to_string()))
        } else {
            Err(RepositoryError::invalid_argument(
                RepositoryOperation::BuildSpecification,
                "include",
                format!("'{}' is not a valid include path", path),
            ))
        }
    }

    /// The full dotted path
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First segment, the relation on the entity itself
    pub fn root(&self) -> &str {
        self.segments().next().unwrap_or(&self.0)
    }

    /// Path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IncludePath {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for IncludePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[test]
    fn test_parse_single_segment() {
        let path = IncludePath::parse("category").unwrap();
        assert_eq!(path.as_str(), "category");
        assert_eq!(path.root(), "category");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let path: IncludePath = " items.product ".parse().unwrap();
        assert_eq!(path.to_string(), "items.product");
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for bad in ["", ".", "a.", ".a", "a..b", "a b", "a-b"] {
            let error = IncludePath::parse(bad).unwrap_err();
            assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument, "{bad:?}");
            assert_eq!(error.field.as_deref(), Some("include"));
        }
    }
}
