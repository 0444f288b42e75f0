use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const REL_PATH_MAX_LEN: usize = 256;

/// Cache key for a single data file, always relative to the resolved base
/// directory and forward-slash separated (`<folder>/<file>`).
///
/// Traversal components are rejected at parse time, so a `RelativePath` can be
/// joined onto the base directory without escaping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct RelativePath(String);

impl RelativePath {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError(
                "relative path must not be empty".to_string(),
            ));
        }
        if s.len() > REL_PATH_MAX_LEN {
            return Err(ValidationError(format!(
                "relative path exceeds max length {REL_PATH_MAX_LEN}"
            )));
        }
        if s.starts_with('/') {
            return Err(ValidationError(
                "path must be relative to the base directory".to_string(),
            ));
        }
        if s.contains('\\') || s.contains('\0') {
            return Err(ValidationError(
                "relative path must use forward slashes and contain no NUL bytes".to_string(),
            ));
        }
        for component in s.split('/') {
            if component.is_empty() {
                return Err(ValidationError(
                    "relative path must not contain empty components".to_string(),
                ));
            }
            if component == "." || component == ".." {
                return Err(ValidationError(
                    "relative path must not contain traversal components".to_string(),
                ));
            }
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    #[must_use]
    pub fn join_onto(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for component in self.0.split('/') {
            out.push(component);
        }
        out
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_folder_and_file_shape() {
        let p = RelativePath::parse("AAPL/D.json").expect("valid path");
        assert_eq!(p.as_str(), "AAPL/D.json");
        assert_eq!(p.file_name(), "D.json");
    }

    #[test]
    fn accepts_nested_components() {
        let p = RelativePath::parse("ds/quality/AAPL_2021-03-04/points.json").expect("valid path");
        assert_eq!(p.file_name(), "points.json");
    }

    #[test]
    fn rejects_empty_and_absolute_input() {
        assert!(RelativePath::parse("").is_err());
        assert!(RelativePath::parse("   ").is_err());
        assert!(RelativePath::parse("/etc/passwd").is_err());
    }

    #[test]
    fn rejects_traversal_and_empty_components() {
        assert!(RelativePath::parse("../secrets.json").is_err());
        assert!(RelativePath::parse("AAPL/../MSFT/D.json").is_err());
        assert!(RelativePath::parse("AAPL/./D.json").is_err());
        assert!(RelativePath::parse("AAPL//D.json").is_err());
    }

    #[test]
    fn rejects_backslashes_and_overlong_input() {
        assert!(RelativePath::parse("AAPL\\D.json").is_err());
        let long = "a/".repeat(200) + "x.json";
        assert!(RelativePath::parse(&long).is_err());
    }

    #[test]
    fn joins_components_onto_root() {
        let p = RelativePath::parse("MSFT/H.json").expect("valid path");
        let joined = p.join_onto(Path::new("/srv/chartdata/ds"));
        assert_eq!(joined, Path::new("/srv/chartdata/ds/MSFT/H.json"));
    }
}
