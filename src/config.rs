//! Parser configuration
//!
//! A [`Configuration`] is built in code or loaded from TOML:
//!
//! ```toml
//! annotation_markers = ["rpc", "SERIALIZE"]
//! include_paths = ["include", "../common"]
//! defined_only_default = false
//! error_policy = "skip"           # or "abort"
//! detached_annotations = "attach" # or "error"
//! ```
//!
//! Validation happens in [`Configuration::validate`], which the parser runs
//! before touching any file.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default nesting limit for `#include` chains
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Setup problems, reported before parsing starts
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no annotation markers configured; at least one is required")]
    NoMarkers,

    #[error("annotation marker '{0}' is not a valid C identifier")]
    InvalidMarker(String),

    #[error("failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {}: {message}", .path.display())]
    Format { path: PathBuf, message: String },
}

/// What a `parse()` call does with a recoverable error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the first error and leave the session as it was before the call
    Abort,
    /// Record the error, resynchronize, and keep going
    #[default]
    Skip,
}

/// What happens to an annotation separated from its declaration by a blank line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachedAnnotationPolicy {
    #[default]
    Attach,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    pub annotation_markers: BTreeSet<String>,
    pub include_paths: Vec<PathBuf>,
    pub defined_only_default: bool,
    pub error_policy: ErrorPolicy,
    pub detached_annotations: DetachedAnnotationPolicy,
    pub max_include_depth: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            annotation_markers: BTreeSet::new(),
            include_paths: Vec::new(),
            defined_only_default: false,
            error_policy: ErrorPolicy::default(),
            detached_annotations: DetachedAnnotationPolicy::default(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl Configuration {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Configuration {
            annotation_markers: markers.into_iter().map(Into::into).collect(),
            ..Configuration::default()
        }
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_defined_only_default(mut self, defined_only: bool) -> Self {
        self.defined_only_default = defined_only;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_detached_annotations(mut self, policy: DetachedAnnotationPolicy) -> Self {
        self.detached_annotations = policy;
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Parse a TOML document. `origin` only labels errors.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let config: Configuration =
            toml::from_str(text).map_err(|e| ConfigurationError::Format {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.annotation_markers.is_empty() {
            return Err(ConfigurationError::NoMarkers);
        }
        if let Some(bad) = self.annotation_markers.iter().find(|m| !is_identifier(m)) {
            return Err(ConfigurationError::InvalidMarker(bad.clone()));
        }
        Ok(())
    }

    pub fn is_marker(&self, name: &str) -> bool {
        self.annotation_markers.contains(name)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_markers_rejected() {
        let config = Configuration::default();
        assert!(matches!(config.validate(), Err(ConfigurationError::NoMarkers)));
    }

    #[test]
    fn test_invalid_marker_rejected() {
        let config = Configuration::new(["rpc", "not a name"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidMarker(ref m)) if m == "not a name"
        ));
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
            annotation_markers = ["rpc_cmd", "SERIALIZE"]
            include_paths = ["include"]
            error_policy = "abort"
            detached_annotations = "error"
        "#;
        let config = Configuration::from_toml_str(text, Path::new("rpc.toml")).unwrap();

        assert!(config.is_marker("rpc_cmd"));
        assert!(config.is_marker("SERIALIZE"));
        assert_eq!(config.include_paths, vec![PathBuf::from("include")]);
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert_eq!(config.detached_annotations, DetachedAnnotationPolicy::Error);
        assert!(!config.defined_only_default);
        assert_eq!(config.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
    }

    #[test]
    fn test_from_toml_unknown_key() {
        let err = Configuration::from_toml_str(
            "annotation_markers = [\"rpc\"]\nbogus = 1\n",
            Path::new("rpc.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Format { .. }));
    }

    #[test]
    fn test_from_toml_without_markers() {
        let err = Configuration::from_toml_str("include_paths = []\n", Path::new("rpc.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NoMarkers));
    }
}
