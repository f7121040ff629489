//! Storage backend selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which storage backend strategy to use for downloaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick based on what the download root already contains (default).
    #[default]
    Auto,
    /// Plain directory tree under the public download root.
    Direct,
    /// Files addressed through the content index.
    Indexed,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Auto => write!(f, "auto"),
            BackendKind::Direct => write!(f, "direct"),
            BackendKind::Indexed => write!(f, "indexed"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "direct" => Ok(BackendKind::Direct),
            "indexed" => Ok(BackendKind::Indexed),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip_names() {
        for kind in [BackendKind::Auto, BackendKind::Direct, BackendKind::Indexed] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
        assert!("mediastore".parse::<BackendKind>().is_err());
    }
}
