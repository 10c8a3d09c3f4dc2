//! Response comparison.
//!
//! # Data Flow
//! ```text
//! primary content-type
//!     → ContentKind (json | xml | other)
//!     → json.rs: parse both sides, structural equality,
//!                on mismatch mask skip paths (mask.rs) and retry
//!     → xml / other: byte-exact
//! ```
//!
//! # Design Decisions
//! - Dispatch is a closed enum; unknown content types compare byte-exact
//! - XML has its own kind so a structural comparator can slot in later;
//!   today it is byte-exact
//! - Parse failures are errors, not mismatches

pub mod json;
pub mod mask;

pub use mask::{SkipPath, SkipPathError, SkipPathSet, MASK_SENTINEL, MAX_ARRAY_INDEX};

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("{side} body is not valid JSON: {source}")]
    Parse {
        side: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Comparator family selected from a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Xml,
    Other,
}

impl ContentKind {
    /// Classify a `content-type` value. Case and parameters are ignored.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" | "application/ld+json" => Self::Json,
            "application/xml" | "text/xml" | "application/xhtml+xml" => Self::Xml,
            e if e.ends_with("+json") => Self::Json,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Other => "other",
        }
    }
}

/// Compare two bodies with the comparator for `kind`.
pub fn compare_bodies(
    kind: ContentKind,
    primary: &[u8],
    secondary: &[u8],
    skip: &SkipPathSet,
) -> Result<bool, CompareError> {
    match kind {
        ContentKind::Json => json::json_bytes_equal(primary, secondary, skip),
        ContentKind::Xml | ContentKind::Other => Ok(primary == secondary),
    }
}
