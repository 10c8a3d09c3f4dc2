//! JSON skip paths.
//!
//! A skip path names a field whose value is expected to differ between the
//! two upstreams (timestamps, request ids, ...). Before the second
//! comparison every skip path is overwritten with [`MASK_SENTINEL`] on both
//! sides.
//!
//! Syntax: components separated by `.`, `\.` for a literal dot. A numeric
//! component indexes an array and is a plain key on an object. Numeric
//! components above [`MAX_ARRAY_INDEX`] are rejected, since masking pads
//! arrays up to the index.

use std::fmt;

use serde_json::Value;

/// Value written over every masked field.
pub const MASK_SENTINEL: &str = "useless";

/// Largest numeric component a skip path may carry.
pub const MAX_ARRAY_INDEX: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipPathError {
    #[error("path is empty")]
    Empty,

    #[error("component {0} is empty")]
    EmptyComponent(usize),

    #[error("path ends with a dangling escape")]
    DanglingEscape,

    #[error("component `{0}` exceeds the maximum array index {MAX_ARRAY_INDEX}")]
    IndexTooLarge(String),
}

/// A parsed skip path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipPath {
    raw: String,
    components: Vec<String>,
}

impl SkipPath {
    pub fn parse(raw: &str) -> Result<Self, SkipPathError> {
        if raw.is_empty() {
            return Err(SkipPathError::Empty);
        }

        let mut components = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => current.push(chars.next().ok_or(SkipPathError::DanglingEscape)?),
                '.' => {
                    if current.is_empty() {
                        return Err(SkipPathError::EmptyComponent(components.len()));
                    }
                    components.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }
        if current.is_empty() {
            return Err(SkipPathError::EmptyComponent(components.len()));
        }
        components.push(current);

        if let Some(c) = components.iter().find(|c| index_too_large(c)) {
            return Err(SkipPathError::IndexTooLarge(c.clone()));
        }

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Write `replacement` at this path, creating whatever is missing.
    ///
    /// Missing keys become objects, short arrays are padded with `null`, and
    /// scalars in the way are replaced by objects.
    pub fn set(&self, root: &mut Value, replacement: Value) {
        let mut slot = root;
        for component in &self.components {
            slot = child_mut(slot, component);
        }
        *slot = replacement;
    }
}

impl fmt::Display for SkipPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn index_too_large(component: &str) -> bool {
    component.bytes().all(|b| b.is_ascii_digit())
        && component.parse::<usize>().map_or(true, |i| i > MAX_ARRAY_INDEX)
}

fn child_mut<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    match key.parse::<usize>() {
        Ok(index) if index <= MAX_ARRAY_INDEX && value.is_array() => {
            let Value::Array(items) = value else {
                unreachable!()
            };
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        _ => {
            let slot = value;
            if !slot.is_object() {
                // indexing null by key turns it into an empty object
                *slot = Value::Null;
            }
            &mut slot[key]
        }
    }
}

/// Ordered, immutable set of skip paths built at startup.
#[derive(Debug, Clone, Default)]
pub struct SkipPathSet {
    paths: Vec<SkipPath>,
}

impl SkipPathSet {
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, SkipPathError> {
        let paths = raw
            .iter()
            .map(|p| SkipPath::parse(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { paths })
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Overwrite every path in `value` with the sentinel.
    pub fn mask(&self, value: &mut Value) {
        for path in &self.paths {
            path.set(value, Value::String(MASK_SENTINEL.to_string()));
        }
    }
}
