//! Cache Key Module
//!
//! Maps request paths onto cache keys and metric names.

/// Character substituted for every `/` in a path.
pub const KEY_DELIMITER: char = '.';

// == Key Deriver ==
/// Derives cache keys from request paths.
///
/// `/nodes/foo` becomes `nodes.foo`. Method and query string are not part of
/// the key, so a write to a path clears exactly the entry a read of the same
/// path consults.
#[derive(Debug, Clone, Copy)]
pub struct KeyDeriver {
    delimiter: char,
}

impl KeyDeriver {
    /// Creates a deriver using the given delimiter.
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    // == Derive ==
    /// Replaces every path separator with the delimiter, then strips a single
    /// leading delimiter.
    pub fn derive(&self, path: &str) -> String {
        let replaced: String = path
            .chars()
            .map(|c| if c == '/' { self.delimiter } else { c })
            .collect();

        match replaced.strip_prefix(self.delimiter) {
            Some(stripped) => stripped.to_string(),
            None => replaced,
        }
    }

    // == Metric Name ==
    /// Builds a metric name scoped to a path, e.g. `nodes.foo.cache.hit`.
    pub fn metric_name(&self, path: &str, suffix: &str) -> String {
        format!("{}{}{}", self.derive(path), self.delimiter, suffix)
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(KEY_DELIMITER)
    }
}
