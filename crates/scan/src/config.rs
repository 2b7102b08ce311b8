//! Scanner configuration

use crate::descriptor::DEFAULT_TAG_KEY;
use crate::naming::NameMapper;

/// Default capacity of the bounded index cache
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Construction-time mapping conventions
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Tag key holding column overrides (default: `db`)
    pub tag_key: String,

    /// Field name to column name transform (default: snake_case)
    pub name_mapper: NameMapper,

    /// Joins nested record prefixes to member names (default: `.`)
    pub separator: String,

    /// Skip row columns with no destination field instead of failing
    pub ignore_unknown_columns: bool,

    /// `None` for the unbounded concurrent cache, `Some(n)` for an LRU
    /// cache holding at most `n` record types
    pub cache_capacity: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tag_key: DEFAULT_TAG_KEY.to_string(),
            name_mapper: NameMapper::SnakeCase,
            separator: ".".to_string(),
            ignore_unknown_columns: false,
            cache_capacity: None,
        }
    }
}

impl ScanConfig {
    /// Set the tag key
    pub fn with_tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_key = key.into();
        self
    }

    /// Set the name mapper
    pub fn with_name_mapper(mut self, mapper: NameMapper) -> Self {
        self.name_mapper = mapper;
        self
    }

    /// Set the nesting separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Tolerate unknown columns
    pub fn with_ignore_unknown_columns(mut self, ignore: bool) -> Self {
        self.ignore_unknown_columns = ignore;
        self
    }

    /// Use a bounded LRU cache
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }
}
