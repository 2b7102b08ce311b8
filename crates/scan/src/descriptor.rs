//! Composite type descriptors
//!
//! A `TypeDescriptor` is the static shape of a record type: its fields in
//! declaration order, their tags, and which of them are nested records.
//! Record types build one in `Record::describe`:
//!
//! ```
//! use rowscan::{Field, TypeDescriptor};
//!
//! struct Person;
//!
//! let desc = TypeDescriptor::of::<Person>()
//!     .field(Field::scalar("FirstName"))
//!     .field(Field::scalar("Email").column("email_address"))
//!     .field(Field::scalar("Password").skip());
//!
//! assert_eq!(desc.fields().len(), 3);
//! assert_eq!(desc.fields()[1].tag("db"), Some("email_address"));
//! ```

use crate::record::Record;
use std::any::TypeId;

/// Tag key consulted for column overrides unless configured otherwise
pub const DEFAULT_TAG_KEY: &str = "db";

/// Tag value that removes a field (and everything below it) from the map
pub const SKIP_TAG: &str = "-";

/// Tag option that maps a composite field as one opaque column
pub const OPAQUE_OPTION: &str = "opaque";

/// What a field holds
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// A leaf value assigned whole from one column
    Scalar,
    /// A nested record, held by value (`optional == false`) or behind
    /// `Option<T>` / `Option<Box<T>>` (`optional == true`)
    Record {
        describe: fn() -> TypeDescriptor,
        optional: bool,
    },
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Scalar => write!(f, "Scalar"),
            FieldKind::Record { optional, .. } => {
                write!(f, "Record {{ optional: {} }}", optional)
            }
        }
    }
}

/// One field of a record type
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as declared
    pub name: &'static str,
    /// Position in declaration order
    pub index: usize,
    /// Whether the field is accessible to the scanner
    pub public: bool,
    /// Members of an embedded record join the parent's namespace
    pub embedded: bool,
    /// `(key, value)` tags, e.g. `("db", "created_at,opaque")`
    pub tags: Vec<(String, String)>,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Raw tag value under `key`
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, FieldKind::Record { .. })
    }
}

/// A tag value split into its column name and options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag<'a> {
    pub name: Option<&'a str>,
    pub options: Vec<&'a str>,
}

impl<'a> ParsedTag<'a> {
    pub fn parse(value: &'a str) -> Self {
        let mut parts = value.split(',');
        let name = parts.next().map(str::trim).filter(|n| !n.is_empty());
        let options = parts.map(str::trim).filter(|o| !o.is_empty()).collect();
        Self { name, options }
    }

    pub fn is_skip(&self) -> bool {
        self.name == Some(SKIP_TAG)
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.contains(&option)
    }
}

/// Static description of a record type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Start describing `T`
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
        }
    }

    /// Append the next declared field
    pub fn field(mut self, field: Field) -> Self {
        let index = self.fields.len();
        self.fields.push(field.into_descriptor(index));
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Builder for one field of a `TypeDescriptor`
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    public: bool,
    embedded: bool,
    tags: Vec<(String, String)>,
    kind: FieldKind,
}

impl Field {
    /// A leaf field
    pub fn scalar(name: &'static str) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    /// A nested record held by value
    pub fn record<T: Record>(name: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Record {
                describe: T::describe,
                optional: false,
            },
        )
    }

    /// A nested record held as `Option<T>` or `Option<Box<T>>`
    pub fn optional<T: Record>(name: &'static str) -> Self {
        Self::new(
            name,
            FieldKind::Record {
                describe: T::describe,
                optional: true,
            },
        )
    }

    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            public: true,
            embedded: false,
            tags: Vec::new(),
            kind,
        }
    }

    /// Attach a tag, replacing an earlier one under the same key
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.tags.retain(|(k, _)| *k != key);
        self.tags.push((key, value.into()));
        self
    }

    /// Override the column name under the default tag key
    pub fn column(self, name: impl Into<String>) -> Self {
        let options = self.default_tag_options();
        self.tag(DEFAULT_TAG_KEY, format!("{}{}", name.into(), options))
    }

    /// Exclude the field and everything below it
    pub fn skip(self) -> Self {
        self.tag(DEFAULT_TAG_KEY, SKIP_TAG)
    }

    /// Map a composite field as one column instead of traversing it
    pub fn opaque(self) -> Self {
        let value = match self.tag_value(DEFAULT_TAG_KEY) {
            Some(existing) => format!("{},{}", existing, OPAQUE_OPTION),
            None => format!(",{}", OPAQUE_OPTION),
        };
        self.tag(DEFAULT_TAG_KEY, value)
    }

    /// Flatten the field's members into the parent's namespace
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Mark the field as not accessible
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn default_tag_options(&self) -> String {
        self.tag_value(DEFAULT_TAG_KEY)
            .and_then(|v| v.find(',').map(|at| v[at..].to_string()))
            .unwrap_or_default()
    }

    fn into_descriptor(self, index: usize) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name,
            index,
            public: self.public,
            embedded: self.embedded,
            tags: self.tags,
            kind: self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            ParsedTag::parse("created_at,opaque"),
            ParsedTag {
                name: Some("created_at"),
                options: vec!["opaque"],
            }
        );
        assert_eq!(ParsedTag::parse(",opaque").name, None);
        assert!(ParsedTag::parse("-").is_skip());
        assert!(!ParsedTag::parse("").is_skip());
    }

    #[test]
    fn test_field_builder_tags() {
        let desc = TypeDescriptor::of::<Probe>()
            .field(Field::scalar("A").opaque().column("a_col"))
            .field(Field::scalar("B").column("b_col").opaque())
            .field(Field::scalar("C").tag("sql", "c_col"));

        let fields = desc.fields();
        assert_eq!(fields[0].tag(DEFAULT_TAG_KEY), Some("a_col,opaque"));
        assert_eq!(fields[1].tag(DEFAULT_TAG_KEY), Some("b_col,opaque"));
        assert_eq!(fields[2].tag("sql"), Some("c_col"));
        assert_eq!(fields[2].tag(DEFAULT_TAG_KEY), None);
        assert_eq!(
            fields.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_type_identity() {
        let desc = TypeDescriptor::of::<Probe>();
        assert_eq!(desc.type_id(), TypeId::of::<Probe>());
        assert!(desc.type_name().ends_with("Probe"));
    }
}
