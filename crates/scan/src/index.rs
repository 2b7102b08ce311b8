//! Column path indexing
//!
//! The [`Indexer`] walks a [`TypeDescriptor`] breadth-first and produces a
//! [`ColumnIndex`]: column name -> field access path. Shallower fields win
//! over deeper ones and earlier declarations win over later ones, so an
//! ambiguous embedded member is shadowed instead of reported.

use crate::config::ScanConfig;
use crate::descriptor::{FieldKind, OPAQUE_OPTION, ParsedTag, TypeDescriptor};
use crate::error::{Error, Result};
use crate::naming::NameMapper;
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Positions (and names) of the fields leading from a record's root to a
/// possibly nested field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    indices: Vec<usize>,
    names: Vec<&'static str>,
}

impl FieldPath {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    fn child(&self, index: usize, name: &'static str) -> Self {
        let mut path = self.clone();
        path.indices.push(index);
        path.names.push(name);
        path
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join("."))
    }
}

/// Column name -> field path for one record type
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
    type_id: TypeId,
    type_name: &'static str,
    paths: HashMap<String, FieldPath>,
}

impl ColumnIndex {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn path(&self, column: &str) -> Option<&FieldPath> {
        self.paths.get(column)
    }

    /// Resolve each column, `None` where the record has no matching field
    pub fn paths_by_names<S: AsRef<str>>(&self, columns: &[S]) -> Vec<Option<&FieldPath>> {
        columns.iter().map(|c| self.path(c.as_ref())).collect()
    }

    /// All mapped column names, sorted
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.paths.keys().map(String::as_str).collect();
        columns.sort_unstable();
        columns
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A record type waiting to be traversed
struct Pending {
    desc: TypeDescriptor,
    prefix: String,
    path: FieldPath,
    // Record types on the way down from the root, to stop on recursive types
    ancestors: Vec<TypeId>,
}

/// Builds column indexes according to the mapping conventions
#[derive(Debug, Clone)]
pub struct Indexer {
    tag_key: String,
    mapper: NameMapper,
    separator: String,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl Indexer {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            tag_key: config.tag_key.clone(),
            mapper: config.name_mapper.clone(),
            separator: config.separator.clone(),
        }
    }

    fn join(&self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", prefix, self.separator, name)
        }
    }

    /// Build the column index for `root`
    pub fn build(&self, root: &TypeDescriptor) -> Result<ColumnIndex> {
        let mut paths: HashMap<String, FieldPath> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(Pending {
            desc: root.clone(),
            prefix: String::new(),
            path: FieldPath::default(),
            ancestors: vec![root.type_id()],
        });

        while let Some(pending) = queue.pop_front() {
            // Direct registrations made by this record, to catch two of its
            // own fields claiming the same column
            let mut own: HashMap<String, FieldPath> = HashMap::new();

            for field in pending.desc.fields() {
                let tag = field
                    .tag(&self.tag_key)
                    .map(ParsedTag::parse)
                    .unwrap_or_default();

                let embedded_record = field.embedded && field.is_record();
                if !field.public && !embedded_record {
                    continue;
                }
                if tag.is_skip() {
                    continue;
                }

                let name = match tag.name {
                    Some(name) => name.to_string(),
                    None => self.mapper.map(field.name),
                };
                let column = self.join(&pending.prefix, &name);
                let path = pending.path.child(field.index, field.name);

                if let FieldKind::Record { describe, .. } = field.kind
                    && !tag.has_option(OPAQUE_OPTION)
                {
                    let desc = describe();
                    if pending.ancestors.contains(&desc.type_id()) {
                        tracing::debug!(
                            "Not descending into recursive field {} of {}",
                            path,
                            root.type_name()
                        );
                    } else {
                        let prefix = if field.embedded && tag.name.is_none() {
                            pending.prefix.clone()
                        } else {
                            column.clone()
                        };
                        let mut ancestors = pending.ancestors.clone();
                        ancestors.push(desc.type_id());
                        queue.push_back(Pending {
                            desc,
                            prefix,
                            path: path.clone(),
                            ancestors,
                        });
                    }

                    if field.embedded {
                        continue;
                    }
                }

                match own.entry(column.clone()) {
                    Entry::Occupied(first) => {
                        return Err(Error::DuplicateColumnMapping {
                            type_name: root.type_name(),
                            column,
                            first: first.get().clone(),
                            second: path,
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(path.clone());
                    }
                }

                paths.entry(column).or_insert(path);
            }
        }

        tracing::debug!(
            "Indexed {} columns for {}",
            paths.len(),
            root.type_name()
        );

        Ok(ColumnIndex {
            type_id: root.type_id(),
            type_name: root.type_name(),
            paths,
        })
    }
}
