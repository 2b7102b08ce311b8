//! Row filler
//!
//! Fills one destination from the current row. The first call reads the
//! column names and resolves them against the destination once; every later
//! call reuses that plan and hands the row source one batch of targets.

use crate::cache::IndexCache;
use crate::config::ScanConfig;
use crate::error::{Error, Phase, Result};
use crate::index::{ColumnIndex, Indexer};
use crate::record::{FieldMut, RecordMut};
use crate::rows::{Rows, Target};
use crate::shape::{Destination, MapMut, Shape, SlotMut, classify};
use rowscan_value::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Columns of one row laid over a record's field tree
#[derive(Debug, Default)]
struct PathNode {
    // Row position of the column targeting this field itself
    column: Option<usize>,
    children: BTreeMap<usize, PathNode>,
}

impl PathNode {
    fn first_column(&self) -> Option<usize> {
        self.column
            .or_else(|| self.children.values().find_map(PathNode::first_column))
    }

    fn insert(&mut self, indices: &[usize], position: usize, columns: &[String]) -> Result<()> {
        let overlap = |column: usize, ancestor: usize| Error::OverlappingColumns {
            column: columns[column].clone(),
            ancestor: columns[ancestor].clone(),
        };

        let mut node = self;
        for index in indices {
            if let Some(ancestor) = node.column {
                return Err(overlap(position, ancestor));
            }
            node = node.children.entry(*index).or_default();
        }

        if let Some(existing) = node.column {
            return Err(overlap(position, existing));
        }
        if let Some(member) = node.first_column() {
            return Err(overlap(member, position));
        }
        node.column = Some(position);
        Ok(())
    }
}

#[derive(Debug)]
enum Plan {
    Record {
        type_id: TypeId,
        index: Arc<ColumnIndex>,
        tree: PathNode,
        discard: Vec<usize>,
    },
    Map {
        type_id: TypeId,
        value_type: &'static str,
    },
    Scalar {
        type_id: TypeId,
    },
}

impl Plan {
    fn type_id(&self) -> TypeId {
        match self {
            Plan::Record { type_id, .. } | Plan::Map { type_id, .. } | Plan::Scalar { type_id } => {
                *type_id
            }
        }
    }
}

#[derive(Debug)]
enum State {
    NotStarted,
    Started {
        columns: Vec<String>,
        plan: Option<Plan>,
    },
}

/// Per-pass row filling state
pub struct RowFiller {
    indexer: Indexer,
    cache: Arc<dyn IndexCache>,
    ignore_unknown_columns: bool,
    state: State,
}

impl RowFiller {
    pub fn new(config: &ScanConfig, cache: Arc<dyn IndexCache>) -> Self {
        Self {
            indexer: Indexer::new(config),
            cache,
            ignore_unknown_columns: config.ignore_unknown_columns,
            state: State::NotStarted,
        }
    }

    /// Column names of the pass, once the first row has been seen
    pub fn columns(&self) -> Option<&[String]> {
        match &self.state {
            State::NotStarted => None,
            State::Started { columns, .. } => Some(columns),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, State::Started { .. })
    }

    /// Fill `dest` from the current row of `rows`
    pub fn fill(&mut self, rows: &mut dyn Rows, dest: &mut dyn Destination) -> Result<()> {
        let classified = classify(dest, false)?;
        let type_name = dest.type_name();
        let slot = dest
            .slot()
            .ok_or_else(|| Error::InvalidDestination(format!("{} is not writable", type_name)))?;
        self.fill_slot(rows, classified.shape, slot)
    }

    /// All values of the current row, in column order
    pub fn values(&mut self, rows: &mut dyn Rows) -> Result<Vec<Value>> {
        let count = self.start(rows)?.len();
        current_values(rows, count)
    }

    pub(crate) fn fill_slot(
        &mut self,
        rows: &mut dyn Rows,
        shape: Shape,
        slot: SlotMut<'_>,
    ) -> Result<()> {
        self.start(rows)?;
        self.prepare(shape)?;

        let State::Started {
            columns,
            plan: Some(plan),
        } = &self.state
        else {
            unreachable!("prepared filler has a plan");
        };

        match (plan, slot) {
            (
                Plan::Record {
                    index,
                    tree,
                    discard,
                    ..
                },
                SlotMut::Record(record),
            ) => fill_record(rows, columns, index, tree, discard, record)?,
            (Plan::Map { value_type, .. }, SlotMut::Map(map)) => {
                fill_map(rows, columns, *value_type, map)?
            }
            (Plan::Scalar { .. }, SlotMut::Scalar(slot)) => {
                assign(rows, &mut [Target::Value(slot)])?
            }
            (Plan::Scalar { .. }, SlotMut::Sequence(seq)) => {
                assign(rows, &mut [Target::Sequence(seq)])?
            }
            _ => {
                return Err(Error::InvalidDestination(format!(
                    "{} does not hand out storage matching its shape",
                    shape.type_name()
                )));
            }
        }

        tracing::trace!("Filled row into {}", shape.type_name());
        Ok(())
    }

    /// Read the column names on the first call
    fn start(&mut self, rows: &mut dyn Rows) -> Result<&[String]> {
        if let State::NotStarted = self.state {
            let columns = rows
                .columns()
                .map_err(|e| Error::from_source(Phase::ColumnDiscovery, e))?;

            let mut seen = HashSet::with_capacity(columns.len());
            for column in &columns {
                if !seen.insert(column.as_str()) {
                    return Err(Error::DuplicateColumn(column.clone()));
                }
            }

            self.state = State::Started {
                columns,
                plan: None,
            };
        }

        match &self.state {
            State::Started { columns, .. } => Ok(columns),
            State::NotStarted => unreachable!("filler just started"),
        }
    }

    /// Resolve the row's columns against `shape`, once per destination type
    fn prepare(&mut self, shape: Shape) -> Result<()> {
        let State::Started { columns, plan } = &mut self.state else {
            unreachable!("prepare runs after start");
        };
        let columns: &Vec<String> = columns;
        if plan.as_ref().is_some_and(|p| p.type_id() == shape.type_id()) {
            return Ok(());
        }

        let built = match shape {
            Shape::Record {
                type_id, describe, ..
            } => {
                let indexer = &self.indexer;
                let index = self
                    .cache
                    .get_or_build(type_id, &|| indexer.build(&describe()))?;

                let mut tree = PathNode::default();
                let mut discard = Vec::new();
                for (position, column) in columns.iter().enumerate() {
                    match index.path(column) {
                        Some(path) => tree.insert(path.indices(), position, columns)?,
                        None if self.ignore_unknown_columns => {
                            tracing::trace!(
                                "Ignoring column {} unknown to {}",
                                column,
                                index.type_name()
                            );
                            discard.push(position);
                        }
                        None => {
                            return Err(Error::UnmappedColumn {
                                type_name: index.type_name(),
                                column: column.clone(),
                            });
                        }
                    }
                }

                Plan::Record {
                    type_id,
                    index,
                    tree,
                    discard,
                }
            }
            Shape::Map {
                type_id,
                key_type,
                string_keys,
                value_type,
                ..
            } => {
                if !string_keys {
                    return Err(Error::UnsupportedMapKey { key_type });
                }
                Plan::Map {
                    type_id,
                    value_type,
                }
            }
            Shape::Scalar { type_id, .. } => {
                if columns.len() != 1 {
                    return Err(Error::ColumnCountMismatch {
                        expected: 1,
                        found: columns.len(),
                    });
                }
                Plan::Scalar { type_id }
            }
        };

        *plan = Some(built);
        Ok(())
    }
}

fn assign(rows: &mut dyn Rows, targets: &mut [Target<'_>]) -> Result<()> {
    rows.assign_values(targets)
        .map_err(|e| Error::from_source(Phase::ValueAssignment, e))
}

fn current_values(rows: &mut dyn Rows, count: usize) -> Result<Vec<Value>> {
    if let Some(values) = rows.materialized_values() {
        return values.map_err(|e| Error::from_source(Phase::ValueAssignment, e));
    }

    let mut values = vec![Value::Null; count];
    let mut targets: Vec<Target<'_>> = values
        .iter_mut()
        .map(|v| Target::Value(v))
        .collect();
    assign(rows, &mut targets)?;
    drop(targets);
    Ok(values)
}

fn fill_map(
    rows: &mut dyn Rows,
    columns: &[String],
    value_type: &'static str,
    map: &mut dyn MapMut,
) -> Result<()> {
    let values = current_values(rows, columns.len())?;
    if values.len() != columns.len() {
        return Err(Error::ColumnCountMismatch {
            expected: columns.len(),
            found: values.len(),
        });
    }

    for (column, value) in columns.iter().zip(values) {
        map.insert_column(column, value)
            .map_err(|source| Error::UnconvertibleMapValue {
                column: column.clone(),
                value_type,
                source,
            })?;
    }
    Ok(())
}

fn fill_record(
    rows: &mut dyn Rows,
    columns: &[String],
    index: &ColumnIndex,
    tree: &PathNode,
    discard: &[usize],
    record: &mut dyn RecordMut,
) -> Result<()> {
    let mut targets: Vec<Option<Target<'_>>> = Vec::with_capacity(columns.len());
    targets.resize_with(columns.len(), || None);
    for position in discard {
        targets[*position] = Some(Target::Discard);
    }

    collect_targets(record, tree, &mut targets)?;

    let mut batch = Vec::with_capacity(targets.len());
    for (position, target) in targets.into_iter().enumerate() {
        match target {
            Some(target) => batch.push(target),
            None => {
                return Err(Error::InvalidDestination(format!(
                    "{} has no field for column {}",
                    index.type_name(),
                    columns[position]
                )));
            }
        }
    }
    assign(rows, &mut batch)
}

/// Walk `tree` over the record's fields, allocating optional records that
/// have at least one column below them
fn collect_targets<'a>(
    record: &'a mut dyn RecordMut,
    node: &PathNode,
    targets: &mut [Option<Target<'a>>],
) -> Result<()> {
    let record_type = record.record_type();
    for (position, field) in record.record_fields_mut().into_iter().enumerate() {
        let Some(child) = node.children.get(&position) else {
            continue;
        };

        if let Some(column) = child.column {
            targets[column] = Some(match field {
                FieldMut::Value(slot) => Target::Value(slot),
                FieldMut::Record(nested) => Target::Record(nested),
                FieldMut::Optional(nested) => Target::Optional(nested),
            });
            continue;
        }

        let nested: &'a mut dyn RecordMut = match field {
            FieldMut::Record(nested) => nested,
            FieldMut::Optional(nested) => nested.get_or_allocate(),
            FieldMut::Value(_) => {
                return Err(Error::InvalidDestination(format!(
                    "field {} of {} is described as a record but is a value",
                    position, record_type
                )));
            }
        };
        collect_targets(nested, child, targets)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ConcurrentIndexCache;
    use crate::descriptor::{Field, TypeDescriptor};
    use crate::memory::MemoryRows;
    use crate::record::Record;
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq)]
    struct Geo {
        lat: f64,
        lng: f64,
    }

    impl Record for Geo {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Self>()
                .field(Field::scalar("Lat"))
                .field(Field::scalar("Lng"))
        }

        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![FieldMut::value(&mut self.lat), FieldMut::value(&mut self.lng)]
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Place {
        name: String,
        geo: Option<Box<Geo>>,
    }

    impl Record for Place {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Self>()
                .field(Field::scalar("Name"))
                .field(Field::optional::<Box<Geo>>("Geo"))
        }

        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![
                FieldMut::value(&mut self.name),
                FieldMut::optional(&mut self.geo),
            ]
        }
    }

    crate::scannable_record!(Place);

    fn filler() -> RowFiller {
        RowFiller::new(&ScanConfig::default(), Arc::new(ConcurrentIndexCache::new()))
    }

    #[test]
    fn test_fill_record_row_by_row() {
        let mut rows = MemoryRows::new(
            ["name", "geo.lat", "geo.lng"],
            vec![
                vec![Value::string("a"), Value::F64(1.0), Value::F64(2.0)],
                vec![Value::string("b"), Value::F64(3.0), Value::F64(4.0)],
            ],
        );
        let mut filler = filler();
        let mut places = Vec::new();
        while rows.advance() {
            let mut place = Place::default();
            filler.fill(&mut rows, &mut place).unwrap();
            places.push(place);
        }

        assert_eq!(places.len(), 2);
        assert_eq!(places[1].geo.as_deref(), Some(&Geo { lat: 3.0, lng: 4.0 }));
        assert_eq!(filler.columns().unwrap().len(), 3);
    }

    #[test]
    fn test_optional_left_unallocated() {
        let mut rows = MemoryRows::new(["name"], vec![vec![Value::string("a")]]);
        let mut filler = filler();
        let mut place = Place::default();
        rows.advance();
        filler.fill(&mut rows, &mut place).unwrap();
        assert_eq!(place.geo, None);
    }

    #[test]
    fn test_overlapping_columns() {
        let mut rows = MemoryRows::new(
            ["geo.lat", "geo"],
            vec![vec![Value::F64(1.0), Value::Null]],
        );
        rows.advance();
        let mut place = Place::default();
        match filler().fill(&mut rows, &mut place) {
            Err(Error::OverlappingColumns { column, ancestor }) => {
                assert_eq!(column, "geo.lat");
                assert_eq!(ancestor, "geo");
            }
            other => panic!("expected overlap, got {:?}", other),
        }
        assert_eq!(rows.assign_calls(), 0);
    }

    #[test]
    fn test_map_without_materialization() {
        let mut rows = MemoryRows::new(
            ["a", "b"],
            vec![vec![Value::I32(1), Value::I64(2)]],
        )
        .without_materialization();
        rows.advance();

        let mut map: HashMap<String, i64> = HashMap::new();
        filler().fill(&mut rows, &mut map).unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(rows.assign_calls(), 1);
    }

    #[test]
    fn test_values_slice_scan() {
        let mut rows = MemoryRows::new(
            ["a", "b"],
            vec![vec![Value::I32(1), Value::string("x")]],
        )
        .without_materialization();
        rows.advance();

        let values = filler().values(&mut rows).unwrap();
        assert_eq!(values, vec![Value::I32(1), Value::string("x")]);
    }

    #[test]
    fn test_plan_follows_destination_type() {
        let mut rows = MemoryRows::new(
            ["name"],
            vec![vec![Value::string("a")], vec![Value::string("b")]],
        );
        let mut filler = filler();

        rows.advance();
        let mut place = Place::default();
        filler.fill(&mut rows, &mut place).unwrap();

        rows.advance();
        let mut name = String::new();
        filler.fill(&mut rows, &mut name).unwrap();

        assert_eq!(place.name, "a");
        assert_eq!(name, "b");
    }

    #[test]
    fn test_column_discovery_failure() {
        let mut rows = MemoryRows::new(["a"], vec![vec![Value::Null]]).fail_columns("gone");
        rows.advance();
        let mut n: Option<i64> = None;
        match filler().fill(&mut rows, &mut n) {
            Err(Error::Source { phase, .. }) => assert_eq!(phase, Phase::ColumnDiscovery),
            other => panic!("expected source error, got {:?}", other),
        }
    }
}
