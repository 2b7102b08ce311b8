//! In-memory row sequence
//!
//! Owned column names plus rows of values, the shape a query result has
//! once it has been fetched. Failures can be injected at each step of the
//! row protocol, and release and assignment calls are counted.

use crate::error::SourceError;
use crate::rows::{Rows, Target};
use rowscan_value::{Row, Value, ValueError};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryRowsError {
    #[error("{0}")]
    Injected(String),

    #[error("no current row")]
    NoCurrentRow,

    #[error("expected {expected} targets, got {found}")]
    TargetCount { expected: usize, found: usize },

    #[error("row has {found} values for {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("column {column}: {source}")]
    Value {
        column: String,
        #[source]
        source: ValueError,
    },
}

#[derive(Debug, Default)]
struct Faults {
    columns: Option<String>,
    assignment: Option<String>,
    release: Option<String>,
    // Stop after this many rows and report the message from last_error
    iteration: Option<(usize, String)>,
}

/// A [`Rows`] over owned values
#[derive(Debug)]
pub struct MemoryRows {
    columns: Vec<String>,
    pending: VecDeque<Row>,
    current: Option<Row>,
    materialize: bool,
    faults: Faults,
    advanced: usize,
    released: bool,
    release_count: usize,
    assign_calls: usize,
    failed: Option<String>,
}

impl MemoryRows {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Row>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            pending: rows.into(),
            current: None,
            materialize: true,
            faults: Faults::default(),
            advanced: 0,
            released: false,
            release_count: 0,
            assign_calls: 0,
            failed: None,
        }
    }

    /// No rows at all
    pub fn empty<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::new(columns, Vec::new())
    }

    /// Force map destinations through `assign_values`
    pub fn without_materialization(mut self) -> Self {
        self.materialize = false;
        self
    }

    pub fn fail_columns(mut self, message: impl Into<String>) -> Self {
        self.faults.columns = Some(message.into());
        self
    }

    pub fn fail_assignment(mut self, message: impl Into<String>) -> Self {
        self.faults.assignment = Some(message.into());
        self
    }

    pub fn fail_release(mut self, message: impl Into<String>) -> Self {
        self.faults.release = Some(message.into());
        self
    }

    /// End iteration with an error once `after` rows have been delivered
    pub fn fail_iteration(mut self, after: usize, message: impl Into<String>) -> Self {
        self.faults.iteration = Some((after, message.into()));
        self
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Number of `assign_values` calls that reached the source
    pub fn assign_calls(&self) -> usize {
        self.assign_calls
    }

    /// Rows delivered so far
    pub fn advanced(&self) -> usize {
        self.advanced
    }

    fn current(&self) -> Result<&Row, MemoryRowsError> {
        let row = self.current.as_ref().ok_or(MemoryRowsError::NoCurrentRow)?;
        if row.len() != self.columns.len() {
            return Err(MemoryRowsError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        Ok(row)
    }
}

impl Rows for MemoryRows {
    fn advance(&mut self) -> bool {
        self.current = None;
        if self.released || self.failed.is_some() {
            return false;
        }
        if let Some((after, message)) = &self.faults.iteration
            && self.advanced >= *after
        {
            self.failed = Some(message.clone());
            return false;
        }
        match self.pending.pop_front() {
            Some(row) => {
                self.current = Some(row);
                self.advanced += 1;
                true
            }
            None => false,
        }
    }

    fn columns(&mut self) -> Result<Vec<String>, SourceError> {
        if let Some(message) = &self.faults.columns {
            return Err(MemoryRowsError::Injected(message.clone()).into());
        }
        Ok(self.columns.clone())
    }

    fn assign_values(&mut self, targets: &mut [Target<'_>]) -> Result<(), SourceError> {
        self.assign_calls += 1;
        if let Some(message) = &self.faults.assignment {
            return Err(MemoryRowsError::Injected(message.clone()).into());
        }
        if targets.len() != self.columns.len() {
            return Err(MemoryRowsError::TargetCount {
                expected: self.columns.len(),
                found: targets.len(),
            }
            .into());
        }

        let row = self.current()?;
        for ((target, value), column) in targets.iter_mut().zip(row).zip(&self.columns) {
            target
                .assign(value.clone())
                .map_err(|source| MemoryRowsError::Value {
                    column: column.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), SourceError> {
        self.release_count += 1;
        self.released = true;
        self.current = None;
        self.pending.clear();
        match &self.faults.release {
            Some(message) => Err(MemoryRowsError::Injected(message.clone()).into()),
            None => Ok(()),
        }
    }

    fn last_error(&mut self) -> Option<SourceError> {
        self.failed
            .as_ref()
            .map(|message| MemoryRowsError::Injected(message.clone()).into())
    }

    fn materialized_values(&mut self) -> Option<Result<Vec<Value>, SourceError>> {
        if !self.materialize {
            return None;
        }
        Some(self.current().cloned().map_err(Into::into))
    }
}
