//! Accumulation driver
//!
//! A [`Scanner`] owns the mapping configuration and the type index cache and
//! runs whole scan passes: advance, fill, repeat, then release the rows on
//! every exit path.

use crate::cache::{ConcurrentIndexCache, IndexCache, LruIndexCache};
use crate::config::ScanConfig;
use crate::error::{Error, Phase, Result};
use crate::filler::RowFiller;
use crate::index::{ColumnIndex, Indexer};
use crate::record::Record;
use crate::rows::Rows;
use crate::shape::{Destination, Scannable, SlotMut, classify};
use std::any::TypeId;
use std::sync::Arc;

/// Releases the rows if a scan pass unwinds before finishing
struct ReleaseGuard<'r> {
    rows: &'r mut dyn Rows,
    armed: bool,
}

impl<'r> ReleaseGuard<'r> {
    fn new(rows: &'r mut dyn Rows) -> Self {
        Self { rows, armed: true }
    }

    fn rows(&mut self) -> &mut dyn Rows {
        &mut *self.rows
    }

    /// Release the rows, keeping `result` as the primary outcome
    fn finish(mut self, result: Result<()>) -> Result<()> {
        self.armed = false;
        match (result, self.rows.release()) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(release)) => Err(Error::from_source(Phase::Release, release)),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(release)) => {
                tracing::warn!("Failed to release rows after error ({}): {}", primary, release);
                Err(primary.with_release_failure(release))
            }
        }
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.rows.release()
        {
            tracing::warn!("Failed to release rows while unwinding: {}", e);
        }
    }
}

fn check_iteration(rows: &mut dyn Rows) -> Result<()> {
    match rows.last_error() {
        Some(e) => Err(Error::from_source(Phase::Iteration, e)),
        None => Ok(()),
    }
}

/// Maps result rows onto records, maps and scalars
pub struct Scanner {
    config: ScanConfig,
    indexer: Indexer,
    cache: Arc<dyn IndexCache>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl Scanner {
    /// Create a scanner with the cache `config` asks for
    pub fn new(config: ScanConfig) -> Self {
        let cache: Arc<dyn IndexCache> = match config.cache_capacity {
            Some(capacity) => Arc::new(LruIndexCache::with_capacity(capacity)),
            None => Arc::new(ConcurrentIndexCache::new()),
        };
        Self::with_cache(config, cache)
    }

    /// Create a scanner sharing an existing cache. The cache must only be
    /// shared between scanners with the same mapping conventions.
    pub fn with_cache(config: ScanConfig, cache: Arc<dyn IndexCache>) -> Self {
        Self {
            indexer: Indexer::new(&config),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn IndexCache> {
        &self.cache
    }

    /// Column index of `T`, built on first use
    pub fn index_of<T: Record>(&self) -> Result<Arc<ColumnIndex>> {
        self.cache
            .get_or_build(TypeId::of::<T>(), &|| self.indexer.build(&T::describe()))
    }

    /// Fresh filler for manual row-by-row scanning
    pub fn row_filler(&self) -> RowFiller {
        RowFiller::new(&self.config, self.cache.clone())
    }

    /// Fill `dest` from the only row of `rows`
    pub fn fill_one<T: Scannable, R: Rows>(&self, dest: &mut T, mut rows: R) -> Result<()> {
        self.fill_one_dyn(dest, &mut rows)
    }

    /// Replace the contents of `dest` with one element per row
    pub fn fill_many<T: Scannable + Default, R: Rows>(
        &self,
        dest: &mut Vec<T>,
        mut rows: R,
    ) -> Result<()> {
        self.fill_many_dyn(dest, &mut rows)
    }

    pub fn fill_one_dyn(&self, dest: &mut dyn Destination, rows: &mut dyn Rows) -> Result<()> {
        let mut guard = ReleaseGuard::new(rows);
        let result = self.exactly_one(dest, guard.rows());
        guard.finish(result)
    }

    pub fn fill_many_dyn(&self, dest: &mut dyn Destination, rows: &mut dyn Rows) -> Result<()> {
        let mut guard = ReleaseGuard::new(rows);
        let result = self.collect_many(dest, guard.rows());
        guard.finish(result)
    }

    fn exactly_one(&self, dest: &mut dyn Destination, rows: &mut dyn Rows) -> Result<()> {
        let classified = classify(dest, false)?;
        let type_name = dest.type_name();
        let mut filler = self.row_filler();

        let mut seen = 0usize;
        while rows.advance() {
            seen += 1;
            if seen > 1 {
                continue;
            }
            let slot = dest
                .slot()
                .ok_or_else(|| Error::InvalidDestination(format!("{} is not writable", type_name)))?;
            filler.fill_slot(rows, classified.shape, slot)?;
        }
        check_iteration(rows)?;

        match seen {
            0 => Err(Error::NotFound),
            1 => Ok(()),
            n => Err(Error::TooManyRows(n)),
        }
    }

    fn collect_many(&self, dest: &mut dyn Destination, rows: &mut dyn Rows) -> Result<()> {
        let classified = classify(dest, true)?;
        let type_name = dest.type_name();
        let seq = dest.sequence().ok_or(Error::NotASequence(type_name))?;
        let mut filler = self.row_filler();

        let mut filled = 0usize;
        while rows.advance() {
            seq.push_filled(&mut |slot: SlotMut<'_>| {
                filler.fill_slot(&mut *rows, classified.shape, slot)
            })?;
            filled += 1;
        }
        check_iteration(rows)?;

        tracing::debug!(
            "Collected {} rows into {} (elements by reference: {})",
            filled,
            type_name,
            classified.by_ref
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRows;
    use rowscan_value::Value;
    use std::collections::VecDeque;

    fn ids(n: i64) -> MemoryRows {
        MemoryRows::new(["id"], (1..=n).map(|i| vec![Value::I64(i)]).collect())
    }

    #[test]
    fn test_fill_one_scalar() {
        let scanner = Scanner::default();
        let mut rows = ids(1);
        let mut id = 0i64;
        scanner.fill_one(&mut id, &mut rows).unwrap();
        assert_eq!(id, 1);
        assert_eq!(rows.release_count(), 1);
    }

    #[test]
    fn test_fill_many_scalars() {
        let scanner = Scanner::default();
        let mut out = vec![99i64];
        scanner.fill_many(&mut out, ids(3)).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_fill_many_dyn_deque() {
        let scanner = Scanner::default();
        let mut out: VecDeque<Option<i64>> = VecDeque::new();
        scanner.fill_many_dyn(&mut out, &mut ids(2)).unwrap();
        assert_eq!(out, VecDeque::from(vec![Some(1), Some(2)]));
    }

    #[test]
    fn test_cardinality() {
        let scanner = Scanner::default();
        let mut id = 0i64;
        assert!(matches!(
            scanner.fill_one(&mut id, ids(0)),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            scanner.fill_one(&mut id, ids(3)),
            Err(Error::TooManyRows(3))
        ));
        // Only the first row is written
        assert_eq!(id, 1);
    }

    #[test]
    fn test_release_failure_alone() {
        let scanner = Scanner::default();
        let mut id = 0i64;
        match scanner.fill_one(&mut id, ids(1).fail_release("close failed")) {
            Err(Error::Source { phase, .. }) => assert_eq!(phase, Phase::Release),
            other => panic!("expected release failure, got {:?}", other),
        }
    }

    #[test]
    fn test_release_on_panic() {
        struct Exploding;

        impl rowscan_value::FromValue for Exploding {
            fn from_value(_: Value) -> rowscan_value::Result<Self> {
                panic!("boom")
            }
        }

        impl Scannable for Exploding {
            fn shape() -> crate::shape::Shape {
                crate::shape::Shape::scalar::<Self>()
            }

            fn slot(&mut self) -> Option<crate::shape::SlotMut<'_>> {
                Some(crate::shape::SlotMut::Scalar(self))
            }
        }

        let scanner = Scanner::default();
        let mut rows = ids(1);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut dest = Exploding;
            let _ = scanner.fill_one(&mut dest, &mut rows);
        }));
        assert!(outcome.is_err());
        assert_eq!(rows.release_count(), 1);
    }

    #[test]
    fn test_index_of_is_cached() {
        #[derive(Default)]
        struct Pair {
            left: i64,
            right: i64,
        }

        impl Record for Pair {
            fn describe() -> crate::descriptor::TypeDescriptor {
                crate::descriptor::TypeDescriptor::of::<Self>()
                    .field(crate::descriptor::Field::scalar("Left"))
                    .field(crate::descriptor::Field::scalar("Right"))
            }

            fn fields_mut(&mut self) -> Vec<crate::record::FieldMut<'_>> {
                vec![
                    crate::record::FieldMut::value(&mut self.left),
                    crate::record::FieldMut::value(&mut self.right),
                ]
            }
        }

        let scanner = Scanner::new(ScanConfig::default().with_cache_capacity(4));
        let first = scanner.index_of::<Pair>().unwrap();
        let second = scanner.index_of::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.columns(), vec!["left", "right"]);
        assert_eq!(scanner.cache().stats().capacity, Some(4));
    }
}
