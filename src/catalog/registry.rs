/// Catalog registry for tables and their secondary indexes
///
/// State is copy-on-write: every mutation builds a new `CatalogState` and
/// swaps the shared pointer, so a snapshot handed to the planner is frozen.
/// Index removal is two-phase (`begin_drop` → `commit`/`rollback`) and only
/// the commit changes what later snapshots see.
use crate::error::{PlanError, Result};
use crate::optimizer::statistics::BaseStatistics;
use crate::types::{Cardinality, ColumnId, TableId, TableSchema};
use ahash::{AHashMap, AHashSet};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Index structure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Adaptive radix tree
    Art,
    /// B-Tree index (general purpose)
    BTree,
    /// Hash index (point lookups only)
    Hash,
}

/// One secondary index defined on one column of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name (unique in the catalog)
    pub name: String,
    /// Indexed table
    pub table: TableId,
    /// Column the index is bound to
    pub column: ColumnId,
    /// Column name, for display
    pub column_name: String,
    /// Index kind
    pub kind: IndexKind,
}

/// Catalog entry for one table
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub schema: TableSchema,
    /// Estimated row count (None when no statistics were gathered)
    pub row_count: Option<Cardinality>,
    /// Per-column statistics
    pub column_stats: AHashMap<ColumnId, BaseStatistics>,
}

#[derive(Debug, Clone, Default)]
struct CatalogState {
    tables: AHashMap<TableId, TableEntry>,
    table_names: AHashMap<String, TableId>,
    /// Index name -> descriptor
    indexes: AHashMap<String, IndexDescriptor>,
    /// Table -> live index names in creation order
    table_indexes: AHashMap<TableId, Vec<String>>,
}

/// Immutable view of the catalog for the duration of one planning call
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    state: Arc<CatalogState>,
}

impl CatalogSnapshot {
    /// Snapshot of an empty catalog
    pub fn empty() -> Self {
        Self {
            state: Arc::new(CatalogState::default()),
        }
    }

    pub fn table(&self, id: TableId) -> Option<&TableEntry> {
        self.state.tables.get(&id)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableEntry> {
        self.state
            .table_names
            .get(name)
            .and_then(|id| self.state.tables.get(id))
    }

    pub fn row_count(&self, table: TableId) -> Option<Cardinality> {
        self.table(table).and_then(|t| t.row_count)
    }

    pub fn column_statistics(&self, table: TableId, column: ColumnId) -> Option<&BaseStatistics> {
        self.table(table).and_then(|t| t.column_stats.get(&column))
    }

    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.state.indexes.get(name)
    }

    /// Live indexes of a table, in creation order
    pub fn indexes_for_table(&self, table: TableId) -> impl Iterator<Item = &IndexDescriptor> + '_ {
        self.state
            .table_indexes
            .get(&table)
            .into_iter()
            .flatten()
            .filter_map(move |name| self.state.indexes.get(name))
    }

    pub fn index_count(&self) -> usize {
        self.state.indexes.len()
    }
}

/// Registry for table metadata and secondary indexes
pub struct CatalogRegistry {
    state: RwLock<Arc<CatalogState>>,
    /// Names of indexes with a drop in flight
    pending_drops: Mutex<AHashSet<String>>,
}

impl CatalogRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(CatalogState::default())),
            pending_drops: Mutex::new(AHashSet::new()),
        }
    }

    /// Take a consistent snapshot for planning
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            state: Arc::clone(&self.state.read()),
        }
    }

    /// Register a table
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut guard = self.state.write();

        if guard.tables.contains_key(&schema.id) || guard.table_names.contains_key(&schema.name) {
            return Err(PlanError::Catalog(format!(
                "Table '{}' already exists",
                schema.name
            )));
        }

        let state = Arc::make_mut(&mut *guard);
        state.table_names.insert(schema.name.clone(), schema.id);
        state.tables.insert(
            schema.id,
            TableEntry {
                schema,
                row_count: None,
                column_stats: AHashMap::new(),
            },
        );
        Ok(())
    }

    /// Drop a table together with all of its indexes
    pub fn drop_table(&self, table_name: &str) -> Result<()> {
        let mut guard = self.state.write();
        let id = guard
            .table_names
            .get(table_name)
            .copied()
            .ok_or_else(|| PlanError::TableNotFound(table_name.to_string()))?;

        let pending = self.pending_drops.lock();
        let index_names = guard.table_indexes.get(&id).cloned().unwrap_or_default();
        if let Some(busy) = index_names.iter().find(|n| pending.contains(*n)) {
            return Err(PlanError::Catalog(format!(
                "Index '{}' on table '{}' has a drop in progress",
                busy, table_name
            )));
        }

        let state = Arc::make_mut(&mut *guard);
        for name in &index_names {
            state.indexes.remove(name);
        }
        state.table_indexes.remove(&id);
        state.table_names.remove(table_name);
        state.tables.remove(&id);
        debug!(table = table_name, indexes = index_names.len(), "dropped table");
        Ok(())
    }

    /// Record the estimated row count of a table
    pub fn set_row_count(&self, table: TableId, rows: Cardinality) -> Result<()> {
        self.update_table(table, |entry| entry.row_count = Some(rows))
    }

    /// Record statistics for one column
    pub fn set_column_statistics(
        &self,
        table: TableId,
        column: ColumnId,
        stats: BaseStatistics,
    ) -> Result<()> {
        self.update_table(table, |entry| {
            entry.column_stats.insert(column, stats);
        })
    }

    fn update_table(&self, table: TableId, f: impl FnOnce(&mut TableEntry)) -> Result<()> {
        let mut guard = self.state.write();
        if !guard.tables.contains_key(&table) {
            return Err(PlanError::TableNotFound(table.to_string()));
        }
        let state = Arc::make_mut(&mut *guard);
        if let Some(entry) = state.tables.get_mut(&table) {
            f(entry);
        }
        Ok(())
    }

    /// Create a secondary index on `table_name.column_name`
    pub fn create_index(
        &self,
        name: &str,
        table_name: &str,
        column_name: &str,
        kind: IndexKind,
    ) -> Result<IndexDescriptor> {
        let mut guard = self.state.write();

        if guard.indexes.contains_key(name) {
            return Err(PlanError::Catalog(format!("Index '{}' already exists", name)));
        }

        let table = guard
            .table_by_name(table_name)
            .ok_or_else(|| PlanError::TableNotFound(table_name.to_string()))?;
        let column = table.schema.get_column_id(column_name).ok_or_else(|| {
            PlanError::ColumnNotFound(format!("{}.{}", table_name, column_name))
        })?;

        let descriptor = IndexDescriptor {
            name: name.to_string(),
            table: table.schema.id,
            column,
            column_name: column_name.to_string(),
            kind,
        };

        let state = Arc::make_mut(&mut *guard);
        state
            .table_indexes
            .entry(descriptor.table)
            .or_default()
            .push(name.to_string());
        state.indexes.insert(name.to_string(), descriptor.clone());

        debug!(index = name, table = table_name, column = column_name, "created index");
        Ok(descriptor)
    }

    /// Start dropping an index.
    ///
    /// The index stays visible to every snapshot until the returned
    /// [`PendingDrop`] is committed. Dropping the guard without committing
    /// rolls the drop back.
    pub fn begin_drop(&self, name: &str) -> Result<PendingDrop<'_>> {
        if self.state.read().indexes.get(name).is_none() {
            return Err(PlanError::IndexNotFound(name.to_string()));
        }
        let mut pending = self.pending_drops.lock();
        if !pending.insert(name.to_string()) {
            return Err(PlanError::Catalog(format!(
                "Index '{}' already has a drop in progress",
                name
            )));
        }
        Ok(PendingDrop {
            registry: self,
            name: name.to_string(),
            finished: false,
        })
    }

    /// Drop an index in one step
    pub fn drop_index(&self, name: &str) -> Result<()> {
        self.begin_drop(name)?.commit()
    }

    fn commit_drop(&self, name: &str) -> Result<()> {
        let mut guard = self.state.write();
        let descriptor = guard
            .indexes
            .get(name)
            .cloned()
            .ok_or_else(|| PlanError::IndexNotFound(name.to_string()))?;

        // Both maps change under one write lock, in one new state.
        let state = Arc::make_mut(&mut *guard);
        state.indexes.remove(name);
        if let Some(names) = state.table_indexes.get_mut(&descriptor.table) {
            names.retain(|n| n != name);
            if names.is_empty() {
                state.table_indexes.remove(&descriptor.table);
            }
        }
        drop(guard);

        self.pending_drops.lock().remove(name);
        debug!(index = name, "committed index drop");
        Ok(())
    }

    fn abort_drop(&self, name: &str) {
        self.pending_drops.lock().remove(name);
        debug!(index = name, "rolled back index drop");
    }

    /// Names of all live indexes
    pub fn list_indexes(&self) -> Vec<String> {
        self.state.read().indexes.keys().cloned().collect()
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogState {
    fn table_by_name(&self, name: &str) -> Option<&TableEntry> {
        self.table_names.get(name).and_then(|id| self.tables.get(id))
    }
}

/// An index drop that has not been committed yet
pub struct PendingDrop<'a> {
    registry: &'a CatalogRegistry,
    name: String,
    finished: bool,
}

impl PendingDrop<'_> {
    pub fn index_name(&self) -> &str {
        &self.name
    }

    /// Remove the index from the live catalog
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        let result = self.registry.commit_drop(&self.name);
        if result.is_err() {
            self.registry.abort_drop(&self.name);
        }
        result
    }

    /// Abandon the drop; the index stays live
    pub fn rollback(mut self) {
        self.finished = true;
        self.registry.abort_drop(&self.name);
    }
}

impl Drop for PendingDrop<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.abort_drop(&self.name);
        }
    }
}
