//! Transaction-local storage tracking
//!
//! Rows appended inside an open transaction live in a private buffer until
//! commit; they are not yet in any index. The planner asks this layer which
//! tables carry such rows, because an index probe would silently miss them.

use crate::error::{PlanError, Result};
use crate::types::TableId;
use ahash::AHashMap;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub type TransactionId = u64;

/// Answers whether a table has uncommitted rows invisible to its indexes
pub trait VisibilityOracle {
    fn has_local_storage(&self, table: TableId) -> bool;
}

/// Uncommitted rows appended to one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTableStorage {
    pub appended_rows: u64,
}

/// Per-transaction record of tables holding uncommitted local rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLocalState {
    pub txn_id: TransactionId,
    tables: AHashMap<TableId, LocalTableStorage>,
}

impl TransactionLocalState {
    pub fn new(txn_id: TransactionId) -> Self {
        Self {
            txn_id,
            tables: AHashMap::new(),
        }
    }

    /// State with no local storage at all (e.g. planning outside a transaction)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record `rows` appended to `table`. Appending zero rows is a no-op.
    pub fn append(&mut self, table: TableId, rows: u64) {
        if rows == 0 {
            return;
        }
        self.tables.entry(table).or_default().appended_rows += rows;
    }

    pub fn local_storage(&self, table: TableId) -> Option<&LocalTableStorage> {
        self.tables.get(&table)
    }

    pub fn tables_with_local_storage(&self) -> impl Iterator<Item = TableId> + '_ {
        self.tables.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl VisibilityOracle for TransactionLocalState {
    fn has_local_storage(&self, table: TableId) -> bool {
        self.tables
            .get(&table)
            .map(|storage| storage.appended_rows > 0)
            .unwrap_or(false)
    }
}

/// Tracks the local storage of every open transaction
pub struct TransactionManager {
    /// Active transactions
    active_txns: DashMap<TransactionId, Arc<RwLock<TransactionLocalState>>>,
    /// Transaction ID generator
    txn_id_gen: AtomicU64,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            active_txns: DashMap::new(),
            txn_id_gen: AtomicU64::new(1),
        }
    }

    /// Begin a new transaction
    pub fn begin(&self) -> TransactionId {
        let txn_id = self.txn_id_gen.fetch_add(1, Ordering::SeqCst);
        self.active_txns
            .insert(txn_id, Arc::new(RwLock::new(TransactionLocalState::new(txn_id))));
        debug!(txn_id, "began transaction");
        txn_id
    }

    fn context(&self, txn_id: TransactionId) -> Result<Arc<RwLock<TransactionLocalState>>> {
        self.active_txns
            .get(&txn_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PlanError::Transaction(format!("Transaction {} not found", txn_id)))
    }

    /// Record rows appended to `table` inside `txn_id`
    pub fn append(&self, txn_id: TransactionId, table: TableId, rows: u64) -> Result<()> {
        self.context(txn_id)?.write().append(table, rows);
        Ok(())
    }

    /// Read-only copy of a transaction's local state, for one planning call
    pub fn local_state(&self, txn_id: TransactionId) -> Result<TransactionLocalState> {
        Ok(self.context(txn_id)?.read().clone())
    }

    /// Commit: local rows become regular table rows, local storage goes away
    pub fn commit(&self, txn_id: TransactionId) -> Result<()> {
        self.finish(txn_id, "committed")
    }

    /// Rollback: local rows are discarded
    pub fn rollback(&self, txn_id: TransactionId) -> Result<()> {
        self.finish(txn_id, "rolled back")
    }

    fn finish(&self, txn_id: TransactionId, outcome: &'static str) -> Result<()> {
        let (_, state) = self
            .active_txns
            .remove(&txn_id)
            .ok_or_else(|| PlanError::Transaction(format!("Transaction {} not found", txn_id)))?;
        let tables = state.read().tables.len();
        debug!(txn_id, tables, "{} transaction", outcome);
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.active_txns.len()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
