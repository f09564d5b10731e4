/// Table metadata and schema definitions consumed by the planner
use super::{ColumnId, TableId};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Timestamp,
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column data type
    pub col_type: ColumnType,
    /// Position in the table (0-indexed)
    pub id: ColumnId,
    /// Whether this column is nullable
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: ColumnType, position: u32) -> Self {
        Self {
            name: name.into(),
            col_type,
            id: ColumnId(position),
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Table schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table identifier
    pub id: TableId,
    /// Table name
    pub name: String,
    /// Column definitions (ordered)
    pub columns: Vec<ColumnDef>,
    /// Column name -> id mapping
    #[serde(skip)]
    column_map: AHashMap<String, ColumnId>,
}

impl TableSchema {
    /// Create a new table schema
    pub fn new(id: TableId, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        let mut schema = Self {
            id,
            name: name.into(),
            columns,
            column_map: AHashMap::new(),
        };
        schema.rebuild_column_map();
        schema
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.column_map
            .get(name)
            .and_then(|id| self.column_by_id(*id))
    }

    /// Get column by id
    pub fn column_by_id(&self, id: ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Get column id by name
    pub fn get_column_id(&self, name: &str) -> Option<ColumnId> {
        self.column_map.get(name).copied()
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All column ids in schema order
    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    /// Rebuild column map (call after deserialization)
    pub fn rebuild_column_map(&mut self) {
        self.column_map.clear();
        for col in &self.columns {
            self.column_map.insert(col.name.clone(), col.id);
        }
    }
}
