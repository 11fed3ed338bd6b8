//! In-memory spatial store for development and tests.
//!
//! Mirrors what the PostGIS sink does with a table: drop/create per policy,
//! integer casts, geometry type checks, and a unit of work that only becomes
//! visible on commit. Several connectors can share one store to simulate
//! consecutive runs against the same database.

use crate::domain::model::{ColumnType, DestinationSchema, GeometryKind, LoadPolicy, SpatialRow};
use crate::domain::ports::{SinkConnector, SpatialSink};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use geo::Geometry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use wkt::TryFromWkt;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: u64,
    pub values: Vec<Option<String>>,
    pub wkt: String,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: DestinationSchema,
    rows: Vec<StoredRow>,
    next_id: u64,
}

impl MemoryTable {
    fn new(schema: &DestinationSchema) -> Self {
        Self {
            schema: schema.clone(),
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    tables: HashMap<String, MemoryTable>,
    reachable: bool,
    open_connections: usize,
}

#[derive(Debug, Clone)]
pub struct MemorySpatialStore {
    state: Arc<RwLock<StoreState>>,
}

impl Default for MemorySpatialStore {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                tables: HashMap::new(),
                reachable: true,
                open_connections: 0,
            })),
        }
    }
}

impl MemorySpatialStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means a test panicked mid-write; the data is still usable.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes subsequent connection attempts fail, as with a database that is down.
    pub fn set_reachable(&self, reachable: bool) {
        self.write().reachable = reachable;
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.read().tables.contains_key(table)
    }

    /// Committed rows in `table`; 0 when it does not exist.
    pub fn row_count(&self, table: &str) -> u64 {
        self.read()
            .tables
            .get(table)
            .map(|t| t.rows.len() as u64)
            .unwrap_or(0)
    }

    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.read()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn open_connections(&self) -> usize {
        self.read().open_connections
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemorySpatialStore,
}

impl MemoryConnector {
    pub fn new(store: MemorySpatialStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SinkConnector for MemoryConnector {
    type Sink = MemorySink;

    async fn connect(&self) -> Result<MemorySink> {
        let mut state = self.store.write();
        if !state.reachable {
            return Err(EtlError::load("<connect>", "connection refused"));
        }
        state.open_connections += 1;
        drop(state);

        Ok(MemorySink {
            store: self.store.clone(),
            staged: None,
            touched: HashSet::new(),
            closed: false,
        })
    }
}

/// One connection to a [`MemorySpatialStore`]. Work between `begin` and
/// `commit` happens on a private copy of the tables; commit writes back only
/// the tables this sink changed.
#[derive(Debug)]
pub struct MemorySink {
    store: MemorySpatialStore,
    staged: Option<HashMap<String, MemoryTable>>,
    touched: HashSet<String>,
    closed: bool,
}

impl MemorySink {
    fn staged_mut(&mut self, table: &str) -> Result<&mut HashMap<String, MemoryTable>> {
        self.staged
            .as_mut()
            .ok_or_else(|| EtlError::load(table, "no open transaction"))
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.staged = None;
            let mut state = self.store.write();
            state.open_connections = state.open_connections.saturating_sub(1);
        }
    }
}

fn check_value(table: &str, column: &str, column_type: ColumnType, value: Option<&str>) -> Result<()> {
    match (column_type, value) {
        (ColumnType::Integer, Some(v)) if v.trim().parse::<i32>().is_err() => Err(EtlError::load(
            table,
            format!("invalid input syntax for type integer: \"{}\" (column {})", v, column),
        )),
        _ => Ok(()),
    }
}

fn check_geometry(table: &str, expected: GeometryKind, wkt: &str) -> Result<()> {
    let geometry = Geometry::<f64>::try_from_wkt_str(wkt)
        .map_err(|e| EtlError::load(table, format!("parse error - invalid geometry: {}", e)))?;

    let actual = GeometryKind::of(&geometry);
    if actual != expected {
        return Err(EtlError::load(
            table,
            format!("Geometry type ({}) does not match column type ({})", actual, expected),
        ));
    }
    Ok(())
}

#[async_trait]
impl SpatialSink for MemorySink {
    async fn begin(&mut self) -> Result<()> {
        let tables = self.store.read().tables.clone();
        self.staged = Some(tables);
        self.touched.clear();
        Ok(())
    }

    async fn prepare_table(&mut self, schema: &DestinationSchema, policy: LoadPolicy) -> Result<()> {
        let tables = self.staged_mut(&schema.table)?;
        match policy {
            LoadPolicy::Replace => {
                tables.insert(schema.table.clone(), MemoryTable::new(schema));
            }
            LoadPolicy::Append => {
                tables
                    .entry(schema.table.clone())
                    .or_insert_with(|| MemoryTable::new(schema));
            }
        }
        self.touched.insert(schema.table.clone());
        Ok(())
    }

    async fn insert(&mut self, schema: &DestinationSchema, row: &SpatialRow) -> Result<()> {
        let tables = self.staged_mut(&schema.table)?;
        let table = tables.get_mut(&schema.table).ok_or_else(|| {
            EtlError::load(&schema.table, format!("relation \"{}\" does not exist", schema.table))
        })?;

        if row.values.len() != table.schema.columns.len() {
            return Err(EtlError::load(
                &schema.table,
                format!(
                    "expected {} values, got {}",
                    table.schema.columns.len(),
                    row.values.len()
                ),
            ));
        }

        for (column, value) in table.schema.columns.iter().zip(&row.values) {
            check_value(&schema.table, &column.name, column.column_type, value.as_deref())?;
        }
        check_geometry(&schema.table, table.schema.geometry_type, &row.wkt)?;

        let id = table.next_id;
        table.next_id += 1;
        table.rows.push(StoredRow {
            id,
            values: row.values.clone(),
            wkt: row.wkt.clone(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut tables = self
            .staged
            .take()
            .ok_or_else(|| EtlError::load("<commit>", "no open transaction"))?;
        let mut state = self.store.write();
        for name in self.touched.drain() {
            if let Some(table) = tables.remove(&name) {
                state.tables.insert(name, table);
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged = None;
        self.touched.clear();
        Ok(())
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        let count = match &self.staged {
            Some(tables) => tables.get(table).map(|t| t.rows.len()),
            None => self.store.read().tables.get(table).map(|t| t.rows.len()),
        };

        count
            .map(|c| c as u64)
            .ok_or_else(|| EtlError::load(table, format!("relation \"{}\" does not exist", table)))
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.release();
    }
}
