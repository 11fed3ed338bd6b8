//! PostGIS sink backed by sqlx.

use crate::domain::model::{ColumnType, DestinationSchema, LoadPolicy, SpatialRow};
use crate::domain::ports::{SinkConnector, SpatialSink};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{redact, validate_database_url, validate_positive_number, Validate};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

/// Connection settings for one database. Credentials live in the URL.
#[derive(Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub connect_timeout: Duration,
    /// Run `CREATE EXTENSION IF NOT EXISTS postgis` before touching tables.
    pub ensure_postgis: bool,
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("database_url", &redact(&self.database_url))
            .field("connect_timeout", &self.connect_timeout)
            .field("ensure_postgis", &self.ensure_postgis)
            .finish()
    }
}

impl PostgresConfig {
    pub fn new(database_url: impl Into<String>) -> Result<Self> {
        let config = Self {
            database_url: database_url.into(),
            connect_timeout: Duration::from_secs(30),
            ensure_postgis: true,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for PostgresConfig {
    fn validate(&self) -> Result<()> {
        validate_database_url("database.url", &self.database_url)?;
        validate_positive_number("database.connect_timeout_seconds", self.connect_timeout.as_secs(), 1)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SinkConnector for PostgresConnector {
    type Sink = PostgresSink;

    async fn connect(&self) -> Result<PostgresSink> {
        tracing::debug!("Connecting to {}", redact(&self.config.database_url));

        // One connection per load; the pool only scopes its lifetime.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.config.connect_timeout)
            .connect(&self.config.database_url)
            .await
            .map_err(|e| EtlError::load("<connect>", format!("Failed to connect to database: {}", e)))?;

        Ok(PostgresSink {
            pool,
            tx: None,
            ensure_postgis: self.config.ensure_postgis,
        })
    }
}

pub struct PostgresSink {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    ensure_postgis: bool,
}

impl PostgresSink {
    fn tx_mut(&mut self, table: &str) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| EtlError::load(table, "Transaction already completed"))
    }

    async fn execute(&mut self, table: &str, sql: &str) -> Result<()> {
        let tx = self.tx_mut(table)?;
        sqlx::query(sql)
            .execute(&mut **tx)
            .await
            .map_err(|e| EtlError::load(table, e))?;
        Ok(())
    }
}

pub fn create_table_sql(schema: &DestinationSchema, if_not_exists: bool) -> String {
    let mut columns = vec!["id SERIAL PRIMARY KEY".to_string()];
    columns.extend(
        schema
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type.sql_type())),
    );
    columns.push(format!(
        "geometry GEOMETRY({}, {})",
        schema.geometry_type.postgis_name(),
        schema.srid
    ));

    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        schema.table,
        columns.join(", ")
    )
}

/// Values are bound as text and cast per column; the geometry comes last.
pub fn insert_sql(schema: &DestinationSchema) -> String {
    let mut names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    names.push("geometry");

    let mut placeholders: Vec<String> = schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| match c.column_type {
            ColumnType::Text => format!("${}::text", i + 1),
            ColumnType::Integer => format!("CAST(${}::text AS INTEGER)", i + 1),
        })
        .collect();
    placeholders.push(format!(
        "ST_SetSRID(ST_GeomFromText(${}::text), {})",
        schema.columns.len() + 1,
        schema.srid
    ));

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table,
        names.join(", "),
        placeholders.join(", ")
    )
}

#[async_trait]
impl SpatialSink for PostgresSink {
    async fn begin(&mut self) -> Result<()> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::load("<begin>", format!("Failed to begin transaction: {}", e)))?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn prepare_table(&mut self, schema: &DestinationSchema, policy: LoadPolicy) -> Result<()> {
        if self.ensure_postgis {
            self.execute(&schema.table, "CREATE EXTENSION IF NOT EXISTS postgis")
                .await?;
        }

        match policy {
            LoadPolicy::Replace => {
                self.execute(&schema.table, &format!("DROP TABLE IF EXISTS {}", schema.table))
                    .await?;
                self.execute(&schema.table, &create_table_sql(schema, false))
                    .await?;
            }
            LoadPolicy::Append => {
                self.execute(&schema.table, &create_table_sql(schema, true))
                    .await?;
            }
        }

        tracing::debug!("Table '{}' ready ({} policy)", schema.table, policy);
        Ok(())
    }

    async fn insert(&mut self, schema: &DestinationSchema, row: &SpatialRow) -> Result<()> {
        let sql = insert_sql(schema);
        let tx = self.tx_mut(&schema.table)?;

        let mut query = sqlx::query(&sql);
        for value in &row.values {
            query = query.bind(value.as_deref());
        }
        query = query.bind(row.wkt.as_str());

        query
            .execute(&mut **tx)
            .await
            .map_err(|e| EtlError::load(&schema.table, e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| EtlError::load("<commit>", "Transaction already completed"))?;
        tx.commit()
            .await
            .map_err(|e| EtlError::load("<commit>", format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(|e| {
                EtlError::load("<rollback>", format!("Failed to rollback transaction: {}", e))
            }),
            None => Ok(()),
        }
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let query = sqlx::query_scalar::<_, i64>(&sql);

        let count = match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
        .map_err(|e| EtlError::load(table, e))?;

        Ok(count.max(0) as u64)
    }

    async fn close(&mut self) -> Result<()> {
        // An open transaction is rolled back when dropped.
        self.tx = None;
        self.pool.close().await;
        Ok(())
    }
}
