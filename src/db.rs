use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Connection, QueryBuilder, Sqlite};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::models::item::{CreationInput, InventoryItem, Patch, UpdateInput};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    description TEXT,
    status      BOOLEAN NOT NULL DEFAULT 1
)
"#;

const COLUMNS: &str = "id, name, description, status";

/// Outcome of a store operation. `ItemNotFound` is the absence signal and is
/// never used for faults.
#[derive(Debug)]
pub enum OperationResult<T> {
    Success(T),
    ItemNotFound,
    ItemAlreadyExists,
    InternalError(String),
}

impl<T> OperationResult<T> {
    /// Collapses a lookup into `Some`/`None`, leaving faults as `Err`.
    pub fn into_found(self) -> Result<Option<T>, String> {
        match self {
            OperationResult::Success(value) => Ok(Some(value)),
            OperationResult::ItemNotFound => Ok(None),
            OperationResult::ItemAlreadyExists => Err("unexpected conflict on lookup".to_string()),
            OperationResult::InternalError(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, sqlx::Error>> for OperationResult<T> {
    fn from(result: Result<T, sqlx::Error>) -> Self {
        match result {
            Ok(value) => OperationResult::Success(value),
            Err(sqlx::Error::RowNotFound) => OperationResult::ItemNotFound,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                OperationResult::ItemAlreadyExists
            }
            Err(err) => OperationResult::InternalError(err.to_string()),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ItemStore: Send {
    async fn get_by_id(&mut self, id: i64) -> OperationResult<InventoryItem>;
    async fn get_by_name(&mut self, name: &str) -> OperationResult<InventoryItem>;
    async fn list(&mut self, skip: i64, limit: i64) -> OperationResult<Vec<InventoryItem>>;
    async fn create(&mut self, input: CreationInput) -> OperationResult<InventoryItem>;
    async fn update(&mut self, id: i64, changes: UpdateInput) -> OperationResult<InventoryItem>;
    async fn delete(&mut self, id: i64) -> OperationResult<InventoryItem>;
}

/// Handle on the item database, shared by all requests.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens its own database, so keep
        // exactly one alive for the lifetime of the pool.
        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn create_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Checks a connection out of the pool for the duration of one request.
    pub async fn session(&self) -> Result<SqliteSession, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        Ok(SqliteSession { conn })
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// A pooled connection. It goes back to the pool when dropped.
pub struct SqliteSession {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl ItemStore for SqliteSession {
    async fn get_by_id(&mut self, id: i64) -> OperationResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory_items WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await
        .into()
    }

    async fn get_by_name(&mut self, name: &str) -> OperationResult<InventoryItem> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory_items WHERE name = ?"
        ))
        .bind(name)
        .fetch_one(&mut *self.conn)
        .await
        .into()
    }

    async fn list(&mut self, skip: i64, limit: i64) -> OperationResult<Vec<InventoryItem>> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory_items ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.conn)
        .await
        .into()
    }

    async fn create(&mut self, input: CreationInput) -> OperationResult<InventoryItem> {
        let result: Result<InventoryItem, sqlx::Error> = async {
            // Dropping `tx` without committing rolls it back.
            let mut tx = self.conn.begin().await?;
            let item = sqlx::query_as::<_, InventoryItem>(&format!(
                "INSERT INTO inventory_items (name, description, status) \
                 VALUES (?, ?, ?) RETURNING {COLUMNS}"
            ))
            .bind(input.name)
            .bind(input.description)
            .bind(input.status)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(item)
        }
        .await;

        if let Ok(item) = &result {
            debug!(id = item.id, "Inserted inventory item");
        }
        result.into()
    }

    async fn update(&mut self, id: i64, changes: UpdateInput) -> OperationResult<InventoryItem> {
        if changes.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE inventory_items SET ");
        let mut assignments = builder.separated(", ");
        if let Patch::Value(name) = changes.name {
            assignments.push("name = ").push_bind_unseparated(name);
        }
        match changes.description {
            Patch::Value(description) => {
                assignments
                    .push("description = ")
                    .push_bind_unseparated(description);
            }
            Patch::Null => {
                assignments.push("description = NULL");
            }
            Patch::Unset => {}
        }
        if let Patch::Value(status) = changes.status {
            assignments.push("status = ").push_bind_unseparated(status);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLUMNS}"));

        let result: Result<InventoryItem, sqlx::Error> = async {
            let mut tx = self.conn.begin().await?;
            let item = builder
                .build_query_as::<InventoryItem>()
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(item)
        }
        .await;
        result.into()
    }

    async fn delete(&mut self, id: i64) -> OperationResult<InventoryItem> {
        let result: Result<InventoryItem, sqlx::Error> = async {
            let mut tx = self.conn.begin().await?;
            let item = sqlx::query_as::<_, InventoryItem>(&format!(
                "DELETE FROM inventory_items WHERE id = ? RETURNING {COLUMNS}"
            ))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(item)
        }
        .await;
        result.into()
    }
}
