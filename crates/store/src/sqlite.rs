//! SQLite entity store.
//!
//! One database file, five tables:
//! - `messages` — the per-session exchange log, one row per side of a turn
//! - `session_turns` — durable per-session turn counter
//! - `orders`, `products`, `policies` — reference data for the lookups
//!
//! The counter row is bumped by the first statement of the commit
//! transaction, so the write lock is taken before anything else is read and
//! two writers can never allocate the same index, even from two processes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use supportdesk_core::entity::{Order, OrderStatus, Policy, Product};
use supportdesk_core::error::StoreError;
use supportdesk_core::message::{NewExchange, Role, StoredMessage};
use supportdesk_core::store::{CatalogStore, MessageLog};
use tracing::{debug, info};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed catalog and message log.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    ///
    /// `url` is an sqlx SQLite URL such as `sqlite:///var/lib/supportdesk.db`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .pragma("foreign_keys", "ON");

        let parent = options.get_filename().parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Connection(format!("Failed to create {}: {e}", dir.display())))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Open a database file by path.
    pub async fn open(path: &std::path::Path, max_connections: u32) -> Result<Self, StoreError> {
        Self::connect(&format!("sqlite://{}", path.display()), max_connections).await
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 7] = [
            (
                "messages table",
                r#"
                CREATE TABLE IF NOT EXISTS messages (
                    id          TEXT PRIMARY KEY NOT NULL,
                    session_id  TEXT NOT NULL,
                    role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                    content     TEXT NOT NULL,
                    turn_index  INTEGER NOT NULL CHECK (turn_index >= 1),
                    tool_calls  TEXT NOT NULL DEFAULT '[]',
                    created_at  TEXT NOT NULL,
                    UNIQUE (session_id, turn_index, role)
                )
                "#,
            ),
            (
                "messages index",
                "CREATE INDEX IF NOT EXISTS idx_messages_session_turn ON messages(session_id, turn_index DESC)",
            ),
            (
                "session_turns table",
                r#"
                CREATE TABLE IF NOT EXISTS session_turns (
                    session_id       TEXT PRIMARY KEY NOT NULL,
                    last_turn_index  INTEGER NOT NULL,
                    updated_at       TEXT NOT NULL
                )
                "#,
            ),
            (
                "orders table",
                r#"
                CREATE TABLE IF NOT EXISTS orders (
                    id               TEXT PRIMARY KEY NOT NULL,
                    user_id          TEXT NOT NULL,
                    status           TEXT NOT NULL,
                    last_update_at   TEXT NOT NULL,
                    eta_date         TEXT,
                    carrier          TEXT,
                    tracking_number  TEXT
                )
                "#,
            ),
            (
                "products table",
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id        TEXT PRIMARY KEY NOT NULL,
                    name      TEXT NOT NULL,
                    features  TEXT,
                    price     REAL,
                    stock     INTEGER
                )
                "#,
            ),
            (
                "products index",
                "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
            ),
            (
                "policies table",
                r#"
                CREATE TABLE IF NOT EXISTS policies (
                    id                TEXT PRIMARY KEY NOT NULL,
                    type              TEXT NOT NULL UNIQUE,
                    content_markdown  TEXT NOT NULL,
                    created_at        TEXT NOT NULL,
                    updated_at        TEXT NOT NULL
                )
                "#,
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Cheap liveness probe.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| classify("ping", e))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert or replace an order by id.
    pub async fn upsert_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, last_update_at, eta_date, carrier, tracking_number)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                status = excluded.status,
                last_update_at = excluded.last_update_at,
                eta_date = excluded.eta_date,
                carrier = excluded.carrier,
                tracking_number = excluded.tracking_number
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.status.as_str())
        .bind(order.last_update_at.to_rfc3339())
        .bind(order.eta_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&order.carrier)
        .bind(&order.tracking_number)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("upsert order", e))?;

        debug!(order_id = %order.id, "Upserted order");
        Ok(())
    }

    /// Insert or replace a product by id.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, features, price, stock)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                features = excluded.features,
                price = excluded.price,
                stock = excluded.stock
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.features)
        .bind(product.price)
        .bind(product.stock)
        .execute(&self.pool)
        .await
        .map_err(|e| classify("upsert product", e))?;

        Ok(())
    }

    /// Insert or replace the policy of `policy.policy_type`. The original
    /// `created_at` survives a replace.
    pub async fn upsert_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO policies (id, type, content_markdown, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(type) DO UPDATE SET
                content_markdown = excluded.content_markdown,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&policy.id)
        .bind(&policy.policy_type)
        .bind(&policy.content_markdown)
        .bind(policy.created_at.to_rfc3339())
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| classify("upsert policy", e))?;

        Ok(())
    }

    /// Remove a policy. Returns whether a row was deleted.
    pub async fn delete_policy(&self, policy_type: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM policies WHERE type = ?1")
            .bind(policy_type)
            .execute(&self.pool)
            .await
            .map_err(|e| classify("delete policy", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Total persisted rows for a session (both roles).
    pub async fn message_count(&self, session_id: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE session_id = ?1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify("count messages", e))?;
        let n: i64 = row.try_get("n").map_err(|e| StoreError::Query(format!("n column: {e}")))?;
        Ok(n.max(0) as u64)
    }

    fn row_to_message(row: &SqliteRow) -> Result<StoredMessage, StoreError> {
        let session_id: String = column(row, "session_id")?;
        let role_str: String = column(row, "role")?;
        let content: String = column(row, "content")?;
        let turn_index: i64 = column(row, "turn_index")?;
        let tool_calls_json: String = column(row, "tool_calls")?;
        let created_at: String = column(row, "created_at")?;

        let role = match Role::parse(&role_str) {
            Some(role @ (Role::User | Role::Assistant)) => role,
            _ => return Err(StoreError::Corrupt(format!("unexpected message role '{role_str}'"))),
        };
        let tool_calls: Vec<String> = serde_json::from_str(&tool_calls_json)
            .map_err(|e| StoreError::Corrupt(format!("tool_calls column: {e}")))?;
        let turn_index = u32::try_from(turn_index)
            .map_err(|_| StoreError::Corrupt(format!("turn_index out of range: {turn_index}")))?;

        Ok(StoredMessage {
            session_id,
            role,
            content,
            turn_index,
            tool_calls,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order, StoreError> {
        let status: String = column(row, "status")?;
        let last_update_at: String = column(row, "last_update_at")?;
        let eta_date: Option<String> = column(row, "eta_date")?;

        let status = OrderStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status '{status}'")))?;
        let eta_date = eta_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corrupt(format!("eta_date '{s}': {e}")))
            })
            .transpose()?;

        Ok(Order {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            status,
            last_update_at: parse_timestamp(&last_update_at)?,
            eta_date,
            carrier: column(row, "carrier")?,
            tracking_number: column(row, "tracking_number")?,
        })
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product, StoreError> {
        Ok(Product {
            id: column(row, "id")?,
            name: column(row, "name")?,
            features: column(row, "features")?,
            price: column(row, "price")?,
            stock: column(row, "stock")?,
        })
    }

    fn row_to_policy(row: &SqliteRow) -> Result<Policy, StoreError> {
        let created_at: String = column(row, "created_at")?;
        let updated_at: String = column(row, "updated_at")?;
        Ok(Policy {
            id: column(row, "id")?,
            policy_type: column(row, "type")?,
            content_markdown: column(row, "content_markdown")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Query(format!("{name} column: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{s}': {e}")))
}

/// Map an sqlx error, separating lock contention from everything else.
fn classify(context: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6), plus their extended codes.
            let code = db.code();
            let primary = code
                .as_deref()
                .and_then(|c| c.parse::<i32>().ok())
                .map(|c| c & 0xff);
            if matches!(primary, Some(5) | Some(6)) || db.message().contains("database is locked") {
                StoreError::Busy(format!("{context}: {err}"))
            } else {
                StoreError::Query(format!("{context}: {err}"))
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(format!("{context}: {err}"))
        }
        _ => StoreError::Query(format!("{context}: {err}")),
    }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn find_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("find order", e))?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>, StoreError> {
        let fragment = name_fragment.trim();
        if fragment.is_empty() {
            return Ok(None);
        }

        // SQLite LIKE is case-insensitive for ASCII.
        let row = sqlx::query(
            r#"
            SELECT * FROM products
            WHERE name LIKE '%' || ?1 || '%' ESCAPE '\'
            ORDER BY length(name), name
            LIMIT 1
            "#,
        )
        .bind(escape_like(fragment))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify("find product", e))?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn find_policy(&self, policy_type: &str) -> Result<Option<Policy>, StoreError> {
        let row = sqlx::query("SELECT * FROM policies WHERE type = ?1")
            .bind(policy_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("find policy", e))?;

        row.as_ref().map(Self::row_to_policy).transpose()
    }

    async fn product_names(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify("product names", e))?;

        rows.iter().map(|row| column(row, "name")).collect()
    }
}

#[async_trait]
impl MessageLog for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn max_turn_index(&self, session_id: &str) -> Result<u32, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(turn_index), 0) AS max_turn FROM messages WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("max turn index", e))?;

        let max_turn: i64 = column(&row, "max_turn")?;
        u32::try_from(max_turn).map_err(|_| StoreError::Corrupt(format!("turn_index out of range: {max_turn}")))
    }

    async fn recent_messages(&self, session_id: &str, k: usize) -> Result<Vec<StoredMessage>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT session_id, role, content, turn_index, tool_calls, created_at
            FROM messages
            WHERE session_id = ?1
              AND turn_index IN (
                  SELECT DISTINCT turn_index FROM messages
                  WHERE session_id = ?1
                  ORDER BY turn_index DESC
                  LIMIT ?2
              )
            ORDER BY turn_index ASC, CASE role WHEN 'user' THEN 0 ELSE 1 END
            "#,
        )
        .bind(session_id)
        .bind(i64::try_from(k).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("recent messages", e))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn history(&self, session_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, role, content, turn_index, tool_calls, created_at
            FROM messages
            WHERE session_id = ?1
            ORDER BY turn_index ASC, CASE role WHEN 'user' THEN 0 ELSE 1 END
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("history", e))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn append_exchange(&self, exchange: NewExchange) -> Result<u32, StoreError> {
        let created_at = exchange.created_at.to_rfc3339();
        let tool_calls_json = serde_json::to_string(&exchange.tool_calls)
            .map_err(|e| StoreError::Query(format!("tool_calls serialization: {e}")))?;

        let mut tx = self.pool.begin().await.map_err(|e| classify("begin", e))?;

        // Writing first takes the database write lock for the whole transaction.
        let row = sqlx::query(
            r#"
            INSERT INTO session_turns (session_id, last_turn_index, updated_at)
            VALUES (
                ?1,
                (SELECT COALESCE(MAX(turn_index), 0) FROM messages WHERE session_id = ?1) + 1,
                ?2
            )
            ON CONFLICT(session_id) DO UPDATE SET
                last_turn_index = session_turns.last_turn_index + 1,
                updated_at = excluded.updated_at
            RETURNING last_turn_index
            "#,
        )
        .bind(&exchange.session_id)
        .bind(&created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("allocate turn index", e))?;

        let turn_index: i64 = column(&row, "last_turn_index")?;

        for (role, content, tool_calls) in [
            (Role::User, &exchange.user_content, "[]"),
            (Role::Assistant, &exchange.assistant_content, tool_calls_json.as_str()),
        ] {
            sqlx::query(
                r#"
                INSERT INTO messages (id, session_id, role, content, turn_index, tool_calls, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&exchange.session_id)
            .bind(role.as_str())
            .bind(content)
            .bind(turn_index)
            .bind(tool_calls)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify("insert message", e))?;
        }

        tx.commit().await.map_err(|e| classify("commit", e))?;

        let turn_index = u32::try_from(turn_index)
            .map_err(|_| StoreError::Corrupt(format!("turn_index out of range: {turn_index}")))?;
        debug!(session_id = %exchange.session_id, turn_index, "Appended exchange");
        Ok(turn_index)
    }
}
