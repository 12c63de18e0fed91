use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::debug;

use crate::config::{BackendKind, DbConfig};
use crate::record::Record;
use crate::{Error, Result};

const DB_PORT: u16 = 5432;

/// Opens the single shared connection handle the whole batch writes through.
/// The writer loop is the only consumer, so one connection is enough.
pub async fn connect(db: &DbConfig) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&db.host)
        .port(DB_PORT)
        .database(&db.database)
        .username(&db.user)
        .password(&db.password);

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Adapts a generic record into a backend-specific write.
///
/// Relational inserts one row with a column per field; document inserts the
/// whole record as a single JSONB document into the named collection table.
/// Either way each record is committed independently: no batching, no
/// transaction spanning records.
pub enum Sink {
    Relational { pool: PgPool, table: String },
    Document { pool: PgPool, collection: String },
}

impl Sink {
    /// The destination name is used verbatim as an SQL identifier, so it has
    /// to pass the identifier allow-list up front.
    pub fn new(pool: PgPool, backend: BackendKind, destination: String) -> Result<Self> {
        validate_identifier(&destination)?;
        Ok(match backend {
            BackendKind::Relational => Sink::Relational {
                pool,
                table: destination,
            },
            BackendKind::Document => Sink::Document {
                pool,
                collection: destination,
            },
        })
    }

    /// Writes one record. An empty record is a no-op and never reaches the
    /// backend; every value travels as a bound parameter.
    pub async fn write(&self, record: &Record) -> Result<()> {
        if record.is_empty() {
            debug!("skipping empty record");
            return Ok(());
        }

        match self {
            Sink::Relational { pool, table } => {
                let sql = build_row_insert(table, record)?;
                let mut query = sqlx::query(&sql);
                for value in record.values() {
                    query = query.bind(value);
                }
                query.execute(pool).await?;
            }
            Sink::Document { pool, collection } => {
                let sql = format!("INSERT INTO {collection} (document) VALUES ($1)");
                sqlx::query(&sql).bind(Json(record)).execute(pool).await?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool().close().await;
    }

    fn pool(&self) -> &PgPool {
        match self {
            Sink::Relational { pool, .. } | Sink::Document { pool, .. } => pool,
        }
    }
}

/// Builds the row insert for whatever columns this record happens to carry,
/// one `$n` placeholder per value in key order.
fn build_row_insert(table: &str, record: &Record) -> Result<String> {
    let mut columns = Vec::with_capacity(record.len());
    for name in record.keys() {
        validate_identifier(name)?;
        columns.push(name.as_str());
    }
    let placeholders = (1..=record.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>();

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// Scraped field names become SQL identifiers verbatim, so only the
/// conservative `[A-Za-z_][A-Za-z0-9_]*` shape is allowed through.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}
