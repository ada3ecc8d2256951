//! PostgreSQL backend using `tokio-postgres` and `deadpool`.

use crate::collaborator::{Collaborator, Endpoint};
use crate::config::DatabaseConfig;
use crate::database::result::*;
use crate::database::traits::SqlBackend;
use crate::error::{CollabResult, CollaboratorError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use deadpool_postgres::{Config as DeadpoolConfig, Object, Pool, PoolConfig, Runtime};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{NoTls, Row, SimpleQueryMessage};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

const LIST_TABLES_SQL: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = current_schema() AND table_type IN ('BASE TABLE', 'VIEW')
    ORDER BY table_name
"#;

const TABLE_SCHEMA_SQL: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        (c.is_nullable = 'YES') AS nullable,
        CASE (
            SELECT MIN(CASE tc.constraint_type
                           WHEN 'PRIMARY KEY' THEN 1
                           WHEN 'UNIQUE' THEN 2
                           ELSE 3
                       END)
            FROM information_schema.key_column_usage k
            JOIN information_schema.table_constraints tc
                ON tc.constraint_name = k.constraint_name
                AND tc.table_schema = k.table_schema
                AND tc.table_name = k.table_name
            WHERE k.table_schema = c.table_schema
                AND k.table_name = c.table_name
                AND k.column_name = c.column_name
        )
            WHEN 1 THEN 'PRI'
            WHEN 2 THEN 'UNI'
            WHEN 3 THEN 'MUL'
            ELSE ''
        END AS key_role,
        c.column_default::text AS column_default,
        CASE
            WHEN c.is_identity = 'YES' THEN 'identity'
            WHEN c.is_generated = 'ALWAYS' THEN 'generated'
            WHEN c.column_default LIKE 'nextval(%' THEN 'auto_increment'
            ELSE ''
        END AS extra
    FROM information_schema.columns c
    WHERE c.table_schema = COALESCE($1::text, current_schema()::text)
        AND c.table_name = $2::text
    ORDER BY c.ordinal_position
"#;

/// PostgreSQL backend. The pool exists only while connected.
pub struct PostgresBackend {
    config: DatabaseConfig,
    pool: Option<Pool>,
}

impl PostgresBackend {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, pool: None }
    }

    async fn client(&self) -> CollabResult<Object> {
        let pool = self
            .pool
            .as_ref()
            .ok_or(CollaboratorError::NotConnected("postgres"))?;

        let wait = self.config.connect_timeout;
        timeout(wait, pool.get())
            .await
            .map_err(|_| CollaboratorError::Timeout(wait.as_millis() as u64))?
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))
    }

    /// Runs `work` under the configured query budget.
    async fn bounded<T, F>(&self, work: F) -> CollabResult<T>
    where
        F: std::future::Future<Output = CollabResult<T>>,
    {
        let budget = self.config.query_timeout;
        timeout(budget, work)
            .await
            .map_err(|_| CollaboratorError::Timeout(budget.as_millis() as u64))?
    }

    async fn fetch(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> CollabResult<Vec<tokio_postgres::Row>> {
        let client = self.client().await?;
        self.bounded(async {
            client.query(sql, params).await.map_err(query_error)
        })
        .await
    }

    /// Extract cell value from a PostgreSQL row by its column type.
    ///
    /// Only called for columns where [`decodes_natively`] holds.
    fn cell_value(row: &Row, index: usize, ty: &Type) -> Result<CellValue, tokio_postgres::Error> {
        match ty.name() {
            "bool" => row.try_get::<_, Option<bool>>(index).map(CellValue::from),
            "int2" => row
                .try_get::<_, Option<i16>>(index)
                .map(|v| CellValue::from(v.map(i64::from))),
            "int4" => row
                .try_get::<_, Option<i32>>(index)
                .map(|v| CellValue::from(v.map(i64::from))),
            "int8" => row.try_get::<_, Option<i64>>(index).map(CellValue::from),
            "oid" => row
                .try_get::<_, Option<u32>>(index)
                .map(|v| CellValue::from(v.map(i64::from))),
            "float4" => row
                .try_get::<_, Option<f32>>(index)
                .map(|v| CellValue::from(v.map(f64::from))),
            "float8" => row.try_get::<_, Option<f64>>(index).map(CellValue::from),
            "numeric" => row.try_get::<_, Option<Decimal>>(index).map(CellValue::from),
            "timestamptz" => row
                .try_get::<_, Option<DateTime<Utc>>>(index)
                .map(|v| v.map_or(CellValue::Null, CellValue::DateTime)),
            "timestamp" => row
                .try_get::<_, Option<NaiveDateTime>>(index)
                .map(|v| v.map_or(CellValue::Null, |dt| CellValue::DateTime(dt.and_utc()))),
            "date" => row
                .try_get::<_, Option<NaiveDate>>(index)
                .map(|v| v.map_or(CellValue::Null, CellValue::Date)),
            "time" => row
                .try_get::<_, Option<NaiveTime>>(index)
                .map(|v| v.map_or(CellValue::Null, CellValue::Time)),
            "json" | "jsonb" => row
                .try_get::<_, Option<Value>>(index)
                .map(|v| v.map_or(CellValue::Null, CellValue::Json)),
            "uuid" => row
                .try_get::<_, Option<Uuid>>(index)
                .map(|v| v.map_or(CellValue::Null, |id| CellValue::String(id.to_string()))),
            "bytea" => row
                .try_get::<_, Option<Vec<u8>>>(index)
                .map(|v| v.map_or(CellValue::Null, |bytes| CellValue::String(bytea_text(&bytes)))),
            "_bool" => array_cell::<bool>(row, index),
            "_int2" => row
                .try_get::<_, Option<Vec<Option<i16>>>>(index)
                .map(|v| match v {
                    Some(items) => CellValue::Json(Value::from(
                        items
                            .into_iter()
                            .map(|i| i.map(i64::from))
                            .collect::<Vec<_>>(),
                    )),
                    None => CellValue::Null,
                }),
            "_int4" => array_cell::<i32>(row, index),
            "_int8" => array_cell::<i64>(row, index),
            "_float8" => array_cell::<f64>(row, index),
            "_text" | "_varchar" | "_bpchar" | "_name" => array_cell::<String>(row, index),
            _ => row
                .try_get::<_, Option<String>>(index)
                .map(|v| v.map_or(CellValue::Null, CellValue::String)),
        }
    }
}

/// Whether the binary row decoder understands `ty`. Any other column type
/// sends the statement through the text protocol instead.
fn decodes_natively(ty: &Type) -> bool {
    matches!(
        ty.name(),
        "bool"
            | "int2"
            | "int4"
            | "int8"
            | "oid"
            | "float4"
            | "float8"
            | "numeric"
            | "timestamptz"
            | "timestamp"
            | "date"
            | "time"
            | "json"
            | "jsonb"
            | "uuid"
            | "bytea"
            | "text"
            | "varchar"
            | "bpchar"
            | "name"
            | "_bool"
            | "_int2"
            | "_int4"
            | "_int8"
            | "_float8"
            | "_text"
            | "_varchar"
            | "_bpchar"
            | "_name"
    )
}

/// One-dimensional array column as a JSON array.
fn array_cell<'a, T>(row: &'a Row, index: usize) -> Result<CellValue, tokio_postgres::Error>
where
    T: tokio_postgres::types::FromSql<'a>,
    T: Into<Value>,
{
    row.try_get::<_, Option<Vec<Option<T>>>>(index)
        .map(|v| v.map_or(CellValue::Null, |items| CellValue::Json(Value::from(items))))
}

/// `bytea` in the server's hex output format.
fn bytea_text(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

/// Cell from the text protocol, typed where the text has an unambiguous
/// native form and kept as the server's rendering otherwise.
fn text_cell(ty: &Type, text: Option<&str>) -> CellValue {
    let Some(text) = text else {
        return CellValue::Null;
    };

    let typed = match ty.name() {
        "bool" => match text {
            "t" => Some(CellValue::Bool(true)),
            "f" => Some(CellValue::Bool(false)),
            _ => None,
        },
        "int2" | "int4" | "int8" | "oid" => text.parse::<i64>().ok().map(CellValue::Int),
        "float4" | "float8" => text.parse::<f64>().ok().map(CellValue::Float),
        "numeric" => Decimal::from_str(text).ok().map(CellValue::Decimal),
        "json" | "jsonb" => serde_json::from_str(text).ok().map(CellValue::Json),
        _ => None,
    };

    typed.unwrap_or_else(|| CellValue::from(text))
}

fn query_error(e: tokio_postgres::Error) -> CollaboratorError {
    let message = match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    };
    CollaboratorError::QueryFailed(message)
}

/// Splits `schema.table`; an unqualified name uses the current schema.
fn split_table_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() => (Some(schema), table),
        _ => (None, name),
    }
}

#[async_trait]
impl Collaborator for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&mut self) -> CollabResult<()> {
        if let Some(old) = self.pool.take() {
            old.close();
        }

        info!(
            "Connecting to PostgreSQL: {}:{}/{}",
            self.config.host, self.config.port, self.config.database
        );

        let mut deadpool_config = DeadpoolConfig::new();
        deadpool_config.host = Some(self.config.host.clone());
        deadpool_config.port = Some(self.config.port);
        deadpool_config.dbname = Some(self.config.database.clone());
        deadpool_config.user = Some(self.config.username.clone());
        if !self.config.password.is_empty() {
            deadpool_config.password = Some(self.config.password.clone());
        }
        deadpool_config.connect_timeout = Some(self.config.connect_timeout);
        deadpool_config.pool = Some(PoolConfig::new(self.config.pool_size));

        let pool = deadpool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let wait = self.config.connect_timeout;
        let client = timeout(wait, pool.get())
            .await
            .map_err(|_| CollaboratorError::Timeout(wait.as_millis() as u64))?
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;
        drop(client);

        info!(
            "PostgreSQL connection pool created with max size {}",
            self.config.pool_size
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let Some(pool) = self.pool.as_ref() else {
            return false;
        };

        let ping = async {
            let client = pool.get().await.ok()?;
            client.simple_query("SELECT 1").await.ok()
        };
        matches!(timeout(PING_TIMEOUT, ping).await, Ok(Some(_)))
    }

    async fn close(&mut self) -> CollabResult<()> {
        if let Some(pool) = self.pool.take() {
            pool.close();
            debug!("PostgreSQL pool closed");
        }
        Ok(())
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::network("postgres", self.config.host.clone(), self.config.port)
            .with_database(self.config.database.clone())
            .with_username(self.config.username.clone())
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    #[instrument(skip(self, sql), fields(db = "postgres"))]
    async fn query(&self, sql: &str) -> CollabResult<QueryResult> {
        let client = self.client().await?;
        debug!("Executing query: {}", sql);

        self.bounded(async {
            let stmt = client.prepare(sql).await.map_err(query_error)?;

            let columns: Vec<String> = stmt
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            let types: Vec<Type> = stmt.columns().iter().map(|c| c.type_().clone()).collect();

            let rows: Vec<Vec<CellValue>> = if types.iter().all(decodes_natively) {
                let pg_rows = client.query(&stmt, &[]).await.map_err(query_error)?;
                pg_rows
                    .iter()
                    .map(|row| {
                        types
                            .iter()
                            .enumerate()
                            .map(|(i, ty)| {
                                Self::cell_value(row, i, ty).map_err(|e| {
                                    CollaboratorError::QueryFailed(format!(
                                        "column '{}': {}",
                                        columns[i], e
                                    ))
                                })
                            })
                            .collect::<CollabResult<Vec<_>>>()
                    })
                    .collect::<CollabResult<Vec<_>>>()?
            } else {
                debug!("Result has column types without a binary decoder, using text results");
                client
                    .simple_query(sql)
                    .await
                    .map_err(query_error)?
                    .iter()
                    .filter_map(|message| match message {
                        SimpleQueryMessage::Row(row) => Some(row),
                        _ => None,
                    })
                    .map(|row| {
                        types
                            .iter()
                            .enumerate()
                            .map(|(i, ty)| text_cell(ty, row.get(i)))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            };

            Ok(QueryResult::new(columns, rows))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_tables(&self) -> CollabResult<Vec<String>> {
        let rows = self.fetch(LIST_TABLES_SQL, &[]).await?;
        rows.iter()
            .map(|row| row.try_get::<_, String>("table_name").map_err(query_error))
            .collect()
    }

    #[instrument(skip(self))]
    async fn table_schema(&self, table: &str) -> CollabResult<Vec<FieldDescriptor>> {
        let (schema, name) = split_table_name(table);
        let rows = self.fetch(TABLE_SCHEMA_SQL, &[&schema, &name]).await?;

        if rows.is_empty() {
            return Err(CollaboratorError::TableNotFound(table.to_string()));
        }

        rows.iter()
            .map(|row| {
                let key_role: String = row.try_get("key_role").map_err(query_error)?;
                Ok(FieldDescriptor {
                    name: row.try_get("column_name").map_err(query_error)?,
                    data_type: row.try_get("data_type").map_err(query_error)?,
                    nullable: row.try_get("nullable").map_err(query_error)?,
                    key: KeyRole::from_code(&key_role),
                    default: row.try_get("column_default").map_err(query_error)?,
                    extra: row.try_get("extra").map_err(query_error)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_table_name() {
        assert_eq!(split_table_name("users"), (None, "users"));
        assert_eq!(split_table_name("audit.events"), (Some("audit"), "events"));
        assert_eq!(split_table_name(".events"), (None, ".events"));
    }

    #[test]
    fn test_native_decoding_coverage() {
        for ty in [Type::UUID, Type::BYTEA, Type::TIME, Type::TEXT_ARRAY, Type::INT8_ARRAY] {
            assert!(decodes_natively(&ty), "{}", ty.name());
        }
        for ty in [Type::INET, Type::INTERVAL, Type::MONEY, Type::TIMETZ] {
            assert!(!decodes_natively(&ty), "{}", ty.name());
        }
    }

    #[test]
    fn test_text_cells_keep_values() {
        assert_eq!(text_cell(&Type::INT4, Some("42")), CellValue::Int(42));
        assert_eq!(text_cell(&Type::BOOL, Some("t")), CellValue::Bool(true));
        assert_eq!(
            text_cell(&Type::NUMERIC, Some("12.50")),
            CellValue::Decimal(Decimal::new(1250, 2))
        );
        assert_eq!(
            text_cell(&Type::JSONB, Some(r#"{"a":1}"#)),
            CellValue::Json(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            text_cell(&Type::INET, Some("10.0.0.1/32")),
            CellValue::from("10.0.0.1/32")
        );
        assert_eq!(
            text_cell(&Type::INTERVAL, Some("1 day 02:00:00")),
            CellValue::from("1 day 02:00:00")
        );
        assert_eq!(text_cell(&Type::UUID, None), CellValue::Null);
    }

    #[test]
    fn test_bytea_uses_hex_format() {
        assert_eq!(bytea_text(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(bytea_text(&[]), "\\x");
    }

    #[test]
    fn test_table_listing_includes_views() {
        assert!(LIST_TABLES_SQL.contains("'VIEW'"));
        assert!(LIST_TABLES_SQL.contains("'BASE TABLE'"));
    }

    #[tokio::test]
    async fn test_not_connected_before_connect() {
        let backend = PostgresBackend::new(DatabaseConfig::default());
        assert!(!backend.is_connected().await);
        assert!(matches!(
            backend.query("SELECT 1").await,
            Err(CollaboratorError::NotConnected("postgres"))
        ));
    }

    #[test]
    fn test_endpoint_has_no_password() {
        let config = DatabaseConfig::builder()
            .host("db.internal")
            .database("shop")
            .username("reader")
            .password("hunter2")
            .build()
            .unwrap();
        let backend = PostgresBackend::new(config);

        let summary = serde_json::to_string(&backend.endpoint()).unwrap();
        assert!(summary.contains("db.internal"));
        assert!(summary.contains("reader"));
        assert!(!summary.contains("hunter2"));
    }
}
