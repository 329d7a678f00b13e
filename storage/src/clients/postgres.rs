use async_trait::async_trait;
use errors::{FixtureError, FixtureResult};
use fixture_core::{QueryExecutor, QueryResult, Row};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{AssertSqlSafe, Column, PgPool, Row as _};
use tracing::instrument;

const BACKEND: &str = "postgres";

/// Query executor over a Postgres connection pool.
pub struct PostgresQueryExecutor {
    pool: PgPool
}

impl PostgresQueryExecutor {
    pub async fn connect(url: &str) -> FixtureResult<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| FixtureError::backend(BACKEND, e))?;
        Ok(Self { pool })
    }

    /// Pool that opens connections on first use.
    pub fn connect_lazy(url: &str) -> FixtureResult<Self> {
        let pool = PgPool::connect_lazy(url).map_err(|e| FixtureError::backend(BACKEND, e))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_value(row: &PgRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(Value::Null, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(index) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}

fn decode_row(row: &PgRow) -> Row {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

#[async_trait]
impl QueryExecutor for PostgresQueryExecutor {
    #[instrument(skip(self))]
    async fn execute(&self, sql: &str) -> FixtureResult<QueryResult> {
        let rows = sqlx::query(AssertSqlSafe(sql))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FixtureError::backend(BACKEND, e))?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        Ok(QueryResult {
            columns,
            rows: rows.iter().map(decode_row).collect()
        })
    }

    async fn close(&self) -> FixtureResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
