use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, postgres::PgPoolOptions, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{timestamp, UPDATED_AT};
use super::{Collection, Document, FindOptions, Store, StoreError, Update};
use crate::config::DatabaseConfig;
use crate::filter::{Filter, FilterOrder, SqlParam, SqlResult};

/// PostgreSQL backend: one table per collection holding JSONB documents.
///
/// `seq` records insertion order and is the final sort key of every query.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(StoreError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(map_sqlx)?;

        info!("Connected to database at {}", parsed.host_str().unwrap_or("localhost"));
        Ok(Self { pool })
    }

    /// Create every collection table and its indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            for statement in schema_statements(collection) {
                sqlx::query(&statement).execute(&self.pool).await.map_err(map_sqlx)?;
            }
            debug!("Ensured table {}", collection);
        }
        info!("Database schema ready ({} collections)", Collection::ALL.len());
        Ok(())
    }

    async fn fetch_documents(&self, sql: SqlResult) -> Result<Vec<Document>, StoreError> {
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(row_to_document).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, collection: Collection, fields: Map<String, Value>) -> Result<Document, StoreError> {
        let doc = Document::new(fields);
        let query = format!("INSERT INTO \"{}\" (id, data) VALUES ($1, $2)", collection.name());
        sqlx::query(&query)
            .bind(doc.id)
            .bind(Value::Object(doc.data.clone()))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        debug!("Inserted {} into {}", doc.id, collection);
        Ok(doc)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let query = format!("SELECT data FROM \"{}\" WHERE id = $1", collection.name());
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await.map_err(map_sqlx)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let options = FindOptions::default().window(0, 1);
        let sql = select_sql(collection, filter, &options)?;
        Ok(self.fetch_documents(sql).await?.into_iter().next())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = select_sql(collection, filter, options)?;
        self.fetch_documents(sql).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let sql = filter.to_count_sql(collection.name())?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await.map_err(map_sqlx)?;
        let count: i64 = row.try_get("count").map_err(map_sqlx)?;
        Ok(count.max(0) as u64)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Document>, StoreError> {
        update.validate()?;
        let sql = update_sql(collection, id, update, &timestamp());
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_optional(&self.pool).await.map_err(map_sqlx)?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let query = format!("DELETE FROM \"{}\" WHERE id = $1", collection.name());
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(())
    }
}

/// DDL for one collection: the document table, the insertion-order index,
/// lookup indexes on reference fields and unique indexes
pub fn schema_statements(collection: Collection) -> Vec<String> {
    let table = collection.name();
    let mut statements = vec![
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id UUID PRIMARY KEY, seq BIGSERIAL NOT NULL, data JSONB NOT NULL)",
            table
        ),
        format!("CREATE INDEX IF NOT EXISTS \"{0}_seq_idx\" ON \"{0}\" (seq)", table),
    ];
    for field in collection.indexed_fields() {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS \"{0}_{1}_idx\" ON \"{0}\" ((COALESCE(data->'{1}', 'null'::jsonb)))",
            table, field
        ));
    }
    for field in collection.unique_fields() {
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{0}_{1}_key\" ON \"{0}\" ((data->>'{1}'))",
            table, field
        ));
    }
    statements
}

pub fn select_sql(collection: Collection, filter: &Filter, options: &FindOptions) -> Result<SqlResult, StoreError> {
    let mut params = Vec::new();
    let where_clause = filter.to_where_sql(&mut params)?;
    let order_clause = FilterOrder::generate(&options.sort)?;

    let mut query = format!(
        "SELECT data FROM \"{}\" WHERE {} {}",
        collection.name(),
        where_clause,
        order_clause
    );
    if let Some(limit) = options.limit {
        query.push_str(&format!(" LIMIT {}", limit));
    }
    if options.skip > 0 {
        query.push_str(&format!(" OFFSET {}", options.skip));
    }
    Ok(SqlResult { query, params })
}

/// Single-statement UPDATE ... RETURNING for one document; `$1` is the id
pub fn update_sql(collection: Collection, id: Uuid, update: &Update, now: &str) -> SqlResult {
    let mut params = vec![SqlParam::Uuid(id)];
    let mut param = |p: SqlParam| {
        params.push(p);
        format!("${}", params.len())
    };

    let body = match update {
        Update::Set(fields) => {
            let p = param(SqlParam::Json(Value::Object(fields.clone())));
            format!("data || {}::jsonb", p)
        }
        Update::Unset(fields) => {
            let mut expr = "data".to_string();
            for field in fields {
                expr = format!("{} - {}::text", expr, param(SqlParam::Text(field.clone())));
            }
            format!("({})", expr)
        }
        Update::Push { field, value } => {
            let f = param(SqlParam::Text(field.clone()));
            let v = param(SqlParam::Json(value.clone()));
            format!(
                "jsonb_set(data, ARRAY[{f}::text], {arr} || jsonb_build_array({v}::jsonb))",
                f = f,
                v = v,
                arr = array_or_empty(&f)
            )
        }
        Update::Pull { field, value } => {
            let f = param(SqlParam::Text(field.clone()));
            let v = param(SqlParam::Json(value.clone()));
            format!(
                "jsonb_set(data, ARRAY[{f}::text], COALESCE((SELECT jsonb_agg(t.e ORDER BY t.i) \
                 FROM jsonb_array_elements({arr}) WITH ORDINALITY AS t(e, i) WHERE t.e <> {v}::jsonb), '[]'::jsonb))",
                f = f,
                v = v,
                arr = array_or_empty(&f)
            )
        }
    };
    let ts = param(SqlParam::Text(now.to_string()));

    SqlResult {
        query: format!(
            "UPDATE \"{}\" SET data = {} || jsonb_build_object('{}', {}::text) WHERE id = $1 RETURNING data",
            collection.name(),
            body,
            UPDATED_AT,
            ts
        ),
        params,
    }
}

fn array_or_empty(field_param: &str) -> String {
    format!(
        "(CASE WHEN jsonb_typeof(data->{f}::text) = 'array' THEN data->{f}::text ELSE '[]'::jsonb END)",
        f = field_param
    )
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let data: Value = row.try_get("data").map_err(map_sqlx)?;
    match data {
        Value::Object(map) => Document::from_data(map),
        other => Err(StoreError::Corrupt(format!("expected object, found {}", other))),
    }
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.constraint().unwrap_or("unique").to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Sqlx(other),
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Uuid(u) => q.bind(*u),
        SqlParam::Json(v) => q.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortSpec};
    use serde_json::json;

    #[test]
    fn schema_includes_unique_user_indexes() {
        let statements = schema_statements(Collection::Users);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS \"users\""));
        assert!(statements
            .iter()
            .any(|s| s == "CREATE UNIQUE INDEX IF NOT EXISTS \"users_email_key\" ON \"users\" ((data->>'email'))"));
        assert!(schema_statements(Collection::Likes).iter().all(|s| !s.contains("UNIQUE")));
    }

    #[test]
    fn select_orders_and_windows() {
        let options = FindOptions::sorted(vec![SortSpec::new("views", SortDirection::Desc)]).window(10, 10);
        let sql = select_sql(Collection::Videos, &Filter::eq("owner", "u1"), &options).unwrap();
        assert_eq!(
            sql.query,
            "SELECT data FROM \"videos\" WHERE COALESCE(data->'owner', 'null'::jsonb) = $1::jsonb \
             ORDER BY COALESCE(data->'views', 'null'::jsonb) DESC, seq ASC LIMIT 10 OFFSET 10"
        );
        assert_eq!(sql.params, vec![SqlParam::Json(json!("u1"))]);
    }

    #[test]
    fn update_set_refreshes_timestamp() {
        let id = Uuid::new_v4();
        let sql = update_sql(Collection::Tweets, id, &Update::set("content", "hi"), "2024-01-01T00:00:00.000Z");
        assert_eq!(
            sql.query,
            "UPDATE \"tweets\" SET data = data || $2::jsonb || jsonb_build_object('updatedAt', $3::text) \
             WHERE id = $1 RETURNING data"
        );
        assert_eq!(sql.params[0], SqlParam::Uuid(id));
        assert_eq!(sql.params[1], SqlParam::Json(json!({ "content": "hi" })));
    }

    #[test]
    fn update_unset_chains_key_removal() {
        let sql = update_sql(Collection::Users, Uuid::new_v4(), &Update::Unset(vec!["refreshToken".into()]), "t");
        assert!(sql.query.contains("SET data = (data - $2::text) || jsonb_build_object"), "{}", sql.query);
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn update_pull_preserves_order() {
        let update = Update::Pull { field: "videos".into(), value: json!("v1") };
        let sql = update_sql(Collection::Playlists, Uuid::new_v4(), &update, "t");
        assert!(sql.query.contains("jsonb_agg(t.e ORDER BY t.i)"));
        assert!(sql.query.contains("WHERE t.e <> $3::jsonb"));
    }
}
