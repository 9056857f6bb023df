use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;
use sqlx::migrate::MigrateDatabase;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::memory::stamp_version;
use super::{Collection, DocumentStore, Query, RawDocument};
use crate::errors::{AppError, AppResult};

pub type DbPool = PgPool;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    if !Postgres::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database...");
        if let Err(e) = Postgres::create_database(database_url).await {
            error!("Error creating database: {}", e);
            sentry::capture_error(&e);
            return Err(e);
        }
        info!("Database created successfully.");
    }

    PgPool::connect(database_url).await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    let result = sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id UUID NOT NULL,
            version BIGINT NOT NULL,
            body JSONB NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
            PRIMARY KEY (collection, id)
        )
    "#,
    )
    .execute(pool)
    .await;
    if let Err(e) = result {
        error!("Migration error (documents): {}", e);
        sentry::capture_error(&e);
        return Err(e);
    }

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_documents_body ON documents USING GIN (body jsonb_path_ops)
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_keys (
            collection TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            document_id UUID NOT NULL,
            PRIMARY KEY (collection, field, value),
            FOREIGN KEY (collection, document_id) REFERENCES documents(collection, id) ON DELETE CASCADE
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_document_keys_owner ON document_keys(collection, document_id)
    "#,
    )
    .execute(pool)
    .await?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// Postgres-backed store: JSONB bodies in `documents`, unique values in
/// `document_keys`. Each save runs in its own transaction.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connects, creating the database if needed, and runs the migrations.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = create_pool(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Value, _>("body")?)),
            None => Ok(None),
        }
    }

    async fn find(&self, collection: Collection, query: &Query) -> AppResult<Vec<Value>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
        builder.push_bind(collection.as_str());
        builder.push(" AND body @> ");
        builder.push_bind(query.filter.clone());

        if let Some(sort) = &query.sort {
            let path: Vec<String> = sort.path.split('.').map(str::to_string).collect();
            builder.push(" ORDER BY body #> ");
            builder.push_bind(path);
            builder.push(if sort.descending { " DESC NULLS LAST" } else { " ASC NULLS FIRST" });
            builder.push(", id");
        } else {
            builder.push(" ORDER BY id");
        }
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }
        if query.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(query.offset as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<Value, _>("body").map_err(AppError::from))
            .collect()
    }

    async fn save(&self, document: RawDocument) -> AppResult<i64> {
        let RawDocument {
            collection,
            id,
            expected_version,
            mut body,
            unique_keys,
        } = document;
        let version = expected_version + 1;
        stamp_version(&mut body, version);

        let mut tx = self.pool.begin().await?;

        let written = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, version, body)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (collection, id) DO NOTHING
            "#,
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(version)
            .bind(&body)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE documents SET version = $3, body = $4, updated_at = NOW()
                WHERE collection = $1 AND id = $2 AND version = $5
            "#,
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(version)
            .bind(&body)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?
        };
        if written.rows_affected() == 0 {
            return Err(AppError::StaleWrite {
                entity: collection.as_str(),
                id,
            });
        }

        sqlx::query("DELETE FROM document_keys WHERE collection = $1 AND document_id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for key in &unique_keys {
            let inserted = sqlx::query(
                "INSERT INTO document_keys (collection, field, value, document_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(collection.as_str())
            .bind(key.field)
            .bind(&key.value)
            .bind(id)
            .execute(&mut *tx)
            .await;
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(AppError::Duplicate {
                        field: key.field.to_string(),
                        value: key.value.clone(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(version)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
