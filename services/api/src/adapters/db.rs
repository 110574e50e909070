//! services/api/src/adapters/db.rs
//!
//! This module contains the Postgres document store adapter, the concrete
//! implementation of the `DocumentStore` port from the `core` crate.
//!
//! A "database" is a Postgres schema and a "container" is a table of the shape
//! `(id TEXT PRIMARY KEY, body JSONB, version BIGINT)`. The row version doubles as
//! the document's etag.

use aikido_live_core::ports::{
    ContainerHandle, DocumentStore, PortError, PortResult, Precondition, StoredDocument,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A document store adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Quotes an identifier discovered from the catalog for use in SQL text.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn table(container: &ContainerHandle) -> String {
    format!(
        "{}.{}",
        quote_ident(&container.database),
        quote_ident(&container.container)
    )
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list_databases(&self) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            // tower_sessions holds login sessions, not documents.
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name <> 'information_schema' AND schema_name NOT LIKE 'pg\\_%' \
             AND schema_name <> 'tower_sessions' \
             ORDER BY schema_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn list_containers(&self, database: &str) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             AND table_name NOT LIKE '\\_sqlx%' \
             ORDER BY table_name",
        )
        .bind(database)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn query_by_id(
        &self,
        container: &ContainerHandle,
        id: &str,
    ) -> PortResult<Vec<StoredDocument>> {
        let sql = format!("SELECT body, version FROM {} WHERE id = $1", table(container));
        let rows = sqlx::query_as::<_, (Json<Value>, i64)>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(rows
            .into_iter()
            .map(|(Json(body), version)| StoredDocument {
                body,
                etag: Some(version.to_string()),
            })
            .collect())
    }

    async fn replace_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        item: Value,
        precondition: Precondition,
    ) -> PortResult<()> {
        let result = match precondition {
            Precondition::None => {
                let sql = format!(
                    "UPDATE {} SET body = $2, version = version + 1 WHERE id = $1",
                    table(container)
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(Json(item))
                    .execute(&self.pool)
                    .await
                    .map_err(unexpected)?
            }
            Precondition::IfMatch(etag) => {
                let expected = etag
                    .parse::<i64>()
                    .map_err(|_| PortError::PreconditionFailed(id.to_string()))?;
                let sql = format!(
                    "UPDATE {} SET body = $2, version = version + 1 WHERE id = $1 AND version = $3",
                    table(container)
                );
                let result = sqlx::query(&sql)
                    .bind(id)
                    .bind(Json(item))
                    .bind(expected)
                    .execute(&self.pool)
                    .await
                    .map_err(unexpected)?;
                if result.rows_affected() == 0 {
                    return Err(PortError::PreconditionFailed(id.to_string()));
                }
                result
            }
        };

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    async fn create_item(&self, container: &ContainerHandle, item: Value) -> PortResult<()> {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| PortError::Unexpected("Document has no string 'id' field".to_string()))?
            .to_string();

        let sql = format!(
            "INSERT INTO {} (id, body, version) VALUES ($1, $2, 1)",
            table(container)
        );
        sqlx::query(&sql)
            .bind(&id)
            .bind(Json(item))
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(id.clone())
                }
                _ => unexpected(e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("documents"), "\"documents\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            table(&ContainerHandle::new("aikido", "documents")),
            "\"aikido\".\"documents\""
        );
    }
}
