use rusqlite::{OptionalExtension, Row};

use super::on_constraint;
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::Entity;

#[derive(Clone)]
pub struct EntityStore {
    db: Database,
}

impl EntityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, code: &str, name: &str) -> Result<Entity, DocflowError> {
        Entity::validate_code(code)?;
        if name.trim().is_empty() {
            return Err(DocflowError::Validation("Entity name is required".to_string()));
        }
        let code = code.to_string();
        let name = name.to_string();
        self.db
            .with_tx_async(move |conn| {
                conn.execute(
                    "INSERT INTO entities (code, name) VALUES (?1, ?2)",
                    rusqlite::params![code, name],
                )
                .map_err(|e| on_constraint(e, || format!("Entity code '{}' already exists", code)))?;
                Ok(Entity {
                    id: conn.last_insert_rowid(),
                    code,
                    name,
                })
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Entity>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT id, code, name FROM entities WHERE id = ?1",
                    rusqlite::params![id],
                    row_to_entity,
                )
                .optional()
            })
            .await
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<Entity>, DocflowError> {
        let code = code.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT id, code, name FROM entities WHERE code = ?1",
                    rusqlite::params![code],
                    row_to_entity,
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Entity>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare("SELECT id, code, name FROM entities ORDER BY code")?;
                let rows = stmt
                    .query_map([], row_to_entity)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

pub(crate) fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
    })
}
