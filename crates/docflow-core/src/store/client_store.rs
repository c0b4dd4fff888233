use chrono::Utc;
use rusqlite::{OptionalExtension, Row};

use super::ms_to_dt;
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::{Client, CreateClientInput, CreateSiteInput, Site};

/// Clients and their sites.
#[derive(Clone)]
pub struct ClientStore {
    db: Database,
}

impl ClientStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateClientInput) -> Result<Client, DocflowError> {
        if input.name.trim().is_empty() {
            return Err(DocflowError::Validation("Client name is required".to_string()));
        }
        let now = Utc::now();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO clients (name, email, phone, address, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        input.name,
                        input.email,
                        input.phone,
                        input.address,
                        now.timestamp_millis(),
                    ],
                )?;
                Ok(Client {
                    id: conn.last_insert_rowid(),
                    name: input.name,
                    email: input.email,
                    phone: input.phone,
                    address: input.address,
                    created_at: now,
                })
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Client>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT id, name, email, phone, address, created_at FROM clients WHERE id = ?1",
                    rusqlite::params![id],
                    row_to_client,
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Client>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, email, phone, address, created_at FROM clients ORDER BY name",
                )?;
                let rows = stmt
                    .query_map([], row_to_client)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn create_site(&self, input: CreateSiteInput) -> Result<Site, DocflowError> {
        if input.name.trim().is_empty() {
            return Err(DocflowError::Validation("Site name is required".to_string()));
        }
        if self.get(input.client_id).await?.is_none() {
            return Err(DocflowError::NotFound(format!("Client {} not found", input.client_id)));
        }
        let now = Utc::now();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO sites (client_id, name, location, description, is_active, created_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                    rusqlite::params![
                        input.client_id,
                        input.name,
                        input.location,
                        input.description,
                        now.timestamp_millis(),
                    ],
                )?;
                Ok(Site {
                    id: conn.last_insert_rowid(),
                    client_id: input.client_id,
                    name: input.name,
                    location: input.location,
                    description: input.description,
                    is_active: true,
                    created_at: now,
                })
            })
            .await
    }

    pub async fn get_site(&self, id: i64) -> Result<Option<Site>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT id, client_id, name, location, description, is_active, created_at
                     FROM sites WHERE id = ?1",
                    rusqlite::params![id],
                    row_to_site,
                )
                .optional()
            })
            .await
    }

    pub async fn list_sites(&self, client_id: i64, active_only: bool) -> Result<Vec<Site>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, client_id, name, location, description, is_active, created_at
                     FROM sites WHERE client_id = ?1 AND (?2 = 0 OR is_active = 1) ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![client_id, active_only as i64], row_to_site)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn set_site_active(&self, id: i64, active: bool) -> Result<bool, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute(
                    "UPDATE sites SET is_active = ?1 WHERE id = ?2",
                    rusqlite::params![active as i64, id],
                )?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        created_at: ms_to_dt(row.get(5)?),
    })
}

fn row_to_site(row: &Row<'_>) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        location: row.get(3)?,
        description: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
        created_at: ms_to_dt(row.get(6)?),
    })
}
