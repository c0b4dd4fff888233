use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use super::{ms_to_dt, on_constraint};
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::{Category, CreateCategoryInput, CreateProductInput, Product};

const PRODUCT_COLUMNS: &str = "id, category_id, code, name, description, standard_price_cents, \
                               is_active, created_at, updated_at";

/// Service catalog: categories per entity and their products.
#[derive(Clone)]
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> Result<Category, DocflowError> {
        Category::validate_code(&input.code)?;
        if input.name.trim().is_empty() {
            return Err(DocflowError::Validation("Category name is required".to_string()));
        }
        self.db
            .with_tx_async(move |conn| {
                conn.execute(
                    "INSERT INTO categories (entity_id, code, name, description, is_active)
                     VALUES (?1, ?2, ?3, ?4, 1)",
                    rusqlite::params![input.entity_id, input.code, input.name, input.description],
                )
                .map_err(|e| {
                    on_constraint(e, || {
                        format!(
                            "Category '{}' already exists for entity {} (or the entity is unknown)",
                            input.code, input.entity_id
                        )
                    })
                })?;
                Ok(Category {
                    id: conn.last_insert_rowid(),
                    entity_id: input.entity_id,
                    code: input.code,
                    name: input.name,
                    description: input.description,
                    is_active: true,
                })
            })
            .await
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, DocflowError> {
        self.db
            .with_conn_async(move |conn| get_category(conn, id))
            .await
    }

    pub async fn list_categories(&self, entity_id: i64) -> Result<Vec<Category>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, entity_id, code, name, description, is_active
                     FROM categories WHERE entity_id = ?1 ORDER BY code",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![entity_id], row_to_category)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn create_product(&self, input: CreateProductInput) -> Result<Product, DocflowError> {
        Product::validate_code(&input.code)?;
        if input.standard_price_cents < 0 {
            return Err(DocflowError::Validation("Standard price cannot be negative".to_string()));
        }
        let now = Utc::now();
        self.db
            .with_tx_async(move |conn| {
                conn.execute(
                    "INSERT INTO products (category_id, code, name, description, standard_price_cents,
                                           is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
                    rusqlite::params![
                        input.category_id,
                        input.code,
                        input.name,
                        input.description,
                        input.standard_price_cents,
                        now.timestamp_millis(),
                    ],
                )
                .map_err(|e| {
                    on_constraint(e, || {
                        format!(
                            "Product '{}' already exists in category {} (or the category is unknown)",
                            input.code, input.category_id
                        )
                    })
                })?;
                Ok(Product {
                    id: conn.last_insert_rowid(),
                    category_id: input.category_id,
                    code: input.code,
                    name: input.name,
                    description: input.description,
                    standard_price_cents: input.standard_price_cents,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await
    }

    pub async fn get_product(&self, id: i64) -> Result<Option<Product>, DocflowError> {
        self.db
            .with_conn_async(move |conn| get_product(conn, id))
            .await
    }

    pub async fn list_products(&self, category_id: i64) -> Result<Vec<Product>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM products WHERE category_id = ?1 ORDER BY code",
                    PRODUCT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![category_id], row_to_product)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn update_price(&self, id: i64, standard_price_cents: i64) -> Result<bool, DocflowError> {
        if standard_price_cents < 0 {
            return Err(DocflowError::Validation("Standard price cannot be negative".to_string()));
        }
        let now = Utc::now().timestamp_millis();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute(
                    "UPDATE products SET standard_price_cents = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![standard_price_cents, now, id],
                )?;
                Ok(n > 0)
            })
            .await
    }
}

pub(crate) fn get_category(conn: &Connection, id: i64) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, entity_id, code, name, description, is_active FROM categories WHERE id = ?1",
        rusqlite::params![id],
        row_to_category,
    )
    .optional()
}

pub(crate) fn get_product(conn: &Connection, id: i64) -> rusqlite::Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
        rusqlite::params![id],
        row_to_product,
    )
    .optional()
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        category_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        standard_price_cents: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        created_at: ms_to_dt(row.get(7)?),
        updated_at: ms_to_dt(row.get(8)?),
    })
}
