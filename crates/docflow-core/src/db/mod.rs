//! SQLite database layer for docflow.
//!
//! Uses rusqlite with WAL mode on file databases. All database operations
//! are executed via `tokio::task::spawn_blocking` to avoid blocking the
//! async runtime. Writes that allocate reference numbers go through
//! [`Database::with_tx`], which takes the SQLite write lock up front so the
//! read-max-then-increment of the monthly sequence is serializable.

use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::DocflowError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(db_path: &str) -> Result<Self, DocflowError> {
        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| DocflowError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
            .map_err(|e| DocflowError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DocflowError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DocflowError::Database(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| DocflowError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    /// Automatically handles locking and error conversion.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DocflowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DocflowError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(DocflowError::from)
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, DocflowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| DocflowError::Internal(format!("Task join error: {}", e)))?
    }

    /// Run a closure inside an IMMEDIATE transaction.
    ///
    /// The transaction commits only when the closure returns `Ok`; any error
    /// (domain or storage) drops it, rolling back every write it made.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, DocflowError>
    where
        F: FnOnce(&Connection) -> Result<T, DocflowError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DocflowError::Database(format!("Lock poisoned: {}", e)))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Async wrapper over [`Database::with_tx`].
    pub async fn with_tx_async<F, T>(&self, f: F) -> Result<T, DocflowError>
    where
        F: FnOnce(&Connection) -> Result<T, DocflowError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_tx(f))
            .await
            .map_err(|e| DocflowError::Internal(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), DocflowError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS entities (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    code            TEXT NOT NULL UNIQUE,
                    name            TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS clients (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    name            TEXT NOT NULL,
                    email           TEXT,
                    phone           TEXT,
                    address         TEXT,
                    created_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_clients_name ON clients(name);

                CREATE TABLE IF NOT EXISTS sites (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    client_id       INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
                    name            TEXT NOT NULL,
                    location        TEXT,
                    description     TEXT,
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    created_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_sites_client ON sites(client_id, is_active);

                CREATE TABLE IF NOT EXISTS categories (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    entity_id       INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
                    code            TEXT NOT NULL,
                    name            TEXT NOT NULL,
                    description     TEXT,
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    UNIQUE (code, entity_id)
                );

                CREATE TABLE IF NOT EXISTS products (
                    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                    category_id             INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                    code                    TEXT NOT NULL,
                    name                    TEXT NOT NULL,
                    description             TEXT,
                    standard_price_cents    INTEGER NOT NULL DEFAULT 0,
                    is_active               INTEGER NOT NULL DEFAULT 1,
                    created_at              INTEGER NOT NULL,
                    updated_at              INTEGER NOT NULL,
                    UNIQUE (code, category_id)
                );

                CREATE TABLE IF NOT EXISTS documents (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    kind                TEXT NOT NULL,
                    entity_id           INTEGER NOT NULL REFERENCES entities(id),
                    client_id           INTEGER NOT NULL REFERENCES clients(id),
                    reference           TEXT NOT NULL UNIQUE,
                    status              TEXT NOT NULL,
                    sequence_number     INTEGER NOT NULL,
                    period_year         INTEGER NOT NULL,
                    period_month        INTEGER NOT NULL,
                    amount_cents        INTEGER NOT NULL DEFAULT 0,
                    comments            TEXT,
                    offer_id            INTEGER REFERENCES documents(id),
                    proforma_id         INTEGER REFERENCES documents(id),
                    business_case_id    INTEGER REFERENCES documents(id),
                    site_id             INTEGER REFERENCES sites(id),
                    product_id          INTEGER REFERENCES products(id),
                    training_session_id INTEGER REFERENCES training_sessions(id),
                    participant_id      INTEGER REFERENCES participants(id),
                    planned_end_on      TEXT,
                    due_on              TEXT,
                    paid_on             TEXT,
                    created_at          INTEGER NOT NULL,
                    updated_at          INTEGER NOT NULL,
                    validated_at        INTEGER,
                    completed_at        INTEGER,
                    UNIQUE (entity_id, kind, period_year, period_month, sequence_number)
                );
                CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents(kind, created_at);
                CREATE INDEX IF NOT EXISTS idx_documents_client ON documents(kind, client_id);

                CREATE UNIQUE INDEX IF NOT EXISTS uq_proforma_per_offer
                    ON documents(offer_id) WHERE kind = 'PRO';
                CREATE UNIQUE INDEX IF NOT EXISTS uq_business_case_per_proforma
                    ON documents(proforma_id) WHERE kind = 'AFF';
                CREATE UNIQUE INDEX IF NOT EXISTS uq_invoice_per_business_case
                    ON documents(business_case_id) WHERE kind = 'FAC';
                CREATE UNIQUE INDEX IF NOT EXISTS uq_report_per_site_product
                    ON documents(business_case_id, site_id, product_id) WHERE kind = 'RAP';
                CREATE UNIQUE INDEX IF NOT EXISTS uq_certificate_per_participant
                    ON documents(participant_id) WHERE kind = 'ATT';

                CREATE TRIGGER IF NOT EXISTS trg_documents_reference_immutable
                BEFORE UPDATE OF reference, sequence_number ON documents
                WHEN NEW.reference IS NOT OLD.reference
                  OR NEW.sequence_number IS NOT OLD.sequence_number
                BEGIN
                    SELECT RAISE(ABORT, 'document reference is immutable');
                END;

                CREATE TABLE IF NOT EXISTS offer_products (
                    offer_id        INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    product_id      INTEGER NOT NULL REFERENCES products(id),
                    PRIMARY KEY (offer_id, product_id)
                );

                CREATE TABLE IF NOT EXISTS offer_sites (
                    offer_id        INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    site_id         INTEGER NOT NULL REFERENCES sites(id),
                    PRIMARY KEY (offer_id, site_id)
                );

                CREATE TABLE IF NOT EXISTS certificate_details (
                    document_id         INTEGER PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
                    details             TEXT NOT NULL,
                    skills_acquired     TEXT,
                    evaluation_result   TEXT,
                    trainer_signed      INTEGER NOT NULL DEFAULT 0,
                    participant_signed  INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS training_sessions (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    business_case_id    INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    client_id           INTEGER NOT NULL REFERENCES clients(id),
                    product_id          INTEGER NOT NULL REFERENCES products(id),
                    title               TEXT NOT NULL,
                    description         TEXT,
                    trainer             TEXT,
                    starts_at           INTEGER,
                    ends_at             INTEGER,
                    average_score       REAL,
                    created_at          INTEGER NOT NULL,
                    UNIQUE (business_case_id, product_id)
                );

                CREATE TABLE IF NOT EXISTS participants (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    training_session_id INTEGER NOT NULL REFERENCES training_sessions(id) ON DELETE CASCADE,
                    last_name           TEXT NOT NULL,
                    first_name          TEXT NOT NULL,
                    email               TEXT,
                    phone               TEXT,
                    job_title           TEXT,
                    present             INTEGER NOT NULL DEFAULT 1,
                    score               REAL,
                    score_comment       TEXT,
                    UNIQUE (email, training_session_id)
                );
                CREATE INDEX IF NOT EXISTS idx_participants_session ON participants(training_session_id);

                CREATE TABLE IF NOT EXISTS document_history (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    document_id     INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    old_status      TEXT NOT NULL,
                    new_status      TEXT NOT NULL,
                    changed_by      TEXT,
                    comment         TEXT,
                    changed_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_history_document ON document_history(document_id);
                ",
            )
        })
    }
}
