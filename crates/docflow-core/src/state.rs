//! Shared application state: the database handle, every store and the workflow.

use std::sync::Arc;

use crate::config::DocflowConfig;
use crate::db::Database;
use crate::store::{
    CatalogStore, ClientStore, DocumentStore, EntityStore, HistoryStore, TrainingStore,
};
use crate::workflow::DocumentWorkflow;

pub struct AppStateInner {
    pub db: Database,
    pub config: DocflowConfig,
    pub entity_store: EntityStore,
    pub client_store: ClientStore,
    pub catalog_store: CatalogStore,
    pub document_store: DocumentStore,
    pub training_store: TrainingStore,
    pub history_store: HistoryStore,
    pub workflow: DocumentWorkflow,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(db: Database, config: DocflowConfig) -> Self {
        Self {
            entity_store: EntityStore::new(db.clone()),
            client_store: ClientStore::new(db.clone()),
            catalog_store: CatalogStore::new(db.clone()),
            document_store: DocumentStore::new(db.clone()),
            training_store: TrainingStore::new(db.clone()),
            history_store: HistoryStore::new(db.clone()),
            workflow: DocumentWorkflow::new(db.clone(), config.clone()),
            db,
            config,
        }
    }
}
