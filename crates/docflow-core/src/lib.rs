//! docflow core: the sales-document pipeline of a multi-entity service company.
//!
//! An offer, once validated, becomes a proforma; a validated proforma opens a
//! business case; a completed business case is invoiced and produces one
//! report per (site, product) and one training session per training product.
//! Every document carries an immutable reference numbered per entity, type
//! and month (see [`reference`]).
//!
//! The crate has no transport dependency; the `docflow` CLI drives it
//! through [`AppState`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reference;
pub mod state;
pub mod store;
pub mod workflow;

pub use config::DocflowConfig;
pub use db::Database;
pub use error::DocflowError;
pub use state::{AppState, AppStateInner};
pub use workflow::{DocumentWorkflow, TransitionOutcome};
