//! Rocal admin dashboard
//!
//! Manages the suppliers, materials and piece-work jobs of a construction
//! business stored in a Supabase project. The crate is the headless core of
//! the dashboard: session tracking, route guarding, per-kind forms, lists,
//! filters and totals. The `rocal-admin` binary drives it from a terminal.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod form;
pub mod kinds;
pub mod list;
pub mod models;
pub mod notify;
pub mod routes;
pub mod session;
pub mod stats;
pub mod store;

pub use app::RocalAdmin;
pub use config::DashboardConfig;
pub use dashboard::{fetch_all, Collections, DashboardController, LoadState, LoadTicket};
pub use error::{Error, Result, StoreError};
pub use kinds::RecordKind;
pub use models::{Identity, Record, RecordId};
pub use session::{AuthFailure, SessionHandle, SessionManager, SessionProvider, SignedIn};
pub use store::{RecordStore, SupabaseStore};

/// Commonly used items
pub mod prelude {
    pub use crate::dashboard::DashboardController;
    pub use crate::error::{Error, Result, StoreError};
    pub use crate::filter::{FilterField, FilterState};
    pub use crate::form::{RecordForm, Submitted};
    pub use crate::kinds::RecordKind;
    pub use crate::list::{DeleteConfirmation, ListView, RecordList};
    pub use crate::models::{Identity, Record, RecordId};
    pub use crate::routes::{resolve, Navigation, Route};
    pub use crate::session::{SessionHandle, SessionManager};
    pub use crate::store::{Payload, RecordStore};
}
