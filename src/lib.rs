//! Stacksmith - bulk metadata companion for catalog document hubs.
//!
//! Generates fill-in sheet templates from a catalog's custom template
//! schemas and bulk-creates documents from the filled-in sheets, with
//! token lifecycle management, a time-boxed collection cache, and a
//! plain-text audit trail for every upload.

pub mod api;
pub mod cache;
pub mod config;
pub mod export;
pub mod hierarchy;
pub mod profile;
pub mod session;
pub mod sheet;
pub mod types;
pub mod upload;
pub mod worker;

pub use config::Args;
pub use session::SessionState;
pub use types::{Result, StacksmithError};
