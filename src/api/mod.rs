//! Catalog REST API access: request engine, token lifecycle, typed
//! models, and the high-level client.

pub mod client;
pub mod http;
pub mod models;
pub mod token;

pub use client::{CatalogClient, NEXT_PAGE_HEADER};
pub use http::{ApiRequest, NoRefresh, RequestEngine, TokenRefresher, AUTH_HEADER};
pub use token::TokenManager;
