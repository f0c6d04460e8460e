//! HTTP surface for VarWISE View
//!
//! - Catalog browser page and grid data endpoint
//! - Object detail page and JSON detail endpoint
//! - ZTF cross-match proxy

pub mod pages;
pub mod server;

pub use server::{
    create_server, start_server, ApiError, AppState, DrawResponse, ErrorResponse,
    PagedResponse, SuccessResponse,
};
