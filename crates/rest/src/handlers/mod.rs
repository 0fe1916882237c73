//! HTTP request handlers.
//!
//! - [`resource`] - Registry-gated resource routes
//! - [`placeholder`] - Default resource handler
//! - [`capabilities`] - Cached CapabilityStatement
//! - [`fallback`] - Unmatched path and method

pub mod capabilities;
pub mod fallback;
pub mod placeholder;
pub mod resource;

pub use capabilities::capabilities_handler;
pub use fallback::{method_not_allowed_handler, not_found_handler};
pub use placeholder::PlaceholderHandler;
pub use resource::{
    create_handler, delete_handler, dispatch, read_handler, search_type_handler, update_handler,
    vread_handler,
};
