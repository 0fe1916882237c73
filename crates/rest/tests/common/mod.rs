//! Common test utilities for REST API testing.
//!
//! - [`harness`] - Test servers over the fully layered application
//! - [`assertions`] - HTTP response assertions

#![allow(dead_code)]

pub mod assertions;
pub mod harness;
