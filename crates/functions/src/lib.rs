//! Cloud Retail functions app library.
//!
//! Small JSON endpoints over the storage service, exposed as a library so
//! the router can be driven in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
