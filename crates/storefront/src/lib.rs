//! Cloud Retail storefront library.
//!
//! Route handlers, middleware and services for the storefront binary,
//! exposed as a library for tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
