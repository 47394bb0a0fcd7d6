//! Bazaar Core - Shared domain types.
//!
//! This crate provides the value types used by the storefront when talking to
//! the shop backend:
//! - typed identifiers for backend entities
//! - decimal prices parsed from the backend's string amounts
//! - order status with its cancellation rule
//! - validated email addresses and phone numbers for registration forms
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O and no HTTP clients. The
//! backend stays the source of truth; these types only give its JSON a shape.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
