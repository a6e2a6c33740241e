//! Wedding invitation service library crate.
//!
//! # Purpose
//! Exposes guest identity and slug management, the guest directory stores,
//! the HTTP surface (pages and JSON API), configuration, and observability
//! for use by the binary and tests.
pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod model;
pub mod observability;
pub mod pages;
pub mod seed;
pub mod store;
pub mod watch;
