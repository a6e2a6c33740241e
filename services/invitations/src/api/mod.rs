//! JSON API under `/v1`.
pub mod error;
pub mod guests;
pub mod openapi;
pub mod slugs;
pub mod system;
pub mod types;
pub mod watch;
