//! # triform-api
//!
//! The remote service as seen by the sync engine: a blocking [`RemoteApi`]
//! trait, an HTTP implementation ([`HttpApi`]) and an in-memory one
//! ([`MemoryApi`]) for offline runs and tests.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod types;

pub use client::{ops, RemoteApi, FULL_DEPTH};
pub use error::ApiError;
pub use http::HttpApi;
pub use memory::{MemoryApi, RecordedCall};
pub use types::{Execution, Membership, Organization, ProjectMetaUpdate, Requirements};
