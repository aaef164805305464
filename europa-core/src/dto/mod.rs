//! Data Transfer Objects for the console backend
//!
//! Request parameters and payloads sent to the backend's ajax operations.
//! Responses are domain types and live in [`crate::domain`].

pub mod pipeline;
pub mod repo;
