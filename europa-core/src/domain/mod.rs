//! Core domain types
//!
//! These types mirror the records served by the console backend. They are
//! deserialized once at the boundary and shared by the sequencer, the
//! promotion workflow and the client.

pub mod component;
pub mod event;
pub mod manifest;
pub mod pipeline;
pub mod repo;
