//! Europa Core
//!
//! Core types and client-side logic for the Europa pipeline console.
//!
//! This crate contains:
//! - Domain types: pipelines, pipeline components, repositories and their events
//! - DTOs: request payloads sent to the console backend
//! - Stage sequencing: turning a component list into renderable stages
//! - Tag rules and the manual promotion workflow

pub mod domain;
pub mod dto;
pub mod promotion;
pub mod stages;
pub mod tag;
