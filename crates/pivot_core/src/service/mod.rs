//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the pivot association protocol.
//! - Keep HTTP/widget layers decoupled from storage details.

pub mod pivot_service;
pub mod registry;
