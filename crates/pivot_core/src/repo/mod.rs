//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Pivot writes must enforce `Pivot::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `MissingTable`) in
//!   addition to DB transport errors.

pub mod object_repo;
pub mod pivot_repo;
