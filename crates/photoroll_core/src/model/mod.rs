//! Domain model for photo items, taxonomy terms and collection aggregates.
//!
//! # Responsibility
//! - Define canonical data structures shared by repositories and services.
//! - Keep identity types explicit in signatures (`ItemId`, `TermId`, ...).
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Term identity is `(taxonomy, slug)`; display names never affect identity.
//! - An aggregate's ordered image-id list is authoritative; rendered bodies are
//!   derived from it, never the inverse.

pub mod aggregate;
pub mod item;
pub mod taken_date;
pub mod term;
