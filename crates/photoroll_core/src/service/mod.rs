//! Reconciliation use-case services.
//!
//! # Responsibility
//! - Compose repository calls into the date-sync and aggregation passes.
//! - Keep callers decoupled from storage details.

pub mod aggregation_service;
pub mod date_tree_service;
pub mod gallery_service;
pub mod taken_date_service;
pub mod upload_grouper;
