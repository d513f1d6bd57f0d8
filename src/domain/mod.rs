//! Core domain types and logic.

pub mod error;
pub mod price_bar;
pub mod indicator;
pub mod condition;
pub mod condition_registry;
pub mod condition_parser;
pub mod strategy;
pub mod signal;
pub mod transaction;
pub mod metrics;
pub mod goal;
pub mod task;
pub mod job_queue;
pub mod pipeline;
pub mod universe;
pub mod config_validation;
