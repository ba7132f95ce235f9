//! Evaluation Strategy Module
//!
//! - Sequential: [`crate::xpath::select`], one expression at a time
//! - Parallel: several compiled expressions over one parsed document

pub mod parallel;

pub use parallel::{evaluate_parallel, select_parallel};
