//! # EVALIO Common Library
//!
//! Shared code for all EVALIO services including:
//! - Error and result types
//! - Bootstrap configuration and root folder resolution
//! - Answer score weighting (the single definition of an overall score)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod scoring;
pub mod time;

pub use error::{Error, Result};
pub use scoring::{AnswerScores, SubScores};
