//! agefit: practice-versus-age regression analysis
//!
//! Derives ages and practice duration from survey responses, summarizes them,
//! fits a practice-only and a practice-plus-age least-squares model and
//! reports standardized effects and the gain in explained variance.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
