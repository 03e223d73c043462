//! Report module - terminal tables and file export

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
