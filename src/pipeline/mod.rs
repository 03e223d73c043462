//! Pipeline module - feature derivation, summaries, regression and comparison

pub mod analysis;
pub mod compare;
pub mod describe;
pub mod design;
pub mod error;
pub mod features;
pub mod loader;
pub mod ols;
pub mod tidy;
pub mod trend;

pub use analysis::*;
pub use compare::*;
pub use describe::*;
pub use design::*;
pub use error::*;
pub use features::*;
pub use loader::*;
pub use ols::*;
pub use tidy::*;
pub use trend::*;
