//! Status dumps of the optimization engines and strategies
//!
//! A refinement phase can be interrupted and resumed from its status files,
//! with the run continuing exactly as if uninterrupted.

mod recovery;
mod state;

pub use recovery::*;
pub use state::*;

/// Prelude for checkpoint module
pub mod prelude {
    pub use super::recovery::*;
    pub use super::state::*;
}
