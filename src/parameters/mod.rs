//! Parameter space description
//!
//! This module provides typed gene values, parameter domains and the
//! parameter tree describing conditional activation of parameters.

pub mod allele;
pub mod domain;
pub mod tree;

pub mod prelude {
    pub use super::allele::*;
    pub use super::domain::*;
    pub use super::tree::*;
}
