//! Continuous optimization engines
//!
//! Both engines work on search points created by a
//! [`SearchPointFactory`](crate::search_point::SearchPointFactory) and rank
//! them through an external [`SearchPointSorter`](crate::sorting::SearchPointSorter).

pub mod cmaes;
pub mod differential_evolution;

pub mod prelude {
    pub use super::cmaes::{
        CmaEs, CmaEsConfiguration, CmaEsElements, CmaEsParameters, CmaEsStatus,
        CovarianceDecomposition,
    };
    pub use super::differential_evolution::prelude::*;
}
