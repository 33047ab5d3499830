//! Error types for gray-tune
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for parameter domains and parameter trees
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    /// Domain bounds are inverted or otherwise unusable
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// The same identifier occurs more than once in a tree
    #[error("Duplicate parameter identifier: {0}")]
    DuplicateIdentifier(String),

    /// An identifier was looked up that the tree does not contain
    #[error("Unknown parameter identifier: {0}")]
    UnknownIdentifier(String),

    /// An OR node is malformed
    #[error("Invalid OR node {identifier}: {reason}")]
    InvalidOrNode { identifier: String, reason: String },

    /// The tree specification could not be parsed
    #[error("Invalid tree specification: {0}")]
    Specification(String),
}

/// Error type for genome conversions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenomeError {
    /// A gene required by the parameter tree is missing
    #[error("Missing gene: {0}")]
    MissingGene(String),

    /// A gene value does not fit its domain
    #[error("Value {value} is not part of the domain of {identifier}")]
    ValueOutsideDomain { identifier: String, value: String },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An encoded categorical feature group could not be decoded
    #[error("Invalid encoding for {identifier}: {reason}")]
    InvalidEncoding { identifier: String, reason: String },
}

/// Error type for search point construction
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchPointError {
    /// Values and bounds do not have the same dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Lower bound exceeds upper bound
    #[error("Invalid bounds in dimension {dimension}: [{lower}, {upper}]")]
    InvalidBounds {
        dimension: usize,
        lower: f64,
        upper: f64,
    },

    /// A partial point was created without a genome to take fixed genes from
    #[error("Partial search point needs an underlying genome")]
    MissingUnderlyingGenome,
}

/// Error type for termination criteria
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TerminationError {
    /// Invalid constructor argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The criterion was evaluated before the CMA-ES state was populated
    #[error("Incomplete CMA-ES state: {0} not set")]
    IncompleteState(&'static str),

    /// The covariance matrix has not been set
    #[error("Covariance matrix not set")]
    MissingCovariance,
}

/// Error type for the continuous optimization engines and strategies
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizationError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Engine was used before being initialized
    #[error("Optimizer has not been initialized")]
    NotInitialized,

    /// The sorter returned something that is not a permutation of the points
    #[error("Invalid sorting: {0}")]
    InvalidSorting(String),

    /// The external evaluation collaborator failed
    #[error("Sorting failed: {0}")]
    SortingFailed(String),

    /// The search distribution degenerated numerically
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    /// A population did not provide what a phase needs
    #[error("Invalid population: {0}")]
    InvalidPopulation(String),
}

/// Error type for regression trees and target leaf computation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    /// The tree has no nodes
    #[error("Tree is empty")]
    EmptyTree,

    /// A node refers to a child that does not exist
    #[error("Invalid node index {index} (tree has {node_count} nodes)")]
    InvalidNodeIndex { index: usize, node_count: usize },

    /// A split refers to a feature outside the representation
    #[error("Feature index {index} out of range for representation of length {length}")]
    FeatureOutOfRange { index: usize, length: usize },

    /// Parent representations differ in length
    #[error("Parent representations differ in length: {competitive} vs {non_competitive}")]
    ParentLengthMismatch {
        competitive: usize,
        non_competitive: usize,
    },

    /// A forest without trees
    #[error("Forest contains no trees")]
    EmptyForest,
}

/// Error type for status dumps
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// IO error during checkpoint
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Checkpoint version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Checkpoint file not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Status dump does not match the component reading it
    #[error("Incompatible status dump: {0}")]
    Incompatible(String),
}

/// Top-level error type
#[derive(Debug, Error)]
pub enum TuneError {
    /// Parameter error
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// Genome error
    #[error("Genome error: {0}")]
    Genome(#[from] GenomeError),

    /// Search point error
    #[error("Search point error: {0}")]
    SearchPoint(#[from] SearchPointError),

    /// Termination error
    #[error("Termination error: {0}")]
    Termination(#[from] TerminationError),

    /// Optimization error
    #[error("Optimization error: {0}")]
    Optimization(#[from] OptimizationError),

    /// Prediction error
    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    /// Checkpoint error
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Result type alias used throughout the crate
pub type TuneResult<T> = Result<T, TuneError>;
