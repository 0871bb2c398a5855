//! Potential energy reconstruction for planar conservative force fields.
//!
//! Given the two force components as text, [`compute`] parses them, integrates
//! U = -∫F·dr, checks that -∇U reproduces F exactly and samples U on a fixed
//! 400 × 400 grid over [-10, 10]².
//!
//!# Example
//! ```
//! use RustedPotential::potential::{ErrorKind, compute};
//! let solution = compute("y", "x").unwrap();
//! let (dx, dy) = solution.potential.gradient_at(2.0, 3.0).unwrap();
//! assert_eq!((dx, dy), (-3.0, -2.0));
//!
//! let failure = compute("y", "y").unwrap_err();
//! assert_eq!(failure.kind, ErrorKind::InconsistentFieldError);
//! ```
/// failure kinds, localized messages
pub mod error;
/// raw evaluation of the verified potential on the sampling grid
pub mod evaluator;
/// glyph replacement in raw input
pub mod normalizer;
/// the stage sequence and the public entry points
pub mod pipeline;
/// antiderivatives along x and y
pub mod reconstructor;
/// parsing and the free-variable check
pub mod validator;
/// exact gradient check of the candidate
pub mod verifier;

pub use error::{ErrorKind, Failure, Locale, PotentialError};
pub use evaluator::{FieldValues, GRID_MAX, GRID_MIN, GRID_RESOLUTION};
pub use pipeline::{
    ComputeSettings, Pipeline, PipelineStage, PotentialSolution, compute, compute_with_settings,
};
pub use reconstructor::ReconstructionStrategy;
