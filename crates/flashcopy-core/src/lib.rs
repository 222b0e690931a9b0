//! Core types for flashcopy.
//!
//! This crate provides the plain data structures shared by the flashcopy
//! engine and its front ends: operation requests, terminal outcomes, the
//! observable progress snapshot, and coordinator configuration.

mod config;
mod error;
mod outcome;
mod request;
mod snapshot;

pub use config::{
    CoordinatorConfig, CoordinatorConfigBuilder, DEFAULT_NOTIFICATION_CAPACITY, ExclusionPolicy,
};
pub use error::DispatchError;
pub use outcome::{ImageInfoOutcome, ImageProcessOutcome, Outcome, ValidationOutcome};
pub use request::{OperationKind, OperationRequest};
pub use snapshot::{ProgressSnapshot, percent_of};
