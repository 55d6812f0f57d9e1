//! Batchbridge Core
//!
//! Core types for the Batchbridge remote job adapter.
//!
//! This crate contains:
//! - Domain types: the job handle, its canonical state, and the job specification
//! - Driver descriptors advertised by backend drivers
//!
//! Nothing in here performs I/O. Transport and orchestration live in `batchbridge-client`.

pub mod domain;

pub use domain::descriptor::DriverDescriptor;
pub use domain::job::{Job, JobState, ParseJobStateError};
pub use domain::spec::{JobSpec, ResourceSpec};
