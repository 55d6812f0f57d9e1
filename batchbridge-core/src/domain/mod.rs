//! Core domain types
//!
//! This module contains the structures shared between the lifecycle adapter,
//! the backend drivers and the command-line front end.

pub mod descriptor;
pub mod job;
pub mod spec;
