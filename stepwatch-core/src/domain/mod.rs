//! Core domain types
//!
//! These types represent the pipeline runs Stepwatch tracks and are shared between
//! the server (which persists them in the delay queue) and the clients.

pub mod job;
pub mod pipeline;
