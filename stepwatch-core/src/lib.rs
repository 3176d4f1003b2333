//! Stepwatch Core
//!
//! Core types shared by the Stepwatch server, clients and CLI.
//!
//! This crate contains:
//! - Domain types: the tracked pipeline run (`JobRecord`) and CI pipeline statuses
//! - DTOs: wire shapes for GitLab, Slack and the operator API
//! - Variable parsing for the `key=value` step input

pub mod domain;
pub mod dto;
pub mod variables;
