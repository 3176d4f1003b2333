//! Data Transfer Objects
//!
//! Wire shapes exchanged with GitLab, Slack and the operator API. The server and
//! the clients both depend on these so request and response bodies stay in sync.

pub mod gitlab;
pub mod queue;
pub mod slack;
