//! GitLab pipelines API DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::PipelineStatus;

/// A single CI variable passed when creating a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVariable {
    pub key: String,
    pub value: String,
}

/// Body of `POST /projects/:id/pipeline`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePipelineRequest {
    pub variables: Vec<PipelineVariable>,
}

/// Pipeline as returned by the create and get endpoints
///
/// Only the fields Stepwatch reads are declared; GitLab sends many more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: PipelineStatus,
    pub web_url: String,
}
