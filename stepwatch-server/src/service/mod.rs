//! Service Module
//!
//! Business logic between the HTTP layer, the delay queue and the external
//! clients.

pub mod ingress;
pub mod status_check;
pub mod step_config;

pub use ingress::{IngressService, JobSpec};
pub use status_check::StatusChecker;
pub use step_config::StepConfigService;
