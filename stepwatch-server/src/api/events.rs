//! Slack Events Handler
//!
//! Single endpoint for both the Events API (JSON bodies) and interactivity
//! (form bodies with a `payload` field). Slack expects an answer within three
//! seconds, so anything that calls out to GitLab or Slack runs in the
//! background task set after the request is acknowledged.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use stepwatch_core::dto::slack::{
    CONFIGURE_VIEW_CALLBACK_ID, CallbackEvent, PipelineInputs, RUN_PIPELINE_CALLBACK_ID,
    SlackPayload,
};
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::api::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_slack_signature};
use crate::service::JobSpec;

/// POST / and GET /
pub async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    if let Some(secret) = &state.signing_secret {
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let verified = verify_slack_signature(
            secret,
            header_str(TIMESTAMP_HEADER),
            header_str(SIGNATURE_HEADER),
            &body,
            chrono::Utc::now().timestamp(),
        );
        if !verified {
            warn!("Rejected Slack request with invalid signature");
            return Err(ApiError::Unauthorized("Invalid request signature".to_string()));
        }
    }

    let payload = parse_payload(&headers, &body)?;
    Ok(dispatch(&state, payload))
}

/// Decodes a JSON body or a form body carrying JSON in `payload`
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> ApiResult<SlackPayload> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let result = if is_json {
        serde_json::from_slice(body)
    } else {
        let payload = url::form_urlencoded::parse(body)
            .find(|(name, _)| name == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| ApiError::BadRequest("Missing payload field".to_string()))?;
        serde_json::from_str(&payload)
    };

    result.map_err(|e| ApiError::BadRequest(format!("Unrecognized payload: {}", e)))
}

fn dispatch(state: &AppState, payload: SlackPayload) -> Response {
    match payload {
        SlackPayload::UrlVerification { challenge } => {
            info!("Answering URL verification");
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }

        SlackPayload::EventCallback {
            event:
                CallbackEvent::WorkflowStepExecute {
                    callback_id,
                    workflow_step,
                },
        } if callback_id == RUN_PIPELINE_CALLBACK_ID => {
            let spec = JobSpec {
                execute_id: workflow_step.workflow_step_execute_id,
                inputs: PipelineInputs::from_step_inputs(&workflow_step.inputs),
            };
            info!(execute_id = %spec.execute_id, project_id = %spec.inputs.project_id, "Workflow step executed");

            let ingress = state.ingress.clone();
            state.tasks.spawn("launch", async move {
                ingress.launch(spec).await;
            });
            StatusCode::OK.into_response()
        }

        SlackPayload::WorkflowStepEdit {
            trigger_id,
            workflow_step,
            ..
        } => {
            let step_config = state.step_config.clone();
            state.tasks.spawn("open_editor", async move {
                if let Err(e) = step_config
                    .open_editor(&trigger_id, &workflow_step.inputs)
                    .await
                {
                    error!("Failed to open step configuration: {}", e);
                }
            });
            StatusCode::OK.into_response()
        }

        SlackPayload::ViewSubmission {
            view,
            workflow_step,
        } if view
            .callback_id
            .as_deref()
            .is_none_or(|id| id == CONFIGURE_VIEW_CALLBACK_ID) =>
        {
            let step_config = state.step_config.clone();
            state.tasks.spawn("save_step", async move {
                if let Err(e) = step_config
                    .save(&workflow_step.workflow_step_edit_id, &view.state)
                    .await
                {
                    error!("Failed to save step configuration: {}", e);
                }
            });
            StatusCode::OK.into_response()
        }

        _ => {
            // Payloads can carry step inputs, including tokens
            debug!("Ignoring unhandled Slack payload");
            StatusCode::OK.into_response()
        }
    }
}
