//! Step configuration
//!
//! Backs the "edit step" flow in Slack's workflow builder: opening the
//! configuration modal and saving what was submitted as the step's inputs.

use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use stepwatch_client::{ChatClient, Result};
use stepwatch_core::dto::slack::{
    CONFIGURE_VIEW_CALLBACK_ID, OutputDeclaration, PipelineInputs, StepInput, StepInputs,
    UpdateStepRequest, ViewState,
};
use tracing::info;

/// Input names, which double as modal block and action ids
const INPUT_NAMES: [&str; 7] = [
    "display_name",
    "baseurl",
    "project_id",
    "personal_token",
    "ref",
    "variables",
    "announcement",
];

pub struct StepConfigService {
    chat: Arc<dyn ChatClient>,
}

impl StepConfigService {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    /// Opens the configuration modal pre-filled with the saved inputs
    pub async fn open_editor(&self, trigger_id: &str, inputs: &StepInputs) -> Result<()> {
        let view = configuration_view(&PipelineInputs::from_step_inputs(inputs));
        self.chat.open_view(trigger_id, view).await
    }

    /// Saves a submitted configuration modal as the step's inputs
    pub async fn save(&self, edit_id: &str, state: &ViewState) -> Result<()> {
        let inputs = submitted_inputs(state);
        info!(edit_id, inputs = inputs.len(), "Saving workflow step configuration");

        self.chat
            .update_step(UpdateStepRequest {
                workflow_step_edit_id: edit_id.to_string(),
                inputs,
                outputs: declared_outputs(),
            })
            .await
    }
}

fn plain_text(text: &str) -> JsonValue {
    json!({ "type": "plain_text", "text": text })
}

fn text_input(id: &str, label: &str, initial: &str) -> JsonValue {
    json!({
        "type": "input",
        "block_id": id,
        "element": {
            "type": "plain_text_input",
            "action_id": id,
            "initial_value": initial,
        },
        "label": plain_text(label),
    })
}

/// Builds the `workflow_step` modal
pub fn configuration_view(inputs: &PipelineInputs) -> JsonValue {
    let mut display_name = text_input("display_name", "Pipeline display name", &inputs.display_name);
    display_name["hint"] = plain_text("This text will be used in communication with users");

    let mut baseurl = text_input("baseurl", "Gitlab base URL", &inputs.base_url);
    baseurl["element"]["placeholder"] = plain_text("https://gitlab.com/");

    let mut project_id = text_input("project_id", "Project ID", &inputs.project_id);
    project_id["hint"] = plain_text(
        "You can find this in your project's homepage in Gitlab, right below the project name",
    );

    let mut personal_token = text_input(
        "personal_token",
        "Personal access Token",
        inputs.personal_token.expose(),
    );
    personal_token["element"]["placeholder"] = plain_text("1111");

    let token_help = json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": "If you are not sure what personal access tokens are, or how to create one, \
                     read more <https://docs.gitlab.com/ee/user/profile/personal_access_tokens.html|here>",
        },
    });

    let git_ref = text_input("ref", "Ref", &inputs.git_ref);

    let mut variables = text_input("variables", "Variables", &inputs.variables);
    variables["optional"] = json!(true);
    variables["element"]["placeholder"] = plain_text("var1=value1:var2=value2");
    variables["hint"] =
        plain_text("colon-separated, key=value formatted variables to pass to the pipeline");

    let mut announcement = json!({
        "type": "input",
        "optional": true,
        "block_id": "announcement",
        "element": {
            "type": "conversations_select",
            "action_id": "announcement",
            "placeholder": plain_text("Select channels"),
        },
        "label": plain_text("Channels to notify progress"),
    });
    if let Some(channel) = &inputs.announcement {
        announcement["element"]["initial_conversation"] = json!(channel);
    }

    json!({
        "type": "workflow_step",
        "callback_id": CONFIGURE_VIEW_CALLBACK_ID,
        "blocks": [
            display_name,
            baseurl,
            project_id,
            personal_token,
            token_help,
            git_ref,
            variables,
            announcement,
        ],
    })
}

/// Step inputs from a submitted modal
///
/// Element states are saved as-is so the execute event can read back either a
/// text value or a selected conversation. Blocks missing from the submission
/// are left out.
pub fn submitted_inputs(state: &ViewState) -> StepInputs {
    INPUT_NAMES
        .iter()
        .filter_map(|name| {
            state
                .element(name)
                .map(|element| (name.to_string(), StepInput::new(element.clone())))
        })
        .collect()
}

/// Outputs later workflow steps can use
pub fn declared_outputs() -> Vec<OutputDeclaration> {
    [("pipeline_id", "Pipeline ID"), ("pipeline_link", "Pipeline Link")]
        .into_iter()
        .map(|(name, label)| OutputDeclaration {
            name: name.to_string(),
            kind: "text".to_string(),
            label: label.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ChatCall, FakeChat};
    use stepwatch_core::dto::slack::DEFAULT_BASE_URL;

    fn view_state() -> ViewState {
        serde_json::from_value(json!({
            "values": {
                "display_name": { "display_name": { "type": "plain_text_input", "value": "Deploy" } },
                "baseurl": { "baseurl": { "type": "plain_text_input", "value": "https://gitlab.example.com/" } },
                "project_id": { "project_id": { "type": "plain_text_input", "value": "42" } },
                "personal_token": { "personal_token": { "type": "plain_text_input", "value": "glpat" } },
                "ref": { "ref": { "type": "plain_text_input", "value": "main" } },
                "variables": { "variables": { "type": "plain_text_input", "value": null } },
                "announcement": {
                    "announcement": { "type": "conversations_select", "selected_conversation": "C0123" }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_view_uses_defaults() {
        let view = configuration_view(&PipelineInputs::from_step_inputs(&StepInputs::new()));

        assert_eq!(view["callback_id"], CONFIGURE_VIEW_CALLBACK_ID);
        let blocks = view["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 8);
        assert_eq!(blocks[0]["element"]["initial_value"], "Pipeline");
        assert_eq!(blocks[1]["element"]["initial_value"], DEFAULT_BASE_URL);
        assert_eq!(blocks[5]["element"]["initial_value"], "master");
        assert!(blocks[7]["element"].get("initial_conversation").is_none());
    }

    #[test]
    fn test_view_prefills_channel() {
        let inputs = submitted_inputs(&view_state());
        let view = configuration_view(&PipelineInputs::from_step_inputs(&inputs));

        let blocks = view["blocks"].as_array().unwrap();
        assert_eq!(blocks[0]["element"]["initial_value"], "Deploy");
        assert_eq!(blocks[7]["element"]["initial_conversation"], "C0123");
    }

    #[test]
    fn test_submitted_inputs_round_trip_to_pipeline_inputs() {
        let inputs = submitted_inputs(&view_state());
        assert_eq!(inputs.len(), 7);

        let parsed = PipelineInputs::from_step_inputs(&inputs);
        assert_eq!(parsed.project_id, "42");
        assert_eq!(parsed.git_ref, "main");
        assert_eq!(parsed.variables, "");
        assert_eq!(parsed.announcement.as_deref(), Some("C0123"));
    }

    #[test]
    fn test_declared_outputs() {
        let names: Vec<_> = declared_outputs().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["pipeline_id", "pipeline_link"]);
    }

    #[tokio::test]
    async fn test_save_updates_step() {
        let chat = Arc::new(FakeChat::new());
        let service = StepConfigService::new(chat.clone());

        service.save("edit-1", &view_state()).await.unwrap();

        match chat.calls().as_slice() {
            [ChatCall::UpdateStep { edit_id, input_names }] => {
                assert_eq!(edit_id, "edit-1");
                assert!(input_names.contains(&"announcement".to_string()));
                assert_eq!(input_names.len(), 7);
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_editor() {
        let chat = Arc::new(FakeChat::new());
        let service = StepConfigService::new(chat.clone());

        service.open_editor("trigger-1", &StepInputs::new()).await.unwrap();

        assert!(matches!(
            chat.calls().as_slice(),
            [ChatCall::OpenView { trigger_id, .. }] if trigger_id == "trigger-1"
        ));
    }
}
