use serde::{Deserialize, Serialize};

/// One stored inference result: the labeled assistant turn next to what the
/// model actually produced. `user` is carried through for diagnostics only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub assistant: String,
    pub model_response: String,
}

impl ResultRecord {
    pub fn new(assistant: &str, model_response: &str) -> Self {
        ResultRecord {
            system: None,
            user: None,
            assistant: assistant.to_string(),
            model_response: model_response.to_string(),
        }
    }
}
