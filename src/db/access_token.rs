use derive_more::Display;

/// The single token a workspace has after installing the app.
#[derive(Debug, Clone, PartialEq, Display)]
#[display("AccessToken ({workspace_id})")]
pub struct AccessToken {
    pub workspace_id: String,
    pub token: String,
}

impl AccessToken {
    pub fn new(workspace_id: impl Into<String>, token: impl Into<String>) -> AccessToken {
        AccessToken { workspace_id: workspace_id.into(), token: token.into() }
    }
}
