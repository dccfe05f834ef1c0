use crate::errors::AppError;

use super::AccessToken;

/// Durable mapping from workspace id to access token.
///
/// `put` and `delete` are idempotent and each call is atomic on its own.
pub trait TokenStore: Send + Sync {
    /// Stores the token, replacing any token already held for the workspace.
    fn put(&self, access_token: &AccessToken) -> Result<(), AppError>;

    fn get(&self, workspace_id: &str) -> Result<Option<String>, AppError>;

    /// Removes the workspace's token. Removing an absent token succeeds.
    fn delete(&self, workspace_id: &str) -> Result<(), AppError>;
}
