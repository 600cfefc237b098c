pub mod telegram;

use async_trait::async_trait;

/// A message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform-specific chat ID
    pub chat_id: i64,
    /// Platform-specific user ID
    pub user_id: u64,
    /// Display name of the user
    pub user_name: String,
    /// The message text
    pub text: String,
}

/// Sends status and result texts back to the chat a message came from.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, text: &str) -> anyhow::Result<()>;
}
