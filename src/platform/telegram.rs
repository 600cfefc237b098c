use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Me};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::TelegramConfig;
use crate::handler::Handler;
use crate::platform::{IncomingMessage, ReplySink};
use crate::relay::DocumentSink;
use crate::startup::StartupError;

/// Telegram rejects messages above 4096 characters.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Build the bot with a client timeout long enough for document uploads.
pub fn build_bot(config: &TelegramConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build Telegram HTTP client")?;
    Ok(Bot::with_client(&config.bot_token, client))
}

/// Check the token and connectivity with `getMe`.
pub async fn connect(bot: &Bot) -> Result<Me, StartupError> {
    bot.get_me().await.map_err(StartupError::from)
}

/// Replies to the chat a message came from.
pub struct ChatReplies {
    bot: Bot,
    chat_id: ChatId,
}

impl ChatReplies {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ReplySink for ChatReplies {
    async fn reply(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.bot
                .send_message(self.chat_id, chunk)
                .await
                .context("Failed to send reply")?;
        }
        Ok(())
    }
}

/// Posts relayed files into the destination channel.
pub struct ChannelSink {
    bot: Bot,
    channel_id: ChatId,
}

impl ChannelSink {
    pub fn new(bot: Bot, channel_id: i64) -> Self {
        Self {
            bot,
            channel_id: ChatId(channel_id),
        }
    }
}

#[async_trait]
impl DocumentSink for ChannelSink {
    async fn send_document(&self, path: &Path, file_name: &str) -> Result<()> {
        let document = InputFile::file(path.to_path_buf()).file_name(file_name.to_string());
        self.bot
            .send_document(self.channel_id, document)
            .await
            .with_context(|| {
                format!("Failed to send {} to channel {}", file_name, self.channel_id.0)
            })?;
        Ok(())
    }
}

/// Run the Telegram bot platform
pub async fn run(bot: Bot, handler: Arc<Handler>) -> Result<()> {
    info!("Starting Telegram platform...");

    let tree = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, tree)
        .dependencies(dptree::deps![handler])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// The command word of a `/command@botname args` message.
fn command_of(text: &str) -> Option<&str> {
    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

async fn handle_message(bot: Bot, msg: Message, handler: Arc<Handler>) -> ResponseResult<()> {
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if text.starts_with('/') {
        match command_of(&text) {
            Some("start") => {
                bot.send_message(msg.chat.id, handler.welcome_text()).await?;
            }
            other => debug!("Ignoring command {:?}", other),
        }
        return Ok(());
    }

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        user_id: user.id.0,
        user_name: user.first_name.clone(),
        text,
    };

    let span = info_span!("message", request_id = %Uuid::new_v4(), chat_id = incoming.chat_id);

    async {
        info!(
            "Telegram message from {} ({}): {}",
            incoming.user_name, incoming.user_id, incoming.text
        );

        let replies = ChatReplies::new(bot.clone(), msg.chat.id);
        match handler.handle(&incoming, &replies).await {
            Ok(outcome) => info!("Finished with {:?}", outcome),
            Err(e) => error!("Error handling message: {:#}", e),
        }
    }
    .instrument(span)
    .await;

    Ok(())
}
