use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::links::LinkValidator;
use crate::platform::{IncomingMessage, ReplySink};
use crate::player::PlayerLink;
use crate::relay::{Relay, RelayStage};
use crate::replies;
use crate::resolver::{Resolve, ResolveResult};

/// How a single message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected,
    ResolveFailed,
    Relayed,
    RelayFailed(RelayStage),
}

/// Runs one link submission from validation to the final report.
pub struct Handler {
    validator: LinkValidator,
    resolver: Arc<dyn Resolve>,
    relay: Arc<dyn Relay>,
    player: PlayerLink,
}

impl Handler {
    pub fn new(
        validator: LinkValidator,
        resolver: Arc<dyn Resolve>,
        relay: Arc<dyn Relay>,
        player: PlayerLink,
    ) -> Self {
        Self {
            validator,
            resolver,
            relay,
            player,
        }
    }

    pub fn welcome_text(&self) -> String {
        replies::welcome(self.validator.domains())
    }

    pub async fn handle(&self, msg: &IncomingMessage, sink: &dyn ReplySink) -> Result<Outcome> {
        let link = match self.validator.find_link(&msg.text) {
            Some(link) => link,
            None => {
                info!("Rejected message without a supported link");
                sink.reply(&replies::rejection(self.validator.domains()))
                    .await?;
                return Ok(Outcome::Rejected);
            }
        };

        sink.reply(replies::PROCESSING).await?;

        let file = match self.resolver.resolve(link).await {
            ResolveResult::Resolved(file) => file,
            ResolveResult::Failed { error } => {
                sink.reply(&replies::resolve_error(&error)).await?;
                return Ok(Outcome::ResolveFailed);
            }
        };

        info!("Resolved {} ({})", file.title, file.size);
        sink.reply(replies::STARTING_RELAY).await?;

        let relayed = self
            .relay
            .relay(&file.direct_link, &file.title)
            .await
            .map_err(|e| e.stage());
        if let Err(stage) = relayed {
            warn!("Relay of {} failed during {:?}", file.title, stage);
        }

        let player_url = self.player.url_for(&file.direct_link, &file.title);
        sink.reply(&replies::final_report(&file, &player_url, relayed))
            .await?;

        Ok(match relayed {
            Ok(()) => Outcome::Relayed,
            Err(stage) => Outcome::RelayFailed(stage),
        })
    }
}
