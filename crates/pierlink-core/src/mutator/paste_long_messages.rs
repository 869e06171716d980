//! Replaces long Discord messages with a preview and a paste link, so IRC
//! channels are not flooded.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use pierlink_types::config::PasteServiceConfig;
use pierlink_types::error::MutatorError;
use pierlink_types::message::{Message, MutatorId, PlatformType};

use super::paste::PasteService;
use super::{LifeCycle, Mutator};

pub struct PasteLongMessages {
    config: PasteServiceConfig,
    service: Arc<dyn PasteService>,
}

impl PasteLongMessages {
    pub const ID: MutatorId = MutatorId("paste-long-messages");

    pub fn new(config: PasteServiceConfig, service: Arc<dyn PasteService>) -> Self {
        Self { config, service }
    }

    fn is_too_long(&self, content: &str) -> bool {
        content.chars().count() > self.config.max_message_length
            || content.lines().count() > self.config.max_new_lines
    }

    fn preview(&self, content: &str) -> String {
        let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        first_line
            .chars()
            .take(self.config.preview_length)
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}

#[async_trait]
impl Mutator for PasteLongMessages {
    fn id(&self) -> MutatorId {
        Self::ID
    }

    async fn mutate(&self, message: &mut Message) -> Result<LifeCycle, MutatorError> {
        if !self.config.enabled
            || message.source.platform != PlatformType::Discord
            || !self.is_too_long(&message.content)
        {
            return Ok(LifeCycle::Continue);
        }

        match self
            .service
            .upload(&message.content, self.config.paste_expiration_days)
            .await
        {
            Ok(url) => {
                debug!(url = %url, chars = message.content.chars().count(), "long message pasted");
                message.content = format!("{}... {url}", self.preview(&message.content));
            }
            Err(e) => {
                warn!(error = %e, "paste upload failed, relaying message unchanged");
            }
        }
        Ok(LifeCycle::Continue)
    }
}
