//! Drops IRC messages that would mass-mention a Discord guild.

use async_trait::async_trait;

use pierlink_types::error::MutatorError;
use pierlink_types::message::{Message, MutatorId, PlatformType};

use super::{LifeCycle, Mutator};

const MASS_MENTIONS: &[&str] = &["@everyone", "@here"];

/// Discards IRC-origin messages containing `@everyone` or `@here`.
///
/// Discord-origin messages are left alone; Discord already enforces its own
/// mention permissions on them.
pub struct BlockHereEveryone;

impl BlockHereEveryone {
    pub const ID: MutatorId = MutatorId("block-here-everyone");
}

#[async_trait]
impl Mutator for BlockHereEveryone {
    fn id(&self) -> MutatorId {
        Self::ID
    }

    async fn mutate(&self, message: &mut Message) -> Result<LifeCycle, MutatorError> {
        if message.source.platform == PlatformType::Irc
            && MASS_MENTIONS.iter().any(|m| message.content.contains(m))
        {
            return Ok(LifeCycle::StopAndDiscard);
        }
        Ok(LifeCycle::Continue)
    }
}
