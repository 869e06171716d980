//! Mutator pipeline.
//!
//! A [`Mutator`] is one transformation stage. [`MutatorManager`] runs the
//! registered mutators over each inbound message in registration order
//! and honors the tri-state [`LifeCycle`] each one returns.
//!
//! Every mutator runs at most once per message: its [`MutatorId`] is
//! recorded in the message's applied-set whatever the outcome, and a
//! message that re-enters the pipeline skips mutators already recorded.

pub mod block_here_everyone;
pub mod paste;
pub mod paste_long_messages;
pub mod translate_formatting;

pub use block_here_everyone::BlockHereEveryone;
pub use paste::{PasteGgClient, PasteService};
pub use paste_long_messages::PasteLongMessages;
pub use translate_formatting::TranslateFormatting;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use pierlink_types::config::Config;
use pierlink_types::error::MutatorError;
use pierlink_types::message::{Message, MutatorId};

/// Outcome of one mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycle {
    /// Pass the message to the next mutator.
    Continue,
    /// Drop the message; nothing is relayed.
    StopAndDiscard,
    /// Skip the remaining mutators and relay the message as it is now.
    ReturnEarly,
}

/// One pipeline stage.
///
/// A mutator only affects the world through the message it is given;
/// external calls it makes are awaited inside [`mutate`](Mutator::mutate).
#[async_trait]
pub trait Mutator: Send + Sync {
    fn id(&self) -> MutatorId;

    async fn mutate(&self, message: &mut Message) -> Result<LifeCycle, MutatorError>;
}

/// Runs the registered mutators over inbound messages.
#[derive(Default)]
pub struct MutatorManager {
    mutators: Vec<Arc<dyn Mutator>>,
}

impl MutatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped pipeline: mass-mention block, long-message paste,
    /// formatting translation.
    pub fn with_defaults(config: &Config, paste: Arc<dyn PasteService>) -> Self {
        Self::new()
            .register(Arc::new(BlockHereEveryone))
            .register(Arc::new(PasteLongMessages::new(
                config.paste_service.clone(),
                paste,
            )))
            .register(Arc::new(TranslateFormatting))
    }

    /// Append a mutator. Registration order is execution order.
    pub fn register(mut self, mutator: Arc<dyn Mutator>) -> Self {
        self.mutators.push(mutator);
        self
    }

    pub fn ids(&self) -> Vec<MutatorId> {
        self.mutators.iter().map(|m| m.id()).collect()
    }

    /// Run the pipeline. `None` means the message was discarded.
    ///
    /// A mutator error is logged and treated as a discard.
    pub async fn apply(&self, mut message: Message) -> Option<Message> {
        for mutator in &self.mutators {
            let id = mutator.id();
            if message.has_applied(id) {
                continue;
            }

            let outcome = mutator.mutate(&mut message).await;
            message.mark_applied(id);

            match outcome {
                Ok(LifeCycle::Continue) => {}
                Ok(LifeCycle::StopAndDiscard) => {
                    debug!(mutator = %id, origin = %message.source.platform, "message discarded");
                    return None;
                }
                Ok(LifeCycle::ReturnEarly) => {
                    debug!(mutator = %id, "pipeline returned early");
                    return Some(message);
                }
                Err(e) => {
                    warn!(mutator = %id, error = %e, "mutator failed, discarding message");
                    return None;
                }
            }
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use pierlink_types::message::{Sender, Source};

    /// Appends its tag to the content and returns a fixed outcome.
    struct Tagging {
        id: &'static str,
        outcome: Result<LifeCycle, &'static str>,
        calls: AtomicUsize,
    }

    impl Tagging {
        fn new(id: &'static str, outcome: LifeCycle) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Ok(outcome),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Err("boom"),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Mutator for Tagging {
        fn id(&self) -> MutatorId {
            MutatorId(self.id)
        }

        async fn mutate(&self, message: &mut Message) -> Result<LifeCycle, MutatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            message.content.push_str(self.id);
            self.outcome.map_err(|e| MutatorError::Other(e.into()))
        }
    }

    fn msg() -> Message {
        Message::new("", Sender::user("alice"), Source::irc("#rust"))
    }

    fn manager(stages: &[Arc<Tagging>]) -> MutatorManager {
        stages
            .iter()
            .fold(MutatorManager::new(), |m, s| m.register(s.clone()))
    }

    #[tokio::test]
    async fn all_continue_runs_in_order() {
        let stages = [
            Tagging::new("a", LifeCycle::Continue),
            Tagging::new("b", LifeCycle::Continue),
            Tagging::new("c", LifeCycle::Continue),
        ];
        let out = manager(&stages).apply(msg()).await.unwrap();
        assert_eq!(out.content, "abc");

        let mut ids: Vec<_> = out.applied_mutators().collect();
        ids.sort();
        assert_eq!(ids, vec![MutatorId("a"), MutatorId("b"), MutatorId("c")]);
    }

    #[tokio::test]
    async fn discard_stops_pipeline() {
        let stages = [
            Tagging::new("a", LifeCycle::Continue),
            Tagging::new("b", LifeCycle::StopAndDiscard),
            Tagging::new("c", LifeCycle::Continue),
        ];
        assert!(manager(&stages).apply(msg()).await.is_none());
        assert_eq!(stages[1].calls(), 1);
        assert_eq!(stages[2].calls(), 0);
    }

    #[tokio::test]
    async fn return_early_skips_rest() {
        let stages = [
            Tagging::new("a", LifeCycle::ReturnEarly),
            Tagging::new("b", LifeCycle::Continue),
        ];
        let out = manager(&stages).apply(msg()).await.unwrap();
        assert_eq!(out.content, "a");
        assert!(out.has_applied(MutatorId("a")));
        assert!(!out.has_applied(MutatorId("b")));
        assert_eq!(stages[1].calls(), 0);
    }

    #[tokio::test]
    async fn error_is_treated_as_discard() {
        let stages = [
            Tagging::failing("a"),
            Tagging::new("b", LifeCycle::Continue),
        ];
        assert!(manager(&stages).apply(msg()).await.is_none());
        assert_eq!(stages[1].calls(), 0);
    }

    #[tokio::test]
    async fn reentry_skips_applied_mutators() {
        let stages = [
            Tagging::new("a", LifeCycle::ReturnEarly),
            Tagging::new("b", LifeCycle::Continue),
        ];
        let mgr = manager(&stages);
        let once = mgr.apply(msg()).await.unwrap();
        let twice = mgr.apply(once).await.unwrap();

        assert_eq!(twice.content, "ab");
        assert_eq!(stages[0].calls(), 1);
        assert_eq!(stages[1].calls(), 1);
    }

    #[tokio::test]
    async fn preapplied_mutator_is_skipped() {
        let stages = [Tagging::new("a", LifeCycle::StopAndDiscard)];
        let mut message = msg();
        message.mark_applied(MutatorId("a"));
        assert!(manager(&stages).apply(message).await.is_some());
        assert_eq!(stages[0].calls(), 0);
    }

    #[tokio::test]
    async fn empty_pipeline_passes_through() {
        let out = MutatorManager::new().apply(msg()).await.unwrap();
        assert_eq!(out.applied_mutators().count(), 0);
    }

    #[test]
    fn default_pipeline_order() {
        let mgr = MutatorManager::with_defaults(
            &Config::default(),
            Arc::new(PasteGgClient::new(&Default::default())),
        );
        assert_eq!(
            mgr.ids(),
            vec![
                BlockHereEveryone::ID,
                PasteLongMessages::ID,
                TranslateFormatting::ID
            ]
        );
    }
}
