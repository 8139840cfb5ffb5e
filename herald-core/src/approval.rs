use crate::permission::{AuthorizationStore, Capability};
use crate::transport::{MessageHandle, MessageId, ReactionEvent, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reaction affordance for accepting a pending creation.
pub const APPROVE_EMOJI: &str = "✅";
/// Reaction affordance for rejecting it.
pub const REJECT_EMOJI: &str = "⛔";

/// Lifecycle of one pending approval. Entries leave the live map the moment
/// they leave `Pending`; terminal states exist for events and logging, not
/// as persisted history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// A created-but-unconfirmed resource awaiting a reaction decision, keyed by
/// the confirmation prompt's message identity.
#[derive(Clone, Debug)]
pub struct PendingApproval<P> {
    /// The confirmation prompt carrying the approve/reject affordances.
    pub prompt: MessageHandle,
    /// The domain object awaiting approval (e.g., a draft issue).
    pub payload: P,
    /// Who asked for the creation, if known.
    pub requester: Option<UserId>,
    pub target_repository: String,
}

/// What a reaction did to the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum ReactionOutcome {
    Transitioned(ApprovalState),
    /// The prompt had already been resolved (or was never ours) — a
    /// duplicate or stray reaction, deliberately a no-op.
    AlreadyResolved,
    /// Wrong emoji, bot actor, or actor without the approve capability.
    Ignored,
}

/// Side effects of the terminal transitions, injected by the embedding
/// command. The queue guarantees each entry reaches at most one of these,
/// exactly once.
#[async_trait]
pub trait ApprovalHandler<P>: Send + Sync {
    /// Perform the real creation side effect and clean up the prompt.
    async fn on_approved(&self, pending: PendingApproval<P>, approver: UserId) -> Result<()>;
    /// Clean up without any external side effect.
    async fn on_rejected(&self, pending: PendingApproval<P>, approver: UserId) -> Result<()>;
    /// Best-effort cleanup of an abandoned prompt.
    async fn on_expired(&self, pending: PendingApproval<P>) -> Result<()>;
}

/// Per-prompt approval state machine: `Pending → {Approved, Rejected,
/// Expired}`.
///
/// Reaction tasks run concurrently, so the lookup-and-remove under the map
/// lock is the serialization point: the first task to remove an entry wins
/// and the losers observe [`ReactionOutcome::AlreadyResolved`]. Handlers run
/// outside the lock.
pub struct ApprovalQueue<P> {
    pending: Mutex<HashMap<MessageId, PendingApproval<P>>>,
    auth: Arc<dyn AuthorizationStore>,
    handler: Arc<dyn ApprovalHandler<P>>,
    approve_capability: Capability,
}

impl<P: Send + 'static> ApprovalQueue<P> {
    pub fn new(
        auth: Arc<dyn AuthorizationStore>,
        handler: Arc<dyn ApprovalHandler<P>>,
        approve_capability: Capability,
    ) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            auth,
            handler,
            approve_capability,
        }
    }

    /// Register a freshly posted confirmation prompt. State = Pending.
    pub async fn register(&self, pending: PendingApproval<P>) {
        debug!(message_id = pending.prompt.id.0, "approval pending");
        self.pending.lock().await.insert(pending.prompt.id, pending);
    }

    pub async fn contains(&self, prompt: MessageId) -> bool {
        self.pending.lock().await.contains_key(&prompt)
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Feed one reaction event through the state machine.
    ///
    /// Reactions from the bot's own automated actions, unrecognized emoji,
    /// and actors without the approve capability are ignored without
    /// transitioning state.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Result<ReactionOutcome> {
        if event.actor_is_bot {
            return Ok(ReactionOutcome::Ignored);
        }
        let approved = match event.emoji.as_str() {
            APPROVE_EMOJI => true,
            REJECT_EMOJI => false,
            _ => return Ok(ReactionOutcome::Ignored),
        };
        if !self
            .auth
            .has_capability(event.actor, self.approve_capability)
            .await
        {
            return Ok(ReactionOutcome::Ignored);
        }

        // Atomic lookup-and-remove: whichever task gets here first owns the
        // terminal transition; everyone else no-ops.
        let Some(pending) = self.pending.lock().await.remove(&event.message) else {
            debug!(message_id = event.message.0, "reaction on resolved prompt");
            return Ok(ReactionOutcome::AlreadyResolved);
        };

        let state = if approved {
            self.handler.on_approved(pending, event.actor).await?;
            ApprovalState::Approved
        } else {
            self.handler.on_rejected(pending, event.actor).await?;
            ApprovalState::Rejected
        };
        debug!(message_id = event.message.0, ?state, "approval resolved");
        Ok(ReactionOutcome::Transitioned(state))
    }

    /// Expire the prompt after `after` if it is still unanswered.
    /// Best-effort cleanup of abandoned UI, not an exact-time guarantee.
    pub fn schedule_expiry(self: Arc<Self>, prompt: MessageId, after: Duration) -> JoinHandle<()> {
        let queue = self;
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let entry = queue.pending.lock().await.remove(&prompt);
            if let Some(pending) = entry {
                debug!(message_id = prompt.0, "pending approval expired");
                if let Err(err) = queue.handler.on_expired(pending).await {
                    warn!(message_id = prompt.0, error = %err, "expiry cleanup failed");
                }
            }
        })
    }
}
