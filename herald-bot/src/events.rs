use crate::config::{ConfigKind, ConfigStore, UserConfig};
use crate::github::DraftIssue;
use crate::notice::{self, TRANSIENT_DELAY};
use herald_core::approval::ApprovalQueue;
use herald_core::dispatch::Dispatcher;
use herald_core::permission::{AuthorizationStore, Capability};
use herald_core::transport::{ChatTransport, MessageHandle, MessageRef, ReactionEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const DEFAULT_PREFIX: &str = ";";

/// Routes raw transport events into the dispatcher and the approval queue.
/// One instance per process; the transport driver calls `on_message` /
/// `on_reaction` for every event it receives.
pub struct EventRouter {
    dispatcher: Arc<Dispatcher>,
    approvals: Arc<ApprovalQueue<DraftIssue>>,
    transport: Arc<dyn ChatTransport>,
    config: Arc<ConfigStore>,
    auth: Arc<dyn AuthorizationStore>,
}

impl EventRouter {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        approvals: Arc<ApprovalQueue<DraftIssue>>,
        transport: Arc<dyn ChatTransport>,
        config: Arc<ConfigStore>,
        auth: Arc<dyn AuthorizationStore>,
    ) -> Self {
        Self {
            dispatcher,
            approvals,
            transport,
            config,
            auth,
        }
    }

    fn prefix(&self) -> String {
        self.config
            .read::<UserConfig>(ConfigKind::User, false)
            .and_then(|cfg| cfg.command_prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }

    /// Handle one inbound message. Returns the executor's join handle when a
    /// command was scheduled; parse and permission failures have already been
    /// reported to the channel by the time this returns.
    pub async fn on_message(&self, message: MessageRef) -> Option<JoinHandle<()>> {
        if message.author_is_bot {
            return None;
        }

        let prefix = self.prefix();
        let Some(body) = message.content.strip_prefix(&prefix) else {
            self.enforce_issue_channel(&message).await;
            return None;
        };

        // A bare prefix is chatter, not a command.
        if body.trim().is_empty() {
            self.enforce_issue_channel(&message).await;
            return None;
        }

        // The issue channel admits exactly one command shape; everything
        // else, prefixed or not, is moderated away.
        if !body.starts_with("issue create") && self.enforce_issue_channel(&message).await {
            return None;
        }

        let command = MessageRef {
            content: body.to_string(),
            ..message.clone()
        };
        match self.dispatcher.dispatch(command).await {
            Ok(handle) => Some(handle),
            Err(err) => {
                debug!(content = %message.content, error = %err, "dispatch rejected");
                if let Err(send_err) =
                    notice::error(self.transport.as_ref(), message.channel, &err.to_string())
                        .await
                {
                    warn!(error = %send_err, "could not report dispatch failure");
                }
                None
            }
        }
    }

    /// Feed a reaction to the approval workflow on its own task; reaction
    /// handling must not block intake.
    pub fn on_reaction(&self, event: ReactionEvent) -> JoinHandle<()> {
        let approvals = Arc::clone(&self.approvals);
        tokio::spawn(async move {
            match approvals.handle_reaction(&event).await {
                Ok(outcome) => debug!(message_id = event.message.0, ?outcome, "reaction handled"),
                Err(err) => {
                    warn!(message_id = event.message.0, error = %err, "reaction handling failed")
                }
            }
        })
    }

    /// Anything but an `issue create` invocation in the configured
    /// issue-creation channel gets removed with a transient pointer at the
    /// right command, unless the author holds the approval capability.
    /// Returns true when the message was removed.
    async fn enforce_issue_channel(&self, message: &MessageRef) -> bool {
        let Some(channel) = self
            .config
            .read::<UserConfig>(ConfigKind::User, false)
            .and_then(|cfg| cfg.issue_creation_channel)
        else {
            return false;
        };
        if channel != message.channel.0 {
            return false;
        }
        if self
            .auth
            .has_capability(message.author, Capability::ApproveIssueCreation)
            .await
        {
            return false;
        }

        let reply = notice::error(
            self.transport.as_ref(),
            message.channel,
            "You need to use the `issue create` command to create an issue!",
        )
        .await;
        if let Err(err) = self
            .transport
            .delete_message(MessageHandle {
                id: message.id,
                channel: message.channel,
            })
            .await
        {
            warn!(error = %err, "could not remove chatter from issue channel");
        }

        if let Ok(reply) = reply {
            let transport = Arc::clone(&self.transport);
            let _cleanup = tokio::spawn(async move {
                sleep(TRANSIENT_DELAY).await;
                if let Err(err) = transport.delete_message(reply).await {
                    warn!(error = %err, "could not remove transient warning");
                }
            });
        }
        true
    }
}
