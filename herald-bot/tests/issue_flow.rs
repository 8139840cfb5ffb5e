//! End-to-end flow: inbound message → dispatcher → creation prompt →
//! reaction → exactly one tracker call, against in-memory collaborators.

use anyhow::Result;
use async_trait::async_trait;
use herald_bot::commands::{self, IssueApprovalHandler, IssueCommandDeps};
use herald_bot::config::{AuthConfig, ConfigKind, ConfigStore, UserConfig};
use herald_bot::events::EventRouter;
use herald_bot::github::{DraftIssue, Fetched, IssueTracker};
use herald_core::approval::{ApprovalQueue, APPROVE_EMOJI, REJECT_EMOJI};
use herald_core::dispatch::Dispatcher;
use herald_core::permission::{AuthorizationStore, Capability};
use herald_core::transport::{
    ChannelId, ChatTransport, EmbedSpec, MessageHandle, MessageId, MessageRef, OutboundContent,
    ReactionEvent, UserId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const APPROVER: UserId = UserId(7);
const REQUESTER: UserId = UserId(100);
const CHANNEL: ChannelId = ChannelId(42);

// ─── In-memory collaborators ──────────────────────────────────

#[derive(Clone, Debug)]
struct Sent {
    handle: MessageHandle,
    content: OutboundContent,
}

#[derive(Default)]
struct MockTransport {
    next_id: AtomicU64,
    sent: Mutex<Vec<Sent>>,
    private: Mutex<Vec<(UserId, OutboundContent)>>,
    deleted: Mutex<Vec<MessageId>>,
    reactions: Mutex<Vec<(MessageId, String)>>,
}

impl MockTransport {
    fn allocate(&self, channel: ChannelId) -> MessageHandle {
        MessageHandle {
            id: MessageId(1000 + self.next_id.fetch_add(1, Ordering::SeqCst)),
            channel,
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().unwrap().clone()
    }

    fn reactions(&self) -> Vec<(MessageId, String)> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: OutboundContent,
    ) -> Result<MessageHandle> {
        let handle = self.allocate(channel);
        self.sent.lock().unwrap().push(Sent { handle, content });
        Ok(handle)
    }

    async fn edit_message(&self, _target: MessageHandle, _content: OutboundContent) -> Result<()> {
        Ok(())
    }

    async fn delete_message(&self, target: MessageHandle) -> Result<()> {
        self.deleted.lock().unwrap().push(target.id);
        Ok(())
    }

    async fn add_reaction(&self, target: MessageHandle, emoji: &str) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((target.id, emoji.to_string()));
        Ok(())
    }

    async fn send_private(&self, user: UserId, content: OutboundContent) -> Result<MessageHandle> {
        self.private.lock().unwrap().push((user, content));
        Ok(self.allocate(ChannelId(0)))
    }
}

#[derive(Default)]
struct MockTracker {
    fetches: Mutex<Vec<(String, String, i64)>>,
    created: Mutex<Vec<(String, String, DraftIssue)>>,
}

#[async_trait]
impl IssueTracker for MockTracker {
    async fn fetch(
        &self,
        user: &str,
        repo: &str,
        number: i64,
        _token: &str,
    ) -> Result<Option<Fetched>> {
        self.fetches
            .lock()
            .unwrap()
            .push((user.to_string(), repo.to_string(), number));
        Ok(None)
    }

    async fn create_issue(
        &self,
        user: &str,
        repo: &str,
        draft: &DraftIssue,
        _token: &str,
    ) -> Result<()> {
        self.created
            .lock()
            .unwrap()
            .push((user.to_string(), repo.to_string(), draft.clone()));
        Ok(())
    }
}

struct StaticAuth {
    approvers: HashSet<UserId>,
}

#[async_trait]
impl AuthorizationStore for StaticAuth {
    async fn has_capability(&self, user: UserId, capability: Capability) -> bool {
        capability == Capability::ApproveIssueCreation && self.approvers.contains(&user)
    }
}

// ─── Harness ──────────────────────────────────────────────────

struct Harness {
    _config_dir: tempfile::TempDir,
    transport: Arc<MockTransport>,
    tracker: Arc<MockTracker>,
    approvals: Arc<ApprovalQueue<DraftIssue>>,
    router: EventRouter,
}

fn harness(user_config: UserConfig) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("herald_core=debug,herald_bot=debug")
        .try_init();

    let config_dir = tempfile::tempdir().unwrap();
    let config = Arc::new(ConfigStore::new(config_dir.path()));
    config
        .write(
            ConfigKind::Auth,
            &AuthConfig {
                github_token: Some("token".to_string()),
            },
        )
        .unwrap();
    config.write(ConfigKind::User, &user_config).unwrap();

    let transport = Arc::new(MockTransport::default());
    let tracker = Arc::new(MockTracker::default());
    let auth: Arc<dyn AuthorizationStore> = Arc::new(StaticAuth {
        approvers: HashSet::from([APPROVER]),
    });

    let handler = Arc::new(IssueApprovalHandler {
        transport: transport.clone() as Arc<dyn ChatTransport>,
        config: Arc::clone(&config),
        tracker: tracker.clone() as Arc<dyn IssueTracker>,
    });
    let approvals = Arc::new(ApprovalQueue::new(
        Arc::clone(&auth),
        handler,
        Capability::ApproveIssueCreation,
    ));

    let mut dispatcher = Dispatcher::new(Arc::clone(&auth));
    commands::register_all(
        &mut dispatcher,
        Arc::new(IssueCommandDeps {
            transport: transport.clone() as Arc<dyn ChatTransport>,
            config: Arc::clone(&config),
            tracker: tracker.clone() as Arc<dyn IssueTracker>,
            approvals: Arc::clone(&approvals),
        }),
    )
    .unwrap();

    let router = EventRouter::new(
        Arc::new(dispatcher),
        Arc::clone(&approvals),
        transport.clone() as Arc<dyn ChatTransport>,
        config,
        auth,
    );

    Harness {
        _config_dir: config_dir,
        transport,
        tracker,
        approvals,
        router,
    }
}

fn default_user_config() -> UserConfig {
    UserConfig {
        default_github_user: Some("kami".to_string()),
        issue_creation_channel: None,
        command_prefix: None,
    }
}

fn inbound(content: &str) -> MessageRef {
    MessageRef {
        id: MessageId(1),
        channel: CHANNEL,
        author: REQUESTER,
        author_is_bot: false,
        content: content.to_string(),
    }
}

fn reaction(prompt: MessageId, emoji: &str, actor: UserId) -> ReactionEvent {
    ReactionEvent {
        message: prompt,
        channel: CHANNEL,
        emoji: emoji.to_string(),
        actor,
        actor_is_bot: false,
    }
}

fn embed(content: &OutboundContent) -> &EmbedSpec {
    match content {
        OutboundContent::Embed(embed) => embed,
        OutboundContent::Text(text) => panic!("expected embed, got text {text:?}"),
    }
}

// ─── Scenarios ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn create_approve_creates_exactly_once() {
    let h = harness(default_user_config());

    let handle = h
        .router
        .on_message(inbound(";issue create myrepo Bug title - Steps to reproduce"))
        .await
        .expect("command should be scheduled");
    handle.await.unwrap();

    // Prompt posted with the split title, affordances paced on, original
    // message removed, entry pending.
    let sent = h.transport.sent();
    let prompt = &sent[0];
    assert_eq!(embed(&prompt.content).title.as_deref(), Some("Bug title "));
    assert!(embed(&prompt.content)
        .description
        .as_deref()
        .unwrap()
        .contains("Steps to reproduce"));
    assert_eq!(
        h.transport.reactions(),
        vec![
            (prompt.handle.id, APPROVE_EMOJI.to_string()),
            (prompt.handle.id, REJECT_EMOJI.to_string()),
        ]
    );
    assert!(h.transport.deleted().contains(&MessageId(1)));
    assert_eq!(h.approvals.pending_count().await, 1);

    // Authorized approve: one tracker call, prompt gone, requester told.
    h.router
        .on_reaction(reaction(prompt.handle.id, APPROVE_EMOJI, APPROVER))
        .await
        .unwrap();

    let created = h.tracker.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    let (owner, repo, draft) = &created[0];
    assert_eq!(owner, "kami");
    assert_eq!(repo, "myrepo");
    assert_eq!(draft.title.as_deref(), Some("Bug title "));
    assert!(draft.body.as_deref().unwrap().contains("Steps to reproduce"));

    assert_eq!(h.approvals.pending_count().await, 0);
    assert!(h.transport.deleted().contains(&prompt.handle.id));
    let private = h.transport.private.lock().unwrap().clone();
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].0, REQUESTER);

    // The transient success notice self-deletes.
    let sent = h.transport.sent();
    let feedback = sent.last().unwrap();
    assert!(h.transport.deleted().contains(&feedback.handle.id));

    // A later reject on the resolved prompt is a no-op.
    h.router
        .on_reaction(reaction(prompt.handle.id, REJECT_EMOJI, APPROVER))
        .await
        .unwrap();
    assert_eq!(h.tracker.created.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reject_never_calls_the_tracker() {
    let h = harness(default_user_config());

    h.router
        .on_message(inbound(";issue create myrepo Title - Body"))
        .await
        .unwrap()
        .await
        .unwrap();
    let prompt = h.transport.sent()[0].handle;

    h.router
        .on_reaction(reaction(prompt.id, REJECT_EMOJI, APPROVER))
        .await
        .unwrap();

    assert!(h.tracker.created.lock().unwrap().is_empty());
    assert_eq!(h.approvals.pending_count().await, 0);
    assert!(h.transport.deleted().contains(&prompt.id));
}

#[tokio::test(start_paused = true)]
async fn unauthorized_reaction_leaves_the_entry_pending() {
    let h = harness(default_user_config());

    h.router
        .on_message(inbound(";issue create myrepo Title - Body"))
        .await
        .unwrap()
        .await
        .unwrap();
    let prompt = h.transport.sent()[0].handle;

    h.router
        .on_reaction(reaction(prompt.id, APPROVE_EMOJI, UserId(9999)))
        .await
        .unwrap();

    assert!(h.tracker.created.lock().unwrap().is_empty());
    assert_eq!(h.approvals.pending_count().await, 1);
}

#[tokio::test]
async fn unknown_command_reports_and_schedules_nothing() {
    let h = harness(default_user_config());

    let handle = h.router.on_message(inbound(";nosuch foo 42")).await;
    assert!(handle.is_none());

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(embed(&sent[0].content)
        .description
        .as_deref()
        .unwrap()
        .contains("unknown command"));
}

#[tokio::test]
async fn trailing_input_reports_once() {
    let h = harness(default_user_config());

    assert!(h
        .router
        .on_message(inbound(";issue myrepo 42 extra"))
        .await
        .is_none());

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(embed(&sent[0].content)
        .description
        .as_deref()
        .unwrap()
        .contains("trailing input"));
}

#[tokio::test]
async fn unprefixed_and_bot_messages_are_ignored() {
    let h = harness(default_user_config());

    assert!(h.router.on_message(inbound("hello there")).await.is_none());

    let mut bot_message = inbound(";issue create myrepo Title - Body");
    bot_message.author_is_bot = true;
    assert!(h.router.on_message(bot_message).await.is_none());

    assert!(h.transport.sent().is_empty());
    assert_eq!(h.approvals.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn creation_outside_the_issue_channel_is_refused() {
    let h = harness(UserConfig {
        issue_creation_channel: Some(777),
        ..default_user_config()
    });

    h.router
        .on_message(inbound(";issue create myrepo Title - Body"))
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(h.approvals.pending_count().await, 0);
    let sent = h.transport.sent();
    assert!(embed(&sent[0].content)
        .description
        .as_deref()
        .unwrap()
        .contains("<#777>"));
}

#[tokio::test(start_paused = true)]
async fn chatter_in_the_issue_channel_is_moderated() {
    let h = harness(UserConfig {
        issue_creation_channel: Some(CHANNEL.0),
        ..default_user_config()
    });

    assert!(h
        .router
        .on_message(inbound("please add this bug"))
        .await
        .is_none());

    // Original chatter removed, warning posted.
    assert!(h.transport.deleted().contains(&MessageId(1)));
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(embed(&sent[0].content)
        .description
        .as_deref()
        .unwrap()
        .contains("issue create"));

    // Approvers may talk freely.
    let mut from_approver = inbound("triage note");
    from_approver.author = APPROVER;
    from_approver.id = MessageId(2);
    assert!(h.router.on_message(from_approver).await.is_none());
    assert!(!h.transport.deleted().contains(&MessageId(2)));
}

#[tokio::test(start_paused = true)]
async fn prefixed_commands_in_the_issue_channel_are_moderated() {
    let h = harness(UserConfig {
        issue_creation_channel: Some(CHANNEL.0),
        ..default_user_config()
    });

    // A fetch from a non-approver counts as chatter in this channel: the
    // message goes away and the executor never runs.
    assert!(h
        .router
        .on_message(inbound(";issue myrepo 5"))
        .await
        .is_none());
    assert!(h.transport.deleted().contains(&MessageId(1)));
    assert!(h.tracker.fetches.lock().unwrap().is_empty());

    // Unknown commands too.
    let mut unknown = inbound(";foo bar");
    unknown.id = MessageId(2);
    assert!(h.router.on_message(unknown).await.is_none());
    assert!(h.transport.deleted().contains(&MessageId(2)));

    // `issue create` is the one admitted shape.
    let mut create = inbound(";issue create myrepo Title - Body");
    create.id = MessageId(3);
    h.router.on_message(create).await.unwrap().await.unwrap();
    assert_eq!(h.approvals.pending_count().await, 1);
}

#[tokio::test]
async fn bare_prefix_is_ignored() {
    let h = harness(default_user_config());

    assert!(h.router.on_message(inbound(";")).await.is_none());
    assert!(h.router.on_message(inbound(";   ")).await.is_none());

    assert!(h.transport.sent().is_empty());
    assert!(h.transport.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_default_user_reports_not_configured() {
    let h = harness(UserConfig {
        default_github_user: None,
        ..default_user_config()
    });

    h.router
        .on_message(inbound(";issue create myrepo Title - Body"))
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(h.approvals.pending_count().await, 0);
    let sent = h.transport.sent();
    assert!(embed(&sent[0].content)
        .description
        .as_deref()
        .unwrap()
        .contains("user.json"));
}
