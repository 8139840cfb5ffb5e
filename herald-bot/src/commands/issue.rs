use crate::config::{AuthConfig, ConfigKind, ConfigStore, UserConfig};
use crate::github::{DraftIssue, Fetched, Issue, IssueTracker, PullRequest};
use crate::notice::{self, colors, TRANSIENT_DELAY};
use anyhow::{Context, Result};
use async_trait::async_trait;
use herald_core::approval::{ApprovalHandler, ApprovalQueue, PendingApproval};
use herald_core::approval::{APPROVE_EMOJI, REJECT_EMOJI};
use herald_core::argument::ArgKind;
use herald_core::context::ParseContext;
use herald_core::transport::{
    ChannelId, ChatTransport, EmbedSpec, MessageHandle, UserId,
};
use herald_core::tree::{CommandNode, Executor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Unanswered creation prompts are cleaned up after this.
pub const PROMPT_EXPIRY: Duration = Duration::from_secs(600);

/// Gap between outbound reaction posts, to stay under the platform's
/// rate limit. Pacing, not correctness.
const REACTION_PACING: Duration = Duration::from_millis(500);

/// Embed description hard cap.
const DESCRIPTION_CAP: usize = 2048;

/// Everything the `issue` executors need, injected once at startup.
pub struct IssueCommandDeps {
    pub transport: Arc<dyn ChatTransport>,
    pub config: Arc<ConfigStore>,
    pub tracker: Arc<dyn IssueTracker>,
    pub approvals: Arc<ApprovalQueue<DraftIssue>>,
}

/// Build the `issue` command tree:
///
/// ```text
/// issue <repo:word> <number:integer>          fetch an issue / pull
/// issue create <repo:word> <contents:greedy>  queue an issue for approval
/// ```
pub fn issue_command(deps: Arc<IssueCommandDeps>) -> CommandNode {
    CommandNode::literal("issue")
        .child(
            CommandNode::literal("create").child(
                CommandNode::argument("repo", ArgKind::Word).child(
                    CommandNode::argument("contents", ArgKind::Greedy).executes(CreateIssue {
                        deps: Arc::clone(&deps),
                    }),
                ),
            ),
        )
        .child(
            CommandNode::argument("repo", ArgKind::Word).child(
                CommandNode::argument("number", ArgKind::Integer).executes(FetchIssue { deps }),
            ),
        )
}

// ─── Shared config lookups ────────────────────────────────────

/// Token from auth config; posts the error notice itself when unset, so
/// callers can just bail out quietly.
async fn github_token(
    config: &ConfigStore,
    transport: &dyn ChatTransport,
    channel: ChannelId,
) -> Result<Option<String>> {
    let token = config
        .read::<AuthConfig>(ConfigKind::Auth, false)
        .and_then(|auth| auth.github_token);
    if token.is_none() {
        notice::error(transport, channel, "Github token is not set in `auth.json`!").await?;
    }
    Ok(token)
}

async fn default_github_user(
    config: &ConfigStore,
    transport: &dyn ChatTransport,
    channel: ChannelId,
) -> Result<Option<String>> {
    let user = config
        .read::<UserConfig>(ConfigKind::User, false)
        .and_then(|cfg| cfg.default_github_user);
    if user.is_none() {
        notice::error(
            transport,
            channel,
            "Default Github user / org is not set in `user.json`!",
        )
        .await?;
    }
    Ok(user)
}

fn mention(user: UserId) -> String {
    format!("<@{}>", user.0)
}

/// Split greedy `contents` into title and body on the first `-`. Whitespace
/// around the separator is kept, so `"Bug title - Steps"` titles as
/// `"Bug title "`.
fn split_contents(contents: &str) -> (Option<String>, Option<String>) {
    let mut parts = contents.splitn(2, '-');
    let title = parts.next().map(str::to_string);
    let body = parts.next().map(str::to_string);
    (title, body)
}

fn draft_title(draft: &DraftIssue) -> &str {
    draft.title.as_deref().unwrap_or("untitled")
}

// ─── Fetch path ───────────────────────────────────────────────

struct FetchIssue {
    deps: Arc<IssueCommandDeps>,
}

#[async_trait]
impl Executor for FetchIssue {
    async fn run(&self, ctx: ParseContext) -> Result<()> {
        let message = ctx.message();
        let channel = message.channel;
        let transport = self.deps.transport.as_ref();
        let repo = ctx.text("repo").context("repo not bound")?.to_string();
        let number = ctx.integer("number").context("number not bound")?;

        let Some(token) = github_token(&self.deps.config, transport, channel).await? else {
            return Ok(());
        };
        let Some(user) = default_github_user(&self.deps.config, transport, channel).await? else {
            return Ok(());
        };

        match self.deps.tracker.fetch(&user, &repo, number, &token).await {
            Ok(Some(Fetched::Issue(issue))) => {
                transport
                    .send_message(channel, issue_embed(&issue).into())
                    .await?;
            }
            Ok(Some(Fetched::Pull { issue, pull })) => {
                transport
                    .send_message(channel, pull_embed(&issue, &pull).into())
                    .await?;
            }
            Ok(None) => {
                notice::error(
                    transport,
                    channel,
                    &format!("Issue / pull `#{number}` in `{user}/{repo}` could not be found!"),
                )
                .await?;
            }
            Err(err) => {
                notice::error(
                    transport,
                    channel,
                    &format!("Looking up `#{number}` in `{user}/{repo}` failed: {err}"),
                )
                .await?;
                return Err(err);
            }
        }
        Ok(())
    }
}

fn common_fields(embed: &mut EmbedSpec, issue: &Issue) {
    embed.description = Some(notice::flatten(
        &notice::clean_body(issue.body.as_deref(), "No Description"),
        DESCRIPTION_CAP,
    ));

    let milestone = issue
        .milestone
        .as_ref()
        .and_then(|m| m.title.clone())
        .unwrap_or_else(|| "No Milestone".to_string());
    let labels = issue
        .labels
        .as_ref()
        .map(|labels| {
            labels
                .iter()
                .filter_map(|label| label.name.as_deref())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "None".to_string());
    let assignees = issue
        .assignees
        .as_ref()
        .map(|assignees| {
            assignees
                .iter()
                .filter_map(|a| a.login.as_deref())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "None".to_string());

    for (name, value) in [
        ("Milestone", milestone),
        ("Labels", labels),
        ("Assignees", assignees),
    ] {
        embed.fields.push(herald_core::transport::EmbedField {
            name: name.to_string(),
            value,
            inline: false,
        });
    }
}

fn issue_embed(issue: &Issue) -> EmbedSpec {
    let closed = issue.state.as_deref() == Some("closed");
    let mut embed = EmbedSpec {
        title: issue.title.clone(),
        thumbnail_url: issue.user.as_ref().and_then(|u| u.avatar_url.clone()),
        url: issue.html_url.clone(),
        color: Some(if closed { colors::ERROR } else { colors::SUCCESS }),
        ..EmbedSpec::default()
    };
    common_fields(&mut embed, issue);
    embed
}

fn pull_embed(issue: &Issue, pull: &PullRequest) -> EmbedSpec {
    let mut embed = EmbedSpec {
        title: pull.title.clone(),
        thumbnail_url: pull.user.as_ref().and_then(|u| u.avatar_url.clone()),
        url: pull.html_url.clone(),
        color: Some(pull_color(pull)),
        ..EmbedSpec::default()
    };
    common_fields(&mut embed, issue);
    embed = embed
        .field(
            "Lines",
            format!(
                "+{} / -{}",
                pull.additions.unwrap_or(-1),
                pull.deletions.unwrap_or(-1)
            ),
        )
        .field("Commits", pull.commits.unwrap_or(-1).to_string())
        .field(
            "Changed Files",
            pull.changed_files.unwrap_or(-1).to_string(),
        );
    embed
}

fn pull_color(pull: &PullRequest) -> u32 {
    if pull.merged {
        colors::MERGED_PULL_REQUEST
    } else {
        match pull.state.as_deref() {
            Some("closed") => colors::ERROR,
            Some("open") => colors::SUCCESS,
            _ => colors::WARN,
        }
    }
}

// ─── Create path ──────────────────────────────────────────────

struct CreateIssue {
    deps: Arc<IssueCommandDeps>,
}

#[async_trait]
impl Executor for CreateIssue {
    async fn run(&self, ctx: ParseContext) -> Result<()> {
        let message = ctx.message();
        let channel = message.channel;
        let transport = self.deps.transport.as_ref();
        let repo = ctx.text("repo").context("repo not bound")?.to_string();
        let contents = ctx.text("contents").context("contents not bound")?;
        let (title, body) = split_contents(contents);

        let user_config: Option<UserConfig> = self.deps.config.read(ConfigKind::User, false);
        if let Some(required) = user_config.as_ref().and_then(|cfg| cfg.issue_creation_channel) {
            if required != channel.0 {
                notice::error(
                    transport,
                    channel,
                    &format!("You're only allowed to create issues in <#{required}>!"),
                )
                .await?;
                return Ok(());
            }
        }
        let Some(owner) = default_github_user(&self.deps.config, transport, channel).await? else {
            return Ok(());
        };

        let attributed_body = format!(
            "Created by: {}\n\n{}",
            mention(message.author),
            body.as_deref().unwrap_or_default()
        );
        let draft = DraftIssue {
            title: title.clone(),
            body: Some(attributed_body.clone()),
        };

        let prompt_embed = EmbedSpec {
            title: title.clone(),
            description: Some(attributed_body),
            color: Some(colors::PRIMARY),
            ..EmbedSpec::default()
        }
        .field("Repository", format!("`{owner}/{repo}`"));
        let prompt = transport.send_message(channel, prompt_embed.into()).await?;

        // Register before the paced reaction posts so an early reaction
        // still counts.
        self.deps
            .approvals
            .register(PendingApproval {
                prompt,
                payload: draft,
                requester: Some(message.author),
                target_repository: repo,
            })
            .await;
        let _expiry = Arc::clone(&self.deps.approvals).schedule_expiry(prompt.id, PROMPT_EXPIRY);

        transport
            .delete_message(MessageHandle {
                id: message.id,
                channel,
            })
            .await?;

        sleep(REACTION_PACING).await;
        transport.add_reaction(prompt, APPROVE_EMOJI).await?;
        sleep(REACTION_PACING).await;
        transport.add_reaction(prompt, REJECT_EMOJI).await?;
        Ok(())
    }
}

// ─── Approval side effects ────────────────────────────────────

/// What actually happens when an approver reacts on a creation prompt.
pub struct IssueApprovalHandler {
    pub transport: Arc<dyn ChatTransport>,
    pub config: Arc<ConfigStore>,
    pub tracker: Arc<dyn IssueTracker>,
}

impl IssueApprovalHandler {
    fn repo_slug(&self, repo: &str) -> String {
        match self
            .config
            .read::<UserConfig>(ConfigKind::User, false)
            .and_then(|cfg| cfg.default_github_user)
        {
            Some(owner) => format!("{owner}/{repo}"),
            None => repo.to_string(),
        }
    }

    async fn notify_requester(
        &self,
        pending: &PendingApproval<DraftIssue>,
        verdict: &str,
        color: u32,
    ) {
        let Some(requester) = pending.requester else {
            return;
        };
        let dm = EmbedSpec {
            title: pending.payload.title.clone(),
            description: Some(verdict.to_string()),
            color: Some(color),
            ..EmbedSpec::default()
        }
        .field(
            "Description:",
            pending.payload.body.clone().unwrap_or_default(),
        )
        .field("Repository:", self.repo_slug(&pending.target_repository));

        // A closed DM must not abort prompt cleanup.
        if let Err(err) = self.transport.send_private(requester, dm.into()).await {
            warn!(user = requester.0, error = %err, "could not notify requester");
        }
    }
}

#[async_trait]
impl ApprovalHandler<DraftIssue> for IssueApprovalHandler {
    async fn on_approved(
        &self,
        pending: PendingApproval<DraftIssue>,
        _approver: UserId,
    ) -> Result<()> {
        let channel = pending.prompt.channel;
        let transport = self.transport.as_ref();

        let Some(token) = github_token(&self.config, transport, channel).await? else {
            return Ok(());
        };
        let Some(owner) = default_github_user(&self.config, transport, channel).await? else {
            return Ok(());
        };

        // The one real side effect. The entry is already out of the pending
        // map, so this runs at most once per prompt; on failure the entry
        // stays dropped and the approver sees the error.
        if let Err(err) = self
            .tracker
            .create_issue(&owner, &pending.target_repository, &pending.payload, &token)
            .await
        {
            notice::error(
                transport,
                channel,
                &format!(
                    "Failed to create issue `{}`: {err}",
                    draft_title(&pending.payload)
                ),
            )
            .await?;
            return Err(err);
        }

        self.notify_requester(&pending, "Your suggestion / bug was accepted!", colors::SUCCESS)
            .await;

        self.transport.delete_message(pending.prompt).await?;
        let feedback = notice::success(
            transport,
            channel,
            &format!(
                "Successfully created issue `{}`!",
                draft_title(&pending.payload)
            ),
        )
        .await?;
        sleep(TRANSIENT_DELAY).await;
        self.transport.delete_message(feedback).await?;
        Ok(())
    }

    async fn on_rejected(
        &self,
        pending: PendingApproval<DraftIssue>,
        _approver: UserId,
    ) -> Result<()> {
        let channel = pending.prompt.channel;

        self.notify_requester(&pending, "Your suggestion / bug was rejected!", colors::ERROR)
            .await;

        self.transport.delete_message(pending.prompt).await?;
        let feedback = notice::error(
            self.transport.as_ref(),
            channel,
            &format!("Issue `{}` rejected!", draft_title(&pending.payload)),
        )
        .await?;
        sleep(TRANSIENT_DELAY).await;
        self.transport.delete_message(feedback).await?;
        Ok(())
    }

    async fn on_expired(&self, pending: PendingApproval<DraftIssue>) -> Result<()> {
        self.transport.delete_message(pending.prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_split_on_first_dash_keeps_whitespace() {
        let (title, body) = split_contents("Bug title - Steps to reproduce");
        assert_eq!(title.as_deref(), Some("Bug title "));
        assert_eq!(body.as_deref(), Some(" Steps to reproduce"));
    }

    #[test]
    fn later_dashes_stay_in_the_body() {
        let (title, body) = split_contents("Crash - step 1 - step 2");
        assert_eq!(title.as_deref(), Some("Crash "));
        assert_eq!(body.as_deref(), Some(" step 1 - step 2"));
    }

    #[test]
    fn missing_dash_means_no_body() {
        let (title, body) = split_contents("just a title");
        assert_eq!(title.as_deref(), Some("just a title"));
        assert_eq!(body, None);
    }

    #[test]
    fn pull_color_tracks_merge_state() {
        let merged = PullRequest {
            merged: true,
            state: Some("closed".to_string()),
            ..PullRequest::default()
        };
        assert_eq!(pull_color(&merged), colors::MERGED_PULL_REQUEST);

        let closed = PullRequest {
            state: Some("closed".to_string()),
            ..PullRequest::default()
        };
        assert_eq!(pull_color(&closed), colors::ERROR);

        let open = PullRequest {
            state: Some("open".to_string()),
            ..PullRequest::default()
        };
        assert_eq!(pull_color(&open), colors::SUCCESS);
    }
}
