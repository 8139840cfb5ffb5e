//! Glue around `herald-core`: JSON config, the GitHub issue-tracker client,
//! the `issue` command with its reaction-gated creation flow, and the event
//! router that feeds transport events into the dispatcher and the approval
//! queue. The chat transport itself stays behind the core's trait.

pub mod commands;
pub mod config;
pub mod events;
pub mod github;
pub mod notice;

pub use config::{AuthConfig, ConfigKind, ConfigStore, UserConfig};
pub use events::{EventRouter, DEFAULT_PREFIX};
pub use github::{DraftIssue, Fetched, GithubClient, Issue, IssueTracker, PullRequest};
