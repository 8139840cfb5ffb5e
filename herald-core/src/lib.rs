//! Core of a chat-command bot: a command tree parser/dispatcher and the
//! reaction-gated approval workflow, with the chat platform and the
//! authorization store behind narrow async traits.
//!
//! The dispatcher owns its root nodes for process lifetime (built once,
//! read-only thereafter); the approval queue owns the pending map and is its
//! own serialization point. No ambient singletons — both are plain values
//! injected wherever the event loop lives.

pub mod approval;
pub mod argument;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod permission;
pub mod scanner;
pub mod transport;
pub mod tree;

pub use approval::{
    ApprovalHandler, ApprovalQueue, ApprovalState, PendingApproval, ReactionOutcome,
    APPROVE_EMOJI, REJECT_EMOJI,
};
pub use argument::{ArgKind, ArgValue};
pub use context::ParseContext;
pub use dispatch::Dispatcher;
pub use error::{DispatchError, ScanError, TreeError};
pub use permission::{AuthorizationStore, Capability};
pub use scanner::TokenScanner;
pub use transport::{
    ChannelId, ChatTransport, EmbedField, EmbedSpec, MessageHandle, MessageId, MessageRef,
    OutboundContent, ReactionEvent, UserId,
};
pub use tree::{CommandNode, Executor, NodeKind};
