pub mod issue;

pub use issue::{issue_command, IssueApprovalHandler, IssueCommandDeps, PROMPT_EXPIRY};

use herald_core::dispatch::Dispatcher;
use herald_core::error::TreeError;
use std::sync::Arc;

/// Register every command the bot ships.
pub fn register_all(
    dispatcher: &mut Dispatcher,
    deps: Arc<IssueCommandDeps>,
) -> Result<(), TreeError> {
    dispatcher.register(issue_command(deps))
}
