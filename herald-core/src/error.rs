use crate::permission::Capability;
use thiserror::Error;

/// Token-level scan failures (argument parsing).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("expected {expected}, found `{found}`")]
    TypeMismatch { expected: &'static str, found: String },
}

/// Structural errors caught when a command tree is registered, never at
/// dispatch time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate literal child `{keyword}` under `{parent}`")]
    DuplicateLiteral { parent: String, keyword: String },
    #[error("node `{parent}` has more than one argument child")]
    AmbiguousArguments { parent: String },
    #[error("argument name `{name}` is bound twice on the same path")]
    DuplicateArgumentName { name: String },
    #[error("greedy argument `{name}` must be the last node in its branch")]
    ChildAfterGreedy { name: String },
    #[error("leaf node `{name}` has no executor")]
    MissingExecutor { name: String },
    #[error("root command node must be a literal keyword")]
    NonLiteralRoot,
}

/// Everything that can go wrong between a raw message and a scheduled
/// executor. All variants are converted to a single user-visible notice at
/// the point of dispatch; none are fatal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("incomplete command: `{0}` expects more input")]
    IncompleteCommand(String),
    #[error("trailing input `{0}` after a complete command")]
    TrailingInput(String),
    #[error("argument `{name}`: {source}")]
    Argument {
        name: String,
        #[source]
        source: ScanError,
    },
    #[error("you need the `{capability}` permission to run this command")]
    PermissionDenied { capability: Capability },
}
