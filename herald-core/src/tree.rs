use crate::argument::ArgKind;
use crate::context::ParseContext;
use crate::error::TreeError;
use crate::permission::Capability;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Terminal handler bound to a command path. Invoked with the resolved
/// arguments on its own task; must not assume any ordering relative to other
/// executors.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, ctx: ParseContext) -> Result<()>;
}

/// What a node matches against the input.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Exact, case-sensitive keyword. Does not bind a value.
    Literal(String),
    /// Matches via an [`ArgKind`] and binds the value under `name`.
    Argument { name: String, kind: ArgKind },
}

/// One node of a command tree. Literal children are tried before the single
/// optional argument child, so exact keywords always win over a same-shaped
/// capture.
pub struct CommandNode {
    kind: NodeKind,
    children: Vec<CommandNode>,
    executor: Option<Arc<dyn Executor>>,
    required_capability: Option<Capability>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("has_executor", &self.executor.is_some())
            .field("required_capability", &self.required_capability)
            .finish()
    }
}

impl CommandNode {
    pub fn literal(keyword: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Literal(keyword.into()),
            children: Vec::new(),
            executor: None,
            required_capability: None,
        }
    }

    pub fn argument(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            kind: NodeKind::Argument {
                name: name.into(),
                kind,
            },
            children: Vec::new(),
            executor: None,
            required_capability: None,
        }
    }

    /// Append a child branch. Structural rules are checked when the root is
    /// registered with the dispatcher, not here.
    pub fn child(mut self, child: CommandNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn executes<E: Executor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn requires(mut self, capability: Capability) -> Self {
        self.required_capability = Some(capability);
        self
    }

    /// Keyword for literals, argument name otherwise — used in diagnostics.
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Literal(keyword) => keyword,
            NodeKind::Argument { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    pub(crate) fn required_capability(&self) -> Option<Capability> {
        self.required_capability
    }

    pub(crate) fn literal_child(&self, word: &str) -> Option<&CommandNode> {
        self.children.iter().find(|child| {
            matches!(&child.kind, NodeKind::Literal(keyword) if keyword == word)
        })
    }

    pub(crate) fn argument_child(&self) -> Option<&CommandNode> {
        self.children
            .iter()
            .find(|child| matches!(&child.kind, NodeKind::Argument { .. }))
    }

    /// Validate the whole subtree:
    /// - at most one literal child per distinct keyword
    /// - at most one argument child per node
    /// - argument names unique along any root-to-leaf path
    /// - greedy arguments are leaves
    /// - every leaf carries an executor
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut path_args = HashSet::new();
        self.validate_branch(&mut path_args)
    }

    fn validate_branch(&self, path_args: &mut HashSet<String>) -> Result<(), TreeError> {
        if let NodeKind::Argument {
            name,
            kind: ArgKind::Greedy,
        } = &self.kind
        {
            if !self.children.is_empty() {
                return Err(TreeError::ChildAfterGreedy { name: name.clone() });
            }
        }

        if self.children.is_empty() && self.executor.is_none() {
            return Err(TreeError::MissingExecutor {
                name: self.name().to_string(),
            });
        }

        let mut keywords = HashSet::new();
        let mut argument_children = 0usize;
        for child in &self.children {
            match &child.kind {
                NodeKind::Literal(keyword) => {
                    if !keywords.insert(keyword.as_str()) {
                        return Err(TreeError::DuplicateLiteral {
                            parent: self.name().to_string(),
                            keyword: keyword.clone(),
                        });
                    }
                }
                NodeKind::Argument { name, .. } => {
                    argument_children += 1;
                    if argument_children > 1 {
                        return Err(TreeError::AmbiguousArguments {
                            parent: self.name().to_string(),
                        });
                    }
                    if path_args.contains(name) {
                        return Err(TreeError::DuplicateArgumentName { name: name.clone() });
                    }
                }
            }
        }

        for child in &self.children {
            let bound_name = match &child.kind {
                NodeKind::Argument { name, .. } => {
                    path_args.insert(name.clone());
                    Some(name.clone())
                }
                NodeKind::Literal(_) => None,
            };
            let result = child.validate_branch(path_args);
            if let Some(name) = bound_name {
                path_args.remove(&name);
            }
            result?;
        }

        Ok(())
    }
}
