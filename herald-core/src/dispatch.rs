use crate::context::ParseContext;
use crate::error::{DispatchError, TreeError};
use crate::permission::AuthorizationStore;
use crate::scanner::TokenScanner;
use crate::transport::MessageRef;
use crate::tree::{CommandNode, NodeKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Owns the registered command trees and walks them against inbound
/// messages. Built once at startup; read-only during dispatch, so it needs
/// no locking.
pub struct Dispatcher {
    roots: HashMap<String, CommandNode>,
    auth: Arc<dyn AuthorizationStore>,
}

impl Dispatcher {
    pub fn new(auth: Arc<dyn AuthorizationStore>) -> Self {
        Self {
            roots: HashMap::new(),
            auth,
        }
    }

    /// Register a command tree. The root must be a literal (the command
    /// name); the whole subtree is validated here so dispatch never sees a
    /// structurally broken tree.
    pub fn register(&mut self, root: CommandNode) -> Result<(), TreeError> {
        let NodeKind::Literal(name) = root.kind() else {
            return Err(TreeError::NonLiteralRoot);
        };
        let name = name.clone();
        if self.roots.contains_key(&name) {
            return Err(TreeError::DuplicateLiteral {
                parent: "<roots>".to_string(),
                keyword: name,
            });
        }
        root.validate()?;
        self.roots.insert(name, root);
        Ok(())
    }

    /// Resolve `message.content` against the tree and schedule the matched
    /// executor. Returns as soon as the executor task is spawned — command
    /// execution never blocks intake of further messages. The handle is
    /// returned so drivers and tests can await completion if they want to.
    ///
    /// Traversal commits greedily: once a child's first token matches, no
    /// sibling branch is retried. Literals are attempted before the argument
    /// child, so an exact keyword always beats a same-shaped capture.
    pub async fn dispatch(&self, message: MessageRef) -> Result<JoinHandle<()>, DispatchError> {
        let mut scanner = TokenScanner::new(&message.content);
        let first = scanner
            .read_word()
            .map_err(|_| DispatchError::UnknownCommand(String::new()))?;
        let mut node = self
            .roots
            .get(first)
            .ok_or_else(|| DispatchError::UnknownCommand(first.to_string()))?;

        let mut bindings = Vec::new();
        let executor = loop {
            if scanner.at_end() {
                match node.executor() {
                    Some(executor) => break Arc::clone(executor),
                    None => {
                        return Err(DispatchError::IncompleteCommand(node.name().to_string()))
                    }
                }
            }

            // Literal children first: probe one word on a scanner copy and
            // commit only on an exact keyword match.
            let mut probe = scanner;
            if let Ok(word) = probe.read_word() {
                if let Some(child) = node.literal_child(word) {
                    scanner = probe;
                    node = child;
                    continue;
                }
            }

            if let Some(child) = node.argument_child() {
                let NodeKind::Argument { name, kind } = child.kind() else {
                    unreachable!("argument_child returned a literal");
                };
                let value = kind.parse(&mut scanner).map_err(|source| {
                    DispatchError::Argument {
                        name: name.clone(),
                        source,
                    }
                })?;
                bindings.push((name.clone(), value));
                node = child;
                continue;
            }

            // No child matched. Unconsumed input on an executable node is an
            // over-long invocation; anything else is a dead end.
            if node.executor().is_some() {
                return Err(DispatchError::TrailingInput(
                    scanner.remaining().trim().to_string(),
                ));
            }
            return Err(DispatchError::IncompleteCommand(node.name().to_string()));
        };

        if let Some(capability) = node.required_capability() {
            if !self.auth.has_capability(message.author, capability).await {
                return Err(DispatchError::PermissionDenied { capability });
            }
        }

        let mut ctx = ParseContext::new(message);
        for (name, value) in bindings {
            ctx.bind(&name, value);
        }

        let command = node.name().to_string();
        Ok(tokio::spawn(async move {
            if let Err(err) = executor.run(ctx).await {
                warn!(%command, error = %err, "command executor failed");
            }
        }))
    }
}
