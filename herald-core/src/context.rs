use crate::argument::ArgValue;
use crate::transport::MessageRef;

/// Arguments bound during tree traversal, in declaration order, plus the
/// invoking message (opaque to the core, passed through to the executor).
#[derive(Clone, Debug)]
pub struct ParseContext {
    message: MessageRef,
    args: Vec<(String, ArgValue)>,
}

impl ParseContext {
    pub fn new(message: MessageRef) -> Self {
        Self {
            message,
            args: Vec::new(),
        }
    }

    pub fn message(&self) -> &MessageRef {
        &self.message
    }

    /// Keys are unique: the tree rejects duplicate argument names on a path
    /// at registration time.
    pub(crate) fn bind(&mut self, name: &str, value: ArgValue) {
        debug_assert!(self.args.iter().all(|(n, _)| n != name));
        self.args.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_text)
    }

    /// All bindings in traversal order.
    pub fn bindings(&self) -> &[(String, ArgValue)] {
        &self.args
    }
}
