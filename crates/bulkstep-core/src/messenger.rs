//! # Messenger
//!
//! Inter-vertex messaging with superstep-delayed delivery.
//!
//! Messages sent during superstep n land in a partition-local [`Outbox`].
//! At the barrier every outbox is drained into a fresh [`MessageBoard`],
//! which becomes the read-only inbox set of superstep n+1. A vertex never
//! sees a message sent in the same superstep.
//!
//! Per-recipient order follows partition order then send order. Callers
//! must not rely on it.

use crate::structure::Graph;
use crate::{ComputeError, Direction, Value, VertexId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Associative, commutative fold applied to all messages bound to one vertex.
pub type MessageCombiner = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Which vertices a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageScope {
    /// The vertices adjacent to the sender along `direction` (and `label`).
    Local {
        direction: Direction,
        label: Option<String>,
    },
    /// Explicit recipients.
    Global(Vec<VertexId>),
}

impl MessageScope {
    /// All neighbors reached along `direction`.
    #[must_use]
    pub fn adjacent(direction: Direction) -> Self {
        MessageScope::Local {
            direction,
            label: None,
        }
    }
}

// =============================================================================
// OUTBOX & BOARD
// =============================================================================

/// Messages sent by one partition during a superstep.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    messages: Vec<(VertexId, Value)>,
}

impl Outbox {
    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Inboxes visible during one superstep.
#[derive(Debug, Default)]
pub(crate) struct MessageBoard {
    inboxes: BTreeMap<VertexId, Vec<Value>>,
}

impl MessageBoard {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    /// Materialize the outboxes of a finished superstep.
    pub(crate) fn deliver(outboxes: Vec<Outbox>, combiner: Option<&MessageCombiner>) -> Self {
        let mut inboxes: BTreeMap<VertexId, Vec<Value>> = BTreeMap::new();
        for outbox in outboxes {
            for (recipient, message) in outbox.messages {
                let inbox = inboxes.entry(recipient).or_default();
                match (combiner, inbox.last_mut()) {
                    (Some(combine), Some(last)) => {
                        let previous = std::mem::replace(last, Value::Null);
                        *last = combine(previous, message);
                    }
                    _ => inbox.push(message),
                }
            }
        }
        Self { inboxes }
    }

    pub(crate) fn inbox(&self, vertex: VertexId) -> &[Value] {
        self.inboxes.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

// =============================================================================
// MESSENGER
// =============================================================================

/// Mailbox handle bound to the vertex currently executing.
pub struct Messenger<'a> {
    vertex: VertexId,
    graph: &'a dyn Graph,
    inbox: &'a [Value],
    outbox: &'a mut Outbox,
}

impl<'a> Messenger<'a> {
    pub(crate) fn new(
        vertex: VertexId,
        graph: &'a dyn Graph,
        inbox: &'a [Value],
        outbox: &'a mut Outbox,
    ) -> Self {
        Self {
            vertex,
            graph,
            inbox,
            outbox,
        }
    }

    /// Messages delivered to this vertex at the start of the superstep.
    pub fn receive(&self) -> impl Iterator<Item = &Value> + '_ {
        self.inbox.iter()
    }

    /// Send a message; recipients see it in the next superstep.
    pub fn send(
        &mut self,
        scope: &MessageScope,
        message: impl Into<Value>,
    ) -> Result<(), ComputeError> {
        let message = message.into();
        match scope {
            MessageScope::Local { direction, label } => {
                let edges = self.graph.edges(self.vertex, *direction, label.as_deref())?;
                for edge in edges {
                    self.outbox
                        .messages
                        .push((edge.other(self.vertex), message.clone()));
                }
            }
            MessageScope::Global(recipients) => {
                for recipient in recipients {
                    if !self.graph.contains_vertex(*recipient) {
                        return Err(ComputeError::VertexDoesNotExist(*recipient));
                    }
                    self.outbox.messages.push((*recipient, message.clone()));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
