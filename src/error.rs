//! Error types for graph construction, validation and driving

use crate::graph::StateId;
use thiserror::Error;

/// Result type alias for fallible graph and driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, validating or driving a state graph.
///
/// Event dispatch never fails with one of these; it reports an
/// [`Outcome`](crate::Outcome) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A link or transition refers to a handle that is not part of the graph
    #[error("State {0} is not part of this graph")]
    UnknownState(StateId),

    /// A transition was declared without a target state
    #[error("Transition #{index} of state {state} has no target state")]
    MissingTarget {
        /// State owning the transition
        state: StateId,
        /// Position of the transition in the state's transition list
        index: usize,
    },

    /// Following entry states from this state never reaches a leaf
    #[error("Entry state chain starting at {0} loops")]
    EntryCycle(StateId),

    /// Following parents from this state never reaches a root
    #[error("Parent chain starting at {0} loops")]
    ParentCycle(StateId),

    /// The designated error state declares outgoing transitions
    #[error("Error state {0} must be final but has {1} transition(s)")]
    ErrorStateNotFinal(StateId, usize),

    /// The machine was driven before `init` bound it to a graph
    #[error("State machine not initialized")]
    StateMachineNotInitialized,
}
