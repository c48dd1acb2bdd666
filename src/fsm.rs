/// A synchronous hierarchical finite state machine (HSM) engine driven by a
/// static [`StateGraph`].
///
/// # Type Parameters
/// - `E`: Event type, implementing [`Event`] to expose its discriminant.
/// - `D`: Per-state data handed to entry, exit and transition actions.
/// - `C`: Condition values handed to transition guards.
///
/// # Dispatch
/// [`StateMachine::handle_event`] looks for a matching transition in the
/// current state, then in its parent, grandparent and so on. The first match
/// wins. Its target is followed through entry states until a leaf is found
/// (the *landing* state), and the change is committed in this order:
///
/// 1. exit action of the state being left (skipped on a self-loop),
/// 2. the transition's action,
/// 3. entry action of the landing state (skipped on a self-loop),
/// 4. previous/current pointers are updated.
///
/// # Errors
/// Dispatch never returns an error. Misuse is reported as
/// [`Outcome::InvalidArgument`], and graph defects push the machine into its
/// error state ([`Outcome::ErrorStateReached`]).
///
/// # See Also
/// - [`StateGraph`]: The immutable graph a machine runs on.
/// - [`Outcome`]: Result codes of event dispatch.
use std::fmt::{self, Debug};

use tracing::{debug, trace, warn};

use crate::graph::{Event, State, StateGraph, StateId, Transition};

/// Result of handing one event to [`StateMachine::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The machine was not initialized, or its error state is not part of
    /// the graph. Nothing was changed and no action ran.
    InvalidArgument,
    /// The machine is now in its error state
    ErrorStateReached,
    /// The machine moved to a different, non-final state
    StateChanged,
    /// The transition led back to the state it started from
    LoopedToSelf,
    /// No transition of the current state or its ancestors matched
    NoStateChange,
    /// The machine moved to a final state other than the error state
    FinalStateReached,
}

impl Outcome {
    /// Classic integer code of this outcome, from -2 (invalid argument) to
    /// 3 (final state reached)
    pub fn code(self) -> i32 {
        match self {
            Outcome::InvalidArgument => -2,
            Outcome::ErrorStateReached => -1,
            Outcome::StateChanged => 0,
            Outcome::LoopedToSelf => 1,
            Outcome::NoStateChange => 2,
            Outcome::FinalStateReached => 3,
        }
    }

    /// Whether the machine can no longer advance after this outcome
    pub fn is_halted(self) -> bool {
        matches!(self, Outcome::ErrorStateReached | Outcome::FinalStateReached)
    }
}

impl From<Outcome> for i32 {
    fn from(outcome: Outcome) -> Self {
        outcome.code()
    }
}

/// A machine instance running on a borrowed [`StateGraph`].
///
/// Only the current, previous and error pointers live here, so any number of
/// machines can share one graph.
pub struct StateMachine<'g, E: Event, D, C = ()> {
    graph: &'g StateGraph<E, D, C>,
    current: Option<StateId>,
    previous: Option<StateId>,
    error: Option<StateId>,
}

impl<'g, E: Event, D, C> StateMachine<'g, E, D, C> {
    /// Create a machine that is not yet initialized.
    ///
    /// Until [`init`](Self::init) is called every event yields
    /// [`Outcome::InvalidArgument`].
    pub fn new(graph: &'g StateGraph<E, D, C>) -> Self {
        Self {
            graph,
            current: None,
            previous: None,
            error: None,
        }
    }

    /// Create a machine and initialize it in one step
    pub fn start(graph: &'g StateGraph<E, D, C>, initial: StateId, error: StateId) -> Self {
        let mut machine = Self::new(graph);
        machine.init(initial, error);
        machine
    }

    /// Initialize (or restart) the machine.
    ///
    /// Sets the current state to `initial` and clears the previous state. No
    /// entry action runs. An `initial` handle that is not part of the graph
    /// leaves the machine without a current state; the next event then sends
    /// it to the error state.
    pub fn init(&mut self, initial: StateId, error: StateId) {
        self.current = Some(initial).filter(|id| self.graph.contains(*id));
        self.previous = None;
        self.error = Some(error);
        debug!(initial = %initial, error = %error, "state machine initialized");
    }

    /// Dispatch an event and report what happened.
    pub fn handle_event(&mut self, event: &E) -> Outcome {
        let graph = self.graph;

        let Some(error) = self.error.filter(|id| graph.contains(*id)) else {
            debug!(kind = ?event.kind(), "event rejected: machine not initialized");
            return Outcome::InvalidArgument;
        };

        let Some((from, state)) = self.current.and_then(|id| graph.state(id).map(|s| (id, s)))
        else {
            warn!(kind = ?event.kind(), "no current state");
            return self.enter_error_state(error, event);
        };

        let Some((owner, index, transition)) = Self::find_transition(graph, from, event) else {
            trace!(state = %from, kind = ?event.kind(), "no transition matched");
            return Outcome::NoStateChange;
        };
        trace!(state = %from, owner = %owner, index, "transition matched");

        let Some(target) = transition.target() else {
            warn!(state = %owner, index, "transition has no target state");
            return self.abort_transition(from, state, transition, error, event);
        };

        let Some((to, landing)) = Self::landing(graph, target) else {
            warn!(target = %target, "entry state chain of target does not resolve");
            return self.abort_transition(from, state, transition, error, event);
        };

        self.commit(from, state, transition, to, landing, event);

        let outcome = if to == from {
            Outcome::LoopedToSelf
        } else if to == error {
            Outcome::ErrorStateReached
        } else if landing.is_final() {
            Outcome::FinalStateReached
        } else {
            Outcome::StateChanged
        };
        debug!(from = %from, to = %to, ?outcome, "transition taken");
        outcome
    }

    /// Current state, `None` before initialization or when the initial state
    /// did not resolve
    pub fn current_state(&self) -> Option<StateId> {
        self.current
    }

    /// State the machine was in before the most recent transition
    pub fn previous_state(&self) -> Option<StateId> {
        self.previous
    }

    /// Error state the machine falls back to
    pub fn error_state(&self) -> Option<StateId> {
        self.error
    }

    /// The current state node
    pub fn current(&self) -> Option<&'g State<E, D, C>> {
        self.current.and_then(|id| self.graph.state(id))
    }

    /// Data of the current state
    pub fn current_data(&self) -> Option<&'g D> {
        self.current().map(State::data)
    }

    /// Whether `init` has been called
    pub fn is_initialized(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the machine cannot advance: it is uninitialized, has no
    /// current state, or sits in a final state (the error state included).
    pub fn stopped(&self) -> bool {
        self.current().map_or(true, State::is_final)
    }

    /// The graph this machine runs on
    pub fn graph(&self) -> &'g StateGraph<E, D, C> {
        self.graph
    }

    fn find_transition(
        graph: &'g StateGraph<E, D, C>,
        from: StateId,
        event: &E,
    ) -> Option<(StateId, usize, &'g Transition<E, D, C>)> {
        graph.ancestors(from).find_map(|(id, state)| {
            state
                .resolve(event)
                .map(|(index, transition)| (id, index, transition))
        })
    }

    fn landing(
        graph: &'g StateGraph<E, D, C>,
        target: StateId,
    ) -> Option<(StateId, &'g State<E, D, C>)> {
        let id = graph.landing_state(target)?;
        graph.state(id).map(|state| (id, state))
    }

    fn commit(
        &mut self,
        from: StateId,
        state: &'g State<E, D, C>,
        transition: &'g Transition<E, D, C>,
        to: StateId,
        landing: &'g State<E, D, C>,
        event: &E,
    ) {
        let looped = from == to;
        if !looped {
            state.exit(event);
        }
        transition.run_action(state.data(), event, landing.data());
        if !looped {
            landing.enter(event);
        }
        self.previous = Some(from);
        self.current = Some(to);
    }

    // Callers that leave a state set `previous` themselves.
    /// A matched transition that cannot land: leave the current state, run the
    /// transition's action against the error state, then enter it.
    fn abort_transition(
        &mut self,
        from: StateId,
        state: &'g State<E, D, C>,
        transition: &'g Transition<E, D, C>,
        error: StateId,
        event: &E,
    ) -> Outcome {
        state.exit(event);
        if let Some(error_state) = self.graph.state(error) {
            transition.run_action(state.data(), event, error_state.data());
        }
        self.previous = Some(from);
        self.enter_error_state(error, event)
    }

    fn enter_error_state(&mut self, error: StateId, event: &E) -> Outcome {
        self.current = Some(error);
        if let Some(state) = self.graph.state(error) {
            state.enter(event);
        }
        warn!(error = %error, previous = ?self.previous, "entered error state");
        Outcome::ErrorStateReached
    }
}

impl<E: Event, D, C> Clone for StateMachine<'_, E, D, C> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph,
            current: self.current,
            previous: self.previous,
            error: self.error,
        }
    }
}

impl<E: Event, D, C> Debug for StateMachine<'_, E, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("error", &self.error)
            .finish()
    }
}
