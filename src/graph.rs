//! Static state graph: states, transitions and guards stored in an arena.
//!
//! A [`StateGraph`] is authored once (usually through
//! [`GraphBuilder`](crate::GraphBuilder)) and is read-only afterwards. States
//! refer to each other through [`StateId`] handles, so parent links, entry
//! states and transition targets never own the state they point at.

use std::fmt::{self, Debug};

use crate::builder::GraphBuilder;
use crate::error::{Error, Result};

/// Events dispatched into a state machine.
///
/// The [`Kind`](Event::Kind) is the discriminant transitions are keyed on.
/// Any payload stays in the implementing type, so guards and actions get a
/// typed value to match on.
///
/// ```rust
/// use hsm_engine::Event;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Kind { Key, Tick }
///
/// enum Input { Key(char), Tick }
///
/// impl Event for Input {
///     type Kind = Kind;
///
///     fn kind(&self) -> Kind {
///         match self {
///             Input::Key(_) => Kind::Key,
///             Input::Tick => Kind::Tick,
///         }
///     }
/// }
/// ```
pub trait Event {
    /// Discriminant type transitions are matched against
    type Kind: Copy + Eq + Debug;

    /// The discriminant of this event
    fn kind(&self) -> Self::Kind;
}

/// Handle to a state stored in a [`StateGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Position of the state in its graph
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Guard predicate, called with the transition's condition and the event
pub type GuardFn<E, C> = Box<dyn Fn(&C, &E) -> bool + Send + Sync>;

/// Transition action, called with the old state's data, the event and the new state's data
pub type ActionFn<E, D> = Box<dyn Fn(&D, &E, &D) + Send + Sync>;

/// Entry or exit action, called with the state's data and the event
pub type StateActionFn<E, D> = Box<dyn Fn(&D, &E) + Send + Sync>;

/// A condition value paired with the predicate that checks it.
pub struct Guard<E, C> {
    condition: C,
    predicate: GuardFn<E, C>,
}

impl<E, C> Guard<E, C> {
    /// Create a guard from a condition and a predicate.
    ///
    /// The predicate should be free of side effects; the engine may evaluate
    /// it for candidates that end up not firing.
    pub fn new<F>(condition: C, predicate: F) -> Self
    where
        F: Fn(&C, &E) -> bool + Send + Sync + 'static,
    {
        Self {
            condition,
            predicate: Box::new(predicate),
        }
    }

    /// The condition value handed to the predicate
    pub fn condition(&self) -> &C {
        &self.condition
    }

    /// Evaluate the predicate against an event
    pub fn check(&self, event: &E) -> bool {
        (self.predicate)(&self.condition, event)
    }
}

impl<E, C: Debug> Debug for Guard<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

/// An outgoing edge of a state.
///
/// ```rust
/// # use hsm_engine::{Event, Transition, StateGraph};
/// # #[derive(Debug, Clone, Copy, PartialEq, Eq)] enum Kind { Key }
/// # struct Key(char);
/// # impl Event for Key { type Kind = Kind; fn kind(&self) -> Kind { Kind::Key } }
/// let mut builder = StateGraph::<Key, &str, char>::builder();
/// let idle = builder.state("idle");
/// let h = builder.state("h");
/// builder.transition(
///     idle,
///     Transition::on(Kind::Key)
///         .when('h', |expected, key: &Key| key.0 == *expected)
///         .to(h),
/// );
/// ```
pub struct Transition<E: Event, D, C> {
    kind: E::Kind,
    guard: Option<Guard<E, C>>,
    action: Option<ActionFn<E, D>>,
    pub(crate) target: Option<StateId>,
}

impl<E: Event, D, C> Transition<E, D, C> {
    /// Start a transition triggered by events of the given kind.
    ///
    /// Without a call to [`to`](Self::to) the transition has no target and
    /// taking it sends the machine to its error state.
    pub fn on(kind: E::Kind) -> Self {
        Self {
            kind,
            guard: None,
            action: None,
            target: None,
        }
    }

    /// Only fire when `predicate(&condition, event)` holds
    pub fn when<F>(mut self, condition: C, predicate: F) -> Self
    where
        F: Fn(&C, &E) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(condition, predicate));
        self
    }

    /// Run `action(old_data, event, new_data)` while the transition is taken
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&D, &E, &D) + Send + Sync + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Set the state the transition leads to
    pub fn to(mut self, target: StateId) -> Self {
        self.target = Some(target);
        self
    }

    /// Event kind this transition reacts to
    pub fn kind(&self) -> E::Kind {
        self.kind
    }

    /// Declared target, before entry-state redirection
    pub fn target(&self) -> Option<StateId> {
        self.target
    }

    /// Attached guard, if any
    pub fn guard(&self) -> Option<&Guard<E, C>> {
        self.guard.as_ref()
    }

    /// Whether this transition accepts the event: same kind, and the guard
    /// (if any) holds.
    pub fn matches(&self, event: &E) -> bool {
        self.kind == event.kind() && self.guard.as_ref().map_or(true, |g| g.check(event))
    }

    pub(crate) fn run_action(&self, old: &D, event: &E, new: &D) {
        if let Some(action) = &self.action {
            action(old, event, new);
        }
    }
}

impl<E: Event, D, C: Debug> Debug for Transition<E, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("kind", &self.kind)
            .field("guard", &self.guard)
            .field("has_action", &self.action.is_some())
            .field("target", &self.target)
            .finish()
    }
}

/// A node of the state graph.
pub struct State<E: Event, D, C> {
    pub(crate) parent: Option<StateId>,
    pub(crate) entry_state: Option<StateId>,
    pub(crate) transitions: Vec<Transition<E, D, C>>,
    pub(crate) data: D,
    pub(crate) on_entry: Option<StateActionFn<E, D>>,
    pub(crate) on_exit: Option<StateActionFn<E, D>>,
}

impl<E: Event, D, C> State<E, D, C> {
    pub(crate) fn new(data: D) -> Self {
        Self {
            parent: None,
            entry_state: None,
            transitions: Vec::new(),
            data,
            on_entry: None,
            on_exit: None,
        }
    }

    /// Parent state that unmatched events bubble up to
    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Child entered in place of this state when it is a transition target
    pub fn entry_state(&self) -> Option<StateId> {
        self.entry_state
    }

    /// Outgoing transitions in match order
    pub fn transitions(&self) -> &[Transition<E, D, C>] {
        &self.transitions
    }

    /// User data passed to this state's actions
    pub fn data(&self) -> &D {
        &self.data
    }

    /// A state without transitions halts the machine
    pub fn is_final(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Find the first transition of this state that accepts `event`.
    ///
    /// Pure query: only guards are evaluated, no action runs. Returns the
    /// transition together with its position in [`transitions`](Self::transitions).
    pub fn resolve(&self, event: &E) -> Option<(usize, &Transition<E, D, C>)> {
        self.transitions
            .iter()
            .enumerate()
            .find(|(_, transition)| transition.matches(event))
    }

    pub(crate) fn enter(&self, event: &E) {
        if let Some(action) = &self.on_entry {
            action(&self.data, event);
        }
    }

    pub(crate) fn exit(&self, event: &E) {
        if let Some(action) = &self.on_exit {
            action(&self.data, event);
        }
    }
}

impl<E: Event, D: Debug, C: Debug> Debug for State<E, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("data", &self.data)
            .field("parent", &self.parent)
            .field("entry_state", &self.entry_state)
            .field("transitions", &self.transitions)
            .field("has_entry_action", &self.on_entry.is_some())
            .field("has_exit_action", &self.on_exit.is_some())
            .finish()
    }
}

/// Immutable arena of states.
///
/// A graph can back any number of [`StateMachine`](crate::StateMachine)s at
/// once; machines only borrow it.
pub struct StateGraph<E: Event, D, C = ()> {
    pub(crate) states: Vec<State<E, D, C>>,
}

impl<E: Event, D, C> StateGraph<E, D, C> {
    /// Start authoring a graph
    pub fn builder() -> GraphBuilder<E, D, C> {
        GraphBuilder::new()
    }

    /// Look up a state; `None` if the handle does not belong to this graph
    pub fn state(&self, id: StateId) -> Option<&State<E, D, C>> {
        self.states.get(id.0)
    }

    /// Whether the handle resolves in this graph
    pub fn contains(&self, id: StateId) -> bool {
        id.0 < self.states.len()
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the graph has no states at all
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Handles of all states, in declaration order
    pub fn ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.states.len()).map(StateId)
    }

    /// The state itself followed by its parent, grandparent and so on.
    ///
    /// Never yields more than [`len`](Self::len) items, so a looping parent
    /// chain still terminates.
    pub fn ancestors(&self, id: StateId) -> Ancestors<'_, E, D, C> {
        Ancestors {
            graph: self,
            next: Some(id),
            remaining: self.states.len(),
        }
    }

    /// Resolve a transition target to the state actually entered.
    ///
    /// Follows entry states transitively until a state without one is found.
    /// Returns `None` if a handle on the way does not resolve or the chain
    /// loops.
    pub fn landing_state(&self, target: StateId) -> Option<StateId> {
        let mut current = target;
        for _ in 0..=self.states.len() {
            match self.state(current)?.entry_state {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
        None
    }

    /// Check the graph for defects the engine would otherwise only discover
    /// while dispatching.
    ///
    /// The engine never calls this; graphs that fail validation still run and
    /// degrade into the error state when a defect is hit.
    pub fn validate(&self, error_state: StateId) -> Result<()> {
        let error = self
            .state(error_state)
            .ok_or(Error::UnknownState(error_state))?;
        if !error.is_final() {
            return Err(Error::ErrorStateNotFinal(
                error_state,
                error.transitions.len(),
            ));
        }

        for id in self.ids() {
            let state = &self.states[id.0];
            for (index, transition) in state.transitions.iter().enumerate() {
                match transition.target {
                    None => return Err(Error::MissingTarget { state: id, index }),
                    Some(target) if !self.contains(target) => {
                        return Err(Error::UnknownState(target))
                    }
                    Some(_) => {}
                }
            }
            if self.landing_state(id).is_none() {
                return Err(Error::EntryCycle(id));
            }
            if self.parent_chain_loops(id) {
                return Err(Error::ParentCycle(id));
            }
        }
        Ok(())
    }

    fn parent_chain_loops(&self, id: StateId) -> bool {
        let mut current = Some(id);
        for _ in 0..=self.states.len() {
            match current.and_then(|id| self.state(id)) {
                Some(state) => current = state.parent,
                None => return false,
            }
        }
        true
    }
}

impl<E: Event, D: Debug, C: Debug> Debug for StateGraph<E, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.states).finish()
    }
}

/// Iterator over a state and its ancestors, see [`StateGraph::ancestors`].
pub struct Ancestors<'g, E: Event, D, C> {
    graph: &'g StateGraph<E, D, C>,
    next: Option<StateId>,
    remaining: usize,
}

impl<'g, E: Event, D, C> Iterator for Ancestors<'g, E, D, C> {
    type Item = (StateId, &'g State<E, D, C>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let state = self.graph.state(id)?;
        self.remaining -= 1;
        self.next = state.parent;
        Some((id, state))
    }
}
