//! Builder pattern implementation for state graphs

use crate::error::{Error, Result};
use crate::graph::{Event, State, StateGraph, StateId, Transition};

/// Builder for constructing state graphs.
///
/// States are declared first and hand back a [`StateId`], so transitions can
/// point at states declared later:
///
/// ```rust
/// use hsm_engine::{Event, StateGraph, Transition};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Kind { Toggle }
/// struct Toggle;
/// impl Event for Toggle {
///     type Kind = Kind;
///     fn kind(&self) -> Kind { Kind::Toggle }
/// }
///
/// let mut builder = StateGraph::<Toggle, &str>::builder();
/// let off = builder.state("off");
/// let on = builder.state("on");
/// builder
///     .transition(off, Transition::on(Kind::Toggle).to(on))
///     .transition(on, Transition::on(Kind::Toggle).to(off));
/// let graph = builder.build().unwrap();
/// assert_eq!(graph.len(), 2);
/// ```
pub struct GraphBuilder<E: Event, D, C = ()> {
    states: Vec<State<E, D, C>>,
    unknown: Option<StateId>,
}

impl<E: Event, D, C> Default for GraphBuilder<E, D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event, D, C> GraphBuilder<E, D, C> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            unknown: None,
        }
    }

    /// Declare a state carrying `data`
    pub fn state(&mut self, data: D) -> StateId {
        self.states.push(State::new(data));
        StateId(self.states.len() - 1)
    }

    /// Make `parent` the state that `child` bubbles unmatched events to
    pub fn parent(&mut self, child: StateId, parent: StateId) -> &mut Self {
        self.with_state(child, |state| state.parent = Some(parent))
    }

    /// Redirect transitions targeting `composite` into `child`
    pub fn entry_state(&mut self, composite: StateId, child: StateId) -> &mut Self {
        self.with_state(composite, |state| state.entry_state = Some(child))
    }

    /// Set the action run when `id` is entered
    pub fn on_entry<F>(&mut self, id: StateId, action: F) -> &mut Self
    where
        F: Fn(&D, &E) + Send + Sync + 'static,
    {
        self.with_state(id, |state| state.on_entry = Some(Box::new(action)))
    }

    /// Set the action run when `id` is left
    pub fn on_exit<F>(&mut self, id: StateId, action: F) -> &mut Self
    where
        F: Fn(&D, &E) + Send + Sync + 'static,
    {
        self.with_state(id, |state| state.on_exit = Some(Box::new(action)))
    }

    /// Append a transition to `id`; transitions match in the order they are added
    pub fn transition(&mut self, id: StateId, transition: Transition<E, D, C>) -> &mut Self {
        self.with_state(id, |state| state.transitions.push(transition))
    }

    /// Build the graph.
    ///
    /// Fails with [`Error::UnknownState`] if any call referred to a handle this
    /// builder did not issue. Transitions without a target are accepted.
    pub fn build(self) -> Result<StateGraph<E, D, C>> {
        if let Some(id) = self.unknown {
            return Err(Error::UnknownState(id));
        }

        let len = self.states.len();
        let known = |id: &StateId| id.0 < len;
        for state in &self.states {
            let links = state
                .parent
                .iter()
                .chain(state.entry_state.iter())
                .chain(state.transitions.iter().filter_map(|t| t.target.as_ref()));
            for id in links {
                if !known(id) {
                    return Err(Error::UnknownState(*id));
                }
            }
        }

        Ok(StateGraph {
            states: self.states,
        })
    }

    fn with_state(&mut self, id: StateId, f: impl FnOnce(&mut State<E, D, C>)) -> &mut Self {
        match self.states.get_mut(id.0) {
            Some(state) => f(state),
            None => {
                self.unknown.get_or_insert(id);
            }
        }
        self
    }
}
