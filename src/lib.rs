//! # Hierarchical State Machine Engine
//!
//! A synchronous hierarchical finite state machine (HSM) engine in Rust.
//! States live in an immutable arena, events bubble from a state to its
//! ancestors until a transition matches, and composite states redirect into
//! their entry states.
//!
//! ## Features
//!
//! - 🏗️ **Hierarchical States**: Unmatched events bubble up the parent chain
//! - 🚪 **Composite Entry States**: Targeting a group state lands on its (nested) entry child
//! - 🛡️ **Guards**: Per-transition condition values checked by typed predicates
//! - 🔁 **Well-defined Ordering**: exit, transition action, entry; self-loops skip exit/entry
//! - 🧯 **Error State Fallback**: Graph defects degrade into a designated error state
//! - ⏰ **Async Driver**: Optional channel-fed event pump (`tokio-integration` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use hsm_engine::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { PowerOn, PowerOff }
//!
//! #[derive(Debug)]
//! enum Input { PowerOn, PowerOff }
//!
//! impl Event for Input {
//!     type Kind = Kind;
//!
//!     fn kind(&self) -> Kind {
//!         match self {
//!             Input::PowerOn => Kind::PowerOn,
//!             Input::PowerOff => Kind::PowerOff,
//!         }
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let mut builder = StateGraph::<Input, &str>::builder();
//! let off = builder.state("off");
//! let on = builder.state("on");
//! let error = builder.state("error");
//! builder
//!     .transition(off, Transition::on(Kind::PowerOn).to(on))
//!     .transition(on, Transition::on(Kind::PowerOff).to(off));
//! let graph = builder.build()?;
//!
//! let mut fsm = StateMachine::start(&graph, off, error);
//! assert_eq!(fsm.handle_event(&Input::PowerOn), Outcome::StateChanged);
//! assert_eq!(fsm.current_data(), Some(&"on"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

mod builder;
mod error;
mod fsm;
mod graph;

#[cfg(feature = "tokio-integration")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-integration")))]
mod driver;

pub use builder::GraphBuilder;
pub use error::{Error, Result};
pub use fsm::{Outcome, StateMachine};
pub use graph::{
    ActionFn, Ancestors, Event, Guard, GuardFn, State, StateActionFn, StateGraph, StateId,
    Transition,
};

#[cfg(feature = "tokio-integration")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-integration")))]
pub use async_trait::async_trait;

#[cfg(feature = "tokio-integration")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-integration")))]
pub use driver::{Driver, EventSource, RunSummary, StopReason};

#[cfg(feature = "tokio-integration")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-integration")))]
pub use tokio::time::Duration;

pub mod prelude {
    //! Prelude module for convenient imports
    pub use crate::{
        Error, Event, GraphBuilder, Outcome, Result, StateGraph, StateId, StateMachine,
        Transition,
    };
    #[cfg(feature = "tokio-integration")]
    pub use crate::{Driver, EventSource};
}
