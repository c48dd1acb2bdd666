//! Keyboard parser example
//!
//! Reads characters from stdin and recognises the words "hi" and "ha", each
//! terminated by a newline:
//! - idle: waiting for 'h'
//! - h: got 'h', waiting for 'a' or 'i'
//! - a / i: waiting for the newline
//!
//! All four states are children of a group state whose single catch-all
//! transition sends any unrecognised character back to idle, so the children
//! do not need to repeat it.
//!
//! Run with `RUST_LOG=hsm_engine=debug` to see the engine's own logging.

use hsm_engine::{Event, Outcome, StateGraph, StateMachine, Transition};
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Keyboard,
}

#[derive(Debug)]
struct Keyboard(char);

impl Event for Keyboard {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        Kind::Keyboard
    }
}

fn is_char(expected: &char, key: &Keyboard) -> bool {
    key.0 == *expected
}

fn announce_enter(name: &&str, _: &Keyboard) {
    println!("Entering {name} state");
}

fn announce_exit(name: &&str, _: &Keyboard) {
    println!("Exiting {name} state");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut builder = StateGraph::<Keyboard, &str, char>::builder();
    let group = builder.state("group");
    let idle = builder.state("idle");
    let h = builder.state("H");
    let i = builder.state("I");
    let a = builder.state("A");
    let error = builder.state("error");

    for state in [group, idle, h, i, a] {
        builder
            .on_entry(state, announce_enter)
            .on_exit(state, announce_exit);
    }
    for child in [idle, h, i, a] {
        builder.parent(child, group);
    }

    builder
        .on_entry(h, |name, key| {
            announce_enter(name, key);
            println!("parsed: {}", key.0);
        })
        .on_entry(error, |_, _| println!("ENTERED ERROR STATE!"))
        .transition(
            group,
            Transition::on(Kind::Keyboard)
                .action(|_, key: &Keyboard, _| {
                    println!("unrecognised character: {:?}", key.0)
                })
                .to(idle),
        )
        .transition(idle, Transition::on(Kind::Keyboard).when('h', is_char).to(h))
        .transition(h, Transition::on(Kind::Keyboard).when('a', is_char).to(a))
        .transition(h, Transition::on(Kind::Keyboard).when('i', is_char).to(i))
        .transition(
            i,
            Transition::on(Kind::Keyboard)
                .when('\n', is_char)
                .action(|_, _, _| println!("Hi!"))
                .to(idle),
        )
        .transition(
            a,
            Transition::on(Kind::Keyboard)
                .when('\n', is_char)
                .action(|_, _, _| println!("Ha-ha"))
                .to(idle),
        );

    let graph = builder.build()?;
    graph.validate(error)?;

    let mut fsm = StateMachine::start(&graph, idle, error);
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;

    for ch in input.chars() {
        if fsm.handle_event(&Keyboard(ch)) == Outcome::ErrorStateReached {
            break;
        }
    }

    Ok(())
}
