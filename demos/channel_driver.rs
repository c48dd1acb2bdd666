//! Channel-driven device example
//!
//! A producer task sends commands over a tokio channel while the state
//! machine is pumped by a [`Driver`]:
//! - off -> powered (composite, enters standby)
//! - standby <-> active, both children of powered
//! - powered handles PowerOff for both children
//! - Shutdown from off reaches the final `halted` state
//!
//! Required features: `tokio-integration`

use hsm_engine::{Driver, Duration, Event, StateGraph, StateMachine, StopReason, Transition};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    PowerOn,
    PowerOff,
    Activate,
    Deactivate,
    Shutdown,
}

#[derive(Debug)]
enum Command {
    PowerOn,
    PowerOff,
    Activate { level: u8 },
    Deactivate,
    Shutdown,
}

impl Event for Command {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        match self {
            Command::PowerOn => Kind::PowerOn,
            Command::PowerOff => Kind::PowerOff,
            Command::Activate { .. } => Kind::Activate,
            Command::Deactivate => Kind::Deactivate,
            Command::Shutdown => Kind::Shutdown,
        }
    }
}

fn level_at_least(min: &u8, command: &Command) -> bool {
    matches!(command, Command::Activate { level } if level >= min)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("hsm_engine=debug"))
        .init();

    let mut builder = StateGraph::<Command, &str, u8>::builder();
    let off = builder.state("off");
    let powered = builder.state("powered");
    let standby = builder.state("standby");
    let active = builder.state("active");
    let halted = builder.state("halted");
    let error = builder.state("error");

    builder
        .parent(standby, powered)
        .parent(active, powered)
        .entry_state(powered, standby)
        .on_entry(active, |_, command| println!("active after {command:?}"))
        .on_exit(active, |_, _| println!("leaving active"))
        .transition(off, Transition::on(Kind::PowerOn).to(powered))
        .transition(off, Transition::on(Kind::Shutdown).to(halted))
        .transition(powered, Transition::on(Kind::PowerOff).to(off))
        .transition(
            standby,
            Transition::on(Kind::Activate)
                .when(10, level_at_least)
                .action(|old, _, new| println!("{old} -> {new}"))
                .to(active),
        )
        .transition(active, Transition::on(Kind::Deactivate).to(standby));
    let graph = builder.build()?;
    graph.validate(error)?;

    let (tx, mut rx) = mpsc::channel(16);
    let producer = tokio::spawn(async move {
        let commands = [
            Command::PowerOn,
            Command::Activate { level: 3 },
            Command::Activate { level: 42 },
            Command::Deactivate,
            Command::PowerOff,
            Command::Shutdown,
        ];
        for command in commands {
            if tx.send(command).await.is_err() {
                break;
            }
        }
    });

    let mut fsm = StateMachine::start(&graph, off, error);
    let summary = Driver::new()
        .idle_timeout(Duration::from_secs(1))
        .run(&mut fsm, &mut rx)
        .await?;
    producer.await?;

    println!(
        "handled {} events, ended in {:?} ({:?})",
        summary.events,
        fsm.current_data(),
        summary.reason
    );
    assert_eq!(summary.reason, StopReason::MachineStopped);
    Ok(())
}
