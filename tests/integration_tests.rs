use hsm_engine::{Event, Outcome, StateGraph, StateId, StateMachine, Transition};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// --- Keyboard machine -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Key,
    Power,
}

#[derive(Debug, Clone)]
enum KeyEvent {
    Key(char),
    Power,
}

impl Event for KeyEvent {
    type Kind = KeyKind;

    fn kind(&self) -> KeyKind {
        match self {
            KeyEvent::Key(_) => KeyKind::Key,
            KeyEvent::Power => KeyKind::Power,
        }
    }
}

fn is_char(expected: &char, event: &KeyEvent) -> bool {
    matches!(event, KeyEvent::Key(c) if c == expected)
}

struct Keyboard {
    graph: StateGraph<KeyEvent, &'static str, char>,
    said: Arc<Mutex<Vec<&'static str>>>,
    idle: StateId,
    h: StateId,
    a: StateId,
    i: StateId,
    error: StateId,
}

fn create_keyboard(with_group: bool) -> Keyboard {
    let said = Arc::new(Mutex::new(Vec::new()));
    let mut builder = StateGraph::<KeyEvent, &'static str, char>::builder();
    let group = builder.state("group");
    let idle = builder.state("idle");
    let h = builder.state("h");
    let a = builder.state("a");
    let i = builder.state("i");
    let error = builder.state("error");

    if with_group {
        for child in [idle, h, a, i] {
            builder.parent(child, group);
        }
        builder.transition(group, Transition::on(KeyKind::Key).to(idle));
    }

    let ha = Arc::clone(&said);
    let hi = Arc::clone(&said);
    let err = Arc::clone(&said);
    builder
        .transition(idle, Transition::on(KeyKind::Key).when('h', is_char).to(h))
        .transition(h, Transition::on(KeyKind::Key).when('a', is_char).to(a))
        .transition(h, Transition::on(KeyKind::Key).when('i', is_char).to(i))
        .transition(
            a,
            Transition::on(KeyKind::Key)
                .when('\n', is_char)
                .action(move |_, _, _| ha.lock().unwrap().push("ha"))
                .to(idle),
        )
        .transition(
            i,
            Transition::on(KeyKind::Key)
                .when('\n', is_char)
                .action(move |_, _, _| hi.lock().unwrap().push("hi"))
                .to(idle),
        )
        .transition(idle, Transition::on(KeyKind::Power))
        .on_entry(error, move |_, _| err.lock().unwrap().push("error"));

    Keyboard {
        graph: builder.build().unwrap(),
        said,
        idle,
        h,
        a,
        i,
        error,
    }
}

#[test]
fn test_round_trip_scenario() {
    init_tracing();
    let kb = create_keyboard(false);
    let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);

    let outcomes: Vec<Outcome> = ['h', 'a', '\n']
        .into_iter()
        .map(|c| fsm.handle_event(&KeyEvent::Key(c)))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            Outcome::StateChanged,
            Outcome::StateChanged,
            Outcome::StateChanged
        ]
    );
    assert_eq!(fsm.current_state(), Some(kb.idle));
    assert_eq!(fsm.previous_state(), Some(kb.a));
    assert_eq!(*kb.said.lock().unwrap(), vec!["ha"]);
}

#[test]
fn test_state_sequence_through_hi() {
    let kb = create_keyboard(false);
    let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);

    fsm.handle_event(&KeyEvent::Key('h'));
    assert_eq!(fsm.current_state(), Some(kb.h));
    fsm.handle_event(&KeyEvent::Key('i'));
    assert_eq!(fsm.current_state(), Some(kb.i));
    fsm.handle_event(&KeyEvent::Key('\n'));
    assert_eq!(fsm.current_state(), Some(kb.idle));
    assert_eq!(*kb.said.lock().unwrap(), vec!["hi"]);
}

#[test]
fn test_unmatched_event_scenario() {
    let kb = create_keyboard(false);
    let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);

    assert_eq!(fsm.handle_event(&KeyEvent::Key('z')), Outcome::NoStateChange);
    assert_eq!(fsm.current_state(), Some(kb.idle));
    assert_eq!(fsm.previous_state(), None);
}

#[test]
fn test_group_catches_unrecognised_characters() {
    let kb = create_keyboard(true);
    let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);

    fsm.handle_event(&KeyEvent::Key('h'));
    assert_eq!(fsm.handle_event(&KeyEvent::Key('x')), Outcome::StateChanged);
    assert_eq!(fsm.current_state(), Some(kb.idle));

    // From idle the group's catch-all lands back on idle
    assert_eq!(fsm.handle_event(&KeyEvent::Key('x')), Outcome::LoopedToSelf);
}

#[test]
fn test_error_fallback_scenario() {
    init_tracing();
    let kb = create_keyboard(false);
    let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);

    assert_eq!(fsm.handle_event(&KeyEvent::Power), Outcome::ErrorStateReached);
    assert_eq!(fsm.current_state(), Some(kb.error));
    assert!(fsm.stopped());
    assert_eq!(*kb.said.lock().unwrap(), vec!["error"]);

    // Restart after the failure
    fsm.init(kb.idle, kb.error);
    assert!(!fsm.stopped());
    assert_eq!(fsm.handle_event(&KeyEvent::Key('h')), Outcome::StateChanged);
}

#[test]
fn test_untargeted_transition_action_sees_error_state() {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);

    let mut builder = StateGraph::<KeyEvent, &'static str, char>::builder();
    let idle = builder.state("idle");
    let error = builder.state("error");
    builder.transition(
        idle,
        Transition::on(KeyKind::Power).action(move |old: &&str, _, new: &&str| {
            record.lock().unwrap().push(format!("{old}->{new}"));
        }),
    );
    let graph = builder.build().unwrap();

    let mut fsm = StateMachine::start(&graph, idle, error);
    assert_eq!(fsm.handle_event(&KeyEvent::Power), Outcome::ErrorStateReached);
    assert_eq!(fsm.previous_state(), Some(idle));
    assert_eq!(*seen.lock().unwrap(), vec!["idle->error"]);
}

#[test]
fn test_graph_shared_across_threads() {
    let kb = Arc::new(create_keyboard(false));

    let handles: Vec<_> = ["ha", "hi"]
        .into_iter()
        .map(|word| {
            let kb = Arc::clone(&kb);
            std::thread::spawn(move || {
                let mut fsm = StateMachine::start(&kb.graph, kb.idle, kb.error);
                for c in word.chars().chain(['\n']) {
                    fsm.handle_event(&KeyEvent::Key(c));
                }
                fsm.current_state()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(kb.idle));
    }
    let mut said = kb.said.lock().unwrap().clone();
    said.sort();
    assert_eq!(said, vec!["ha", "hi"]);
}

// --- Nested composite machine ------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dummy;

#[derive(Debug)]
struct Step {
    input: char,
    expected: &'static str,
}

impl Event for Step {
    type Kind = Dummy;

    fn kind(&self) -> Dummy {
        Dummy
    }
}

fn input_is(expected: &char, step: &Step) -> bool {
    step.input == *expected
}

type Nested = StateGraph<Step, &'static str, char>;

// s9 (entry s4) contains s1 and s10; s10 (entry s9) contains s3 and s11;
// s11 (entry s5) contains s4 and s5. s2 and s6 are top level, s6 is final.
fn create_nested(log: &Arc<Mutex<Vec<String>>>) -> (Nested, StateId, StateId) {
    let mut builder = Nested::builder();
    let names = ["1", "2", "3", "4", "5", "6", "9", "10", "11", "E"];
    let ids: Vec<StateId> = names.iter().map(|name| builder.state(*name)).collect();
    let id = |name: &str| ids[names.iter().position(|n| *n == name).unwrap()];

    for &state in &ids {
        let enter = Arc::clone(log);
        let exit = Arc::clone(log);
        builder
            .on_entry(state, move |name, _| enter.lock().unwrap().push(format!("enter {name}")))
            .on_exit(state, move |name, _| exit.lock().unwrap().push(format!("exit {name}")));
    }

    builder
        .parent(id("1"), id("9"))
        .parent(id("3"), id("10"))
        .parent(id("4"), id("11"))
        .parent(id("5"), id("11"))
        .parent(id("10"), id("9"))
        .parent(id("11"), id("10"))
        .entry_state(id("9"), id("4"))
        .entry_state(id("10"), id("9"))
        .entry_state(id("11"), id("5"));

    let edges = [
        ("1", Some('d'), "3"),
        ("2", Some('b'), "1"),
        ("3", Some('e'), "11"),
        ("4", Some('h'), "5"),
        ("4", Some('j'), "9"),
        ("5", None, "10"),
        ("9", Some('a'), "3"),
        ("10", Some('f'), "2"),
        ("10", Some('i'), "6"),
        ("11", Some('g'), "2"),
    ];
    for (from, input, to) in edges {
        let check = Arc::clone(log);
        let mut transition: Transition<Step, &'static str, char> =
            Transition::on(Dummy).action(move |_, step: &Step, new| {
                if step.expected != *new {
                    check
                        .lock()
                        .unwrap()
                        .push(format!("unexpected {new} for '{}'", step.input));
                }
            });
        if let Some(c) = input {
            transition = transition.when(c, input_is);
        }
        builder.transition(id(from), transition.to(id(to)));
    }

    let initial = id("1");
    let error = id("E");
    (builder.build().unwrap(), initial, error)
}

#[test]
fn test_nested_composite_walk() {
    init_tracing();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (graph, initial, error) = create_nested(&log);
    assert!(graph.validate(error).is_ok());
    let mut fsm = StateMachine::start(&graph, initial, error);

    let steps = [
        ('d', "3"),
        ('e', "5"),
        ('*', "4"),
        ('j', "4"),
        ('g', "2"),
        ('b', "1"),
        ('d', "3"),
        ('e', "5"),
        ('k', "4"),
        ('h', "5"),
        ('*', "4"),
        ('f', "2"),
        ('b', "1"),
        ('a', "3"),
        ('f', "2"),
        ('b', "1"),
        ('d', "3"),
    ];

    let mut previous_expected = "";
    for (input, expected) in steps {
        let outcome = fsm.handle_event(&Step { input, expected });
        if expected == previous_expected {
            assert_eq!(outcome, Outcome::LoopedToSelf, "input '{input}'");
        } else {
            assert_eq!(outcome, Outcome::StateChanged, "input '{input}'");
        }
        assert_eq!(fsm.current_data(), Some(&expected), "input '{input}'");
        previous_expected = expected;
    }

    let outcome = fsm.handle_event(&Step {
        input: 'i',
        expected: "6",
    });
    assert_eq!(outcome, Outcome::FinalStateReached);
    assert!(fsm.stopped());

    let log = log.lock().unwrap();
    assert!(!log.iter().any(|line| line.starts_with("unexpected")), "{log:?}");
}

#[test]
fn test_nested_entry_only_enters_innermost() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (graph, initial, error) = create_nested(&log);
    let mut fsm = StateMachine::start(&graph, initial, error);

    // s1 -> s3 -> (s11 => s5) -> (s10 => s9 => s4)
    fsm.handle_event(&Step { input: 'd', expected: "3" });
    fsm.handle_event(&Step { input: 'e', expected: "5" });
    log.lock().unwrap().clear();

    fsm.handle_event(&Step { input: '*', expected: "4" });
    assert_eq!(*log.lock().unwrap(), vec!["exit 5", "enter 4"]);
}

#[test]
fn test_self_loop_through_composite_skips_entry_and_exit() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (graph, initial, error) = create_nested(&log);
    let mut fsm = StateMachine::start(&graph, initial, error);
    for (input, expected) in [('d', "3"), ('e', "5"), ('*', "4")] {
        fsm.handle_event(&Step { input, expected });
    }
    log.lock().unwrap().clear();

    // s4 'j' targets s9, whose entry state is s4 again
    assert_eq!(
        fsm.handle_event(&Step { input: 'j', expected: "4" }),
        Outcome::LoopedToSelf
    );
    assert!(log.lock().unwrap().is_empty());
}
