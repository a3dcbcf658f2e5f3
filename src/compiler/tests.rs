use super::{ActionRegistry, ActionSchema, CompileErrorCode, Compiler};
use crate::runtime::{Context, ErrorCode, Machine, MessageBus, TickResult, UNINITIALIZED};
use crate::{CompilerOptions, compile};

const COUNTER: &str = "@machine a -> b\n@state b\n@run\nincrement";

/// Built-ins plus `increment`, which bumps the context counter and yields.
fn registry() -> ActionRegistry<u32> {
    let mut registry = ActionRegistry::with_builtins(&CompilerOptions::default()).unwrap();
    registry
        .register(ActionSchema::from_fn("increment", |ctx: &mut Context<u32>| {
            ctx.data += 1;
            TickResult::Yield
        }))
        .unwrap();
    registry
}

fn counter_machine() -> Machine<u32> {
    compile(COUNTER, &registry()).unwrap()
}

#[test]
fn first_tick_enters_second_tick_runs() {
    let machine = counter_machine();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);
    assert_eq!(ctx.exec_state().state_id, 0);
    assert_eq!(ctx.data, 0);

    machine.tick(&mut ctx);
    assert_eq!(ctx.data, 1);
    assert_eq!(ctx.exec_state().action_index, 0);
    assert_eq!(ctx.last_error(), None);
}

#[test]
fn contexts_share_a_machine_independently() {
    let machine = counter_machine();
    let mut first = Context::new(0);
    let mut second = Context::new(0);

    for _ in 0..2 {
        machine.tick(&mut first);
        machine.tick(&mut second);
    }

    assert_eq!(first.data, 1);
    assert_eq!(second.data, 1);
}

#[test]
fn contexts_on_separate_threads() {
    let machine = counter_machine();

    let counts: Vec<u32> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u32)
            .map(|n| {
                let machine = &machine;
                scope.spawn(move || {
                    let mut ctx = Context::new(0);
                    for _ in 0..=n + 1 {
                        machine.tick(&mut ctx);
                    }
                    ctx.data
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counts, vec![1, 2, 3, 4]);
}

#[test]
fn compiling_is_deterministic() {
    let source = "@machine m -> a\n@state a\n@enter\nlog 'in'\n@run\nincrement\n-> b\n@on\n'x': -> b\n'y': done\n@state b";
    let registry = registry();

    let first = compile(source, &registry).unwrap();
    let second = compile(source, &registry).unwrap();
    assert_eq!(format!("{first:?}"), format!("{second:?}"));

    let mut a = Context::new(0);
    let mut b = Context::new(0);
    for _ in 0..3 {
        first.tick(&mut a);
        second.tick(&mut b);
        assert_eq!(a.exec_state(), b.exec_state());
        assert_eq!(a.data, b.data);
    }
}

#[test]
fn done_chain_runs_to_the_end_in_one_tick() {
    let machine = compile("@machine m -> a\n@state a\n@run\ndone\ndone\ndone\ndone", &registry()).unwrap();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);
    machine.tick(&mut ctx);

    assert_eq!(ctx.exec_state().action_index, 4);
}

#[test]
fn loop_restarts_the_run_section() {
    let machine = compile("@machine m -> a\n@state a\n@run\nincrement\nloop", &registry()).unwrap();
    let mut ctx = Context::new(0);
    machine.tick(&mut ctx);

    // `increment` yields, so `loop` is never reached.
    machine.tick(&mut ctx);
    assert_eq!((ctx.data, ctx.exec_state().action_index), (1, 0));

    let machine = compile("@machine m -> a\n@state a\n@run\ndone\nloop", &registry()).unwrap();
    let mut ctx = Context::new(0);
    machine.tick(&mut ctx);
    machine.tick(&mut ctx);
    assert_eq!(ctx.exec_state().action_index, 0);
}

#[test]
fn transitions_run_exit_then_enter() {
    let mut registry = registry();
    registry
        .register(ActionSchema::from_fn("mark", |ctx: &mut Context<u32>| {
            ctx.data = ctx.data * 10 + ctx.exec_state().state_id as u32 + 1;
            TickResult::Done
        }))
        .unwrap();
    let source = "@machine m -> first\n@state first\n@exit\nmark\n@run\n-> second\n@state second\n@enter\nmark";
    let machine = compile(source, &registry).unwrap();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);
    assert_eq!(ctx.data, 0);
    machine.tick(&mut ctx);

    // exit ran while still in `first` (id 0), enter ran in `second` (id 1)
    assert_eq!(ctx.data, 12);
    assert_eq!(ctx.exec_state().state_id, 1);
}

#[test]
fn enter_section_that_yields_is_recoverable() {
    let machine = compile("@machine m -> a\n@state a\n@enter\nyield\n@run\nincrement", &registry()).unwrap();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);
    assert_eq!(ctx.last_error(), Some(ErrorCode::EnterActionDidNotReturnDone));
    assert_eq!(ctx.exec_state().state_id, 0);

    machine.tick(&mut ctx);
    assert_eq!(ctx.last_error(), None);
    assert_eq!(ctx.data, 1);
}

#[test]
fn machine_action_must_transition() {
    let machine = compile("@machine m yield\n@state a", &registry()).unwrap();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);

    let err = ctx.last_error().unwrap();
    assert_eq!(err, ErrorCode::MachineActionMustReturnTransition);
    assert!(err.is_fatal());
    assert_eq!(ctx.exec_state().state_id, UNINITIALIZED);
}

#[test]
fn messages_flow_through_the_bus() {
    let source = "@machine guard -> idle\n@state idle\n@run\nincrement\n@on\n'seen': -> chase\n'noise': done\n@state chase";
    let machine = compile(source, &registry()).unwrap();
    let mut contexts = vec![Context::new(0), Context::new(0)];
    let mut bus = MessageBus::new(4);

    for ctx in &mut contexts {
        machine.tick(ctx);
    }
    bus.enqueue("noise", 0, None).unwrap();
    bus.enqueue("seen", 1, None).unwrap();
    bus.enqueue("unknown", 0, None).unwrap();

    while let Some(envelope) = bus.dequeue_first() {
        let recipient = envelope.recipient.unwrap();
        machine.send_message(&mut contexts[recipient], envelope);
        envelope.recycle();
    }

    assert!(bus.is_empty());
    assert_eq!(contexts[0].exec_state().state_id, 0);
    assert_eq!(contexts[1].exec_state().state_id, 1);
    assert!(contexts.iter().all(|c| c.last_error().is_none()));
}

#[test]
fn compiler_reuses_buffers_across_scripts() {
    let mut compiler = Compiler::with_builtins(CompilerOptions::default()).unwrap();
    compiler
        .registry_mut()
        .register(ActionSchema::from_fn("increment", |ctx: &mut Context<u32>| {
            ctx.data += 1;
            TickResult::Yield
        }))
        .unwrap();

    let counter = compiler.compile(COUNTER).unwrap();
    assert!(compiler.compile("@machine broken -> nowhere\n@state b").is_err());
    let run = compiler.compile_with_metrics("@machine m -> x\n@state x\n@state y").unwrap();

    assert_eq!(counter.state_count(), 1);
    assert_eq!(run.machine.state_count(), 2);
    assert_eq!(run.metrics.parse.produced, 2);
    assert_eq!(run.metrics.resolve.produced, 1);
}

#[test]
fn error_codes_and_lines() {
    let cases: Vec<(&str, CompileErrorCode, usize)> = vec![
        ("@machine m -> a\n@state a\n\n@run\n-> nowhere", CompileErrorCode::StateNotFoundForTransition, 5),
        ("@machine m -> A\n@state a\n@state b\n@run\nfly", CompileErrorCode::ActionNotFound, 5),
        ("@machine m -> a\n@state a\n@run\n&", CompileErrorCode::LexerStuck, 4),
        ("@machine\n", CompileErrorCode::SyntaxError, 1),
        ("@machine m -> a\n@state a\n@state a", CompileErrorCode::DuplicateState, 3),
        ("@machine m -> a\n@state a\n@on\n'x': done\n@on", CompileErrorCode::DuplicateSection, 5),
        ("@machine m -> a\n@state a\n@on\n'x': done\n'x': yield", CompileErrorCode::DuplicateMessage, 5),
        ("@machine m -> a\n@state a\n@run\nlog message -> a", CompileErrorCode::PropertyKindMismatch, 4),
        ("@machine m -> a\n@state a\n@run\nlog level: 3", CompileErrorCode::PropertyNotFound, 4),
        ("@machine m -> a\n@state a\n@run\nyield 3", CompileErrorCode::NoDefaultProperty, 4),
        ("@machine m -> a\n@state a\n@run\nincrement\ngoto", CompileErrorCode::ActionBindFailed, 5),
    ];

    let registry = registry();
    for (source, code, line) in cases {
        let err = compile(source, &registry).unwrap_err();
        assert_eq!(err.code(), code, "{source:?}: {err}");
        assert_eq!(err.line(), Some(line), "{source:?}: {err}");
    }
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let source = "\n# guard behaviour\n\n@machine guard -> idle   # start idle\n\n@state idle\n  @run\n    increment  # count\n\n";
    let machine = compile(source, &registry()).unwrap();
    let mut ctx = Context::new(0);

    machine.tick(&mut ctx);
    machine.tick(&mut ctx);

    assert_eq!(ctx.data, 1);
}
