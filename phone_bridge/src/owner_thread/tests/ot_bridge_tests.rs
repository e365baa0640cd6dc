// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Thread-level tests for the owner loop, the dispatcher and the completion adapter.
//!
//! - **Group A**: [`AsyncCompletionAdapter`] and [`OwnerLoopState`] driven directly,
//!   no threads.
//! - **Group B**: [`OwnerLoop`] with a real owner thread and real caller threads.

use super::super::*;
use crate::{BridgeError, LivenessState};
use pretty_assertions::assert_eq;
use std::{sync::{mpsc, Arc, Barrier, Mutex, OnceLock},
          thread,
          time::{Duration, Instant}};

/// Bound for anything that is expected to finish promptly.
const PROMPT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestOp {
    /// Returns `arg * 10`.
    Echo,
    /// Fire-and-forget: pushes `arg` onto the shared log.
    Append,
    /// Returns a snapshot of the shared log.
    Read,
    /// Initiated. Behavior picked by `arg`, see [`FetchMode`].
    FetchList,
    /// Initiated. Keeps the handle and never delivers.
    Hold,
    /// Initiated. Drops the handle without delivering.
    Discard,
    /// Calls back into the dispatcher from the owner thread.
    ReenterSync,
    /// Enqueues `Append(99)` from the owner thread.
    ReenterAsync,
    /// Reports which thread it ran on.
    WhereAmI,
    PanicNow,
}

impl OpCode for TestOp {
    fn mode(self) -> OpMode {
        match self {
            TestOp::FetchList | TestOp::Hold | TestOp::Discard => OpMode::Initiate,
            _ => OpMode::Execute,
        }
    }
}

struct FetchMode;

impl FetchMode {
    const SUCCEED_LATER: u64 = 0;
    const FAIL_LATER: u64 = 1;
    const EMPTY_LATER: u64 = 2;
    const SUCCEED_INLINE: u64 = 3;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TestOutput {
    Num(u64),
    List(Vec<u64>),
    Flag(bool),
    Thread(thread::ThreadId, Option<String>),
}

type TestDispatcher = RequestDispatcher<TestResource>;

struct TestResource {
    log: Arc<Mutex<Vec<u64>>>,
    held: Vec<CompletionHandle<TestResource>>,
    reentry: Arc<OnceLock<TestDispatcher>>,
}

impl TestResource {
    fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(vec![])),
            held: vec![],
            reentry: Arc::new(OnceLock::new()),
        }
    }
}

impl OwnedResource for TestResource {
    type Op = TestOp;
    type Arg = u64;
    type Output = TestOutput;

    fn execute(&mut self, op: TestOp, arg: &u64) -> TestOutput {
        match op {
            TestOp::Echo => TestOutput::Num(arg * 10),
            TestOp::Read => TestOutput::List(self.log.lock().unwrap().clone()),
            TestOp::ReenterSync => {
                let dispatcher = self.reentry.get().expect("reentry dispatcher not set");
                let started = Instant::now();
                let result = dispatcher.call_sync(TestOp::Echo, 1);
                TestOutput::Flag(
                    matches!(result, Err(BridgeError::WouldDeadlock { .. }))
                        && started.elapsed() < PROMPT,
                )
            }
            TestOp::ReenterAsync => {
                let dispatcher = self.reentry.get().expect("reentry dispatcher not set");
                TestOutput::Flag(dispatcher.call_async(TestOp::Append, 99).is_ok())
            }
            TestOp::WhereAmI => {
                let current = thread::current();
                TestOutput::Thread(current.id(), current.name().map(str::to_string))
            }
            TestOp::PanicNow => panic!("TestResource: deliberate panic for testing"),
            TestOp::Append | TestOp::FetchList | TestOp::Hold | TestOp::Discard => {
                unreachable!("{op:?} is not executed synchronously")
            }
        }
    }

    fn initiate(&mut self, op: TestOp, arg: &u64, handle: CompletionHandle<Self>) {
        match (op, *arg) {
            (TestOp::Hold, _) => self.held.push(handle),
            (TestOp::Discard, _) => drop(handle),
            (TestOp::FetchList, FetchMode::SUCCEED_INLINE) => {
                handle.succeed(TestOutput::List(vec![7]));
            }
            (TestOp::FetchList, mode) => {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    match mode {
                        FetchMode::SUCCEED_LATER => {
                            handle.succeed(TestOutput::List(vec![1, 2, 3]));
                        }
                        FetchMode::FAIL_LATER => handle.fail("radio not available"),
                        FetchMode::EMPTY_LATER => handle.deliver(AsyncOutcome::Success(None)),
                        _ => unreachable!(),
                    }
                });
            }
            _ => unreachable!("{op:?} is not initiated"),
        }
    }

    fn fire_and_forget(&mut self, op: TestOp, arg: u64) {
        if op == TestOp::Append {
            self.log.lock().unwrap().push(arg);
        }
    }

    fn fallback_output(_op: TestOp) -> TestOutput { TestOutput::List(vec![]) }
}

fn spawn_loop() -> (OwnerLoop<TestResource>, Arc<Mutex<Vec<u64>>>) {
    let resource = TestResource::new();
    let log = Arc::clone(&resource.log);
    let reentry = Arc::clone(&resource.reentry);
    let owner_loop = OwnerLoop::spawn(resource, OwnerLoopConfig::default()).unwrap();
    reentry.set(owner_loop.dispatcher()).unwrap();
    (owner_loop, log)
}

/// Runs `call_sync` on a helper thread and returns a receiver for its result.
fn call_on_helper_thread(
    dispatcher: TestDispatcher,
    op: TestOp,
    arg: u64,
) -> mpsc::Receiver<Result<TestOutput, BridgeError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        drop(tx.send(dispatcher.call_sync(op, arg)));
    });
    rx
}

// ─── Group A: no threads ────────────────────────────────────────────────────────

#[test]
fn adapter_delivers_payload_to_parked_request() {
    let mut adapter = AsyncCompletionAdapter::<TestResource>::new();
    let request = PendingRequest::new(0);
    let waiter = request.waiter();
    let token = adapter.mint_token();
    adapter.park(token, TestOp::FetchList, request);
    assert_eq!(adapter.outstanding(), 1);

    let resolution =
        adapter.resolve(token, AsyncOutcome::Success(Some(TestOutput::List(vec![4]))));

    assert_eq!(resolution, Resolution::Delivered);
    assert_eq!(adapter.outstanding(), 0);
    assert_eq!(waiter.wait().unwrap(), TestOutput::List(vec![4]));
}

#[test]
fn adapter_uses_fallback_for_failure_and_missing_payload() {
    let mut adapter = AsyncCompletionAdapter::<TestResource>::new();
    for outcome in [
        AsyncOutcome::Failure("boom".to_string()),
        AsyncOutcome::Success(None),
    ] {
        let request = PendingRequest::new(0);
        let waiter = request.waiter();
        let token = adapter.mint_token();
        adapter.park(token, TestOp::FetchList, request);
        assert_eq!(adapter.resolve(token, outcome), Resolution::Fallback);
        assert_eq!(waiter.wait().unwrap(), TestOutput::List(vec![]));
    }
}

#[test]
fn adapter_ignores_unknown_and_repeated_tokens() {
    let mut adapter = AsyncCompletionAdapter::<TestResource>::new();
    let never_parked = adapter.mint_token();
    assert_eq!(
        adapter.resolve(never_parked, AsyncOutcome::Success(None)),
        Resolution::UnknownToken
    );

    let token = adapter.mint_token();
    adapter.park(token, TestOp::FetchList, PendingRequest::new(0));
    assert_eq!(
        adapter.resolve(token, AsyncOutcome::Success(None)),
        Resolution::Fallback
    );
    assert_eq!(
        adapter.resolve(token, AsyncOutcome::Success(None)),
        Resolution::UnknownToken
    );
}

#[test]
fn tokens_are_never_reused() {
    let mut adapter = AsyncCompletionAdapter::<TestResource>::new();
    let first = adapter.mint_token();
    let second = adapter.mint_token();
    assert!(second > first);
}

#[test]
fn loop_state_processes_commands_in_order_and_stops_on_shutdown() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut state = OwnerLoopState::new(TestResource::new(), tx.clone());

    for arg in [3, 1, 2] {
        tx.send(Command::FireAndForget {
            op: TestOp::Append,
            arg,
        })
        .unwrap();
    }
    let request = PendingRequest::new(0);
    let waiter = request.waiter();
    tx.send(Command::ExecuteAndReturn {
        op: TestOp::Read,
        request,
    })
    .unwrap();
    tx.send(Command::Shutdown).unwrap();

    let mut continuations = vec![];
    while let Ok(command) = rx.try_recv() {
        continuations.push(state.handle_command(command));
    }

    assert_eq!(continuations.last(), Some(&crate::Continuation::Stop));
    assert_eq!(waiter.wait().unwrap(), TestOutput::List(vec![3, 1, 2]));
    assert_eq!(*state.resource().log.lock().unwrap(), vec![3, 1, 2]);
}

#[test]
fn loop_state_parks_initiated_request_until_completion_arrives() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut state = OwnerLoopState::new(TestResource::new(), tx);

    let request = PendingRequest::new(FetchMode::SUCCEED_INLINE);
    let waiter = request.waiter();
    state.handle_command(Command::InitiateAsync {
        op: TestOp::FetchList,
        request,
    });
    assert_eq!(state.adapter().outstanding(), 1);
    assert!(!waiter.is_settled());

    // The inline delivery was queued behind the initiating command.
    let completion = rx.try_recv().unwrap();
    assert_eq!(completion.kind(), "AsyncCompleted");
    state.handle_command(completion);

    assert_eq!(state.adapter().outstanding(), 0);
    assert_eq!(waiter.wait().unwrap(), TestOutput::List(vec![7]));
}

#[test]
fn loop_state_resolves_request_whose_handle_was_dropped() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut state = OwnerLoopState::new(TestResource::new(), tx);

    let request = PendingRequest::new(0);
    let waiter = request.waiter();
    state.handle_command(Command::InitiateAsync {
        op: TestOp::Discard,
        request,
    });
    assert_eq!(state.adapter().outstanding(), 1);

    let completion = rx.try_recv().unwrap();
    assert!(matches!(
        completion,
        Command::AsyncCompleted {
            outcome: AsyncOutcome::Failure(ref reason),
            ..
        } if reason == HANDLE_DROPPED
    ));
    state.handle_command(completion);

    assert_eq!(state.adapter().outstanding(), 0);
    assert_eq!(waiter.wait().unwrap(), TestOutput::List(vec![]));
}

#[test]
fn fired_handle_sends_exactly_one_completion() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Command<TestResource>>();
    let mut adapter = AsyncCompletionAdapter::<TestResource>::new();
    let handle = CompletionHandle::new(adapter.mint_token(), tx);

    handle.succeed(TestOutput::Num(1));

    assert_eq!(rx.try_recv().unwrap().kind(), "AsyncCompleted");
    assert!(rx.try_recv().is_err());
}

// ─── Group B: real owner thread ─────────────────────────────────────────────────

#[test]
fn concurrent_callers_each_get_their_own_result() {
    const CALLERS: u64 = 16;
    const CALLS_PER_CALLER: u64 = 50;

    let (owner_loop, _log) = spawn_loop();
    let barrier = Arc::new(Barrier::new(CALLERS as usize));

    let handles: Vec<_> = (0..CALLERS)
        .map(|caller| {
            let dispatcher = owner_loop.dispatcher();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for call in 0..CALLS_PER_CALLER {
                    let arg = caller * 1_000 + call;
                    let output = dispatcher.call_sync(TestOp::Echo, arg).unwrap();
                    assert_eq!(output, TestOutput::Num(arg * 10));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    owner_loop.shutdown().unwrap();
}

#[test]
fn resource_runs_only_on_the_named_owner_thread() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    let TestOutput::Thread(thread_id, name) =
        dispatcher.call_sync(TestOp::WhereAmI, 0).unwrap()
    else {
        panic!("unexpected output");
    };

    assert_eq!(thread_id, owner_loop.owner_thread_id());
    assert_ne!(thread_id, thread::current().id());
    let name = name.unwrap();
    assert!(name.starts_with("owner-loop-gen-"), "{name}");
    assert!(!dispatcher.is_owner_thread());
}

#[test]
fn call_sync_from_owner_thread_fails_fast_with_would_deadlock() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    let output = dispatcher
        .call_sync_with_deadline(TestOp::ReenterSync, 0, PROMPT)
        .unwrap();

    assert_eq!(output, TestOutput::Flag(true));
    // The loop is still healthy afterwards.
    assert_eq!(
        dispatcher.call_sync(TestOp::Echo, 4).unwrap(),
        TestOutput::Num(40)
    );
}

#[test]
fn call_async_from_owner_thread_is_allowed_and_runs_later() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    dispatcher.call_async(TestOp::Append, 1).unwrap();
    assert_eq!(
        dispatcher.call_sync(TestOp::ReenterAsync, 0).unwrap(),
        TestOutput::Flag(true)
    );
    dispatcher.call_async(TestOp::Append, 2).unwrap();

    // 99 was enqueued by the owner thread while it ran ReenterAsync, which is before
    // this caller enqueued 2.
    assert_eq!(
        dispatcher.call_sync(TestOp::Read, 0).unwrap(),
        TestOutput::List(vec![1, 99, 2])
    );
}

#[test]
fn commands_from_two_threads_run_in_submission_order() {
    let (owner_loop, _log) = spawn_loop();
    let (first_done_tx, first_done_rx) = mpsc::channel();

    let first = {
        let dispatcher = owner_loop.dispatcher();
        thread::spawn(move || {
            for arg in 1..=3 {
                dispatcher.call_async(TestOp::Append, arg).unwrap();
            }
            first_done_tx.send(()).unwrap();
        })
    };
    let second = {
        let dispatcher = owner_loop.dispatcher();
        thread::spawn(move || {
            first_done_rx.recv().unwrap();
            for arg in 4..=6 {
                dispatcher.call_async(TestOp::Append, arg).unwrap();
            }
        })
    };
    first.join().unwrap();
    second.join().unwrap();

    assert_eq!(
        owner_loop.dispatcher().call_sync(TestOp::Read, 0).unwrap(),
        TestOutput::List(vec![1, 2, 3, 4, 5, 6])
    );
}

#[test]
fn initiated_operation_completes_through_callback() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    assert_eq!(
        dispatcher
            .call_sync(TestOp::FetchList, FetchMode::SUCCEED_LATER)
            .unwrap(),
        TestOutput::List(vec![1, 2, 3])
    );
    assert_eq!(
        dispatcher
            .call_sync(TestOp::FetchList, FetchMode::SUCCEED_INLINE)
            .unwrap(),
        TestOutput::List(vec![7])
    );
}

#[test]
fn failed_or_empty_callback_resolves_with_fallback_in_bounded_time() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    for mode in [FetchMode::FAIL_LATER, FetchMode::EMPTY_LATER] {
        let output = dispatcher
            .call_sync_with_deadline(TestOp::FetchList, mode, PROMPT)
            .unwrap();
        assert_eq!(output, TestOutput::List(vec![]));
    }
}

#[test]
fn never_fired_callback_blocks_caller_until_loop_is_torn_down() {
    let (owner_loop, _log) = spawn_loop();
    let rx = call_on_helper_thread(owner_loop.dispatcher(), TestOp::Hold, 0);

    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(200)),
        Err(mpsc::RecvTimeoutError::Timeout)
    ));

    // Tearing the loop down drops the parked request, which releases the caller.
    owner_loop.shutdown().unwrap();
    assert!(matches!(
        rx.recv_timeout(PROMPT).unwrap(),
        Err(BridgeError::LoopUnavailable)
    ));
}

#[test]
fn dropped_handle_resolves_caller_with_fallback_promptly() {
    let (owner_loop, _log) = spawn_loop();
    let rx = call_on_helper_thread(owner_loop.dispatcher(), TestOp::Discard, 0);

    assert_eq!(
        rx.recv_timeout(PROMPT).unwrap().unwrap(),
        TestOutput::List(vec![])
    );
    // The loop is still serving.
    assert_eq!(
        owner_loop.dispatcher().call_sync(TestOp::Echo, 4).unwrap(),
        TestOutput::Num(40)
    );
}

#[test]
fn deadline_detaches_caller_without_hurting_the_loop() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    let started = Instant::now();
    let result = dispatcher.call_sync_with_deadline(TestOp::Hold, 0, Duration::from_millis(50));

    assert!(matches!(
        result,
        Err(BridgeError::DeadlineExceeded { ref op, .. }) if op == "Hold"
    ));
    assert!(started.elapsed() < PROMPT);
    assert_eq!(owner_loop.liveness(), LivenessState::Running);
    assert_eq!(
        dispatcher.call_sync(TestOp::Echo, 2).unwrap(),
        TestOutput::Num(20)
    );
}

#[test]
fn default_deadline_from_config_applies_to_call_sync() {
    let config = OwnerLoopConfig::default()
        .with_thread_name("deadline-loop")
        .with_default_deadline(Duration::from_millis(50));
    let owner_loop = OwnerLoop::spawn(TestResource::new(), config).unwrap();
    let dispatcher = owner_loop.dispatcher();

    assert!(matches!(
        dispatcher.call_sync(TestOp::Hold, 0),
        Err(BridgeError::DeadlineExceeded { .. })
    ));
    assert_eq!(
        dispatcher.call_sync(TestOp::Echo, 3).unwrap(),
        TestOutput::Num(30)
    );
}

#[test]
fn shutdown_runs_everything_queued_before_it() {
    let (owner_loop, log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();
    for arg in 1..=5 {
        dispatcher.call_async(TestOp::Append, arg).unwrap();
    }

    owner_loop.shutdown().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn calls_after_shutdown_fail_with_loop_unavailable() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();
    owner_loop.shutdown().unwrap();

    assert!(matches!(
        dispatcher.call_sync(TestOp::Echo, 1),
        Err(BridgeError::LoopUnavailable)
    ));
    assert!(matches!(
        dispatcher.call_async(TestOp::Append, 1),
        Err(BridgeError::LoopUnavailable)
    ));
}

#[test]
fn dropping_the_loop_handle_stops_the_thread() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();
    drop(owner_loop);

    assert!(matches!(
        dispatcher.call_sync(TestOp::Echo, 1),
        Err(BridgeError::LoopUnavailable)
    ));
}

#[test]
fn panic_in_resource_releases_caller_and_marks_loop_terminated() {
    let (owner_loop, _log) = spawn_loop();
    let dispatcher = owner_loop.dispatcher();

    assert!(matches!(
        dispatcher.call_sync(TestOp::PanicNow, 0),
        Err(BridgeError::LoopUnavailable)
    ));

    let started = Instant::now();
    while owner_loop.liveness() == LivenessState::Running && started.elapsed() < PROMPT {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(owner_loop.liveness(), LivenessState::Terminated);
    assert!(matches!(
        owner_loop.shutdown(),
        Err(BridgeError::LoopUnavailable)
    ));
}

#[test]
fn each_loop_gets_a_new_generation() {
    let (first, _) = spawn_loop();
    let (second, _) = spawn_loop();
    assert_ne!(first.generation(), second.generation());
}
