//! Structural invariants every trace must satisfy, checked over a program
//! that exercises the stack, both queues, timers, and async suspension.

use looplab::{replay, run, RunResult, RuntimeMode, Step};
use pretty_assertions::assert_eq;

const BUSY_PROGRAM: &str = r#"
    function work(tag) {
        console.log("work " + tag);
    }
    async function pipeline() {
        const first = await Promise.resolve("one");
        work(first);
        await Promise.resolve();
        return "done";
    }
    console.log("start");
    setTimeout(() => work("timeout"), 10);
    const interval = setInterval(() => {
        work("interval");
        clearInterval(interval);
    }, 5);
    queueMicrotask(() => work("micro"));
    pipeline().then((result) => console.log(result));
    console.log("end");
"#;

fn busy_trace(mode: RuntimeMode) -> RunResult {
    let result = run(BUSY_PROGRAM, mode);
    assert_eq!(result.errors, Vec::<String>::new());
    result
}

#[test]
fn every_push_has_a_matching_lifo_pop() {
    for mode in [RuntimeMode::Browser, RuntimeMode::Node] {
        let result = busy_trace(mode);
        let mut stack = Vec::new();
        for step in &result.steps {
            match &step.step {
                Step::PushStack { id, .. } => stack.push(*id),
                Step::PopStack { id } => {
                    let top = stack.pop().expect("POP_STACK with an empty stack");
                    assert_eq!(top, *id, "frames must pop in LIFO order");
                }
                _ => {}
            }
        }
        assert!(stack.is_empty(), "unbalanced frames: {stack:?}");
    }
}

#[test]
fn tasks_are_scheduled_before_dequeue_and_dequeued_before_execute() {
    for mode in [RuntimeMode::Browser, RuntimeMode::Node] {
        let result = busy_trace(mode);
        let mut scheduled = Vec::new();
        let mut dequeued = Vec::new();
        for step in &result.steps {
            match &step.step {
                Step::ScheduleMicrotask { id, .. } | Step::ScheduleMacrotask { id, .. } => {
                    scheduled.push(*id);
                }
                Step::DequeueMicrotask { id, .. } | Step::DequeueMacrotask { id, .. } => {
                    assert!(
                        scheduled.contains(id),
                        "task {id} dequeued without a schedule step"
                    );
                    dequeued.push(*id);
                }
                Step::ExecuteMicrotask { id, .. } | Step::ExecuteMacrotask { id, .. } => {
                    assert!(
                        dequeued.contains(id),
                        "task {id} executed without a dequeue step"
                    );
                }
                _ => {}
            }
        }
    }
}

#[test]
fn virtual_time_never_decreases() {
    for mode in [RuntimeMode::Browser, RuntimeMode::Node] {
        let result = busy_trace(mode);
        let mut last = 0;
        for step in &result.steps {
            assert!(
                step.timestamp_ms >= last,
                "timestamp went backwards: {} < {last}",
                step.timestamp_ms
            );
            last = step.timestamp_ms;
        }
    }
}

#[test]
fn browser_macrotasks_wait_for_an_empty_microtask_queue() {
    let result = busy_trace(RuntimeMode::Browser);
    let mut pending_microtasks = 0i64;
    for step in &result.steps {
        match &step.step {
            Step::ScheduleMicrotask { .. } => pending_microtasks += 1,
            Step::DequeueMicrotask { .. } => pending_microtasks -= 1,
            Step::ExecuteMacrotask { .. } => {
                assert_eq!(
                    pending_microtasks, 0,
                    "a macrotask ran while microtasks were queued"
                );
            }
            _ => {}
        }
    }
}

#[test]
fn cleared_timers_never_resolve() {
    let result = run(
        r#"
        const doomed = setTimeout(() => console.log("never"), 10);
        clearTimeout(doomed);
        setTimeout(() => console.log("kept"), 20);
        "#,
        RuntimeMode::Browser,
    );

    let registered: Vec<u64> = result
        .steps
        .iter()
        .filter_map(|step| match &step.step {
            Step::RegisterWebApi { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    let resolved: Vec<u64> = result
        .steps
        .iter()
        .filter_map(|step| match &step.step {
            Step::ResolveWebApi { id, .. } => Some(*id),
            _ => None,
        })
        .collect();

    assert_eq!(registered.len(), 2);
    // Only the second (kept) timer may resolve.
    assert_eq!(resolved, vec![registered[1]]);
    let output: Vec<String> = result.console.into_iter().map(|e| e.text).collect();
    assert_eq!(output, ["kept"]);
}

#[test]
fn identical_runs_produce_identical_traces() {
    for mode in [RuntimeMode::Browser, RuntimeMode::Node] {
        let first = run(BUSY_PROGRAM, mode);
        let second = run(BUSY_PROGRAM, mode);
        assert_eq!(first.steps, second.steps);
        assert_eq!(first.console, second.console);
    }
}

#[test]
fn replaying_the_full_trace_leaves_everything_drained() {
    for mode in [RuntimeMode::Browser, RuntimeMode::Node] {
        let result = busy_trace(mode);
        let snapshot = replay(&result.steps, result.steps.len());
        assert!(snapshot.call_stack.is_empty());
        assert!(snapshot.microtasks.is_empty());
        assert!(snapshot.macrotasks.is_empty());
        assert!(snapshot.web_apis.is_empty());
        assert_eq!(snapshot.console.len(), result.console.len());
    }
}

#[test]
fn prefix_replays_expose_intermediate_stack_depth() {
    let result = busy_trace(RuntimeMode::Browser);
    let deepest = (0..=result.steps.len())
        .map(|upto| replay(&result.steps, upto).call_stack.len())
        .max()
        .unwrap();
    assert!(deepest >= 2, "expected nested frames at some prefix");
}

#[test]
fn node_phases_appear_in_order_within_an_iteration() {
    let result = busy_trace(RuntimeMode::Node);
    use looplab::LoopPhase;
    let phases: Vec<LoopPhase> = result
        .steps
        .iter()
        .filter_map(|step| match &step.step {
            Step::EventLoopCheck { phase } => Some(*phase),
            _ => None,
        })
        .collect();

    // Timers must always come before poll, and poll before close, inside
    // one loop iteration.
    let mut saw_timers = false;
    for phase in phases {
        match phase {
            LoopPhase::Timers => saw_timers = true,
            LoopPhase::Poll | LoopPhase::Close => {
                assert!(saw_timers, "phase {phase:?} before the first timers phase");
            }
            _ => {}
        }
    }
}
