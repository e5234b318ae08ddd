//! End-to-end console-ordering scenarios, run through the public API.

use looplab::{run, RuntimeMode};
use pretty_assertions::assert_eq;

fn console_of(source: &str, mode: RuntimeMode) -> Vec<String> {
    let result = run(source, mode);
    assert_eq!(result.errors, Vec::<String>::new(), "unexpected errors");
    result.console.into_iter().map(|entry| entry.text).collect()
}

#[test]
fn sync_then_microtask_then_macrotask() {
    let output = console_of(
        r#"
        console.log("A");
        setTimeout(() => console.log("B"), 0);
        Promise.resolve().then(() => console.log("C"));
        console.log("D");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["A", "D", "C", "B"]);
}

#[test]
fn promise_executor_runs_synchronously() {
    let output = console_of(
        r#"
        new Promise((resolve) => {
            console.log("B");
            resolve();
            console.log("C");
        }).then(() => console.log("D"));
        console.log("A");
        console.log("E");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["B", "C", "A", "E", "D"]);
}

#[test]
fn await_resumes_after_the_synchronous_tail() {
    let output = console_of(
        r#"
        async function f() {
            console.log("s");
            await Promise.resolve();
            console.log("e");
        }
        console.log("1");
        f();
        console.log("2");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["1", "s", "2", "e"]);
}

#[test]
fn microtask_flood_finishes_before_the_timeout() {
    let output = console_of(
        r#"
        let count = 0;
        function again() {
            count = count + 1;
            console.log("m" + count);
            if (count < 3) {
                queueMicrotask(again);
            }
        }
        queueMicrotask(again);
        setTimeout(() => console.log("t"), 0);
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["m1", "m2", "m3", "t"]);
}

#[test]
fn node_timers_phase_precedes_check_phase() {
    let output = console_of(
        r#"
        setTimeout(() => console.log("T"), 0);
        setImmediate(() => console.log("I"));
        "#,
        RuntimeMode::Node,
    );
    assert_eq!(output, ["T", "I"]);
}

#[test]
fn node_next_tick_precedes_promise_reactions() {
    let output = console_of(
        r#"
        process.nextTick(() => console.log("N"));
        Promise.resolve().then(() => console.log("P"));
        "#,
        RuntimeMode::Node,
    );
    assert_eq!(output, ["N", "P"]);
}

#[test]
fn next_ticks_stay_fifo_among_themselves() {
    let output = console_of(
        r#"
        process.nextTick(() => console.log("n1"));
        process.nextTick(() => console.log("n2"));
        Promise.resolve().then(() => console.log("p"));
        "#,
        RuntimeMode::Node,
    );
    assert_eq!(output, ["n1", "n2", "p"]);
}

#[test]
fn chained_awaits_resume_one_tick_at_a_time() {
    let output = console_of(
        r#"
        async function f() {
            const a = await Promise.resolve(1);
            console.log("a" + a);
            const b = await Promise.resolve(2);
            console.log("b" + b);
            return a + b;
        }
        f().then((sum) => console.log("sum" + sum));
        console.log("main");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["main", "a1", "b2", "sum3"]);
}

#[test]
fn awaiting_a_rejected_promise_throws_into_try_catch() {
    let output = console_of(
        r#"
        async function f() {
            try {
                await Promise.reject("boom");
                console.log("unreachable");
            } catch (error) {
                console.log("caught " + error);
            }
        }
        f();
        console.log("after");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["caught boom", "after"]);
}

#[test]
fn awaiting_a_plain_value_continues_inline() {
    let output = console_of(
        r#"
        async function f() {
            const x = await 5;
            console.log("x" + x);
        }
        f();
        console.log("after");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["x5", "after"]);
}

#[test]
fn timers_fire_in_virtual_time_order() {
    let output = console_of(
        r#"
        setTimeout(() => console.log("slow"), 100);
        setTimeout(() => console.log("fast"), 10);
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["fast", "slow"]);
}

#[test]
fn cleared_timers_never_fire() {
    let output = console_of(
        r#"
        const id = setTimeout(() => console.log("never"), 50);
        clearTimeout(id);
        setTimeout(() => console.log("kept"), 60);
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["kept"]);
}

#[test]
fn intervals_repeat_until_cleared() {
    let output = console_of(
        r#"
        let ticks = 0;
        const id = setInterval(() => {
            ticks = ticks + 1;
            console.log("tick" + ticks);
            if (ticks === 3) {
                clearInterval(id);
            }
        }, 10);
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["tick1", "tick2", "tick3"]);
}

#[test]
fn promise_all_collects_in_input_order() {
    let output = console_of(
        r#"
        Promise.all([Promise.resolve("x"), "y", Promise.resolve("z")])
            .then((values) => console.log(values.join("-")));
        console.log("sync");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["sync", "x-y-z"]);
}

#[test]
fn promise_race_adopts_the_first_settlement() {
    let output = console_of(
        r#"
        const slow = new Promise((resolve) => setTimeout(() => resolve("slow"), 100));
        Promise.race([slow, Promise.resolve("fast")])
            .then((winner) => console.log(winner));
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["fast"]);
}

#[test]
fn finally_forwards_the_original_outcome() {
    let output = console_of(
        r#"
        Promise.resolve("ok")
            .finally(() => console.log("cleanup"))
            .then((value) => console.log(value));
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["cleanup", "ok"]);
}

#[test]
fn catch_recovers_a_rejected_chain() {
    let output = console_of(
        r#"
        Promise.reject("bad")
            .catch((reason) => {
                console.log("caught " + reason);
                return "fixed";
            })
            .then((value) => console.log(value));
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["caught bad", "fixed"]);
}

#[test]
fn animation_frames_run_as_macrotasks() {
    let output = console_of(
        r#"
        requestAnimationFrame(() => console.log("frame"));
        Promise.resolve().then(() => console.log("micro"));
        console.log("sync");
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(output, ["sync", "micro", "frame"]);
}
