//! Interpreter semantics observed through console output and the error list.

use looplab::{run, RuntimeMode};
use pretty_assertions::assert_eq;

fn console_of(source: &str) -> Vec<String> {
    let result = run(source, RuntimeMode::Browser);
    assert_eq!(result.errors, Vec::<String>::new(), "unexpected errors");
    result.console.into_iter().map(|entry| entry.text).collect()
}

#[test]
fn closures_capture_their_environment() {
    let output = console_of(
        r#"
        function counter() {
            let count = 0;
            return function () {
                count = count + 1;
                return count;
            };
        }
        const next = counter();
        next();
        next();
        console.log(next());
        "#,
    );
    assert_eq!(output, ["3"]);
}

#[test]
fn var_hoists_to_the_function_scope() {
    let output = console_of(
        r#"
        function f() {
            {
                var x = 1;
                let y = 2;
            }
            console.log(typeof x, typeof y);
        }
        f();
        "#,
    );
    assert_eq!(output, ["number undefined"]);
}

#[test]
fn function_declarations_hoist_above_their_call_site() {
    let output = console_of(
        r#"
        console.log(early());
        function early() {
            return "hoisted";
        }
        "#,
    );
    assert_eq!(output, ["hoisted"]);
}

#[test]
fn coercion_rules_match_js() {
    let output = console_of(
        r#"
        console.log(1 + 2);
        console.log("1" + 2);
        console.log("3" * "2");
        console.log("" + true);
        console.log(null + 1);
        console.log(undefined + 1);
        console.log(1 == "1", 1 === "1");
        console.log(null == undefined, null === undefined);
        console.log("a" < "b", 2 < 10, "2" < "10");
        "#,
    );
    assert_eq!(
        output,
        [
            "3",
            "12",
            "6",
            "true",
            "1",
            "NaN",
            "true false",
            "true false",
            "true true false",
        ]
    );
}

#[test]
fn bitwise_operators_use_int32_semantics() {
    let output = console_of(
        r#"
        console.log(5 & 3, 5 | 3, 5 ^ 3);
        console.log(1 << 3, -8 >> 1, -8 >>> 28);
        console.log(~5);
        "#,
    );
    assert_eq!(output, ["1 7 6", "8 -4 15", "-6"]);
}

#[test]
fn short_circuit_preserves_the_chosen_operand() {
    let output = console_of(
        r#"
        console.log(0 || "fallback");
        console.log("first" && "second");
        console.log(null ?? "default");
        console.log(0 ?? "not used");
        let touched = false;
        false && (touched = true);
        console.log(touched);
        "#,
    );
    assert_eq!(output, ["fallback", "second", "default", "0", "false"]);
}

#[test]
fn typeof_reports_the_expected_tags() {
    let output = console_of(
        r#"
        console.log(typeof 1, typeof "s", typeof true);
        console.log(typeof undefined, typeof null, typeof missing);
        console.log(typeof console.log, typeof function () {});
        "#,
    );
    assert_eq!(
        output,
        ["number string boolean", "undefined object undefined", "function function"]
    );
}

#[test]
fn template_literals_interpolate_stringified_values() {
    let output = console_of(
        r#"
        const who = "world";
        const n = 2;
        console.log(`hello ${who}, ${n} + ${n} = ${n + n}`);
        "#,
    );
    assert_eq!(output, ["hello world, 2 + 2 = 4"]);
}

#[test]
fn switch_falls_through_until_break() {
    let output = console_of(
        r#"
        function label(n) {
            switch (n) {
                case 1:
                    console.log("one");
                case 2:
                    console.log("two");
                    break;
                case 3:
                    console.log("three");
                    break;
                default:
                    console.log("other");
            }
        }
        label(1);
        label(3);
        label(9);
        "#,
    );
    assert_eq!(output, ["one", "two", "three", "other"]);
}

#[test]
fn loops_honor_break_and_continue() {
    let output = console_of(
        r#"
        let seen = [];
        for (let i = 0; i < 10; i++) {
            if (i % 2 === 0) {
                continue;
            }
            if (i > 6) {
                break;
            }
            seen.push(i);
        }
        console.log(seen.join(","));

        let n = 0;
        do {
            n++;
        } while (n < 3);
        console.log(n);
        "#,
    );
    assert_eq!(output, ["1,3,5", "3"]);
}

#[test]
fn try_catch_finally_runs_in_order() {
    let output = console_of(
        r#"
        try {
            console.log("try");
            throw "oops";
        } catch (error) {
            console.log("caught " + error);
        } finally {
            console.log("finally");
        }
        console.log("after");
        "#,
    );
    assert_eq!(output, ["try", "caught oops", "finally", "after"]);
}

#[test]
fn finally_runs_even_when_the_function_returns() {
    let output = console_of(
        r#"
        function f() {
            try {
                return "value";
            } finally {
                console.log("cleanup");
            }
        }
        console.log(f());
        "#,
    );
    assert_eq!(output, ["cleanup", "value"]);
}

#[test]
fn objects_and_arrays_support_spread_and_computed_access() {
    let output = console_of(
        r#"
        const base = { a: 1, b: 2 };
        const extended = { ...base, b: 3, ["c" + ""]: 4 };
        console.log(extended.a, extended.b, extended["c"]);

        const parts = [2, 3];
        const all = [1, ...parts, 4];
        console.log(all.length, all[2]);
        console.log(Math.max(...all));
        "#,
    );
    assert_eq!(output, ["1 3 4", "4 3", "4"]);
}

#[test]
fn methods_bind_this_to_their_receiver() {
    let output = console_of(
        r#"
        const counter = {
            count: 0,
            bump() {
                this.count = this.count + 1;
                return this.count;
            },
        };
        counter.bump();
        console.log(counter.bump());
        "#,
    );
    assert_eq!(output, ["2"]);
}

#[test]
fn new_builds_an_object_and_ignores_explicit_returns() {
    let output = console_of(
        r#"
        function Point(x, y) {
            this.x = x;
            this.y = y;
            return "ignored";
        }
        const p = new Point(3, 4);
        console.log(p.x, p.y);
        "#,
    );
    assert_eq!(output, ["3 4"]);
}

#[test]
fn array_methods_route_callbacks_through_the_interpreter() {
    let output = console_of(
        r#"
        const numbers = [1, 2, 3, 4];
        const doubled = numbers.map((n) => n * 2);
        const even = numbers.filter((n) => n % 2 === 0);
        const total = numbers.reduce((sum, n) => sum + n, 0);
        console.log(doubled.join(","), even.join(","), total);
        console.log(numbers.indexOf(3), numbers.includes(9));
        console.log(numbers.slice(1, 3).join(","), numbers.slice(-2).join(","));
        "#,
    );
    assert_eq!(output, ["2,4,6,8 2,4 10", "2 false", "2,3 3,4"]);
}

#[test]
fn string_methods_cover_the_practical_set() {
    let output = console_of(
        r#"
        const s = "  Event Loop  ";
        console.log(s.trim().toUpperCase());
        console.log("a-b-c".split("-").join("+"));
        console.log("hello".slice(1, 3), "hello".charAt(1));
        console.log("hello".indexOf("ll"), "hello".includes("ell"));
        console.log("ab".repeat(3), "hello".length);
        "#,
    );
    assert_eq!(
        output,
        ["EVENT LOOP", "a+b+c", "el e", "2 true", "ababab 5"]
    );
}

#[test]
fn builtin_namespaces_are_present() {
    let output = console_of(
        r#"
        console.log(Math.floor(2.9), Math.ceil(2.1), Math.round(2.5), Math.abs(-4));
        console.log(Math.max(1, 9, 3), Math.min(1, 9, 3), Math.pow(2, 10));
        console.log(JSON.stringify({ a: [1, "two", null] }));
        console.log(JSON.parse("[1,2,3]").length);
        console.log(Array.isArray([1]), Array.isArray("no"));
        console.log(Array.from("abc").join("-"));
        console.log(Array.from([1, 2, 3], (n) => n * 10).join(","));
        console.log(parseInt("42px"), parseFloat("3.5em"), isNaN("x"), isFinite(1));
        console.log(Date.now());
        "#,
    );
    assert_eq!(
        output,
        [
            "1 3 3 4",
            "9 1 1024",
            "{\"a\":[1,\"two\",null]}",
            "3",
            "true false",
            "a-b-c",
            "10,20,30",
            "42 3.5 true true",
            "0",
        ]
    );
}

#[test]
fn stringification_matches_the_console_format() {
    let output = console_of(
        r#"
        console.log([1, "two", [3]]);
        console.log({ a: 1, b: { c: 2 } });
        console.log(function named() {});
        console.log(Promise.resolve(1));
        console.log(undefined, null, NaN, Infinity, -0);
        "#,
    );
    assert_eq!(
        output,
        [
            "[1, two, [3]]",
            "{a: 1, b: {c: 2}}",
            "[Function: named]",
            "Promise {<fulfilled>}",
            "undefined null NaN Infinity 0",
        ]
    );
}

#[test]
fn intentional_simplifications_hold() {
    let output = console_of(
        r#"
        console.log([] instanceof Array);
        const o = { a: 1 };
        console.log(delete o.a, o.a);
        console.log("a" in o, "b" in o);
        "#,
    );
    assert_eq!(output, ["false", "true 1", "true false"]);
}

//---------------------------------------------------------
//  ERROR SURFACING.
//---------------------------------------------------------

#[test]
fn reading_a_missing_identifier_is_a_reference_error() {
    let result = run("console.log(nope);", RuntimeMode::Browser);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("ReferenceError"));
    assert!(result.errors[0].contains("nope is not defined"));
}

#[test]
fn assigning_to_a_const_is_a_type_error() {
    let result = run("const x = 1; x = 2;", RuntimeMode::Browser);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("TypeError"));
    assert!(result.errors[0].contains("constant"));
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    let result = run("const x = 5; x();", RuntimeMode::Browser);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("TypeError"));
    assert!(result.errors[0].contains("x is not a function"));
}

#[test]
fn reading_properties_of_undefined_is_a_type_error() {
    let result = run("let o; console.log(o.field);", RuntimeMode::Browser);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Cannot read properties of undefined (reading 'field')"));
}

#[test]
fn runaway_loops_hit_the_iteration_guard() {
    let result = run("while (true) {}", RuntimeMode::Browser);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("RangeError"));
}

#[test]
fn an_uncaught_throw_still_lets_scheduled_work_run() {
    let result = run(
        r#"
        setTimeout(() => console.log("survivor"), 0);
        throw "top-level";
        "#,
        RuntimeMode::Browser,
    );
    assert_eq!(result.errors, vec!["top-level".to_string()]);
    let output: Vec<String> = result.console.into_iter().map(|e| e.text).collect();
    // The CONSOLE_ERROR for the throw lands in the console list too.
    assert_eq!(output, ["top-level", "survivor"]);
}

#[test]
fn a_rejection_inside_a_microtask_does_not_halt_the_loop() {
    let result = run(
        r#"
        Promise.resolve().then(() => {
            throw "inside";
        });
        setTimeout(() => console.log("after"), 0);
        "#,
        RuntimeMode::Browser,
    );
    // The then-handler has a child promise, so the throw becomes that
    // child's rejection instead of a surfaced error; the loop keeps going.
    let output: Vec<String> = result.console.into_iter().map(|e| e.text).collect();
    assert_eq!(output, ["after"]);
}
