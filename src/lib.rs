//! An educational JavaScript runtime simulator.
//!
//! `looplab` runs a subset of JavaScript on a tree-walking interpreter wired
//! to a virtual-time scheduler, and records every observable scheduling
//! decision (stack pushes, queue traffic, timer lifecycles, console output)
//! as an ordered, replayable trace. A host UI folds the trace back into
//! visual state with [`replay`] to teach how call stacks, microtasks,
//! macrotasks, timers, promises and `async`/`await` actually interleave —
//! in both a browser-style loop and a node-style six-phase loop.
//!
//! ```
//! use looplab::{run, RuntimeMode};
//!
//! let result = run(
//!     r#"
//!     console.log("A");
//!     setTimeout(() => console.log("B"), 0);
//!     Promise.resolve().then(() => console.log("C"));
//!     console.log("D");
//!     "#,
//!     RuntimeMode::Browser,
//! );
//!
//! let output: Vec<&str> = result.console.iter().map(|entry| entry.text.as_str()).collect();
//! assert_eq!(output, ["A", "D", "C", "B"]);
//! ```

pub mod bindings;
pub mod errors;
pub mod event_loop;
pub mod interpreter;
pub mod parser;
pub mod promise;
pub mod replay;
pub mod runtime;
pub mod scope;
pub mod timers;
pub mod trace;
pub mod value;

pub use crate::replay::replay;
pub use crate::replay::LoopSnapshot;
pub use crate::runtime::RunResult;
pub use crate::runtime::Runtime;
pub use crate::runtime::RuntimeMode;
pub use crate::runtime::RuntimeOptions;
pub use crate::trace::ConsoleEntry;
pub use crate::trace::ConsoleLevel;
pub use crate::trace::ExecutionStep;
pub use crate::trace::LoopPhase;
pub use crate::trace::Step;
pub use crate::trace::TaskSource;
pub use crate::value::Value;

/// Runs `source` in the given mode with default options.
pub fn run(source: &str, mode: RuntimeMode) -> RunResult {
    Runtime::with_options(RuntimeOptions {
        mode,
        ..RuntimeOptions::default()
    })
    .run(source)
}
