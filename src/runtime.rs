use crate::bindings;
use crate::errors::JsError;
use crate::errors::JsException;
use crate::event_loop::EventLoop;
use crate::parser;
use crate::scope::Scope;
use crate::scope::ScopeRef;
use crate::trace::ConsoleEntry;
use crate::trace::ConsoleLevel;
use crate::trace::ExecutionStep;
use crate::trace::LoopPhase;
use crate::trace::Step;
use crate::value::Value;
use serde::Serialize;
use swc_common::sync::Lrc;
use swc_common::SourceMap;
use swc_common::Span;

/// Which platform's event loop the scheduler simulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Browser,
    Node,
}

/// Engine configuration; every cap is a safety net against runaway input.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub mode: RuntimeMode,
    /// Outer event-loop iteration cap.
    pub max_loop_iterations: usize,
    /// Microtasks allowed in a single drain.
    pub max_microtasks_per_drain: usize,
    /// Iterations a single `while`/`for`/`do-while` may run.
    pub max_loop_guard: u32,
    /// Seed for the `Math.random` generator, so traces replay identically.
    pub random_seed: u64,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            mode: RuntimeMode::Browser,
            max_loop_iterations: 500,
            max_microtasks_per_drain: 200,
            max_loop_guard: 10_000,
            random_seed: 42,
        }
    }
}

/// Everything one call to [`Runtime::run`] produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub steps: Vec<ExecutionStep>,
    pub console: Vec<ConsoleEntry>,
    pub errors: Vec<String>,
}

/// The engine: owns the global scope, the scheduler, the trace buffer, and
/// every per-run counter. Nothing in here touches process-wide state, so two
/// runtimes never interfere.
pub struct Runtime {
    pub options: RuntimeOptions,
    pub event_loop: EventLoop,
    pub global_scope: ScopeRef,
    pub steps: Vec<ExecutionStep>,
    pub console: Vec<ConsoleEntry>,
    pub errors: Vec<String>,
    pub source_map: Option<Lrc<SourceMap>>,
    next_frame_id: u64,
    next_task_id: u64,
    next_timer_id: u64,
    next_promise_id: u64,
    rng_state: u64,
}

impl Runtime {
    /// Creates a new runtime with browser-mode defaults.
    pub fn new() -> Runtime {
        Self::with_options(RuntimeOptions::default())
    }

    /// Creates a new runtime based on provided options.
    pub fn with_options(options: RuntimeOptions) -> Runtime {
        let rng_state = options.random_seed;
        Runtime {
            options,
            event_loop: EventLoop::new(),
            global_scope: Scope::global(),
            steps: Vec::new(),
            console: Vec::new(),
            errors: Vec::new(),
            source_map: None,
            next_frame_id: 1,
            next_task_id: 1,
            next_timer_id: 1,
            next_promise_id: 1,
            rng_state,
        }
    }

    /// Parses and executes `source`, runs the configured event loop until it
    /// goes quiet, and returns the accumulated trace.
    pub fn run(&mut self, source: &str) -> RunResult {
        self.reset();

        let program = match parser::parse(source) {
            Ok(program) => program,
            Err(error) => {
                let text = error.text();
                self.steps.push(ExecutionStep {
                    step: Step::ConsoleError {
                        args: vec![text.clone()],
                        raw: vec![serde_json::Value::String(text.clone())],
                    },
                    line: Some(error.line),
                    column: Some(error.column),
                    timestamp_ms: 0,
                });
                self.console.push(ConsoleEntry {
                    level: ConsoleLevel::Error,
                    text: text.clone(),
                });
                self.errors.push(text);
                return self.take_result();
            }
        };

        self.source_map = Some(program.source_map.clone());
        bindings::install(self);

        // The whole program runs inside a virtual `<global>` frame.
        self.emit(Step::EventLoopCheck {
            phase: LoopPhase::Stack,
        });
        let frame = self.push_frame("<global>", Some(1));
        if let Err(exception) = self.exec_program(&program.script) {
            self.report_exception(&exception);
        }
        self.pop_frame(frame);

        self.run_event_loop();
        self.take_result()
    }

    /// Clears all per-run state, including every id counter.
    fn reset(&mut self) {
        self.event_loop = EventLoop::new();
        self.global_scope = Scope::global();
        self.steps.clear();
        self.console.clear();
        self.errors.clear();
        self.source_map = None;
        self.next_frame_id = 1;
        self.next_task_id = 1;
        self.next_timer_id = 1;
        self.next_promise_id = 1;
        self.rng_state = self.options.random_seed;
    }

    fn take_result(&mut self) -> RunResult {
        RunResult {
            steps: std::mem::take(&mut self.steps),
            console: std::mem::take(&mut self.console),
            errors: std::mem::take(&mut self.errors),
        }
    }
}

//---------------------------------------------------------
//  TRACE EMISSION.
//---------------------------------------------------------

impl Runtime {
    /// Appends a step stamped with the current virtual time.
    pub fn emit(&mut self, step: Step) {
        self.emit_at(step, None, None);
    }

    pub fn emit_at(&mut self, step: Step, line: Option<u32>, column: Option<u32>) {
        self.steps.push(ExecutionStep {
            step,
            line,
            column,
            timestamp_ms: self.event_loop.now_ms,
        });
    }

    /// Opens a call-stack frame in the trace and returns its id.
    pub fn push_frame(&mut self, name: &str, line: Option<u32>) -> u64 {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.emit(Step::PushStack {
            id,
            name: name.to_string(),
            line,
        });
        id
    }

    pub fn pop_frame(&mut self, id: u64) {
        self.emit(Step::PopStack { id });
    }

    pub fn highlight_line(&mut self, line: u32) {
        self.emit_at(Step::HighlightLine { line }, Some(line), None);
    }

    /// Emits a `CONSOLE_*` step and mirrors it into the console list.
    pub fn console_event(&mut self, level: ConsoleLevel, args: &[Value]) {
        let texts: Vec<String> = args.iter().map(Value::stringify).collect();
        let raw: Vec<serde_json::Value> = args.iter().map(Value::to_json).collect();
        let text = texts.join(" ");
        let step = match level {
            ConsoleLevel::Log => Step::ConsoleLog { args: texts, raw },
            ConsoleLevel::Warn => Step::ConsoleWarn { args: texts, raw },
            ConsoleLevel::Error => Step::ConsoleError { args: texts, raw },
        };
        self.emit(step);
        self.console.push(ConsoleEntry { level, text });
    }

    /// Routes an uncaught exception: a `CONSOLE_ERROR` step, a console
    /// entry, and an entry in the error list. Never halts the host.
    pub fn report_exception(&mut self, exception: &JsException) {
        let text = exception.text();
        self.emit_at(
            Step::ConsoleError {
                args: vec![text.clone()],
                raw: vec![exception.value.to_json()],
            },
            exception.line,
            None,
        );
        self.console.push(ConsoleEntry {
            level: ConsoleLevel::Error,
            text: text.clone(),
        });
        self.errors.push(text);
    }

    /// Reports a scheduler safety-cap hit; the partial trace survives.
    pub fn report_overflow(&mut self, message: &str) {
        let text = JsError::generic(format!("Scheduler overflow: {message}")).text();
        self.emit(Step::ConsoleError {
            args: vec![text.clone()],
            raw: vec![serde_json::Value::String(text.clone())],
        });
        self.console.push(ConsoleEntry {
            level: ConsoleLevel::Error,
            text: text.clone(),
        });
        self.errors.push(text);
    }
}

//---------------------------------------------------------
//  ENGINE-OWNED COUNTERS.
//---------------------------------------------------------

impl Runtime {
    pub fn next_task_id(&mut self) -> u64 {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    pub fn next_timer_id(&mut self) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        id
    }

    pub fn next_promise_id(&mut self) -> u64 {
        let id = self.next_promise_id;
        self.next_promise_id += 1;
        id
    }

    /// Seeded LCG behind `Math.random`; engine-owned so identical runs
    /// produce identical traces.
    pub fn random(&mut self) -> f64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.rng_state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// 1-based source line for a span, when the source map is around.
    /// Dummy spans (scheduler-invoked callbacks) carry no position.
    pub fn line_of(&self, span: Span) -> Option<u32> {
        if span.lo.0 == 0 {
            return None;
        }
        self.source_map
            .as_ref()
            .map(|source_map| parser::line_col(source_map, span).0)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
