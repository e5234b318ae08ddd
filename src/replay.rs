use crate::trace::ConsoleEntry;
use crate::trace::ConsoleLevel;
use crate::trace::ExecutionStep;
use crate::trace::LoopPhase;
use crate::trace::Step;
use crate::trace::TaskSource;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub id: u64,
    pub name: String,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: u64,
    pub label: String,
    pub source: TaskSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebApiSnapshot {
    pub id: u64,
    pub label: String,
    pub delay: u64,
}

/// Everything a visualizer needs to draw the engine at one instant:
/// the call stack, the queues, the pending web APIs, console output, the
/// highlighted line, and the loop phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopSnapshot {
    pub call_stack: Vec<FrameSnapshot>,
    pub microtasks: Vec<TaskSnapshot>,
    pub macrotasks: Vec<TaskSnapshot>,
    pub web_apis: Vec<WebApiSnapshot>,
    pub console: Vec<ConsoleEntry>,
    pub current_line: Option<u32>,
    pub phase: Option<LoopPhase>,
    pub now_ms: u64,
}

/// Folds the first `upto` steps of a trace into the visual state at that
/// point. Pure: replaying any prefix is independent of the engine, so a UI
/// can scrub back and forth through a recorded run.
pub fn replay(steps: &[ExecutionStep], upto: usize) -> LoopSnapshot {
    let mut snapshot = LoopSnapshot::default();

    for step in steps.iter().take(upto) {
        snapshot.now_ms = step.timestamp_ms;
        match &step.step {
            Step::PushStack { id, name, line } => {
                snapshot.call_stack.push(FrameSnapshot {
                    id: *id,
                    name: name.clone(),
                    line: *line,
                });
            }
            Step::PopStack { id } => {
                if let Some(position) =
                    snapshot.call_stack.iter().rposition(|frame| frame.id == *id)
                {
                    snapshot.call_stack.remove(position);
                }
            }
            Step::HighlightLine { line } => snapshot.current_line = Some(*line),
            Step::ScheduleMicrotask { id, label, source } => {
                snapshot.microtasks.push(TaskSnapshot {
                    id: *id,
                    label: label.clone(),
                    source: *source,
                });
            }
            Step::DequeueMicrotask { id, .. } => {
                remove_task(&mut snapshot.microtasks, *id);
            }
            Step::ScheduleMacrotask { id, label, source } => {
                snapshot.macrotasks.push(TaskSnapshot {
                    id: *id,
                    label: label.clone(),
                    source: *source,
                });
            }
            Step::DequeueMacrotask { id, .. } => {
                remove_task(&mut snapshot.macrotasks, *id);
            }
            // Execution markers carry no state of their own; the queue
            // change already happened at the dequeue step.
            Step::ExecuteMicrotask { .. } | Step::ExecuteMacrotask { .. } => {}
            Step::RegisterWebApi { id, label, delay } => {
                snapshot.web_apis.push(WebApiSnapshot {
                    id: *id,
                    label: label.clone(),
                    delay: *delay,
                });
            }
            Step::ResolveWebApi { id, .. } => {
                if let Some(position) =
                    snapshot.web_apis.iter().position(|api| api.id == *id)
                {
                    snapshot.web_apis.remove(position);
                }
            }
            Step::EventLoopCheck { phase } => snapshot.phase = Some(*phase),
            Step::ConsoleLog { args, .. } => push_console(&mut snapshot, ConsoleLevel::Log, args),
            Step::ConsoleWarn { args, .. } => push_console(&mut snapshot, ConsoleLevel::Warn, args),
            Step::ConsoleError { args, .. } => {
                push_console(&mut snapshot, ConsoleLevel::Error, args)
            }
        }
    }

    snapshot
}

fn remove_task(tasks: &mut Vec<TaskSnapshot>, id: u64) {
    if let Some(position) = tasks.iter().position(|task| task.id == id) {
        tasks.remove(position);
    }
}

fn push_console(snapshot: &mut LoopSnapshot, level: ConsoleLevel, args: &[String]) {
    snapshot.console.push(ConsoleEntry {
        level,
        text: args.join(" "),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn step(step: Step, timestamp_ms: u64) -> ExecutionStep {
        ExecutionStep {
            step,
            line: None,
            column: None,
            timestamp_ms,
        }
    }

    #[test]
    fn frames_push_and_pop_by_id() {
        let steps = vec![
            step(
                Step::PushStack {
                    id: 1,
                    name: "<global>".into(),
                    line: Some(1),
                },
                0,
            ),
            step(
                Step::PushStack {
                    id: 2,
                    name: "work".into(),
                    line: Some(3),
                },
                0,
            ),
            step(Step::PopStack { id: 2 }, 0),
            step(Step::PopStack { id: 1 }, 0),
        ];

        let mid = replay(&steps, 2);
        assert_eq!(mid.call_stack.len(), 2);
        assert_eq!(mid.call_stack[1].name, "work");

        let done = replay(&steps, steps.len());
        assert!(done.call_stack.is_empty());
    }

    #[test]
    fn queues_shrink_on_dequeue_and_track_time() {
        let steps = vec![
            step(
                Step::ScheduleMacrotask {
                    id: 7,
                    label: "setTimeout".into(),
                    source: TaskSource::Timeout,
                },
                0,
            ),
            step(
                Step::DequeueMacrotask {
                    id: 7,
                    label: "setTimeout".into(),
                },
                25,
            ),
        ];

        let before = replay(&steps, 1);
        assert_eq!(before.macrotasks.len(), 1);
        assert_eq!(before.now_ms, 0);

        let after = replay(&steps, 2);
        assert!(after.macrotasks.is_empty());
        assert_eq!(after.now_ms, 25);
    }

    #[test]
    fn console_and_phase_accumulate() {
        let steps = vec![
            step(
                Step::EventLoopCheck {
                    phase: LoopPhase::Microtask,
                },
                0,
            ),
            step(
                Step::ConsoleLog {
                    args: vec!["a".into(), "b".into()],
                    raw: vec![],
                },
                0,
            ),
        ];

        let snapshot = replay(&steps, steps.len());
        assert_eq!(snapshot.phase, Some(LoopPhase::Microtask));
        assert_eq!(snapshot.console.len(), 1);
        assert_eq!(snapshot.console[0].text, "a b");
    }
}
