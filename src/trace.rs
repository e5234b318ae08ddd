use serde::Serialize;

/// Where a queued task came from; drives queue routing and the replay UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskSource {
    #[serde(rename = "process.nextTick")]
    NextTick,
    #[serde(rename = "queueMicrotask")]
    Microtask,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "interval")]
    Interval,
    #[serde(rename = "setImmediate")]
    Immediate,
    #[serde(rename = "rAF")]
    AnimationFrame,
    #[serde(rename = "generic")]
    Generic,
}

/// Event-loop location reported by `EVENT_LOOP_CHECK` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPhase {
    Stack,
    Microtask,
    Macrotask,
    WebApi,
    Timers,
    Pending,
    Poll,
    Check,
    Close,
    Idle,
}

/// One fine-grained execution event.
///
/// The serialized form is `{"type": "...", "payload": {...}}`, which is the
/// closed step vocabulary the host UI folds over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    PushStack {
        id: u64,
        name: String,
        line: Option<u32>,
    },
    PopStack {
        id: u64,
    },
    HighlightLine {
        line: u32,
    },
    ScheduleMicrotask {
        id: u64,
        label: String,
        source: TaskSource,
    },
    DequeueMicrotask {
        id: u64,
        label: String,
    },
    ExecuteMicrotask {
        id: u64,
        label: String,
    },
    ScheduleMacrotask {
        id: u64,
        label: String,
        source: TaskSource,
    },
    DequeueMacrotask {
        id: u64,
        label: String,
    },
    ExecuteMacrotask {
        id: u64,
        label: String,
    },
    RegisterWebApi {
        id: u64,
        label: String,
        delay: u64,
    },
    ResolveWebApi {
        id: u64,
        label: String,
    },
    EventLoopCheck {
        phase: LoopPhase,
    },
    ConsoleLog {
        args: Vec<String>,
        raw: Vec<serde_json::Value>,
    },
    ConsoleWarn {
        args: Vec<String>,
        raw: Vec<serde_json::Value>,
    },
    ConsoleError {
        args: Vec<String>,
        raw: Vec<serde_json::Value>,
    },
}

/// A [`Step`] stamped with its source position and the virtual time at
/// which it was emitted. The trace is an append-only sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStep {
    #[serde(flatten)]
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

/// Flattened console output, collected next to the step stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn steps_serialize_with_the_wire_type_names() {
        let step = ExecutionStep {
            step: Step::PushStack {
                id: 1,
                name: "<global>".into(),
                line: Some(1),
            },
            line: Some(1),
            column: None,
            timestamp_ms: 0,
        };
        let encoded = serde_json::to_value(&step).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "PUSH_STACK",
                "payload": { "id": 1, "name": "<global>", "line": 1 },
                "line": 1,
                "timestamp_ms": 0,
            })
        );
    }

    #[test]
    fn task_sources_use_their_js_spellings() {
        assert_eq!(
            serde_json::to_value(TaskSource::NextTick).unwrap(),
            json!("process.nextTick")
        );
        assert_eq!(
            serde_json::to_value(TaskSource::AnimationFrame).unwrap(),
            json!("rAF")
        );
    }

    #[test]
    fn phases_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(LoopPhase::Microtask).unwrap(),
            json!("microtask")
        );
        assert_eq!(serde_json::to_value(LoopPhase::WebApi).unwrap(), json!("webapi"));
    }
}
