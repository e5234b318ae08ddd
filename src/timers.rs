use crate::runtime::Runtime;
use crate::trace::Step;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timeout,
    Interval,
}

/// A virtual-time timer registered through `setTimeout`/`setInterval`.
///
/// Timers never consult a real clock; they expire when the scheduler decides
/// to advance `now_ms` past their deadline.
#[derive(Debug)]
pub struct Timer {
    pub id: u64,
    pub label: String,
    pub delay_ms: u64,
    pub start_time_ms: u64,
    pub callback: Value,
    pub kind: TimerKind,
    pub cleared: bool,
}

impl Timer {
    pub fn expires_at(&self) -> u64 {
        self.start_time_ms + self.delay_ms
    }
}

impl Runtime {
    /// Registers a new timer and announces it as a pending web API.
    pub fn register_timer(&mut self, callback: Value, delay_ms: u64, kind: TimerKind) -> u64 {
        let id = self.next_timer_id();
        let label = match (&callback, kind) {
            (Value::Function(function), _) if function.name.is_some() => {
                function.name.clone().unwrap()
            }
            (_, TimerKind::Timeout) => "setTimeout".to_string(),
            (_, TimerKind::Interval) => "setInterval".to_string(),
        };

        self.emit(Step::RegisterWebApi {
            id,
            label: label.clone(),
            delay: delay_ms,
        });

        let start_time_ms = self.event_loop.now_ms;
        self.event_loop.timers.push(Timer {
            id,
            label,
            delay_ms,
            start_time_ms,
            callback,
            kind,
            cleared: false,
        });

        id
    }

    /// Marks a timer cleared; a cleared timer never fires.
    pub fn clear_timer(&mut self, id: u64) {
        if let Some(timer) = self.event_loop.timers.iter_mut().find(|t| t.id == id) {
            timer.cleared = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_start_plus_delay() {
        let timer = Timer {
            id: 1,
            label: "setTimeout".into(),
            delay_ms: 50,
            start_time_ms: 10,
            callback: Value::Undefined,
            kind: TimerKind::Timeout,
            cleared: false,
        };
        assert_eq!(timer.expires_at(), 60);
    }
}
