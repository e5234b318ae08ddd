use crate::errors::JsException;
use crate::runtime::Runtime;
use crate::timers::Timer;
use crate::timers::TimerKind;
use crate::trace::LoopPhase;
use crate::trace::Step;
use crate::trace::TaskSource;
use std::collections::VecDeque;

/// Callback executed when a queued task is dequeued.
pub type TaskCallback = Box<dyn FnOnce(&mut Runtime) -> Result<(), JsException>>;

/// A callback waiting in one of the scheduler queues.
pub struct QueuedTask {
    pub id: u64,
    pub label: String,
    pub callback: TaskCallback,
    pub source: TaskSource,
}

/// Scheduler state: the three task queues, the timer set, and the virtual
/// clock. The loop drivers live on [`Runtime`] so that executing a task can
/// re-enter the interpreter and append to the trace.
pub struct EventLoop {
    pub microtasks: VecDeque<QueuedTask>,
    pub macrotasks: VecDeque<QueuedTask>,
    pub check_queue: VecDeque<QueuedTask>,
    pub timers: Vec<Timer>,
    pub now_ms: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            microtasks: VecDeque::new(),
            macrotasks: VecDeque::new(),
            check_queue: VecDeque::new(),
            timers: Vec::new(),
            now_ms: 0,
        }
    }

    /// Returns if there is anything left for the loop to do.
    pub fn has_pending_work(&self) -> bool {
        !self.queues_empty() || self.has_active_timers()
    }

    pub fn queues_empty(&self) -> bool {
        self.microtasks.is_empty() && self.macrotasks.is_empty() && self.check_queue.is_empty()
    }

    pub fn has_active_timers(&self) -> bool {
        self.timers.iter().any(|timer| !timer.cleared)
    }

    /// Earliest deadline among the uncleared timers.
    pub fn next_timer_expiry(&self) -> Option<u64> {
        self.timers
            .iter()
            .filter(|timer| !timer.cleared)
            .map(Timer::expires_at)
            .min()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

//---------------------------------------------------------
//  SCHEDULING METHODS.
//---------------------------------------------------------

impl Runtime {
    /// Enqueues a microtask and announces it in the trace.
    ///
    /// `process.nextTick` tasks join the back of the nextTick run at the head
    /// of the queue: FIFO among themselves, ahead of ordinary microtasks.
    pub fn schedule_microtask(
        &mut self,
        label: &str,
        source: TaskSource,
        callback: TaskCallback,
    ) -> u64 {
        let id = self.next_task_id();
        self.emit(Step::ScheduleMicrotask {
            id,
            label: label.to_string(),
            source,
        });
        self.enqueue_microtask(QueuedTask {
            id,
            label: label.to_string(),
            callback,
            source,
        });
        id
    }

    /// Enqueues a microtask whose `SCHEDULE_MICROTASK` step was already
    /// emitted earlier (the `await` suspension path announces at suspension
    /// time, then enqueues on settlement under the same id).
    pub fn enqueue_microtask_preannounced(
        &mut self,
        id: u64,
        label: &str,
        source: TaskSource,
        callback: TaskCallback,
    ) {
        self.enqueue_microtask(QueuedTask {
            id,
            label: label.to_string(),
            callback,
            source,
        });
    }

    fn enqueue_microtask(&mut self, task: QueuedTask) {
        match task.source {
            TaskSource::NextTick => {
                let position = self
                    .event_loop
                    .microtasks
                    .iter()
                    .position(|queued| queued.source != TaskSource::NextTick)
                    .unwrap_or(self.event_loop.microtasks.len());
                self.event_loop.microtasks.insert(position, task);
            }
            _ => self.event_loop.microtasks.push_back(task),
        }
    }

    /// Enqueues a macrotask and announces it in the trace.
    pub fn schedule_macrotask(
        &mut self,
        label: &str,
        source: TaskSource,
        callback: TaskCallback,
    ) -> u64 {
        let id = self.next_task_id();
        self.emit(Step::ScheduleMacrotask {
            id,
            label: label.to_string(),
            source,
        });
        self.event_loop.macrotasks.push_back(QueuedTask {
            id,
            label: label.to_string(),
            callback,
            source,
        });
        id
    }

    /// Enqueues a `setImmediate` callback to the node-only check queue.
    pub fn schedule_check(&mut self, label: &str, callback: TaskCallback) -> u64 {
        let id = self.next_task_id();
        self.emit(Step::ScheduleMacrotask {
            id,
            label: label.to_string(),
            source: TaskSource::Immediate,
        });
        self.event_loop.check_queue.push_back(QueuedTask {
            id,
            label: label.to_string(),
            callback,
            source: TaskSource::Immediate,
        });
        id
    }
}

//---------------------------------------------------------
//  EVENT LOOP PHASES.
//---------------------------------------------------------

impl Runtime {
    /// Runs the event loop of the configured mode until no work remains.
    pub fn run_event_loop(&mut self) {
        match self.options.mode {
            crate::runtime::RuntimeMode::Browser => self.run_browser_loop(),
            crate::runtime::RuntimeMode::Node => self.run_node_loop(),
        }
    }

    /// The browser loop: drain microtasks, sweep timers, then pick exactly
    /// one macrotask per iteration.
    fn run_browser_loop(&mut self) {
        let mut iterations = 0;
        while self.event_loop.has_pending_work() {
            if iterations >= self.options.max_loop_iterations {
                self.report_overflow("event loop exceeded its iteration limit");
                return;
            }
            iterations += 1;

            if !self.drain_microtasks() {
                return;
            }

            if self.event_loop.has_active_timers() {
                self.emit(Step::EventLoopCheck {
                    phase: LoopPhase::WebApi,
                });
                self.advance_timers();
            }

            if let Some(task) = self.event_loop.macrotasks.pop_front() {
                self.emit(Step::EventLoopCheck {
                    phase: LoopPhase::Macrotask,
                });
                self.execute_macrotask(task);
                continue;
            }

            if self.event_loop.has_active_timers() {
                self.advance_timers();
            }
        }
    }

    /// The node loop: six phases per iteration, with a full microtask drain
    /// (nextTick first, then promise reactions) between every phase.
    fn run_node_loop(&mut self) {
        let mut iterations = 0;
        while self.event_loop.has_pending_work() {
            if iterations >= self.options.max_loop_iterations {
                self.report_overflow("event loop exceeded its iteration limit");
                return;
            }
            iterations += 1;

            if !self.drain_microtasks() {
                return;
            }

            // Phase 1: timers.
            self.emit(Step::EventLoopCheck {
                phase: LoopPhase::Timers,
            });
            self.advance_timers();
            loop {
                // Timer callbacks drain FIFO out of the shared macrotask
                // queue, filtered by source tag.
                let position = self.event_loop.macrotasks.iter().position(|task| {
                    matches!(task.source, TaskSource::Timeout | TaskSource::Interval)
                });
                let Some(position) = position else { break };
                let task = self.event_loop.macrotasks.remove(position).unwrap();
                self.execute_macrotask(task);
            }
            if !self.drain_microtasks() {
                return;
            }

            // Phase 2: pending callbacks. I/O is not simulated, so the phase
            // only leaves its marker.
            self.emit(Step::EventLoopCheck {
                phase: LoopPhase::Pending,
            });
            if !self.drain_microtasks() {
                return;
            }

            // Phase 3: idle/prepare is libuv-internal and skipped.

            // Phase 4: poll. Runs one remaining macrotask (rAF, generic).
            self.emit(Step::EventLoopCheck {
                phase: LoopPhase::Poll,
            });
            if let Some(task) = self.event_loop.macrotasks.pop_front() {
                self.execute_macrotask(task);
            }
            if !self.drain_microtasks() {
                return;
            }

            // Phase 5: check. Drains every setImmediate callback.
            if !self.event_loop.check_queue.is_empty() {
                self.emit(Step::EventLoopCheck {
                    phase: LoopPhase::Check,
                });
                while let Some(task) = self.event_loop.check_queue.pop_front() {
                    self.execute_macrotask(task);
                }
            }
            if !self.drain_microtasks() {
                return;
            }

            // Phase 6: close callbacks.
            self.emit(Step::EventLoopCheck {
                phase: LoopPhase::Close,
            });
            if !self.drain_microtasks() {
                return;
            }

            // Only uncleared timers remain: jump the clock so the next
            // iteration has something to run.
            if self.event_loop.queues_empty() && self.event_loop.has_active_timers() {
                self.advance_timers();
            }
        }
    }
}

//---------------------------------------------------------
//  QUEUE AND TIMER PROCESSING.
//---------------------------------------------------------

impl Runtime {
    /// Pops and executes microtasks until the queue is empty. Returns false
    /// when the per-drain safety cap fires, which aborts the run.
    fn drain_microtasks(&mut self) -> bool {
        let mut processed = 0;
        while let Some(task) = self.event_loop.microtasks.pop_front() {
            processed += 1;
            if processed > self.options.max_microtasks_per_drain {
                self.report_overflow("microtask queue exceeded its per-drain limit");
                return false;
            }

            self.emit(Step::EventLoopCheck {
                phase: LoopPhase::Microtask,
            });
            self.emit(Step::DequeueMicrotask {
                id: task.id,
                label: task.label.clone(),
            });
            self.emit(Step::ExecuteMicrotask {
                id: task.id,
                label: task.label.clone(),
            });

            let frame = self.push_frame(&task.label, None);
            let result = (task.callback)(self);
            self.pop_frame(frame);

            if let Err(exception) = result {
                self.report_exception(&exception);
            }
        }
        true
    }

    /// Dequeues and runs a single macrotask.
    fn execute_macrotask(&mut self, task: QueuedTask) {
        self.emit(Step::DequeueMacrotask {
            id: task.id,
            label: task.label.clone(),
        });
        self.emit(Step::ExecuteMacrotask {
            id: task.id,
            label: task.label.clone(),
        });

        let frame = self.push_frame(&task.label, None);
        let result = (task.callback)(self);
        self.pop_frame(frame);

        if let Err(exception) = result {
            self.report_exception(&exception);
        }
    }

    /// Advances the virtual clock to the earliest timer deadline and fires
    /// everything that is due: each expired timer resolves its web API slot
    /// and enqueues its callback as a macrotask. Intervals restart from the
    /// new clock value; timeouts are spent.
    pub fn advance_timers(&mut self) {
        let Some(min_expiry) = self.event_loop.next_timer_expiry() else {
            return;
        };
        if min_expiry > self.event_loop.now_ms {
            self.event_loop.now_ms = min_expiry;
        }
        let now = self.event_loop.now_ms;

        // Collect the due cohort first; firing needs &mut self for the trace.
        let mut due = Vec::new();
        for timer in self.event_loop.timers.iter_mut() {
            if timer.cleared || timer.expires_at() > now {
                continue;
            }
            due.push((timer.id, timer.label.clone(), timer.kind, timer.callback.clone()));
            match timer.kind {
                TimerKind::Interval => timer.start_time_ms = now,
                TimerKind::Timeout => timer.cleared = true,
            }
        }

        for (id, label, kind, callback) in due {
            self.emit(Step::ResolveWebApi {
                id,
                label: label.clone(),
            });
            let source = match kind {
                TimerKind::Timeout => TaskSource::Timeout,
                TimerKind::Interval => TaskSource::Interval,
            };
            self.schedule_macrotask(
                &label,
                source,
                Box::new(move |runtime| runtime.call_function(&callback, &[], None).map(|_| ())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn pending_work_accounts_for_queues_and_timers() {
        let mut event_loop = EventLoop::new();
        assert!(!event_loop.has_pending_work());

        event_loop.timers.push(Timer {
            id: 1,
            label: "setTimeout".into(),
            delay_ms: 10,
            start_time_ms: 0,
            callback: Value::Undefined,
            kind: TimerKind::Timeout,
            cleared: false,
        });
        assert!(event_loop.has_pending_work());
    }

    #[test]
    fn cleared_timers_do_not_contribute_a_deadline() {
        let mut event_loop = EventLoop::new();
        event_loop.timers.push(Timer {
            id: 1,
            label: "setTimeout".into(),
            delay_ms: 10,
            start_time_ms: 0,
            callback: Value::Undefined,
            kind: TimerKind::Timeout,
            cleared: true,
        });
        event_loop.timers.push(Timer {
            id: 2,
            label: "setTimeout".into(),
            delay_ms: 25,
            start_time_ms: 0,
            callback: Value::Undefined,
            kind: TimerKind::Timeout,
            cleared: false,
        });
        assert_eq!(event_loop.next_timer_expiry(), Some(25));
    }
}
