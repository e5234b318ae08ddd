use crate::errors::JsError;
use crate::errors::JsException;
use crate::event_loop::TaskCallback;
use crate::runtime::Runtime;
use crate::trace::TaskSource;
use crate::value::PromiseRef;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

/// One side of a registered reaction: either a user callback or a Rust
/// continuation (used for `await` resumption and internal chaining).
pub enum Reaction {
    Js(Value),
    Continuation(Box<dyn FnOnce(&mut Runtime, Value) -> Result<(), JsException>>),
}

/// A reaction pair registered through `then`/`catch`/`finally` or `await`.
pub struct PromiseHandler {
    pub label: String,
    /// Set when the `SCHEDULE_MICROTASK` step was already emitted (the
    /// `await` path announces at suspension time); the reaction then enters
    /// the queue under this id without a second schedule step.
    pub task_id: Option<u64>,
    pub on_fulfilled: Option<Reaction>,
    pub on_rejected: Option<Reaction>,
    pub child: Option<PromiseRef>,
}

/// The simulated promise: a plain state machine whose reactions only ever
/// run from the microtask queue, never synchronously.
pub struct SimPromise {
    pub id: u64,
    pub state: PromiseState,
    pub value: Value,
    handlers: Vec<PromiseHandler>,
}

impl SimPromise {
    pub fn state_name(&self) -> &'static str {
        match self.state {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled => "fulfilled",
            PromiseState::Rejected => "rejected",
        }
    }

    fn settled(&self) -> bool {
        self.state != PromiseState::Pending
    }
}

impl std::fmt::Debug for SimPromise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimPromise")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl Runtime {
    /// Allocates a fresh pending promise.
    pub fn new_promise(&mut self) -> PromiseRef {
        let id = self.next_promise_id();
        Rc::new(RefCell::new(SimPromise {
            id,
            state: PromiseState::Pending,
            value: Value::Undefined,
            handlers: Vec::new(),
        }))
    }

    /// A promise born fulfilled with `value`.
    pub fn fulfilled_promise(&mut self, value: Value) -> PromiseRef {
        let promise = self.new_promise();
        promise.borrow_mut().state = PromiseState::Fulfilled;
        promise.borrow_mut().value = value;
        promise
    }

    /// A promise born rejected with `reason`.
    pub fn rejected_promise(&mut self, reason: Value) -> PromiseRef {
        let promise = self.new_promise();
        promise.borrow_mut().state = PromiseState::Rejected;
        promise.borrow_mut().value = reason;
        promise
    }

    /// Coerces a value to a promise: promises pass through, anything else
    /// wraps as pre-fulfilled.
    pub fn to_promise(&mut self, value: Value) -> PromiseRef {
        match value {
            Value::Promise(promise) => promise,
            other => self.fulfilled_promise(other),
        }
    }

    /// Resolves a promise. Settled promises ignore the call; resolving with
    /// another promise adopts that promise's eventual state.
    pub fn resolve_promise(&mut self, promise: &PromiseRef, value: Value) {
        if promise.borrow().settled() {
            return;
        }

        if let Value::Promise(inner) = &value {
            if Rc::ptr_eq(promise, inner) {
                let error = JsError::type_error("Chaining cycle detected for promise");
                self.reject_promise(promise, Value::String(error.text()));
                return;
            }
            let inner_state = inner.borrow().state;
            match inner_state {
                PromiseState::Fulfilled => {
                    let settled = inner.borrow().value.clone();
                    self.resolve_promise(promise, settled);
                }
                PromiseState::Rejected => {
                    let settled = inner.borrow().value.clone();
                    self.reject_promise(promise, settled);
                }
                PromiseState::Pending => {
                    let forward_resolve = promise.clone();
                    let forward_reject = promise.clone();
                    self.add_continuation_handler(
                        inner,
                        "chain",
                        None,
                        move |runtime, settled| {
                            runtime.resolve_promise(&forward_resolve, settled);
                            Ok(())
                        },
                        move |runtime, reason| {
                            runtime.reject_promise(&forward_reject, reason);
                            Ok(())
                        },
                    );
                }
            }
            return;
        }

        promise.borrow_mut().state = PromiseState::Fulfilled;
        promise.borrow_mut().value = value;
        self.flush_promise(promise);
    }

    /// Rejects a promise; a no-op on settled promises.
    pub fn reject_promise(&mut self, promise: &PromiseRef, reason: Value) {
        if promise.borrow().settled() {
            return;
        }
        promise.borrow_mut().state = PromiseState::Rejected;
        promise.borrow_mut().value = reason;
        self.flush_promise(promise);
    }

    /// Schedules one microtask per queued handler. Never runs user code
    /// directly.
    fn flush_promise(&mut self, promise: &PromiseRef) {
        let (state, value, handlers) = {
            let mut promise = promise.borrow_mut();
            if !promise.settled() {
                return;
            }
            (
                promise.state,
                promise.value.clone(),
                std::mem::take(&mut promise.handlers),
            )
        };
        let fulfilled = state == PromiseState::Fulfilled;
        for handler in handlers {
            self.schedule_reaction(fulfilled, value.clone(), handler);
        }
    }

    /// Registers `then(onFulfilled, onRejected)` and returns the child
    /// promise. Settled promises flush the new handler immediately (still
    /// through the microtask queue).
    pub fn promise_then(
        &mut self,
        promise: &PromiseRef,
        label: &str,
        on_fulfilled: Option<Value>,
        on_rejected: Option<Value>,
    ) -> PromiseRef {
        let child = self.new_promise();
        let handler = PromiseHandler {
            label: label.to_string(),
            task_id: None,
            on_fulfilled: on_fulfilled.map(Reaction::Js),
            on_rejected: on_rejected.map(Reaction::Js),
            child: Some(child.clone()),
        };
        self.add_handler(promise, handler);
        child
    }

    /// Registers `finally(f)`: runs `f` on either outcome and forwards the
    /// original settlement, unless `f` itself throws.
    pub fn promise_finally(&mut self, promise: &PromiseRef, callback: Value) -> PromiseRef {
        let child = self.new_promise();
        let on_fulfilled = {
            let callback = callback.clone();
            let child = child.clone();
            move |runtime: &mut Runtime, value: Value| {
                match runtime.call_function(&callback, &[], None) {
                    Ok(_) => runtime.resolve_promise(&child, value),
                    Err(exception) => runtime.reject_promise(&child, exception.value),
                }
                Ok(())
            }
        };
        let on_rejected = {
            let child = child.clone();
            move |runtime: &mut Runtime, reason: Value| {
                match runtime.call_function(&callback, &[], None) {
                    Ok(_) => runtime.reject_promise(&child, reason),
                    Err(exception) => runtime.reject_promise(&child, exception.value),
                }
                Ok(())
            }
        };
        self.add_continuation_handler(promise, "Promise.finally", None, on_fulfilled, on_rejected);
        child
    }

    /// Registers a Rust continuation pair on a promise. Used by `await`
    /// resumption, promise adoption, and the combinators.
    pub fn add_continuation_handler<F, R>(
        &mut self,
        promise: &PromiseRef,
        label: &str,
        task_id: Option<u64>,
        on_fulfilled: F,
        on_rejected: R,
    ) where
        F: FnOnce(&mut Runtime, Value) -> Result<(), JsException> + 'static,
        R: FnOnce(&mut Runtime, Value) -> Result<(), JsException> + 'static,
    {
        let handler = PromiseHandler {
            label: label.to_string(),
            task_id,
            on_fulfilled: Some(Reaction::Continuation(Box::new(on_fulfilled))),
            on_rejected: Some(Reaction::Continuation(Box::new(on_rejected))),
            child: None,
        };
        self.add_handler(promise, handler);
    }

    fn add_handler(&mut self, promise: &PromiseRef, handler: PromiseHandler) {
        let state = promise.borrow().state;
        match state {
            PromiseState::Pending => promise.borrow_mut().handlers.push(handler),
            _ => {
                let fulfilled = state == PromiseState::Fulfilled;
                let value = promise.borrow().value.clone();
                self.schedule_reaction(fulfilled, value, handler);
            }
        }
    }

    /// Turns a settled handler into one queued microtask.
    fn schedule_reaction(&mut self, fulfilled: bool, value: Value, handler: PromiseHandler) {
        let PromiseHandler {
            label,
            task_id,
            on_fulfilled,
            on_rejected,
            child,
        } = handler;

        let callback: TaskCallback = Box::new(move |runtime| {
            let reaction = if fulfilled { on_fulfilled } else { on_rejected };
            match reaction {
                Some(Reaction::Js(function)) => {
                    match runtime.call_function(&function, &[value], None) {
                        Ok(result) => {
                            if let Some(child) = child {
                                runtime.resolve_promise(&child, result);
                            }
                            Ok(())
                        }
                        Err(exception) => match child {
                            Some(child) => {
                                runtime.reject_promise(&child, exception.value);
                                Ok(())
                            }
                            None => Err(exception),
                        },
                    }
                }
                Some(Reaction::Continuation(run)) => run(runtime, value),
                // No matching handler: the outcome propagates to the child.
                None => {
                    if let Some(child) = child {
                        if fulfilled {
                            runtime.resolve_promise(&child, value);
                        } else {
                            runtime.reject_promise(&child, value);
                        }
                    }
                    Ok(())
                }
            }
        });

        match task_id {
            Some(id) => {
                self.enqueue_microtask_preannounced(id, &label, TaskSource::Microtask, callback)
            }
            None => {
                self.schedule_microtask(&label, TaskSource::Microtask, callback);
            }
        }
    }

    /// `Promise.all`: fulfills with the ordered array of results, or rejects
    /// with the first rejection.
    pub fn promise_all(&mut self, items: Vec<Value>) -> PromiseRef {
        let result = self.new_promise();
        if items.is_empty() {
            self.resolve_promise(&result, Value::array(Vec::new()));
            return result;
        }

        let total = items.len();
        let state = Rc::new(RefCell::new((vec![Value::Undefined; total], total)));

        for (index, item) in items.into_iter().enumerate() {
            let entry = self.to_promise(item);
            let on_fulfilled = {
                let state = state.clone();
                let result = result.clone();
                move |runtime: &mut Runtime, value: Value| {
                    let finished = {
                        let mut state = state.borrow_mut();
                        state.0[index] = value;
                        state.1 -= 1;
                        state.1 == 0
                    };
                    if finished {
                        let results = state.borrow().0.clone();
                        runtime.resolve_promise(&result, Value::array(results));
                    }
                    Ok(())
                }
            };
            let on_rejected = {
                let result = result.clone();
                move |runtime: &mut Runtime, reason: Value| {
                    runtime.reject_promise(&result, reason);
                    Ok(())
                }
            };
            self.add_continuation_handler(&entry, "Promise.all", None, on_fulfilled, on_rejected);
        }

        result
    }

    /// `Promise.race`: adopts whichever input settles first.
    pub fn promise_race(&mut self, items: Vec<Value>) -> PromiseRef {
        let result = self.new_promise();
        for item in items {
            let entry = self.to_promise(item);
            let on_fulfilled = {
                let result = result.clone();
                move |runtime: &mut Runtime, value: Value| {
                    runtime.resolve_promise(&result, value);
                    Ok(())
                }
            };
            let on_rejected = {
                let result = result.clone();
                move |runtime: &mut Runtime, reason: Value| {
                    runtime.reject_promise(&result, reason);
                    Ok(())
                }
            };
            self.add_continuation_handler(&entry, "Promise.race", None, on_fulfilled, on_rejected);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn transitions_are_one_way() {
        let mut runtime = Runtime::new();
        let promise = runtime.new_promise();

        runtime.resolve_promise(&promise, Value::Number(1.0));
        runtime.reject_promise(&promise, Value::String("late".into()));

        assert_eq!(promise.borrow().state, PromiseState::Fulfilled);
        assert_eq!(promise.borrow().value.to_number(), 1.0);
    }

    #[test]
    fn reactions_are_queued_not_run_synchronously() {
        let mut runtime = Runtime::new();
        let promise = runtime.fulfilled_promise(Value::Number(7.0));

        let _child = runtime.promise_then(&promise, "Promise.then", None, None);

        // The reaction waits in the microtask queue until the loop drains it.
        assert_eq!(runtime.event_loop.microtasks.len(), 1);
    }

    #[test]
    fn resolving_with_a_settled_promise_adopts_its_value() {
        let mut runtime = Runtime::new();
        let inner = runtime.fulfilled_promise(Value::String("adopted".into()));
        let outer = runtime.new_promise();

        runtime.resolve_promise(&outer, Value::Promise(inner));

        assert_eq!(outer.borrow().state, PromiseState::Fulfilled);
        assert_eq!(outer.borrow().value.stringify(), "adopted");
    }

    #[test]
    fn resolving_with_a_pending_promise_waits_for_it() {
        let mut runtime = Runtime::new();
        let inner = runtime.new_promise();
        let outer = runtime.new_promise();

        runtime.resolve_promise(&outer, Value::Promise(inner.clone()));
        assert_eq!(outer.borrow().state, PromiseState::Pending);

        runtime.resolve_promise(&inner, Value::Number(3.0));
        assert_eq!(outer.borrow().state, PromiseState::Pending);

        // The forwarding continuation sits in the microtask queue.
        assert_eq!(runtime.event_loop.microtasks.len(), 1);
    }
}
