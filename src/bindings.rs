use crate::errors::JsError;
use crate::errors::JsException;
use crate::runtime::Runtime;
use crate::runtime::RuntimeMode;
use crate::scope::BindingKind;
use crate::scope::Scope;
use crate::timers::TimerKind;
use crate::trace::ConsoleLevel;
use crate::trace::TaskSource;
use crate::value::ArrayRef;
use crate::value::Value;
use indexmap::IndexMap;
use swc_common::Span;

/// Populates the global scope with the runtime's built-in surface.
pub fn install(runtime: &mut Runtime) {
    install_globals(runtime);
    install_console(runtime);
    install_timers(runtime);
    install_promise(runtime);
    install_math(runtime);
    install_json(runtime);
    install_array(runtime);
    install_date(runtime);

    match runtime.options.mode {
        RuntimeMode::Node => install_node_globals(runtime),
        RuntimeMode::Browser => install_browser_globals(runtime),
    }
}

/// Adds a binding to the global scope.
fn set_global_to(runtime: &mut Runtime, name: &str, value: Value) {
    let scope = runtime.global_scope.clone();
    Scope::define(&scope, name, value, BindingKind::Const);
}

/// Adds a native function into the given object.
fn set_function_to<F>(target: &mut IndexMap<String, Value>, name: &'static str, func: F)
where
    F: Fn(&mut Runtime, &[Value]) -> Result<Value, JsException> + 'static,
{
    target.insert(short_name(name).to_string(), Value::native(name, func));
}

// Native names read as "console.log"; the property key is the last segment.
fn short_name(name: &'static str) -> &'static str {
    name.rsplit('.').next().unwrap_or(name)
}

fn callback_arg(args: &[Value], who: &str) -> Result<Value, JsException> {
    match args.first() {
        Some(value) if value.is_callable() => Ok(value.clone()),
        _ => Err(JsError::type_error(format!("{who} requires a function argument")).into()),
    }
}

/// Task labels prefer the callback's own name.
fn function_label(callback: &Value, fallback: &str) -> String {
    match callback {
        Value::Function(function) => function
            .name
            .clone()
            .unwrap_or_else(|| fallback.to_string()),
        _ => fallback.to_string(),
    }
}

//---------------------------------------------------------
//  GLOBAL CONSTANTS AND CONVERSIONS.
//---------------------------------------------------------

fn install_globals(runtime: &mut Runtime) {
    set_global_to(runtime, "undefined", Value::Undefined);
    set_global_to(runtime, "NaN", Value::Number(f64::NAN));
    set_global_to(runtime, "Infinity", Value::Number(f64::INFINITY));

    set_global_to(
        runtime,
        "parseInt",
        Value::native("parseInt", |_, args| {
            let text = args.first().map_or_else(String::new, Value::stringify);
            let radix = args.get(1).map_or(0.0, Value::to_number);
            let radix = if radix.is_finite() && radix >= 0.0 {
                radix as u32
            } else {
                0
            };
            Ok(Value::Number(parse_int(&text, radix)))
        }),
    );
    set_global_to(
        runtime,
        "parseFloat",
        Value::native("parseFloat", |_, args| {
            let text = args.first().map_or_else(String::new, Value::stringify);
            Ok(Value::Number(parse_float(&text)))
        }),
    );
    set_global_to(
        runtime,
        "isNaN",
        Value::native("isNaN", |_, args| {
            Ok(Value::Bool(
                args.first().map_or(f64::NAN, Value::to_number).is_nan(),
            ))
        }),
    );
    set_global_to(
        runtime,
        "isFinite",
        Value::native("isFinite", |_, args| {
            Ok(Value::Bool(
                args.first().map_or(f64::NAN, Value::to_number).is_finite(),
            ))
        }),
    );
    set_global_to(
        runtime,
        "String",
        Value::native("String", |_, args| {
            Ok(Value::String(
                args.first().map_or_else(String::new, Value::stringify),
            ))
        }),
    );
    set_global_to(
        runtime,
        "Number",
        Value::native("Number", |_, args| {
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
        }),
    );
    set_global_to(
        runtime,
        "Boolean",
        Value::native("Boolean", |_, args| {
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }),
    );
}

//---------------------------------------------------------
//  CONSOLE.
//---------------------------------------------------------

fn install_console(runtime: &mut Runtime) {
    let mut console = IndexMap::new();
    set_function_to(&mut console, "console.log", |runtime, args| {
        runtime.console_event(ConsoleLevel::Log, args);
        Ok(Value::Undefined)
    });
    set_function_to(&mut console, "console.warn", |runtime, args| {
        runtime.console_event(ConsoleLevel::Warn, args);
        Ok(Value::Undefined)
    });
    set_function_to(&mut console, "console.error", |runtime, args| {
        runtime.console_event(ConsoleLevel::Error, args);
        Ok(Value::Undefined)
    });
    set_global_to(runtime, "console", Value::object(console));
}

//---------------------------------------------------------
//  TIMERS.
//---------------------------------------------------------

fn install_timers(runtime: &mut Runtime) {
    set_global_to(
        runtime,
        "setTimeout",
        Value::native("setTimeout", |runtime, args| {
            let callback = callback_arg(args, "setTimeout")?;
            let id = runtime.register_timer(callback, timer_delay(args.get(1)), TimerKind::Timeout);
            Ok(Value::Number(id as f64))
        }),
    );
    set_global_to(
        runtime,
        "setInterval",
        Value::native("setInterval", |runtime, args| {
            let callback = callback_arg(args, "setInterval")?;
            let id =
                runtime.register_timer(callback, timer_delay(args.get(1)), TimerKind::Interval);
            Ok(Value::Number(id as f64))
        }),
    );
    set_global_to(
        runtime,
        "clearTimeout",
        Value::native("clearTimeout", |runtime, args| {
            clear_timer_arg(runtime, args);
            Ok(Value::Undefined)
        }),
    );
    set_global_to(
        runtime,
        "clearInterval",
        Value::native("clearInterval", |runtime, args| {
            clear_timer_arg(runtime, args);
            Ok(Value::Undefined)
        }),
    );
    set_global_to(
        runtime,
        "queueMicrotask",
        Value::native("queueMicrotask", |runtime, args| {
            let callback = callback_arg(args, "queueMicrotask")?;
            let label = function_label(&callback, "queueMicrotask");
            runtime.schedule_microtask(
                &label,
                TaskSource::Microtask,
                Box::new(move |runtime| runtime.call_function(&callback, &[], None).map(|_| ())),
            );
            Ok(Value::Undefined)
        }),
    );
}

/// Delays clamp to `max(0, ms)`.
fn timer_delay(value: Option<&Value>) -> u64 {
    let delay = value.map_or(0.0, Value::to_number);
    if delay.is_finite() && delay > 0.0 {
        delay as u64
    } else {
        0
    }
}

fn clear_timer_arg(runtime: &mut Runtime, args: &[Value]) {
    let id = args.first().map_or(f64::NAN, Value::to_number);
    if id.is_finite() && id >= 0.0 {
        runtime.clear_timer(id as u64);
    }
}

//---------------------------------------------------------
//  PROMISE.
//---------------------------------------------------------

fn install_promise(runtime: &mut Runtime) {
    let constructor = Value::native("Promise", |runtime, args| {
        let executor = args
            .first()
            .filter(|value| value.is_callable())
            .cloned()
            .ok_or_else(|| JsException::from(JsError::type_error("Promise resolver is not a function")))?;

        let promise = runtime.new_promise();
        let resolve = {
            let promise = promise.clone();
            Value::native("resolve", move |runtime, args| {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                runtime.resolve_promise(&promise, value);
                Ok(Value::Undefined)
            })
        };
        let reject = {
            let promise = promise.clone();
            Value::native("reject", move |runtime, args| {
                let reason = args.first().cloned().unwrap_or(Value::Undefined);
                runtime.reject_promise(&promise, reason);
                Ok(Value::Undefined)
            })
        };

        // The executor runs synchronously; a throw inside rejects.
        if let Err(exception) = runtime.call_function(&executor, &[resolve, reject], None) {
            runtime.reject_promise(&promise, exception.value);
        }
        Ok(Value::Promise(promise))
    });

    if let Value::Native(native) = &constructor {
        let mut properties = native.properties.borrow_mut();
        properties.insert(
            "resolve".to_string(),
            Value::native("Promise.resolve", |runtime, args| {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                match value {
                    Value::Promise(promise) => Ok(Value::Promise(promise)),
                    other => Ok(Value::Promise(runtime.fulfilled_promise(other))),
                }
            }),
        );
        properties.insert(
            "reject".to_string(),
            Value::native("Promise.reject", |runtime, args| {
                let reason = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(Value::Promise(runtime.rejected_promise(reason)))
            }),
        );
        properties.insert(
            "all".to_string(),
            Value::native("Promise.all", |runtime, args| {
                let items = iterable_items(args.first())?;
                Ok(Value::Promise(runtime.promise_all(items)))
            }),
        );
        properties.insert(
            "race".to_string(),
            Value::native("Promise.race", |runtime, args| {
                let items = iterable_items(args.first())?;
                Ok(Value::Promise(runtime.promise_race(items)))
            }),
        );
    }

    set_global_to(runtime, "Promise", constructor);
}

fn iterable_items(value: Option<&Value>) -> Result<Vec<Value>, JsException> {
    match value {
        Some(Value::Array(items)) => Ok(items.borrow().clone()),
        other => Err(JsError::type_error(format!(
            "{} is not iterable",
            other.map_or_else(|| "undefined".to_string(), |value| value.stringify())
        ))
        .into()),
    }
}

//---------------------------------------------------------
//  MATH, JSON, ARRAY, DATE.
//---------------------------------------------------------

fn install_math(runtime: &mut Runtime) {
    let mut math = IndexMap::new();
    math.insert("PI".to_string(), Value::Number(std::f64::consts::PI));
    math.insert("E".to_string(), Value::Number(std::f64::consts::E));

    set_function_to(&mut math, "Math.floor", |_, args| {
        Ok(Value::Number(first_number(args).floor()))
    });
    set_function_to(&mut math, "Math.ceil", |_, args| {
        Ok(Value::Number(first_number(args).ceil()))
    });
    set_function_to(&mut math, "Math.round", |_, args| {
        // JS rounds halves toward positive infinity.
        Ok(Value::Number((first_number(args) + 0.5).floor()))
    });
    set_function_to(&mut math, "Math.abs", |_, args| {
        Ok(Value::Number(first_number(args).abs()))
    });
    set_function_to(&mut math, "Math.sqrt", |_, args| {
        Ok(Value::Number(first_number(args).sqrt()))
    });
    set_function_to(&mut math, "Math.pow", |_, args| {
        let base = args.first().map_or(f64::NAN, Value::to_number);
        let exponent = args.get(1).map_or(f64::NAN, Value::to_number);
        Ok(Value::Number(base.powf(exponent)))
    });
    set_function_to(&mut math, "Math.max", |_, args| {
        let mut best = f64::NEG_INFINITY;
        for arg in args {
            let number = arg.to_number();
            if number.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            best = best.max(number);
        }
        Ok(Value::Number(best))
    });
    set_function_to(&mut math, "Math.min", |_, args| {
        let mut best = f64::INFINITY;
        for arg in args {
            let number = arg.to_number();
            if number.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            best = best.min(number);
        }
        Ok(Value::Number(best))
    });
    set_function_to(&mut math, "Math.random", |runtime, _| {
        Ok(Value::Number(runtime.random()))
    });

    set_global_to(runtime, "Math", Value::object(math));
}

fn first_number(args: &[Value]) -> f64 {
    args.first().map_or(f64::NAN, Value::to_number)
}

fn install_json(runtime: &mut Runtime) {
    let mut json = IndexMap::new();
    set_function_to(&mut json, "JSON.stringify", |_, args| {
        match args.first() {
            None | Some(Value::Undefined) => Ok(Value::Undefined),
            Some(value) => {
                let encoded = serde_json::to_string(&value.to_json())
                    .map_err(|error| JsError::generic(error.to_string()))?;
                Ok(Value::String(encoded))
            }
        }
    });
    set_function_to(&mut json, "JSON.parse", |_, args| {
        let text = args.first().map_or_else(String::new, Value::stringify);
        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| JsError::generic(format!("Unexpected token in JSON: {text}")))?;
        Ok(json_to_value(&parsed))
    });
    set_global_to(runtime, "JSON", Value::object(json));
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(value) => Value::Bool(*value),
        serde_json::Value::Number(value) => Value::Number(value.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(value) => Value::String(value.clone()),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(entries) => {
            let mut properties = IndexMap::new();
            for (key, value) in entries {
                properties.insert(key.clone(), json_to_value(value));
            }
            Value::object(properties)
        }
    }
}

fn install_array(runtime: &mut Runtime) {
    let constructor = Value::native("Array", |_, args| match args {
        [Value::Number(length)] if length.fract() == 0.0 && *length >= 0.0 => {
            Ok(Value::array(vec![Value::Undefined; *length as usize]))
        }
        _ => Ok(Value::array(args.to_vec())),
    });

    if let Value::Native(native) = &constructor {
        let mut properties = native.properties.borrow_mut();
        properties.insert(
            "from".to_string(),
            Value::native("Array.from", |runtime, args| {
                let mut items = match args.first() {
                    Some(Value::Array(items)) => items.borrow().clone(),
                    Some(Value::String(text)) => text
                        .chars()
                        .map(|c| Value::String(c.to_string()))
                        .collect(),
                    other => {
                        return Err(JsError::type_error(format!(
                            "{} is not iterable",
                            other.map_or_else(|| "undefined".to_string(), Value::stringify)
                        ))
                        .into())
                    }
                };
                // The optional map function routes through the ordinary call
                // protocol, so it shows up on the traced stack.
                if let Some(mapper) = args.get(1).filter(|value| value.is_callable()) {
                    let mapper = mapper.clone();
                    for (index, item) in items.iter_mut().enumerate() {
                        *item = runtime.call_function(
                            &mapper,
                            &[item.clone(), Value::Number(index as f64)],
                            None,
                        )?;
                    }
                }
                Ok(Value::array(items))
            }),
        );
        properties.insert(
            "isArray".to_string(),
            Value::native("Array.isArray", |_, args| {
                Ok(Value::Bool(matches!(args.first(), Some(Value::Array(_)))))
            }),
        );
    }

    set_global_to(runtime, "Array", constructor);
}

fn install_date(runtime: &mut Runtime) {
    let mut date = IndexMap::new();
    set_function_to(&mut date, "Date.now", |runtime, _| {
        Ok(Value::Number(runtime.event_loop.now_ms as f64))
    });
    set_global_to(runtime, "Date", Value::object(date));
}

//---------------------------------------------------------
//  MODE-SPECIFIC GLOBALS.
//---------------------------------------------------------

fn install_node_globals(runtime: &mut Runtime) {
    let mut process = IndexMap::new();
    set_function_to(&mut process, "process.nextTick", |runtime, args| {
        let callback = callback_arg(args, "process.nextTick")?;
        let label = function_label(&callback, "process.nextTick");
        runtime.schedule_microtask(
            &label,
            TaskSource::NextTick,
            Box::new(move |runtime| runtime.call_function(&callback, &[], None).map(|_| ())),
        );
        Ok(Value::Undefined)
    });
    set_global_to(runtime, "process", Value::object(process));

    set_global_to(
        runtime,
        "setImmediate",
        Value::native("setImmediate", |runtime, args| {
            let callback = callback_arg(args, "setImmediate")?;
            let label = function_label(&callback, "setImmediate");
            runtime.schedule_check(
                &label,
                Box::new(move |runtime| runtime.call_function(&callback, &[], None).map(|_| ())),
            );
            Ok(Value::Undefined)
        }),
    );
}

fn install_browser_globals(runtime: &mut Runtime) {
    set_global_to(
        runtime,
        "requestAnimationFrame",
        Value::native("requestAnimationFrame", |runtime, args| {
            let callback = callback_arg(args, "requestAnimationFrame")?;
            let label = function_label(&callback, "requestAnimationFrame");
            runtime.schedule_macrotask(
                &label,
                TaskSource::AnimationFrame,
                Box::new(move |runtime| {
                    let timestamp = Value::Number(runtime.event_loop.now_ms as f64);
                    runtime.call_function(&callback, &[timestamp], None).map(|_| ())
                }),
            );
            Ok(Value::Undefined)
        }),
    );
}

//---------------------------------------------------------
//  ARRAY AND STRING METHODS.
//---------------------------------------------------------

impl Runtime {
    /// The pragmatic array method set; user callbacks go through the
    /// ordinary call protocol.
    pub fn call_array_method(
        &mut self,
        items: &ArrayRef,
        key: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, JsException> {
        match key {
            "push" => {
                items.borrow_mut().extend(args);
                Ok(Value::Number(items.borrow().len() as f64))
            }
            "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
            "shift" => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    Ok(Value::Undefined)
                } else {
                    Ok(items.remove(0))
                }
            }
            "unshift" => {
                let mut items = items.borrow_mut();
                for (index, value) in args.into_iter().enumerate() {
                    items.insert(index, value);
                }
                Ok(Value::Number(items.len() as f64))
            }
            "slice" => {
                let items = items.borrow();
                let length = items.len();
                let start = relative_index(args.first(), 0, length);
                let end = relative_index(args.get(1), length, length);
                Ok(Value::array(
                    items.get(start..end.max(start)).unwrap_or(&[]).to_vec(),
                ))
            }
            "join" => {
                let separator = args.first().map_or_else(|| ",".to_string(), Value::stringify);
                let joined: Vec<String> =
                    items.borrow().iter().map(Value::stringify).collect();
                Ok(Value::String(joined.join(&separator)))
            }
            "indexOf" => {
                let target = args.first().cloned().unwrap_or(Value::Undefined);
                let position = items
                    .borrow()
                    .iter()
                    .position(|item| item.strict_eq(&target));
                Ok(Value::Number(position.map_or(-1.0, |index| index as f64)))
            }
            "includes" => {
                let target = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(Value::Bool(
                    items.borrow().iter().any(|item| item.strict_eq(&target)),
                ))
            }
            "concat" => {
                let mut merged = items.borrow().clone();
                for arg in args {
                    match arg {
                        Value::Array(extra) => merged.extend(extra.borrow().iter().cloned()),
                        other => merged.push(other),
                    }
                }
                Ok(Value::array(merged))
            }
            "map" => {
                let callback = callback_arg(&args, "map")?;
                // Snapshot first: the callback may mutate the array.
                let snapshot = items.borrow().clone();
                let mut mapped = Vec::with_capacity(snapshot.len());
                for (index, item) in snapshot.into_iter().enumerate() {
                    mapped.push(self.call_function(
                        &callback,
                        &[item, Value::Number(index as f64)],
                        None,
                    )?);
                }
                Ok(Value::array(mapped))
            }
            "filter" => {
                let callback = callback_arg(&args, "filter")?;
                let snapshot = items.borrow().clone();
                let mut kept = Vec::new();
                for (index, item) in snapshot.into_iter().enumerate() {
                    let verdict = self.call_function(
                        &callback,
                        &[item.clone(), Value::Number(index as f64)],
                        None,
                    )?;
                    if verdict.is_truthy() {
                        kept.push(item);
                    }
                }
                Ok(Value::array(kept))
            }
            "forEach" => {
                let callback = callback_arg(&args, "forEach")?;
                let snapshot = items.borrow().clone();
                for (index, item) in snapshot.into_iter().enumerate() {
                    self.call_function(&callback, &[item, Value::Number(index as f64)], None)?;
                }
                Ok(Value::Undefined)
            }
            "reduce" => {
                let callback = callback_arg(&args, "reduce")?;
                let snapshot = items.borrow().clone();
                let mut iterator = snapshot.into_iter().enumerate();
                let mut accumulator = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iterator.next() {
                        Some((_, first)) => first,
                        None => {
                            let error = JsError::type_error(
                                "Reduce of empty array with no initial value",
                            );
                            return Err(self.exception_at(error, span));
                        }
                    },
                };
                for (index, item) in iterator {
                    accumulator = self.call_function(
                        &callback,
                        &[accumulator, item, Value::Number(index as f64)],
                        None,
                    )?;
                }
                Ok(accumulator)
            }
            _ => {
                let error = JsError::type_error(format!("{key} is not a function"));
                Err(self.exception_at(error, span))
            }
        }
    }

    /// The pragmatic string method set.
    pub fn call_string_method(
        &mut self,
        text: &str,
        key: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, JsException> {
        match key {
            "toUpperCase" => Ok(Value::String(text.to_uppercase())),
            "toLowerCase" => Ok(Value::String(text.to_lowercase())),
            "trim" => Ok(Value::String(text.trim().to_string())),
            "charAt" => {
                let index = args.first().map_or(0.0, Value::to_number);
                let index = if index.is_finite() && index >= 0.0 {
                    index as usize
                } else {
                    return Ok(Value::String(String::new()));
                };
                Ok(Value::String(
                    text.chars().nth(index).map_or_else(String::new, |c| c.to_string()),
                ))
            }
            "slice" => {
                let characters: Vec<char> = text.chars().collect();
                let length = characters.len();
                let start = relative_index(args.first(), 0, length);
                let end = relative_index(args.get(1), length, length);
                Ok(Value::String(
                    characters
                        .get(start..end.max(start))
                        .unwrap_or(&[])
                        .iter()
                        .collect(),
                ))
            }
            "split" => match args.first() {
                None | Some(Value::Undefined) => {
                    Ok(Value::array(vec![Value::String(text.to_string())]))
                }
                Some(separator) => {
                    let separator = separator.stringify();
                    let parts: Vec<Value> = if separator.is_empty() {
                        text.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        text.split(&separator)
                            .map(|part| Value::String(part.to_string()))
                            .collect()
                    };
                    Ok(Value::array(parts))
                }
            },
            "includes" => {
                let needle = args.first().map_or_else(String::new, Value::stringify);
                Ok(Value::Bool(text.contains(&needle)))
            }
            "indexOf" => {
                let needle = args.first().map_or_else(String::new, Value::stringify);
                let position = text
                    .find(&needle)
                    .map(|byte| text[..byte].chars().count());
                Ok(Value::Number(position.map_or(-1.0, |index| index as f64)))
            }
            "startsWith" => {
                let needle = args.first().map_or_else(String::new, Value::stringify);
                Ok(Value::Bool(text.starts_with(&needle)))
            }
            "endsWith" => {
                let needle = args.first().map_or_else(String::new, Value::stringify);
                Ok(Value::Bool(text.ends_with(&needle)))
            }
            "repeat" => {
                let count = args.first().map_or(0.0, Value::to_number);
                if !count.is_finite() || count < 0.0 {
                    let error = JsError::range("Invalid count value");
                    return Err(self.exception_at(error, span));
                }
                Ok(Value::String(text.repeat(count as usize)))
            }
            _ => {
                let error = JsError::type_error(format!("{key} is not a function"));
                Err(self.exception_at(error, span))
            }
        }
    }

}

/// Normalizes a possibly-negative slice index against `length`.
fn relative_index(value: Option<&Value>, default: usize, length: usize) -> usize {
    let Some(value) = value else { return default };
    let number = value.to_number();
    if number.is_nan() {
        return default;
    }
    if number < 0.0 {
        length.saturating_sub((-number) as usize)
    } else {
        (number as usize).min(length)
    }
}

//---------------------------------------------------------
//  NUMBER PARSING.
//---------------------------------------------------------

fn parse_int(text: &str, radix: u32) -> f64 {
    let text = text.trim();
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = if radix == 16 || radix == 0 {
        match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            Some(hex) => (16, hex),
            None => (if radix == 0 { 10 } else { radix }, rest),
        }
    } else {
        (radix, rest)
    };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut value = f64::NAN;
    for character in digits.chars() {
        match character.to_digit(radix) {
            Some(digit) => {
                value = if value.is_nan() { 0.0 } else { value };
                value = value * f64::from(radix) + f64::from(digit);
            }
            None => break,
        }
    }
    sign * value
}

fn parse_float(text: &str) -> f64 {
    let text = text.trim();
    // Longest numeric prefix wins, as in JS.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(index, character)| index + character.len_utf8())
        .collect();
    for boundary in boundaries.into_iter().rev() {
        if let Ok(value) = text[..boundary].parse::<f64>() {
            return value;
        }
    }
    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_follows_js_rules() {
        assert_eq!(parse_int("42px", 0), 42.0);
        assert_eq!(parse_int("  -17 ", 0), -17.0);
        assert_eq!(parse_int("0xff", 0), 255.0);
        assert_eq!(parse_int("1010", 2), 10.0);
        assert!(parse_int("px", 0).is_nan());
    }

    #[test]
    fn parse_float_takes_the_longest_prefix() {
        assert_eq!(parse_float("3.14rad"), 3.14);
        assert_eq!(parse_float("  2.5e2x"), 250.0);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn relative_indexes_clamp_and_wrap() {
        assert_eq!(relative_index(Some(&Value::Number(-2.0)), 0, 5), 3);
        assert_eq!(relative_index(Some(&Value::Number(99.0)), 0, 5), 5);
        assert_eq!(relative_index(None, 5, 5), 5);
    }
}
