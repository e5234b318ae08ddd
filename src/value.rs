use crate::errors::JsException;
use crate::promise::SimPromise;
use crate::runtime::Runtime;
use crate::scope::ScopeRef;
use indexmap::IndexMap;
use serde_json::json;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use swc_ecma_ast::BlockStmt;
use swc_ecma_ast::Expr;

/// Shared handle types for the reference-typed values.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;
pub type PromiseRef = Rc<RefCell<SimPromise>>;

/// Signature shared by every Rust-implemented global.
pub type NativeFn = Box<dyn Fn(&mut Runtime, &[Value]) -> Result<Value, JsException>>;

// Composite values deeper than this render as an ellipsis, which also keeps
// the stringifier safe on cyclic object graphs.
const MAX_RENDER_DEPTH: usize = 6;

/// A JavaScript value as the interpreter sees it.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<JsFunction>),
    Native(Rc<NativeFunction>),
    Promise(PromiseRef),
}

/// A user-defined function; immutable once created.
pub struct JsFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FunctionBody,
    pub scope: ScopeRef,
    pub is_async: bool,
    pub is_arrow: bool,
    pub line: u32,
}

#[derive(Clone)]
pub enum FunctionBody {
    Block(Rc<BlockStmt>),
    Expr(Rc<Expr>),
}

/// A Rust-implemented function exposed to the interpreted program.
///
/// The property table lets a callable double as a namespace, which is how
/// `Promise.resolve` and friends hang off the `Promise` constructor.
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
    pub properties: RefCell<IndexMap<String, Value>>,
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(properties)))
    }

    pub fn native<F>(name: &'static str, func: F) -> Value
    where
        F: Fn(&mut Runtime, &[Value]) -> Result<Value, JsException> + 'static,
    {
        Value::Native(Rc::new(NativeFunction {
            name,
            func: Box::new(func),
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// The `typeof` tag for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) | Value::Promise(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(value) => *value,
            Value::Number(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
            _ => true,
        }
    }

    /// Numeric coercion for arithmetic and comparisons.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(value) => f64::from(*value),
            Value::Number(value) => *value,
            Value::String(value) => string_to_number(value),
            _ => f64::NAN,
        }
    }

    /// ToInt32 for the bitwise operators.
    pub fn to_int32(&self) -> i32 {
        let number = self.to_number();
        if !number.is_finite() || number == 0.0 {
            return 0;
        }
        let modulo = number.trunc().rem_euclid(4_294_967_296.0);
        if modulo >= 2_147_483_648.0 {
            (modulo - 4_294_967_296.0) as i32
        } else {
            modulo as i32
        }
    }

    /// ToUint32, used by the unsigned right shift.
    pub fn to_uint32(&self) -> u32 {
        let number = self.to_number();
        if !number.is_finite() || number == 0.0 {
            return 0;
        }
        number.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    /// Strict equality (`===`).
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Loose equality (`==`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_)) => self.strict_eq(other),
            (
                Value::Number(_) | Value::String(_) | Value::Bool(_),
                Value::Number(_) | Value::String(_) | Value::Bool(_),
            ) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Renders the value the way `console.log` and string concatenation do.
    pub fn stringify(&self) -> String {
        self.render(0)
    }

    fn render(&self, depth: usize) -> String {
        if depth > MAX_RENDER_DEPTH {
            return "…".into();
        }
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(value) => value.to_string(),
            Value::Number(value) => format_number(*value),
            Value::String(value) => value.clone(),
            Value::Array(items) => {
                let items = items.borrow();
                let inner: Vec<String> = items.iter().map(|v| v.render(depth + 1)).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Object(properties) => {
                let properties = properties.borrow();
                if properties.is_empty() {
                    return "{}".into();
                }
                let inner: Vec<String> = properties
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.render(depth + 1)))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Value::Function(function) => {
                let name = function.name.as_deref().unwrap_or("anonymous");
                format!("[Function: {name}]")
            }
            Value::Native(function) => format!("[Function: {}]", function.name),
            Value::Promise(promise) => {
                format!("Promise {{<{}>}}", promise.borrow().state_name())
            }
        }
    }

    /// JSON projection of the value for the `raw` side of `CONSOLE_*` steps.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_depth(0)
    }

    fn to_json_depth(&self, depth: usize) -> serde_json::Value {
        if depth > MAX_RENDER_DEPTH {
            return json!("…");
        }
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(value) => json!(value),
            Value::Number(value) if value.is_finite() => json!(value),
            Value::Number(value) => json!(format_number(*value)),
            Value::String(value) => json!(value),
            Value::Array(items) => {
                let items = items.borrow();
                serde_json::Value::Array(items.iter().map(|v| v.to_json_depth(depth + 1)).collect())
            }
            Value::Object(properties) => {
                let properties = properties.borrow();
                let entries = properties
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json_depth(depth + 1)))
                    .collect();
                serde_json::Value::Object(entries)
            }
            Value::Function(_) | Value::Native(_) | Value::Promise(_) => json!(self.stringify()),
        }
    }
}

/// JS-flavoured rendering of an f64: integers print without a fraction,
/// the non-finite values use their JavaScript spellings.
pub fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".into();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if number == 0.0 {
        return "0".into();
    }
    format!("{number}")
}

fn string_to_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(0))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("is_async", &self.is_async)
            .field("is_arrow", &self.is_arrow)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numeric_coercion_follows_js_rules() {
        assert_eq!(Value::String("  42 ".into()).to_number(), 42.0);
        assert_eq!(Value::String("".into()).to_number(), 0.0);
        assert!(Value::String("banana".into()).to_number().is_nan());
        assert_eq!(Value::String("0x10".into()).to_number(), 16.0);
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Bool(true).to_number(), 1.0);
    }

    #[test]
    fn int32_wraps_like_js() {
        assert_eq!(Value::Number(4_294_967_296.0).to_int32(), 0);
        assert_eq!(Value::Number(2_147_483_648.0).to_int32(), -2_147_483_648);
        assert_eq!(Value::Number(-1.5).to_int32(), -1);
        assert_eq!(Value::Number(f64::NAN).to_int32(), 0);
    }

    #[test]
    fn numbers_render_without_trailing_fraction() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn composites_stringify_recursively() {
        let array = Value::array(vec![
            Value::Number(1.0),
            Value::String("two".into()),
            Value::array(vec![Value::Number(3.0)]),
        ]);
        assert_eq!(array.stringify(), "[1, two, [3]]");

        let mut properties = IndexMap::new();
        properties.insert("a".to_string(), Value::Number(1.0));
        properties.insert("b".to_string(), Value::Undefined);
        assert_eq!(Value::object(properties).stringify(), "{a: 1, b: undefined}");
    }

    #[test]
    fn equality_distinguishes_loose_and_strict() {
        let one = Value::Number(1.0);
        let one_text = Value::String("1".into());
        assert!(one.loose_eq(&one_text));
        assert!(!one.strict_eq(&one_text));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));

        let shared = Value::array(vec![]);
        assert!(shared.strict_eq(&shared.clone()));
        assert!(!Value::array(vec![]).strict_eq(&Value::array(vec![])));
    }
}
