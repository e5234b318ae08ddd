use crate::value::Value;
use colored::*;
use std::borrow::Cow;
use std::fmt::Display;

// A simple error type that lets the creator specify both the error message and
// the error class name.
#[derive(Debug, Clone, PartialEq)]
pub struct JsError {
    pub class: &'static str,
    pub message: Cow<'static, str>,
}

impl JsError {
    pub fn generic(message: impl Into<Cow<'static, str>>) -> JsError {
        JsError {
            class: "Error",
            message: message.into(),
        }
    }

    pub fn reference(message: impl Into<Cow<'static, str>>) -> JsError {
        JsError {
            class: "ReferenceError",
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<Cow<'static, str>>) -> JsError {
        JsError {
            class: "TypeError",
            message: message.into(),
        }
    }

    pub fn range(message: impl Into<Cow<'static, str>>) -> JsError {
        JsError {
            class: "RangeError",
            message: message.into(),
        }
    }

    /// Plain (uncolored) rendering, safe to embed into the trace.
    pub fn text(&self) -> String {
        format!("{}: {}", self.class, self.message)
    }
}

impl std::error::Error for JsError {}

impl Display for JsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.class.red().bold(), self.message)
    }
}

/// A thrown value unwinding through the interpreter.
///
/// Engine-raised errors (reference, type, range, …) and user `throw`
/// statements both travel through this carrier; the interpreter propagates
/// it with `?` until a `try/catch` handler or the top-level reporter
/// catches it.
#[derive(Debug, Clone)]
pub struct JsException {
    pub value: Value,
    pub line: Option<u32>,
}

impl JsException {
    /// Wraps a user-thrown value.
    pub fn from_value(value: Value, line: Option<u32>) -> JsException {
        JsException { value, line }
    }

    /// Stringified form, used by `CONSOLE_ERROR` steps and the error list.
    pub fn text(&self) -> String {
        self.value.stringify()
    }
}

impl From<JsError> for JsException {
    fn from(error: JsError) -> JsException {
        JsException {
            value: Value::String(error.text()),
            line: None,
        }
    }
}

impl Display for JsException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} {} (line {})", "Uncaught".red().bold(), self.text(), line),
            None => write!(f, "{} {}", "Uncaught".red().bold(), self.text()),
        }
    }
}

/// Represents a syntax error coming from the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl std::error::Error for ParseError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({}:{})",
            "SyntaxError".red().bold(),
            self.message,
            self.line,
            self.column
        )
    }
}

impl ParseError {
    /// Plain (uncolored) rendering, safe to embed into the trace.
    pub fn text(&self) -> String {
        format!("SyntaxError: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_is_uncolored() {
        let error = JsError::reference("x is not defined");
        assert_eq!(error.text(), "ReferenceError: x is not defined");
    }

    #[test]
    fn exception_carries_thrown_value() {
        let exception = JsException::from_value(Value::Number(42.0), Some(3));
        assert_eq!(exception.text(), "42");
        assert_eq!(exception.line, Some(3));
    }
}
