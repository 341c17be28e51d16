//! Error types for the binding layer

use std::fmt;

use bagscript_engine::EngineError;
use thiserror::Error;

/// Number of arguments a builtin accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

/// Errors raised while validating, converting or delegating script calls
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("{function}() takes {expected} arguments, got {got}")]
    ArgumentCount {
        function: String,
        expected: Arity,
        got: usize,
    },

    #[error("{context} expects {expected}, got {got}")]
    ArgumentType {
        context: String,
        expected: String,
        got: String,
    },

    #[error("cannot convert {found} at {path}")]
    Conversion { path: String, found: String },

    #[error("{type_tag} has no attribute {name}: {reason}")]
    UnsupportedAttribute {
        type_tag: String,
        name: String,
        reason: String,
    },

    #[error("operation {op} not supported on {type_tag}")]
    UnsupportedOperation { type_tag: String, op: String },

    #[error("{function}() failed: {message}")]
    NativeOperation { function: String, message: String },

    #[error("evaluation cost limit of {limit} exceeded")]
    CostLimit { limit: u64 },
}

impl BindingError {
    /// Name of the error in the script-visible taxonomy
    pub fn kind(&self) -> &'static str {
        match self {
            BindingError::ArgumentCount { .. } => "ArgumentCountError",
            BindingError::ArgumentType { .. } => "ArgumentTypeError",
            BindingError::Conversion { .. } => "ConversionError",
            BindingError::UnsupportedAttribute { .. } => "UnsupportedAttributeError",
            BindingError::UnsupportedOperation { .. } => "UnsupportedOperationError",
            BindingError::NativeOperation { .. } => "NativeOperationError",
            BindingError::CostLimit { .. } => "CostLimitError",
        }
    }

    pub fn argument_type(context: impl Into<String>, expected: impl Into<String>, got: impl Into<String>) -> Self {
        BindingError::ArgumentType {
            context: context.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn unsupported_attribute(type_tag: &str, name: &str, reason: impl Into<String>) -> Self {
        BindingError::UnsupportedAttribute {
            type_tag: type_tag.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn read_only(type_tag: &str, name: &str) -> Self {
        Self::unsupported_attribute(type_tag, name, "attribute is read-only")
    }

    pub fn unknown_attribute(type_tag: &str, name: &str) -> Self {
        Self::unsupported_attribute(type_tag, name, "unknown attribute")
    }

    /// Wrap a native engine failure, keeping its message
    pub fn native(function: &str, err: EngineError) -> Self {
        BindingError::NativeOperation {
            function: function.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindingError>;

/// Errors surfaced by [`crate::ScriptEngine`]
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script compilation failed
    #[error("Script compilation error: {0}")]
    Compile(String),

    /// Script raised a binding error that was not caught
    #[error("{kind}: {message}")]
    Binding { kind: String, message: String },

    /// Any other runtime failure reported by rhai
    #[error("Script execution error: {0}")]
    Execution(String),
}

impl ScriptError {
    /// Taxonomy name for binding errors, `None` for other failures
    pub fn kind(&self) -> Option<&str> {
        match self {
            ScriptError::Binding { kind, .. } => Some(kind),
            ScriptError::Compile(_) | ScriptError::Execution(_) => None,
        }
    }
}
