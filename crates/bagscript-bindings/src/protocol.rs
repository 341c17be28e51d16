//! The capability contract every script-visible native value implements.

use std::fmt;
use std::rc::Rc;

use rhai::Dynamic;

use crate::adapters::Foreign;
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};

/// Binary operators a foreign value may define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Stable type tag, display and cost hint
pub trait Identified {
    fn type_tag(&self) -> &'static str;

    /// Human readable form; never fails and never mutates
    fn display(&self) -> String;

    /// Relative evaluation cost charged against the budget
    fn cost(&self) -> u64 {
        0
    }

    /// Address of the shared native object for handles, `None` for values
    fn identity(&self) -> Option<usize> {
        None
    }
}

/// Access to the wrapped native value
pub trait Wrapper {
    type Native;

    fn native(&self) -> Self::Native;
}

/// Attribute read and write.
///
/// `get_attribute` returns `None` for unknown names so the caller can raise
/// a uniform error. `set_attribute` validates the value before touching the
/// native object.
pub trait AttributeAccessible: Identified {
    fn get_attribute(&self, name: &str) -> Option<Dynamic>;

    fn set_attribute(&self, _ctx: &Context, name: &str, _value: Dynamic) -> Result<()> {
        Err(if self.get_attribute(name).is_some() {
            BindingError::read_only(self.type_tag(), name)
        } else {
            BindingError::unknown_attribute(self.type_tag(), name)
        })
    }
}

pub trait Comparable {
    fn equals(&self, _other: &Foreign) -> bool {
        false
    }
}

pub trait Truthy {
    fn is_truthy(&self) -> bool {
        true
    }
}

pub trait Operable: Identified {
    fn apply_operator(&self, op: BinaryOp, _rhs: &Dynamic) -> Result<Dynamic> {
        Err(BindingError::UnsupportedOperation {
            type_tag: self.type_tag().to_string(),
            op: op.symbol().to_string(),
        })
    }
}

/// Everything the runtime needs from a foreign value
pub trait ForeignObject: AttributeAccessible + Comparable + Truthy + Operable {}

impl<T> ForeignObject for T where T: AttributeAccessible + Comparable + Truthy + Operable {}

/// Declares the attribute table of an adapter: plain fields and methods.
/// Methods are returned as [`Builtin`] values by `get_attribute`.
macro_rules! attributes {
    (
        $(#[$meta:meta])*
        $name:ident {
            fields { $($field:ident => $field_name:literal),* $(,)? }
            methods { $($method:ident => $method_name:literal),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(crate) enum $name {
            $($field,)*
            $($method,)*
        }

        #[allow(dead_code)]
        impl $name {
            pub(crate) const FIELDS: &'static [&'static str] = &[$($field_name),*];
            pub(crate) const METHODS: &'static [&'static str] = &[$($method_name),*];

            pub(crate) fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($field_name => Some($name::$field),)*
                    $($method_name => Some($name::$method),)*
                    _ => None,
                }
            }

            pub(crate) fn name(self) -> &'static str {
                match self {
                    $($name::$field => $field_name,)*
                    $($name::$method => $method_name,)*
                }
            }

            pub(crate) fn is_method(self) -> bool {
                Self::METHODS.contains(&self.name())
            }
        }
    };
}

pub(crate) use attributes;

type NativeFn = dyn Fn(&Context, &[Dynamic]) -> Result<Dynamic>;

/// A callable attribute: arity check, argument checks, delegation
#[derive(Clone)]
pub struct Builtin {
    name: Rc<str>,
    arity: Arity,
    func: Rc<NativeFn>,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Builtin {
    pub fn new(
        name: &str,
        arity: Arity,
        func: impl Fn(&Context, &[Dynamic]) -> Result<Dynamic> + 'static,
    ) -> Self {
        Builtin {
            name: Rc::from(name),
            arity,
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, ctx: &Context, args: &[Dynamic]) -> Result<Dynamic> {
        if !self.arity.accepts(args.len()) {
            return Err(BindingError::ArgumentCount {
                function: self.name.to_string(),
                expected: self.arity,
                got: args.len(),
            });
        }
        (self.func)(ctx, args)
    }
}

/// Builtin wrapped as a script value
pub fn method(
    name: &str,
    arity: Arity,
    func: impl Fn(&Context, &[Dynamic]) -> Result<Dynamic> + 'static,
) -> Dynamic {
    Dynamic::from(Foreign::Builtin(Builtin::new(name, arity, func)))
}

attributes! {
    BuiltinAttr {
        fields { Name => "name", Arity => "arity" }
        methods {}
    }
}

impl Identified for Builtin {
    fn type_tag(&self) -> &'static str {
        "builtin"
    }

    fn display(&self) -> String {
        format!("builtin({})", self.name)
    }
}

impl AttributeAccessible for Builtin {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match BuiltinAttr::from_name(name)? {
            BuiltinAttr::Name => Some(self.name.to_string().into()),
            BuiltinAttr::Arity => Some(self.arity.to_string().into()),
        }
    }
}

impl Comparable for Builtin {}
impl Truthy for Builtin {}
impl Operable for Builtin {}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Builtin {
        Builtin::new("test.echo", Arity::Range(1, 2), |_ctx, args| Ok(args[0].clone()))
    }

    #[test]
    fn test_builtin_checks_arity() {
        let ctx = Context::default();
        let err = echo().call(&ctx, &[]).unwrap_err();
        assert_eq!(err.kind(), "ArgumentCountError");
        assert_eq!(err.to_string(), "test.echo() takes 1 to 2 arguments, got 0");
        let value = echo().call(&ctx, &[Dynamic::from(5_i64)]).unwrap();
        assert_eq!(value.as_int().unwrap(), 5);
    }

    #[test]
    fn test_builtin_attributes() {
        let builtin = echo();
        assert_eq!(builtin.display(), "builtin(test.echo)");
        let name = builtin.get_attribute("name").unwrap();
        assert_eq!(name.into_string().unwrap(), "test.echo");
        assert!(builtin.get_attribute("missing").is_none());
    }

    #[test]
    fn test_default_set_attribute_errors() {
        let ctx = Context::default();
        let builtin = echo();
        let err = builtin
            .set_attribute(&ctx, "name", Dynamic::from("x"))
            .unwrap_err();
        assert!(matches!(err, BindingError::UnsupportedAttribute { ref reason, .. } if reason == "attribute is read-only"));
        let err = builtin
            .set_attribute(&ctx, "colour", Dynamic::from("x"))
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedAttributeError");
    }

    #[test]
    fn test_default_operator_unsupported() {
        let err = echo()
            .apply_operator(BinaryOp::Add, &Dynamic::from(1_i64))
            .unwrap_err();
        assert_eq!(err.kind(), "UnsupportedOperationError");
    }
}
