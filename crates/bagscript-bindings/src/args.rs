//! Argument and attribute value checking

use rhai::{Array, Blob, Dynamic, ImmutableString, Map, FLOAT, INT};

use crate::adapters::Foreign;
use crate::error::{BindingError, Result};

/// A native value that can be taken out of a script value
pub trait FromDynamic: Sized {
    /// Type name used in error messages
    const EXPECTED: &'static str;

    fn from_dynamic(value: &Dynamic) -> Option<Self>;
}

impl FromDynamic for String {
    const EXPECTED: &'static str = "string";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        if value.is::<ImmutableString>() {
            value.clone().into_string().ok()
        } else {
            None
        }
    }
}

impl FromDynamic for INT {
    const EXPECTED: &'static str = "int";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.as_int().ok()
    }
}

/// Accepts ints as well
impl FromDynamic for FLOAT {
    const EXPECTED: &'static str = "number";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value
            .as_float()
            .ok()
            .or_else(|| value.as_int().ok().map(|i| i as FLOAT))
    }
}

impl FromDynamic for bool {
    const EXPECTED: &'static str = "bool";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.as_bool().ok()
    }
}

impl FromDynamic for char {
    const EXPECTED: &'static str = "char";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.as_char().ok()
    }
}

impl FromDynamic for Map {
    const EXPECTED: &'static str = "map";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.clone().try_cast::<Map>()
    }
}

impl FromDynamic for Array {
    const EXPECTED: &'static str = "array";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.clone().try_cast::<Array>()
    }
}

impl FromDynamic for Blob {
    const EXPECTED: &'static str = "blob";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.clone().try_cast::<Blob>()
    }
}

impl FromDynamic for Foreign {
    const EXPECTED: &'static str = "foreign object";

    fn from_dynamic(value: &Dynamic) -> Option<Self> {
        value.clone().try_cast::<Foreign>()
    }
}

/// Type name of a script value as shown in error messages. Foreign values
/// report their type tag.
pub fn dynamic_type_name(value: &Dynamic) -> String {
    if let Some(foreign) = value.clone().try_cast::<Foreign>() {
        return foreign.object().type_tag().to_string();
    }
    let name = if value.is::<INT>() {
        "int"
    } else if value.is::<FLOAT>() {
        "float"
    } else if value.is::<ImmutableString>() {
        "string"
    } else if value.is::<bool>() {
        "bool"
    } else if value.is::<Map>() {
        "map"
    } else if value.is::<Array>() {
        "array"
    } else if value.is::<Blob>() {
        "blob"
    } else if value.is::<char>() {
        "char"
    } else if value.is::<()>() {
        "nil"
    } else {
        return value.type_name().to_string();
    };
    name.to_string()
}

/// Text form of any script value, foreign values through their display
pub fn display_value(value: &Dynamic) -> String {
    if let Some(foreign) = value.read_lock::<Foreign>() {
        return foreign.object().display();
    }
    if value.is::<()>() {
        return "nil".to_string();
    }
    value.to_string()
}

/// Check a single value, for attribute assignment
pub fn expect<T: FromDynamic>(value: &Dynamic, context: &str) -> Result<T> {
    T::from_dynamic(value)
        .ok_or_else(|| BindingError::argument_type(context, T::EXPECTED, dynamic_type_name(value)))
}

/// Positional arguments of one builtin call
pub struct Args<'a> {
    function: &'a str,
    values: &'a [Dynamic],
}

impl<'a> Args<'a> {
    pub fn new(function: &'a str, values: &'a [Dynamic]) -> Self {
        Args { function, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn context(&self, index: usize, label: &str) -> String {
        format!("{}() argument {} ({})", self.function, index + 1, label)
    }

    /// Required argument. Arity is checked before the builtin runs, so a
    /// missing value reads as nil here.
    pub fn get<T: FromDynamic>(&self, index: usize, label: &str) -> Result<T> {
        let value = self.values.get(index).cloned().unwrap_or(Dynamic::UNIT);
        expect(&value, &self.context(index, label))
    }

    /// Optional trailing argument
    pub fn opt<T: FromDynamic>(&self, index: usize, label: &str) -> Result<Option<T>> {
        match self.values.get(index) {
            None => Ok(None),
            Some(value) => expect(value, &self.context(index, label)).map(Some),
        }
    }

    pub fn raw(&self, index: usize) -> Option<&'a Dynamic> {
        self.values.get(index)
    }

    /// Arguments from `index` on
    pub fn rest(&self, index: usize) -> &'a [Dynamic] {
        self.values.get(index..).unwrap_or_default()
    }

    /// Error for an argument of the wrong type detected by the caller
    pub fn type_error(&self, index: usize, label: &str, expected: &str) -> BindingError {
        let got = self
            .values
            .get(index)
            .map(dynamic_type_name)
            .unwrap_or_else(|| "nil".to_string());
        BindingError::argument_type(self.context(index, label), expected, got)
    }
}
