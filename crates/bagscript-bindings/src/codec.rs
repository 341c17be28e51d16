//! Conversion between script values and the native PDF primitive tree.
//!
//! Script to native accepts strings, ints, names, object numbers, maps
//! with any of these (and arrays) as values, and arrays of scalars. Names
//! only come from `pdf::name(..)` values; a string is always a string,
//! whatever it starts with. Everything else is a
//! [`BindingError::Conversion`] naming the key path, and no partial result
//! is returned. Native to script matches every [`PdfValue`] variant.

use bagscript_engine::pdf::{Dict, Name, ObjectNumber, PdfValue};
use rhai::{Array, Dynamic, ImmutableString, Map, FLOAT, INT};

use crate::adapters::pdf::{NameValue, ObjectNumberValue};
use crate::adapters::Foreign;
use crate::args::{dynamic_type_name, FromDynamic};
use crate::error::{BindingError, Result};

fn conversion(path: &str, value: &Dynamic) -> BindingError {
    BindingError::Conversion {
        path: if path.is_empty() { "top level".to_string() } else { path.to_string() },
        found: dynamic_type_name(value),
    }
}

/// Scalars allowed anywhere: string, name, int, object reference
fn scalar(value: &Dynamic, path: &str, allow_float: bool) -> Result<PdfValue> {
    if let Ok(i) = value.as_int() {
        return Ok(PdfValue::Int(i));
    }
    if allow_float {
        if let Ok(f) = value.as_float() {
            return Ok(PdfValue::Float(f));
        }
    }
    if value.is::<ImmutableString>() {
        let text = value.clone().into_string().map_err(|_| conversion(path, value))?;
        return Ok(PdfValue::String(text));
    }
    if let Some(name) = Name::from_dynamic(value) {
        return Ok(PdfValue::Name(name));
    }
    if let Some(number) = ObjectNumber::from_dynamic(value) {
        return Ok(PdfValue::Ref(number));
    }
    Err(conversion(path, value))
}

fn convert(value: &Dynamic, path: &str) -> Result<PdfValue> {
    if let Some(map) = value.read_lock::<Map>() {
        return map_to_dict(&map, path).map(PdfValue::Dict);
    }
    if let Some(array) = value.read_lock::<Array>() {
        return array_to_native(&array, path, false).map(PdfValue::Array);
    }
    scalar(value, path, false)
}

fn map_to_dict(map: &Map, prefix: &str) -> Result<Dict> {
    let mut dict = Dict::new();
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        };
        let converted = convert(value, &path)?;
        dict.insert(Name::new(key.as_str()), converted);
    }
    Ok(dict)
}

fn array_to_native(array: &Array, prefix: &str, allow_float: bool) -> Result<Vec<PdfValue>> {
    array
        .iter()
        .enumerate()
        .map(|(i, item)| scalar(item, &format!("{}[{}]", prefix, i), allow_float))
        .collect()
}

/// Convert any accepted script value
pub fn script_to_native(value: &Dynamic) -> Result<PdfValue> {
    convert(value, "")
}

/// Convert a script map into a dictionary. Either every entry converts or
/// an error is returned.
pub fn script_to_dict(map: &Map) -> Result<Dict> {
    map_to_dict(map, "")
}

/// Convert a script array of scalars. `allow_float` admits numbers for
/// arrays such as boxes and matrices.
pub fn script_to_array(array: &Array, allow_float: bool) -> Result<Vec<PdfValue>> {
    array_to_native(array, "", allow_float)
}

pub fn native_to_script(value: &PdfValue) -> Dynamic {
    match value {
        PdfValue::Null => Dynamic::UNIT,
        PdfValue::Bool(b) => Dynamic::from(*b),
        PdfValue::Int(i) => Dynamic::from(*i as INT),
        PdfValue::Float(f) => Dynamic::from(*f as FLOAT),
        PdfValue::String(s) => Dynamic::from(s.clone()),
        PdfValue::Name(n) => Dynamic::from(Foreign::Name(NameValue(n.clone()))),
        PdfValue::Array(items) => Dynamic::from_array(items.iter().map(native_to_script).collect()),
        PdfValue::Dict(dict) => Dynamic::from_map(dict_to_map(dict)),
        PdfValue::Ref(number) => Dynamic::from(Foreign::ObjectNumber(ObjectNumberValue(*number))),
    }
}

pub fn dict_to_map(dict: &Dict) -> Map {
    dict.iter()
        .map(|(key, value)| (key.as_str().into(), native_to_script(value)))
        .collect()
}
