//! Registration of the [`Foreign`] type with rhai: attribute access,
//! method calls, operators, iteration and the script helpers.
//!
//! Every binding error crosses into rhai as a runtime error carrying the
//! map `#{kind, message}`, so scripts can inspect `e.kind` in a `catch`.

use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Position, FLOAT, INT};

use crate::adapters::Foreign;
use crate::args::dynamic_type_name;
use crate::context::Context;
use crate::error::{BindingError, Result};
use crate::protocol::{BinaryOp, ForeignObject};

pub(crate) type RhaiResult = std::result::Result<Dynamic, Box<EvalAltResult>>;

/// Turn a binding error into a catchable rhai error
pub fn to_rhai(err: BindingError) -> Box<EvalAltResult> {
    tracing::debug!(kind = err.kind(), "{}", err);
    let mut map = Map::new();
    map.insert("kind".into(), err.kind().into());
    map.insert("message".into(), err.to_string().into());
    EvalAltResult::ErrorRuntime(Dynamic::from_map(map), Position::NONE).into()
}

/// Hand a builtin result to the script, charging the cost hint of the
/// returned value against the budget
pub(crate) fn deliver(ctx: &Context, result: Result<Dynamic>) -> RhaiResult {
    let value = result.map_err(to_rhai)?;
    let cost = value
        .read_lock::<Foreign>()
        .map(|f| f.object().cost())
        .unwrap_or(0);
    if cost > 0 {
        ctx.charge(cost).map_err(to_rhai)?;
    }
    Ok(value)
}

/// Resolve `name` on `obj` and call it if it is a builtin
fn call_method(ctx: &Context, obj: &Foreign, name: &str, args: Vec<Dynamic>) -> RhaiResult {
    let object = obj.object();
    let attribute = object
        .get_attribute(name)
        .ok_or_else(|| to_rhai(BindingError::unknown_attribute(object.type_tag(), name)))?;
    match attribute.try_cast::<Foreign>() {
        Some(Foreign::Builtin(builtin)) => deliver(ctx, builtin.call(ctx, &args)),
        _ => Err(to_rhai(BindingError::UnsupportedOperation {
            type_tag: object.type_tag().to_string(),
            op: format!("call {}", name),
        })),
    }
}

fn invoke(ctx: &Context, callee: &Foreign, args: Vec<Dynamic>) -> RhaiResult {
    match callee {
        Foreign::Builtin(builtin) => deliver(ctx, builtin.call(ctx, &args)),
        other => Err(to_rhai(BindingError::UnsupportedOperation {
            type_tag: other.object().type_tag().to_string(),
            op: "invoke".to_string(),
        })),
    }
}

/// Truthiness of any script value
pub fn is_truthy(value: &Dynamic) -> bool {
    if let Some(foreign) = value.read_lock::<Foreign>() {
        return foreign.object().is_truthy();
    }
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(i) = value.as_int() {
        return i != 0;
    }
    if let Ok(f) = value.as_float() {
        return f != 0.0;
    }
    if value.is::<()>() {
        return false;
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return !s.is_empty();
    }
    true
}

/// Type tag of a foreign value, or the plain type name
pub fn type_tag(value: &Dynamic) -> String {
    dynamic_type_name(value)
}

macro_rules! register_method_arities {
    ($engine:expr, $ctx:expr, $name:expr; $(($($arg:ident),*)),+) => {
        $({
            let ctx = $ctx.clone();
            let name: &'static str = $name;
            $engine.register_fn(name, move |obj: Foreign, $($arg: Dynamic),*| -> RhaiResult {
                call_method(&ctx, &obj, name, vec![$($arg),*])
            });
        })+
    };
}

macro_rules! register_invoke_arities {
    ($engine:expr, $ctx:expr; $(($($arg:ident),*)),+) => {
        $({
            let ctx = $ctx.clone();
            $engine.register_fn("invoke", move |callee: Foreign, $($arg: Dynamic),*| -> RhaiResult {
                invoke(&ctx, &callee, vec![$($arg),*])
            });
        })+
    };
}

/// Structural equality of two script values. Handles compare by identity,
/// value types through `equals`.
fn same_value(a: &Dynamic, b: &Dynamic) -> bool {
    match (a.read_lock::<Foreign>(), b.read_lock::<Foreign>()) {
        (Some(x), Some(y)) => {
            return match (x.object().identity(), y.object().identity()) {
                (Some(i), Some(j)) => i == j,
                (None, None) => x.object().equals(&y),
                _ => false,
            };
        }
        (None, None) => {}
        _ => return false,
    }
    if a.type_name() != b.type_name() {
        return false;
    }
    if a.is::<()>() {
        return true;
    }
    if let (Ok(x), Ok(y)) = (a.as_bool(), b.as_bool()) {
        return x == y;
    }
    if let (Ok(x), Ok(y)) = (a.as_int(), b.as_int()) {
        return x == y;
    }
    if let (Ok(x), Ok(y)) = (a.as_float(), b.as_float()) {
        return x == y;
    }
    if let (Ok(x), Ok(y)) = (a.as_char(), b.as_char()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.read_lock::<ImmutableString>(), b.read_lock::<ImmutableString>()) {
        return *x == *y;
    }
    if let (Some(x), Some(y)) = (a.read_lock::<Array>(), b.read_lock::<Array>()) {
        return x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| same_value(l, r));
    }
    if let (Some(x), Some(y)) = (a.read_lock::<Map>(), b.read_lock::<Map>()) {
        return x.len() == y.len()
            && x.iter().all(|(k, l)| y.get(k).is_some_and(|r| same_value(l, r)));
    }
    false
}

/// rhai stores a property back after any method call reached through it
/// (`doc.pages.len()`, `doc.pdf_writer.info = ..`). Storing the value the
/// attribute already holds is a no-op, on read-only attributes too.
fn is_write_back(object: &dyn ForeignObject, name: &str, value: &Dynamic) -> bool {
    object
        .get_attribute(name)
        .is_some_and(|current| same_value(&current, value))
}

fn operator(lhs: &Foreign, op: BinaryOp, rhs: &Dynamic) -> RhaiResult {
    lhs.object().apply_operator(op, rhs).map_err(to_rhai)
}

/// Register the foreign type and everything that works on it.
///
/// Methods take the receiver by value: a handle clone shares the native
/// object, and rhai does not try to store a by-value receiver back.
pub fn register(engine: &mut Engine, ctx: &Rc<Context>) {
    engine.register_type_with_name::<Foreign>("Foreign");

    // attribute access; rhai also falls back to the indexer for `obj.name`
    engine.register_indexer_get(|obj: &mut Foreign, name: ImmutableString| -> RhaiResult {
        let object = obj.object();
        object
            .get_attribute(&name)
            .ok_or_else(|| to_rhai(BindingError::unknown_attribute(object.type_tag(), &name)))
    });
    let set_ctx = ctx.clone();
    engine.register_indexer_set(
        move |obj: &mut Foreign, name: ImmutableString, value: Dynamic| -> std::result::Result<(), Box<EvalAltResult>> {
            let object = obj.object();
            if is_write_back(object, &name, &value) {
                return Ok(());
            }
            object.set_attribute(&set_ctx, &name, value).map_err(to_rhai)
        },
    );

    for name in Foreign::method_names() {
        register_method_arities!(engine, ctx, name;
            (), (a), (a, b), (a, b, c), (a, b, c, d), (a, b, c, d, e), (a, b, c, d, e, f));
    }
    register_invoke_arities!(engine, ctx;
        (), (a), (a, b), (a, b, c), (a, b, c, d), (a, b, c, d, e), (a, b, c, d, e, f));

    for (symbol, op) in [
        ("+", BinaryOp::Add),
        ("-", BinaryOp::Sub),
        ("*", BinaryOp::Mul),
        ("/", BinaryOp::Div),
    ] {
        engine.register_fn(symbol, move |lhs: Foreign, rhs: Dynamic| -> RhaiResult {
            operator(&lhs, op, &rhs)
        });
    }
    // scaling commutes: `3 * sp`
    engine.register_fn("*", |lhs: INT, rhs: Foreign| -> RhaiResult {
        operator(&rhs, BinaryOp::Mul, &Dynamic::from(lhs))
    });
    engine.register_fn("==", |lhs: Foreign, rhs: Foreign| lhs.object().equals(&rhs));
    engine.register_fn("!=", |lhs: Foreign, rhs: Foreign| !lhs.object().equals(&rhs));

    engine.register_fn("to_string", |obj: &mut Foreign| obj.object().display());
    engine.register_fn("to_debug", |obj: &mut Foreign| format!("{:?}", obj));
    engine.register_iterator::<Foreign>();

    engine.register_fn("type_tag", |value: Dynamic| type_tag(&value));
    engine.register_fn("is_truthy", |value: Dynamic| is_truthy(&value));
    engine.register_fn("cost", |value: Dynamic| -> INT {
        value
            .read_lock::<Foreign>()
            .map(|f| f.object().cost() as INT)
            .unwrap_or(0)
    });
    engine.register_fn("pt", |value: FLOAT| {
        Foreign::Sp(crate::adapters::bag::SpValue(bagscript_engine::ScaledPoint::from_pt(value)))
    });
    engine.register_fn("pt", |value: INT| {
        Foreign::Sp(crate::adapters::bag::SpValue(bagscript_engine::ScaledPoint::from_pt(value as f64)))
    });
}
