//! Scaled points and the script logger

use bagscript_engine::ScaledPoint;
use rhai::{Dynamic, FLOAT, INT};
use tracing::Level;

use crate::adapters::Foreign;
use crate::args::{display_value, Args};
use crate::context::Context;
use crate::error::{Arity, BindingError, Result};
use crate::protocol::{
    attributes, method, AttributeAccessible, BinaryOp, Comparable, Identified, Operable, Truthy,
    Wrapper,
};

/// A length. The only value with arithmetic: multiplication by an int.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpValue(pub ScaledPoint);

attributes! {
    SpAttr {
        fields { Pt => "pt", Sp => "sp" }
        methods {}
    }
}

impl Wrapper for SpValue {
    type Native = ScaledPoint;

    fn native(&self) -> ScaledPoint {
        self.0
    }
}

impl Identified for SpValue {
    fn type_tag(&self) -> &'static str {
        "backend.sp"
    }

    fn display(&self) -> String {
        self.0.to_string()
    }
}

impl AttributeAccessible for SpValue {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        match SpAttr::from_name(name)? {
            SpAttr::Pt => Some(Dynamic::from(self.0.to_pt() as FLOAT)),
            SpAttr::Sp => Some(Dynamic::from(self.0 .0 as INT)),
        }
    }
}

impl Comparable for SpValue {
    fn equals(&self, other: &Foreign) -> bool {
        matches!(other, Foreign::Sp(o) if o.0 == self.0)
    }
}

impl Truthy for SpValue {
    fn is_truthy(&self) -> bool {
        !self.0.is_zero()
    }
}

impl Operable for SpValue {
    fn apply_operator(&self, op: BinaryOp, rhs: &Dynamic) -> Result<Dynamic> {
        match (op, rhs.as_int()) {
            (BinaryOp::Mul, Ok(factor)) => Ok(Dynamic::from(Foreign::Sp(SpValue(
                self.0.multiply(factor),
            )))),
            _ => Err(BindingError::UnsupportedOperation {
                type_tag: self.type_tag().to_string(),
                op: op.symbol().to_string(),
            }),
        }
    }
}

/// Script access to the injected log sink
#[derive(Debug, Clone, Default)]
pub struct LoggerHandle;

attributes! {
    LoggerAttr {
        fields {}
        methods {
            Trace => "trace",
            Info => "info",
            Warn => "warn",
            Error => "error",
        }
    }
}

impl LoggerAttr {
    fn level(self) -> Level {
        match self {
            LoggerAttr::Trace => Level::TRACE,
            LoggerAttr::Info => Level::INFO,
            LoggerAttr::Warn => Level::WARN,
            LoggerAttr::Error => Level::ERROR,
        }
    }
}

/// `msg, key, value, key, value, ...`
fn log_call(ctx: &Context, function: &str, level: Level, values: &[Dynamic]) -> Result<Dynamic> {
    let args = Args::new(function, values);
    let message: String = args.get(0, "msg")?;
    let pairs = args.rest(1);
    if pairs.len() % 2 != 0 {
        return Err(args.type_error(values.len() - 1, "value", "a value after every key"));
    }
    let mut fields = Vec::with_capacity(pairs.len() / 2);
    for (i, pair) in pairs.chunks(2).enumerate() {
        let key: String = args.get(1 + 2 * i, "key")?;
        fields.push((key, display_value(&pair[1])));
    }
    ctx.log(level, message, fields);
    Ok(Dynamic::UNIT)
}

impl Identified for LoggerHandle {
    fn type_tag(&self) -> &'static str {
        "log.logger"
    }

    fn display(&self) -> String {
        "logger".to_string()
    }
}

impl AttributeAccessible for LoggerHandle {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let attr = LoggerAttr::from_name(name)?;
        let function = format!("logger.{}", attr.name());
        Some(method(&function.clone(), Arity::AtLeast(1), move |ctx, args| {
            log_call(ctx, &function, attr.level(), args)
        }))
    }
}

impl Comparable for LoggerHandle {}
impl Truthy for LoggerHandle {}
impl Operable for LoggerHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemorySink;
    use std::rc::Rc;

    fn ten_pt() -> SpValue {
        SpValue(ScaledPoint::parse("10pt").unwrap())
    }

    #[test]
    fn test_multiply_by_int() {
        let result = ten_pt()
            .apply_operator(BinaryOp::Mul, &Dynamic::from(3_i64))
            .unwrap();
        let Some(Foreign::Sp(sp)) = result.try_cast::<Foreign>() else {
            panic!("expected a scaled point");
        };
        assert_eq!(sp.0, ScaledPoint::parse("30pt").unwrap());
        assert_eq!(sp.display(), "30pt");
    }

    #[test]
    fn test_other_operands_unsupported() {
        for rhs in [Dynamic::from(1.5_f64), Dynamic::from("3")] {
            let err = ten_pt().apply_operator(BinaryOp::Mul, &rhs).unwrap_err();
            assert_eq!(err.kind(), "UnsupportedOperationError");
        }
        let err = ten_pt()
            .apply_operator(BinaryOp::Add, &Dynamic::from(1_i64))
            .unwrap_err();
        assert_eq!(err.to_string(), "operation + not supported on backend.sp");
    }

    #[test]
    fn test_equality_and_truthiness() {
        assert!(ten_pt().equals(&Foreign::Sp(ten_pt())));
        assert!(!ten_pt().equals(&Foreign::Sp(SpValue(ScaledPoint::ZERO))));
        assert!(!SpValue(ScaledPoint::ZERO).is_truthy());
        assert_eq!(ten_pt().get_attribute("pt").unwrap().as_float().unwrap(), 10.0);
    }

    #[test]
    fn test_read_only_fields() {
        let ctx = Context::default();
        let err = ten_pt()
            .set_attribute(&ctx, "pt", Dynamic::from(1_i64))
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_logger_writes_fields() {
        let sink = Rc::new(MemorySink::new());
        let ctx = Context::new(sink.clone());
        let warn = LoggerHandle.get_attribute("warn").unwrap();
        let Some(Foreign::Builtin(builtin)) = warn.try_cast::<Foreign>() else {
            panic!("expected a builtin");
        };
        builtin
            .call(
                &ctx,
                &[Dynamic::from("page full"), Dynamic::from("page"), Dynamic::from(3_i64)],
            )
            .unwrap();
        let records = sink.records();
        assert_eq!(records[0].level, Level::WARN);
        assert_eq!(records[0].to_string(), "page full page=3");

        let err = builtin
            .call(&ctx, &[Dynamic::from("odd"), Dynamic::from("key")])
            .unwrap_err();
        assert_eq!(err.kind(), "ArgumentTypeError");
    }
}
