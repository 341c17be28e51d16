//! Rhai bindings for the bagscript document engine
//!
//! Native engine objects reach scripts as foreign values: handles with a
//! type tag, checked attribute access, optional operators and methods. All
//! argument checking and value conversion happens here; layout, shaping
//! and PDF output stay in `bagscript-engine`.
//!
//! # Example
//!
//! ```ignore
//! use bagscript_bindings::ScriptEngine;
//!
//! let engine = ScriptEngine::new();
//! let ast = engine.compile(r#"
//!     let doc = document::create("out.pdf");
//!     let page = doc.new_page();
//!     let rule = node::create("rule");
//!     rule.width = bag::sp("100pt");
//!     rule.height = bag::sp("1pt");
//!     page.output_at(bag::sp("72pt"), bag::sp("770pt"), node::vpack(rule));
//!     page.shipout();
//!     doc.finish();
//! "#).unwrap();
//! engine.run(&ast).unwrap();
//! ```

pub mod adapters;
pub mod args;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod iter;
pub mod modules;
pub mod protocol;
pub mod runtime;
pub mod settings;

use std::path::Path;
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, Map, Scope, AST};

pub use adapters::Foreign;
pub use config::{EngineConfig, Limits, LogLevel};
pub use context::{Context, LogRecord, LogSink, MemorySink, TracingSink};
pub use error::{BindingError, Result, ScriptError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A rhai engine with every adapter and script module registered
pub struct ScriptEngine {
    engine: Engine,
    context: Rc<Context>,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// Engine with default limits logging through `tracing`
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default(), Context::default())
    }

    pub fn with_config(config: &EngineConfig, context: Context) -> Self {
        let context = if config.limits.max_cost > 0 {
            context.with_budget(Some(config.limits.max_cost))
        } else {
            context
        };
        let context = Rc::new(context);

        let mut engine = Engine::new();
        Self::apply_limits(&mut engine, &config.limits);

        let print_ctx = context.clone();
        engine.on_print(move |text| print_ctx.info(text));
        let debug_ctx = context.clone();
        engine.on_debug(move |text, source, pos| {
            debug_ctx.log(
                tracing::Level::DEBUG,
                text,
                vec![
                    ("source".to_string(), source.unwrap_or("script").to_string()),
                    ("position".to_string(), pos.to_string()),
                ],
            )
        });

        runtime::register(&mut engine, &context);
        modules::register(&mut engine, &context);

        Self { engine, context }
    }

    /// Zero disables a limit
    fn apply_limits(engine: &mut Engine, limits: &Limits) {
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
        if limits.max_call_levels > 0 {
            engine.set_max_call_levels(limits.max_call_levels);
        }
        engine.set_max_operations(limits.max_operations);
        engine.set_max_modules(16);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);
    }

    /// Compile a script
    pub fn compile(&self, script: &str) -> std::result::Result<AST, ScriptError> {
        self.engine
            .compile(script)
            .map_err(|e| ScriptError::Compile(e.to_string()))
    }

    /// Compile a script from a file
    pub fn compile_file(&self, path: &Path) -> std::result::Result<AST, ScriptError> {
        self.engine
            .compile_file(path.to_path_buf())
            .map_err(|e| ScriptError::Compile(format!("{}: {}", path.display(), e)))
    }

    /// Run a compiled script for its effects
    pub fn run(&self, ast: &AST) -> std::result::Result<(), ScriptError> {
        self.eval(ast).map(|_| ())
    }

    /// Run a compiled script and return its last value
    pub fn eval(&self, ast: &AST) -> std::result::Result<Dynamic, ScriptError> {
        let mut scope = Scope::new();
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, ast)
            .map_err(script_error)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Unwrap call and module frames down to the error the script raised
fn script_error(err: Box<EvalAltResult>) -> ScriptError {
    match *err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => script_error(inner),
        EvalAltResult::ErrorRuntime(value, pos) => {
            let fields = value.read_lock::<Map>().and_then(|map| {
                let kind = map.get("kind")?.clone().into_string().ok()?;
                let message = map.get("message")?.clone().into_string().ok()?;
                Some((kind, message))
            });
            match fields {
                Some((kind, message)) => ScriptError::Binding { kind, message },
                None => ScriptError::Execution(
                    EvalAltResult::ErrorRuntime(value, pos).to_string(),
                ),
            }
        }
        other => ScriptError::Execution(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error() {
        let engine = ScriptEngine::new();
        let err = engine.compile("let x = ;").unwrap_err();
        assert!(matches!(err, ScriptError::Compile(_)));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_binding_error_surfaces_kind() {
        let engine = ScriptEngine::new();
        let ast = engine.compile(r#"bag::sp("12parsecs")"#).unwrap();
        let err = engine.eval(&ast).unwrap_err();
        assert_eq!(err.kind(), Some("NativeOperationError"));
    }

    #[test]
    fn test_thrown_string_is_execution_error() {
        let engine = ScriptEngine::new();
        let ast = engine.compile(r#"throw "boom""#).unwrap();
        let err = engine.eval(&ast).unwrap_err();
        assert!(matches!(err, ScriptError::Execution(ref m) if m.contains("boom")));
    }

    #[test]
    fn test_print_goes_to_sink() {
        let sink = Rc::new(MemorySink::new());
        let engine = ScriptEngine::with_config(&EngineConfig::default(), Context::new(sink.clone()));
        let ast = engine.compile(r#"print("hello")"#).unwrap();
        engine.run(&ast).unwrap();
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "hello");
    }

    #[test]
    fn test_cost_limit_from_config() {
        let mut config = EngineConfig::default();
        config.limits.max_cost = 1;
        let engine = ScriptEngine::with_config(&config, Context::default());
        assert_eq!(engine.context().budget(), Some(1));
        let font = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../testdata/fonts/DejaVuSansMono-Oblique.ttf");
        let script = format!(
            r#"
            let face = pdf::create().new_face("{}");
            let f = font::create(face, bag::sp("10pt"));
            f.shape("abc")
            "#,
            font.display()
        );
        let ast = engine.compile(&script).unwrap();
        let err = engine.eval(&ast).unwrap_err();
        assert_eq!(err.kind(), Some("CostLimitError"));
    }
}
