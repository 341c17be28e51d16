//! Call-time context handed to every adapter: the log sink and the
//! evaluation cost budget.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::Level;

use crate::error::{BindingError, Result};

/// One log message emitted by a script or an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Destination for script logging
pub trait LogSink {
    fn log(&self, record: LogRecord);
}

/// Forwards records to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, record: LogRecord) {
        let fields = record
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        match record.level {
            Level::ERROR => tracing::error!(target: "bagscript::script", %fields, "{}", record.message),
            Level::WARN => tracing::warn!(target: "bagscript::script", %fields, "{}", record.message),
            Level::INFO => tracing::info!(target: "bagscript::script", %fields, "{}", record.message),
            Level::DEBUG => tracing::debug!(target: "bagscript::script", %fields, "{}", record.message),
            _ => tracing::trace!(target: "bagscript::script", %fields, "{}", record.message),
        }
    }
}

/// Keeps records in memory, for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RefCell<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, record: LogRecord) {
        self.records.borrow_mut().push(record);
    }
}

/// State shared by all builtins of one [`crate::ScriptEngine`]
pub struct Context {
    sink: Rc<dyn LogSink>,
    budget: Option<u64>,
    spent: Cell<u64>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("budget", &self.budget)
            .field("spent", &self.spent.get())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Rc::new(TracingSink))
    }
}

impl Context {
    pub fn new(sink: Rc<dyn LogSink>) -> Self {
        Context {
            sink,
            budget: None,
            spent: Cell::new(0),
        }
    }

    /// Limit the total cost charged by builtins; `None` or zero means unlimited
    pub fn with_budget(mut self, budget: Option<u64>) -> Self {
        self.budget = budget.filter(|b| *b > 0);
        self
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    pub fn spent(&self) -> u64 {
        self.spent.get()
    }

    /// Account for the cost hint of a value handed to the script
    pub fn charge(&self, cost: u64) -> Result<()> {
        let spent = self.spent.get().saturating_add(cost);
        self.spent.set(spent);
        match self.budget {
            Some(limit) if spent > limit => Err(BindingError::CostLimit { limit }),
            _ => Ok(()),
        }
    }

    pub fn log(&self, level: Level, message: impl Into<String>, fields: Vec<(String, String)>) {
        self.sink.log(LogRecord {
            level,
            message: message.into(),
            fields,
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::WARN, message, Vec::new());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::INFO, message, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let sink = Rc::new(MemorySink::new());
        let ctx = Context::new(sink.clone());
        ctx.log(
            Level::INFO,
            "page done",
            vec![("page".to_string(), "1".to_string())],
        );
        ctx.warn("careful");
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].to_string(), "page done page=1");
        assert_eq!(records[1].level, Level::WARN);
    }

    #[test]
    fn test_budget() {
        let ctx = Context::default().with_budget(Some(5));
        assert!(ctx.charge(3).is_ok());
        assert!(ctx.charge(2).is_ok());
        let err = ctx.charge(1).unwrap_err();
        assert_eq!(err.kind(), "CostLimitError");
        assert_eq!(ctx.spent(), 6);
    }

    #[test]
    fn test_zero_budget_is_unlimited() {
        let ctx = Context::default().with_budget(Some(0));
        assert!(ctx.charge(u64::MAX).is_ok());
        assert_eq!(ctx.budget(), None);
    }
}
