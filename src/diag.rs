use std::sync::Mutex;

/// Diagnostic capability handed into each pipeline stage. Keeping the sink
/// explicit (instead of a process-global logger) lets tests assert on the
/// exact lines a stage emits.
pub trait DiagnosticSink: Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards diagnostics to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Collects diagnostics in memory so tests can inspect them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().expect("diagnostic lock poisoned").clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .expect("diagnostic lock poisoned")
            .iter()
            .any(|(_, line)| line.contains(needle))
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .expect("diagnostic lock poisoned")
            .iter()
            .filter(|(_, line)| line.contains(needle))
            .count()
    }

    fn push(&self, severity: Severity, message: &str) {
        self.lines
            .lock()
            .expect("diagnostic lock poisoned")
            .push((severity, message.to_string()));
    }
}

impl DiagnosticSink for CollectingSink {
    fn info(&self, message: &str) {
        self.push(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
}
