//! The instrumentation engine seam.
//!
//! The engine performs the actual bytecode rewrite and is external to this
//! crate; the pipeline only hands it a directory and the merged schema. The
//! production implementation shells out to a configured executable with the
//! schema serialized to a JSON file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::diag::DiagnosticSink;
use crate::error::PipelineError;
use crate::schema::Schema;

pub trait Instrumenter {
    fn instrument(
        &self,
        directory: &Path,
        schema: &Schema,
        debug: bool,
        sink: &dyn DiagnosticSink,
    ) -> Result<()>;
}

/// Runs an external instrumenter executable:
/// `<command> --schema <schema.json> --dir <classes-dir> [--debug]`.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    command: PathBuf,
}

impl CommandEngine {
    pub fn new(command: PathBuf) -> Self {
        Self { command }
    }

    fn write_schema_handoff(&self, schema: &Schema) -> Result<PathBuf> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "portatype-schema-{}-{}.json",
            std::process::id(),
            nanos
        ));
        let json = serde_json::to_vec_pretty(schema)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write schema handoff: {}", path.display()))?;
        Ok(path)
    }
}

impl Instrumenter for CommandEngine {
    fn instrument(
        &self,
        directory: &Path,
        schema: &Schema,
        debug: bool,
        sink: &dyn DiagnosticSink,
    ) -> Result<()> {
        let schema_path = self.write_schema_handoff(schema)?;

        let mut command = Command::new(&self.command);
        command
            .arg("--schema")
            .arg(&schema_path)
            .arg("--dir")
            .arg(directory);
        if debug {
            command.arg("--debug");
        }

        let output = command.output().with_context(|| {
            format!("failed to execute instrumentation engine '{}'", self.command.display())
        });
        let _ = std::fs::remove_file(&schema_path);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Instrument {
                directory: directory.to_path_buf(),
                reason: format!("engine exited with {}: {}", output.status, stderr.trim()),
            }
            .into());
        }

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if !line.trim().is_empty() {
                sink.info(line);
            }
        }
        Ok(())
    }
}
