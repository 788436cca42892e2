//! The single exposed operation: assemble the schema sources in precedence
//! order and drive the instrumentation engine over the worklist.
//!
//! Fold order is fixed: dependency scans first (dependency types must be
//! resolvable as property types referenced from project classes), then the
//! project roots in worklist order (test, main), then the XML overrides
//! (test resources, main resources). Dependency scanning is parallelized, but
//! results are collected and folded in that fixed order.

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

use crate::artifacts;
use crate::config::InstrumentConfig;
use crate::diag::DiagnosticSink;
use crate::engine::Instrumenter;
use crate::overrides;
use crate::scan::{self, ScanRoot, TypeFilter};
use crate::schema::{ClassScanSource, PropertyPolicy, Schema, SchemaSource};
use crate::worklist::{self, WorklistEntry};

#[derive(Debug, Serialize)]
pub struct InstrumentOutcome {
    pub instrumented_directories: usize,
    pub types_in_schema: usize,
}

/// Builds the merged schema and the worklist it applies to. An empty worklist
/// short-circuits: no dependency resolution, no scanning.
pub fn build_schema(
    config: &InstrumentConfig,
    sink: &dyn DiagnosticSink,
) -> Result<(Schema, Vec<WorklistEntry>)> {
    log_configuration(config, sink);

    let entries = worklist::build_worklist(config, sink);
    if entries.is_empty() {
        return Ok((Schema::default(), entries));
    }

    let filter = TypeFilter::has_annotation(config.marker_annotation.clone());

    let artifacts = artifacts::resolve(&config.classpath, sink);
    let dependency_roots = classify_artifacts(&artifacts, sink);
    let dependency_sources: Vec<ClassScanSource> = dependency_roots
        .par_iter()
        .map(|root| scan::scan(root, &filter, PropertyPolicy::NamesOnlyObjectTyped))
        .collect::<Result<_>>()?;

    let mut project_sources = Vec::new();
    for entry in &entries {
        let root = ScanRoot::classify(&entry.directory)?;
        project_sources.push(scan::scan(&root, &filter, PropertyPolicy::Full)?);
    }

    let mut sources: Vec<SchemaSource> = Vec::new();
    sources.extend(dependency_sources.into_iter().map(SchemaSource::ClassScan));
    sources.extend(project_sources.into_iter().map(SchemaSource::ClassScan));
    for resources in [
        config.test_resources.as_deref(),
        config.main_resources.as_deref(),
    ] {
        if let Some(xml) = overrides::discover(resources, sink)? {
            sources.push(SchemaSource::XmlOverride(xml));
        }
    }

    Ok((Schema::merge(&sources), entries))
}

/// Runs the whole pipeline. The first engine failure aborts the remaining
/// worklist; there is no partial-success continuation.
pub fn instrument_project(
    config: &InstrumentConfig,
    engine: &dyn Instrumenter,
    sink: &dyn DiagnosticSink,
) -> Result<InstrumentOutcome> {
    let (schema, entries) = build_schema(config, sink)?;

    if entries.is_empty() {
        sink.info("No class directories eligible for instrumentation.");
        return Ok(InstrumentOutcome {
            instrumented_directories: 0,
            types_in_schema: schema.len(),
        });
    }

    let instrumented_directories = entries.len();
    for entry in entries {
        for name in schema.types.keys() {
            if class_file_exists(&entry.directory, name) {
                sink.info(&format!(
                    "Instrumenting type {} in {}",
                    name,
                    entry.directory.display()
                ));
            }
        }

        sink.info(&format!(
            "Running instrumentation for classes in {}",
            entry.directory.display()
        ));
        engine.instrument(&entry.directory, &schema, config.debug, sink)?;
    }

    Ok(InstrumentOutcome {
        instrumented_directories,
        types_in_schema: schema.len(),
    })
}

/// Directories first, then jars, each group in input order; that grouping is
/// the order their schema contributions fold in.
fn classify_artifacts(artifacts: &[std::path::PathBuf], sink: &dyn DiagnosticSink) -> Vec<ScanRoot> {
    let mut roots = Vec::new();
    for path in artifacts.iter().filter(|p| p.is_dir()) {
        sink.info(&format!("Adding classes from {} to schema", path.display()));
        roots.push(ScanRoot::Directory(path.clone()));
    }
    for path in artifacts.iter().filter(|p| p.is_file()) {
        match ScanRoot::classify(path) {
            Ok(root) => {
                sink.info(&format!("Adding classes from {} to schema", path.display()));
                roots.push(root);
            }
            Err(_) => sink.info(&format!(
                "Ignoring classpath entry '{}': not a class directory or jar archive.",
                path.display()
            )),
        }
    }
    roots
}

fn class_file_exists(dir: &Path, binary_name: &str) -> bool {
    dir.join(format!("{}.class", binary_name.replace('.', "/")))
        .is_file()
}

fn log_configuration(config: &InstrumentConfig, sink: &dyn DiagnosticSink) {
    sink.info("The following configuration properties are configured:");
    sink.info(&format!("Property debug = {}", config.debug));
    sink.info(&format!(
        "Property instrumentTestClasses = {}",
        config.instrument_test_classes
    ));
    sink.info(&format!("Property mainClassesDirectory = {:?}", config.main_classes));
    sink.info(&format!("Property testClassesDirectory = {:?}", config.test_classes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CollectingSink;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct RecordingEngine {
        invocations: Mutex<Vec<PathBuf>>,
    }

    impl RecordingEngine {
        fn new() -> Self {
            Self {
                invocations: Mutex::new(Vec::new()),
            }
        }
    }

    impl Instrumenter for RecordingEngine {
        fn instrument(
            &self,
            directory: &Path,
            _schema: &Schema,
            _debug: bool,
            _sink: &dyn DiagnosticSink,
        ) -> Result<()> {
            self.invocations
                .lock()
                .expect("engine lock poisoned")
                .push(directory.to_path_buf());
            Ok(())
        }
    }

    fn empty_config(base: &Path) -> InstrumentConfig {
        InstrumentConfig {
            main_classes: Some(base.join("missing-main")),
            test_classes: Some(base.join("missing-test")),
            main_resources: None,
            test_resources: None,
            classpath: Vec::new(),
            instrument_test_classes: true,
            debug: false,
            marker_annotation: crate::scan::DEFAULT_MARKER_ANNOTATION.to_string(),
        }
    }

    #[test]
    fn missing_output_directories_complete_without_engine_calls() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RecordingEngine::new();
        let sink = CollectingSink::new();

        let outcome = instrument_project(&empty_config(dir.path()), &engine, &sink).unwrap();

        assert_eq!(outcome.instrumented_directories, 0);
        assert_eq!(outcome.types_in_schema, 0);
        assert!(engine.invocations.lock().unwrap().is_empty());
        assert_eq!(sink.count_matching("does not exist"), 2);
        // Dependency resolution is skipped entirely for an empty worklist.
        assert!(!sink.contains("Resolved"));
    }
}
