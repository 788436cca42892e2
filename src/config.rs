use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::artifacts;
use crate::cli::Cli;
use crate::scan::DEFAULT_MARKER_ANNOTATION;

/// Everything one build invocation needs. Constructed fresh per invocation;
/// nothing survives across runs.
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub main_classes: Option<PathBuf>,
    pub test_classes: Option<PathBuf>,
    pub main_resources: Option<PathBuf>,
    pub test_resources: Option<PathBuf>,
    /// Resolved dependency classpath, in resolution order.
    pub classpath: Vec<PathBuf>,
    pub instrument_test_classes: bool,
    pub debug: bool,
    pub marker_annotation: String,
}

pub fn resolve_config(cli: &Cli) -> Result<InstrumentConfig> {
    let project_dir = resolve_project_dir(cli)?;

    Ok(InstrumentConfig {
        main_classes: convention(cli.main_classes.clone(), &project_dir, "build/classes/java/main"),
        test_classes: convention(cli.test_classes.clone(), &project_dir, "build/classes/java/test"),
        main_resources: convention(cli.main_resources.clone(), &project_dir, "build/resources/main"),
        test_resources: convention(cli.test_resources.clone(), &project_dir, "build/resources/test"),
        classpath: resolve_classpath(cli)?,
        instrument_test_classes: cli.instrument_test_classes,
        debug: cli.debug,
        marker_annotation: cli
            .marker_annotation
            .clone()
            .unwrap_or_else(|| DEFAULT_MARKER_ANNOTATION.to_string()),
    })
}

/// Resolves the engine executable: explicit option first, then the
/// PORTATYPE_ENGINE environment variable.
pub fn resolve_engine_command(engine: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = engine {
        return Ok(p);
    }

    if let Ok(p) = env::var("PORTATYPE_ENGINE") {
        return Ok(PathBuf::from(p));
    }

    anyhow::bail!("no instrumentation engine configured; use --engine or set PORTATYPE_ENGINE")
}

fn resolve_project_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.project_dir.clone() {
        return Ok(p);
    }
    env::current_dir().context("failed to resolve current directory")
}

/// Explicit option wins; otherwise the Gradle-layout convention under the
/// project directory.
fn convention(explicit: Option<PathBuf>, project_dir: &Path, relative: &str) -> Option<PathBuf> {
    explicit.or_else(|| Some(project_dir.join(relative)))
}

fn resolve_classpath(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut classpath = Vec::new();
    if let Some(joined) = &cli.classpath {
        classpath.extend(env::split_paths(joined));
    }
    if let Some(file) = &cli.classpath_file {
        classpath.extend(artifacts::read_classpath_file(file)?);
    }
    Ok(classpath)
}
