//! Dependency artifact resolution.
//!
//! The build's dependency layer hands over an already-resolved classpath; the
//! only job here is to keep the entries that actually exist, in input order.
//! Missing entries are a recoverable condition, not a failure.

use std::path::{Path, PathBuf};

use crate::diag::DiagnosticSink;

pub fn resolve(dependency_specs: &[PathBuf], sink: &dyn DiagnosticSink) -> Vec<PathBuf> {
    let mut artifacts = Vec::new();
    for path in dependency_specs {
        if path.exists() {
            sink.info(&format!("Adding dependency '{}'.", path.display()));
            artifacts.push(path.clone());
        } else {
            sink.info(&format!("Dependency '{}' does not exist.", path.display()));
        }
    }
    sink.info(&format!("Resolved {} dependencies.", artifacts.len()));
    artifacts
}

/// Reads a classpath file as build tools emit them: one resolved path per
/// line, blank lines ignored.
pub fn read_classpath_file(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read classpath file '{}': {e}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::CollectingSink;

    #[test]
    fn keeps_existing_entries_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let jar_a = dir.path().join("a.jar");
        let jar_b = dir.path().join("b.jar");
        let missing = dir.path().join("gone.jar");
        std::fs::write(&jar_a, "stub").unwrap();
        std::fs::write(&jar_b, "stub").unwrap();

        let sink = CollectingSink::new();
        let resolved = resolve(&[jar_b.clone(), missing.clone(), jar_a.clone()], &sink);

        assert_eq!(resolved, vec![jar_b, jar_a]);
        assert!(sink.contains("gone.jar' does not exist"));
        assert!(sink.contains("Resolved 2 dependencies."));
    }

    #[test]
    fn empty_classpath_resolves_to_nothing() {
        let sink = CollectingSink::new();
        let resolved = resolve(&[], &sink);
        assert!(resolved.is_empty());
        assert!(sink.contains("Resolved 0 dependencies."));
    }

    #[test]
    fn classpath_file_is_one_path_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("classpath.txt");
        std::fs::write(&file, "/repo/a.jar\n\n  /repo/b.jar  \n").unwrap();

        let paths = read_classpath_file(&file).unwrap();
        assert_eq!(paths, vec![PathBuf::from("/repo/a.jar"), PathBuf::from("/repo/b.jar")]);
    }
}
