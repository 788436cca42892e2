//! Decides which class directories get instrumented, and in what order.

use std::path::PathBuf;

use crate::config::InstrumentConfig;
use crate::diag::DiagnosticSink;

/// One root kind per project compilation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Test,
    Main,
}

/// Fixed evaluation order: test before main, matching the order the override
/// lookup visits resource roots. The merge is order-sensitive, so this is a
/// contract, not an implementation detail.
pub const ROOT_ORDER: [RootKind; 2] = [RootKind::Test, RootKind::Main];

/// One directory queued for instrumentation. Created once per build
/// invocation, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklistEntry {
    pub directory: PathBuf,
    pub instrument_as_test: bool,
}

pub fn build_worklist(config: &InstrumentConfig, sink: &dyn DiagnosticSink) -> Vec<WorklistEntry> {
    let mut entries = Vec::new();

    for kind in ROOT_ORDER {
        match kind {
            RootKind::Test => {
                match config.test_classes.as_deref() {
                    Some(dir) if dir.is_dir() => {
                        if config.instrument_test_classes {
                            entries.push(WorklistEntry {
                                directory: dir.to_path_buf(),
                                instrument_as_test: true,
                            });
                        } else {
                            sink.info(
                                "Skipping test classes: instrumentTestClasses is disabled.",
                            );
                        }
                    }
                    _ => sink.warn("Skipping test classes directory as it does not exist."),
                }
            }
            RootKind::Main => match config.main_classes.as_deref() {
                Some(dir) if dir.is_dir() => {
                    entries.push(WorklistEntry {
                        directory: dir.to_path_buf(),
                        instrument_as_test: false,
                    });
                }
                _ => sink.warn("Skipping main classes directory as it does not exist."),
            },
        }
    }

    entries
}
