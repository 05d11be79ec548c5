use std::path::Path;

use avscout_core::{Field, Movie};
use avscout_lib::ScanReport;

use crate::orchestrator::{Aggregation, AttemptResult, Outcome};

/// A single entry in the run log. Paths are relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Resolved {
        key: String,
        files: Vec<String>,
        /// Connectors that filled at least one field, in the order they ran
        sources: Vec<String>,
    },
    Partial {
        key: String,
        files: Vec<String>,
        missing: Vec<Field>,
        /// `site: reason` for every connector that was skipped
        skipped: Vec<String>,
    },
    Unidentified {
        file: String,
    },
    Ambiguous {
        key: String,
        reason: String,
        files: Vec<String>,
    },
}

/// Collects the results of one run and writes a log file.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Record the files a scan could not turn into movies.
    pub fn record_scan(&mut self, report: &ScanReport) {
        for group in &report.ambiguous {
            self.add(LogEntry::Ambiguous {
                key: group.key.clone(),
                reason: group.reason.to_string(),
                files: group
                    .files
                    .iter()
                    .map(|f| display(report, &f.path))
                    .collect(),
            });
        }
        for path in &report.unidentified {
            self.add(LogEntry::Unidentified {
                file: display(report, path),
            });
        }
    }

    pub fn record_aggregation(
        &mut self,
        report: &ScanReport,
        movie: &Movie,
        aggregation: &Aggregation,
    ) {
        let key = movie.key().to_string();
        let files = movie
            .files()
            .iter()
            .map(|f| display(report, &f.path))
            .collect();

        let entry = match &aggregation.outcome {
            Outcome::RequirementsMet => LogEntry::Resolved {
                key,
                files,
                sources: aggregation
                    .attempts
                    .iter()
                    .filter(|a| match &a.result {
                        AttemptResult::Filled { fields, .. } => !fields.is_empty(),
                        AttemptResult::Skipped { .. } => false,
                    })
                    .map(|a| a.site_id.clone())
                    .collect(),
            },
            Outcome::Exhausted { missing } => LogEntry::Partial {
                key,
                files,
                missing: missing.clone(),
                skipped: aggregation
                    .attempts
                    .iter()
                    .filter_map(|a| match &a.result {
                        AttemptResult::Skipped { reason, .. } => {
                            Some(format!("{}: {}", a.site_id, reason))
                        }
                        AttemptResult::Filled { .. } => None,
                    })
                    .collect(),
            },
        };
        self.add(entry);
    }

    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for entry in &self.entries {
            match entry {
                LogEntry::Resolved { .. } => summary.total_resolved += 1,
                LogEntry::Partial { .. } => summary.total_partial += 1,
                LogEntry::Unidentified { .. } => summary.total_unidentified += 1,
                LogEntry::Ambiguous { .. } => summary.total_ambiguous += 1,
            }
        }
        summary
    }

    /// Write the log to a file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let mut file = std::fs::File::create(path)?;
        let summary = self.summary();

        writeln!(file, "=== avscout Run Log ===")?;
        writeln!(
            file,
            "Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file)?;
        writeln!(file, "--- Summary ---")?;
        writeln!(file, "Resolved: {}", summary.total_resolved)?;
        writeln!(file, "Partial: {}", summary.total_partial)?;
        writeln!(file, "Unidentified: {}", summary.total_unidentified)?;
        writeln!(file, "Ambiguous: {}", summary.total_ambiguous)?;
        writeln!(file)?;
        writeln!(file, "--- Details ---")?;
        writeln!(file)?;

        for entry in &self.entries {
            match entry {
                LogEntry::Resolved {
                    key,
                    files,
                    sources,
                } => {
                    writeln!(file, "[OK] {} ({})", key, sources.join(", "))?;
                    for f in files {
                        writeln!(file, "     {}", f)?;
                    }
                }
                LogEntry::Partial {
                    key,
                    files,
                    missing,
                    skipped,
                } => {
                    let missing: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
                    writeln!(file, "[PARTIAL] {} (missing: {})", key, missing.join(", "))?;
                    for f in files {
                        writeln!(file, "     {}", f)?;
                    }
                    for s in skipped {
                        writeln!(file, "     Skipped {}", s)?;
                    }
                }
                LogEntry::Unidentified { file: f } => {
                    writeln!(file, "[UNIDENTIFIED] {}", f)?;
                }
                LogEntry::Ambiguous { key, reason, files } => {
                    writeln!(file, "[AMBIGUOUS] {}: {}", key, reason)?;
                    for f in files {
                        writeln!(file, "     {}", f)?;
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub total_resolved: usize,
    pub total_partial: usize,
    pub total_unidentified: usize,
    pub total_ambiguous: usize,
}

fn display(report: &ScanReport, path: &Path) -> String {
    report.relative(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::orchestrator::Attempt;
    use avscout_core::{DiscoveredFile, Identity, MetadataRecord};
    use avscout_lib::{AmbiguityReason, AmbiguousGroup};
    use std::path::PathBuf;

    fn report() -> ScanReport {
        ScanReport {
            root: PathBuf::from("/lib"),
            movies: Vec::new(),
            ambiguous: vec![AmbiguousGroup {
                key: "ABC-777".into(),
                files: vec![
                    DiscoveredFile::new("/lib/a/ABC-777.mp4", 1),
                    DiscoveredFile::new("/lib/b/ABC-777.mp4", 1),
                ],
                reason: AmbiguityReason::SpansDirectories(vec![
                    PathBuf::from("/lib/a"),
                    PathBuf::from("/lib/b"),
                ]),
            }],
            unidentified: vec![PathBuf::from("/lib/home video.mp4")],
            skipped_small: Vec::new(),
        }
    }

    fn movie() -> Movie {
        Movie::new(
            Identity::from_key("ABC-123", None).unwrap(),
            vec![DiscoveredFile::new("/lib/x/ABC-123.mp4", 1)],
        )
    }

    fn aggregation(outcome: Outcome) -> Aggregation {
        Aggregation {
            record: MetadataRecord::new(),
            outcome,
            attempts: vec![
                Attempt {
                    site_id: "a".into(),
                    result: AttemptResult::Skipped {
                        reason: SkipReason::Blocked,
                        message: "a: access blocked".into(),
                    },
                },
                Attempt {
                    site_id: "b".into(),
                    result: AttemptResult::Filled {
                        fields: vec![Field::Title],
                        complete: false,
                    },
                },
            ],
        }
    }

    #[test]
    fn records_scan_leftovers_relative_to_root() {
        let mut log = RunLog::new();
        log.record_scan(&report());

        assert_eq!(
            log.entries()[1],
            LogEntry::Unidentified {
                file: "home video.mp4".into()
            }
        );
        let LogEntry::Ambiguous { files, .. } = &log.entries()[0] else {
            panic!("expected an ambiguous entry");
        };
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("ABC-777.mp4"));
        assert!(!files[0].starts_with('/'));
    }

    #[test]
    fn classifies_aggregations() {
        let report = report();
        let mut log = RunLog::new();
        log.record_aggregation(&report, &movie(), &aggregation(Outcome::RequirementsMet));
        log.record_aggregation(
            &report,
            &movie(),
            &aggregation(Outcome::Exhausted {
                missing: vec![Field::Cover],
            }),
        );

        let LogEntry::Resolved { sources, .. } = &log.entries()[0] else {
            panic!("expected a resolved entry");
        };
        assert_eq!(sources, &vec!["b".to_string()]);
        let LogEntry::Partial { skipped, .. } = &log.entries()[1] else {
            panic!("expected a partial entry");
        };
        assert_eq!(skipped, &vec!["a: blocked".to_string()]);

        assert_eq!(
            log.summary(),
            LogSummary {
                total_resolved: 1,
                total_partial: 1,
                total_unidentified: 0,
                total_ambiguous: 0,
            }
        );
    }

    #[test]
    fn writes_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let report = report();
        let mut log = RunLog::new();
        log.record_scan(&report);
        log.record_aggregation(
            &report,
            &movie(),
            &aggregation(Outcome::Exhausted {
                missing: vec![Field::Cover, Field::Title],
            }),
        );
        log.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("=== avscout Run Log ==="));
        assert!(text.contains("Partial: 1"));
        assert!(text.contains("[PARTIAL] ABC-123 (missing: cover, title)"));
        assert!(text.contains("Skipped a: blocked"));
        assert!(text.contains("[UNIDENTIFIED] home video.mp4"));
        assert!(text.contains("[AMBIGUOUS] ABC-777"));
    }
}
