// src/report/mod.rs

use crate::error::Result;
use crate::memory::OutcomeLog;
use chrono::Local;
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the full log as CSV to `dir/responses_validated_<timestamp>.csv`.
pub fn export_csv(log: &OutcomeLog, dir: &Path) -> Result<PathBuf> {
    let name = format!("responses_validated_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(name);

    let mut writer = csv::Writer::from_path(&path)?;
    for entry in log.entries() {
        writer.serialize(entry)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = log.total(), "results exported");
    Ok(path)
}

/// Prints totals and, for every failed question, what was asked, the start of
/// the reply and why it was rejected.
pub fn render_summary<W: Write>(log: &OutcomeLog, out: &mut W) -> Result<()> {
    writeln!(out, "\n{}", "=== Validation Results ===".bold())?;
    writeln!(out, "Total questions: {}", log.total())?;
    writeln!(out, "Incorrect answers: {}", log.incorrect())?;

    match log.summarize() {
        Ok(summary) => {
            let rate = format!("{:.2}%", summary.success_rate * 100.0);
            let rate = if summary.incorrect == 0 { rate.green() } else { rate.yellow() };
            writeln!(out, "Success rate: {rate}")?;
        }
        Err(_) => writeln!(out, "Success rate: n/a (no questions recorded)")?,
    }

    if log.incorrect() > 0 {
        writeln!(out, "\n{}", "Incorrect Answers:".red().bold())?;
        for item in log.failures() {
            writeln!(out, "\n{}. Structure: {}", item.number, item.structure)?;
            writeln!(out, "Question: {}", item.question)?;
            writeln!(out, "Response received:")?;
            writeln!(out, "{}...", item.response_preview())?;
            writeln!(out, "Reason incorrect: {}", item.reason.red())?;
            writeln!(out, "{}", "-".repeat(80))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SessionOutcome;
    use crate::model::StructureKind;

    fn log() -> OutcomeLog {
        let mut log = OutcomeLog::new();
        log.record(SessionOutcome {
            number: 1,
            structure: StructureKind::Queue,
            operation: "create".into(),
            question: "Create a queue with the following values: 1, 2.".into(),
            response: r#"{"queue": [1, 2]}"#.into(),
            valid: true,
            reason: "no specific rule".into(),
        });
        log.record(SessionOutcome {
            number: 2,
            structure: StructureKind::Queue,
            operation: "Enqueue".into(),
            question: "For the queue created earlier, Enqueue value(s) 9.".into(),
            response: "No response found after retries".into(),
            valid: false,
            reason: "invalid structured response".into(),
        });
        log
    }

    #[test]
    fn csv_has_header_and_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_csv(&log(), dir.path()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("responses_validated_") && name.ends_with(".csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["number", "structure", "operation", "question", "response", "valid", "reason"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][1], "queue");
        assert_eq!(&rows[1][5], "false");
    }

    #[test]
    fn summary_lists_only_failures() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        render_summary(&log(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Total questions: 2"));
        assert!(text.contains("Incorrect answers: 1"));
        assert!(text.contains("Success rate: 50.00%"));
        assert!(text.contains("2. Structure: queue"));
        assert!(!text.contains("1. Structure"));
        assert!(text.contains("Reason incorrect: invalid structured response"));
    }

    #[test]
    fn empty_summary_does_not_divide() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        render_summary(&OutcomeLog::new(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Success rate: n/a"));
    }
}
