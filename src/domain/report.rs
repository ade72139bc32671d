//! Reconciliation run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::normalizer::NormalizationError;
use crate::domain::product::ProductField;

/// Classification of one source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Added,
    Updated,
    Unchanged,
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
        })
    }
}

/// Why a record was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "error", rename_all = "camelCase")]
pub enum SkipReason {
    Normalization(NormalizationError),
    /// Store error text, kept verbatim
    Persistence(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalization(e) => write!(f, "{e}"),
            Self::Persistence(msg) => write!(f, "PersistenceError: {msg}"),
        }
    }
}

/// Result for a single source record, in enumeration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub identifier: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<ProductField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub outcomes: Vec<RecordOutcome>,
}

impl ReconciliationReport {
    #[must_use]
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            total: 0,
            added: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            outcomes: Vec::new(),
        }
    }

    /// Records one outcome and bumps the matching counter
    pub fn record(&mut self, entry: RecordOutcome) {
        self.total += 1;
        match entry.outcome {
            Outcome::Added => self.added += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.outcomes.push(entry);
    }

    pub fn added(&mut self, identifier: &str) {
        self.record(RecordOutcome {
            identifier: identifier.to_string(),
            outcome: Outcome::Added,
            changed_fields: Vec::new(),
            reason: None,
        });
    }

    pub fn updated(&mut self, identifier: &str, changed_fields: Vec<ProductField>) {
        self.record(RecordOutcome {
            identifier: identifier.to_string(),
            outcome: Outcome::Updated,
            changed_fields,
            reason: None,
        });
    }

    pub fn unchanged(&mut self, identifier: &str) {
        self.record(RecordOutcome {
            identifier: identifier.to_string(),
            outcome: Outcome::Unchanged,
            changed_fields: Vec::new(),
            reason: None,
        });
    }

    pub fn skipped(&mut self, identifier: &str, reason: SkipReason) {
        self.record(RecordOutcome {
            identifier: identifier.to_string(),
            outcome: Outcome::Skipped,
            changed_fields: Vec::new(),
            reason: Some(reason),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// `(identifier, outcome, reason)` for every skipped record, in order
    pub fn skipped_records(&self) -> impl Iterator<Item = (&str, Outcome, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| {
            o.reason
                .as_ref()
                .map(|reason| (o.identifier.as_str(), o.outcome, reason))
        })
    }

    /// Outcome recorded for an identifier (the last one if it repeats)
    #[must_use]
    pub fn outcome_of(&self, identifier: &str) -> Option<&RecordOutcome> {
        self.outcomes.iter().rev().find(|o| o.identifier == identifier)
    }

    /// Returns a renderer that also lists updated records with their fields
    #[must_use]
    pub const fn verbose(&self) -> VerboseReport<'_> {
        VerboseReport(self)
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Reconciliation run {}{mode}", self.run_id)?;
        writeln!(f, "  source records: {}", self.total)?;
        writeln!(f, "  added:          {}", self.added)?;
        writeln!(f, "  updated:        {}", self.updated)?;
        writeln!(f, "  unchanged:      {}", self.unchanged)?;
        writeln!(f, "  skipped:        {}", self.skipped)?;

        if self.skipped > 0 {
            writeln!(f, "Skipped records:")?;
            for (identifier, _, reason) in self.skipped_records() {
                writeln!(f, "  {identifier}: {reason}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f)
    }
}

pub struct VerboseReport<'a>(&'a ReconciliationReport);

impl fmt::Display for VerboseReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_summary(f)?;

        let updated: Vec<_> = self
            .0
            .outcomes
            .iter()
            .filter(|o| o.outcome == Outcome::Updated)
            .collect();
        if !updated.is_empty() {
            writeln!(f, "Updated records:")?;
            for entry in updated {
                let fields: Vec<&str> = entry.changed_fields.iter().map(|c| c.key()).collect();
                writeln!(f, "  {}: {}", entry.identifier, fields.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_recorded_outcomes() {
        let mut report = ReconciliationReport::new(Uuid::new_v4(), false);
        report.added("B2");
        report.updated("A1", vec![ProductField::Name]);
        report.unchanged("C3");
        report.skipped("D4", SkipReason::Normalization(NormalizationError::MissingImage));

        assert_eq!(report.total, 4);
        assert_eq!(
            (report.added, report.updated, report.unchanged, report.skipped),
            (1, 1, 1, 1)
        );

        let skips: Vec<_> = report.skipped_records().collect();
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].0, "D4");
        assert_eq!(skips[0].1, Outcome::Skipped);
    }

    #[test]
    fn summary_lists_skip_reasons() {
        let mut report = ReconciliationReport::new(Uuid::new_v4(), true);
        report.skipped("X9", SkipReason::Persistence("database is locked".to_string()));

        let text = report.to_string();
        assert!(text.contains("(dry run)"));
        assert!(text.contains("skipped:        1"));
        assert!(text.contains("X9: PersistenceError: database is locked"));
    }

    #[test]
    fn verbose_summary_lists_changed_fields() {
        let mut report = ReconciliationReport::new(Uuid::new_v4(), false);
        report.updated("A1", vec![ProductField::Name, ProductField::ImageUrl]);

        let text = report.verbose().to_string();
        assert!(text.contains("A1: name, imageUrl"));
    }

    #[test]
    fn serializes_reasons_with_their_kind() {
        let mut report = ReconciliationReport::new(Uuid::new_v4(), false);
        report.skipped("D4", SkipReason::Normalization(NormalizationError::MissingImage));

        let json = serde_json::to_value(&report).unwrap();
        let reason = &json["outcomes"][0]["reason"];
        assert_eq!(reason["stage"], "normalization");
        assert_eq!(reason["error"]["kind"], "missingImage");
    }
}
