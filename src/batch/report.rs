//! Batch report: one outcome per unit of work plus how the batch ended.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{ShiftKind, TemplateAssignment, TemplateId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Succeeded,
    Failed { reason: String },
    /// Never attempted: the batch was cancelled or aborted first
    Unprocessed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Succeeded => "succeeded",
            DocumentStatus::Failed { .. } => "failed",
            DocumentStatus::Unprocessed => "unprocessed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub date: NaiveDate,
    pub shift: ShiftKind,
    pub template_id: TemplateId,
    #[serde(flatten)]
    pub status: DocumentStatus,
    pub attempts: u32,
}

impl DocumentOutcome {
    pub fn succeeded(unit: &TemplateAssignment, attempts: u32) -> Self {
        Self::with_status(unit, DocumentStatus::Succeeded, attempts)
    }

    pub fn failed(unit: &TemplateAssignment, reason: impl Into<String>, attempts: u32) -> Self {
        Self::with_status(
            unit,
            DocumentStatus::Failed {
                reason: reason.into(),
            },
            attempts,
        )
    }

    pub fn unprocessed(unit: &TemplateAssignment) -> Self {
        Self::with_status(unit, DocumentStatus::Unprocessed, 0)
    }

    fn with_status(unit: &TemplateAssignment, status: DocumentStatus, attempts: u32) -> Self {
        Self {
            date: unit.date,
            shift: unit.shift,
            template_id: unit.template_id.clone(),
            status,
            attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchTermination {
    Completed,
    Cancelled,
    /// Stopped early because the host could not be used
    Aborted { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unprocessed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
    pub termination: BatchTermination,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            termination: BatchTermination::Completed,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: DocumentOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn mark_unprocessed<'a, I>(&mut self, units: I)
    where
        I: IntoIterator<Item = &'a TemplateAssignment>,
    {
        self.outcomes
            .extend(units.into_iter().map(DocumentOutcome::unprocessed));
    }

    pub fn finish(&mut self, termination: BatchTermination) {
        self.termination = termination;
        self.finished_at = Some(Local::now());
    }

    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts {
            total: self.outcomes.len(),
            ..BatchCounts::default()
        };
        for outcome in &self.outcomes {
            match outcome.status {
                DocumentStatus::Succeeded => counts.succeeded += 1,
                DocumentStatus::Failed { .. } => counts.failed += 1,
                DocumentStatus::Unprocessed => counts.unprocessed += 1,
            }
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DocumentStatus::Failed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        let counts = self.counts();
        self.termination == BatchTermination::Completed && counts.failed == 0
    }

    /// One-line description of how the batch ended.
    pub fn summary(&self) -> String {
        let c = self.counts();
        match &self.termination {
            BatchTermination::Completed if c.failed == 0 => {
                format!("Completed: all {} documents sent to the printer", c.total)
            }
            BatchTermination::Completed => {
                format!("Completed with {} of {} failures", c.failed, c.total)
            }
            BatchTermination::Cancelled => format!(
                "Cancelled: {} succeeded, {} failed, {} not processed",
                c.succeeded, c.failed, c.unprocessed
            ),
            BatchTermination::Aborted { reason } => format!(
                "Stopped early due to environment failure: {} ({} succeeded, {} failed, {} not processed)",
                reason, c.succeeded, c.failed, c.unprocessed
            ),
        }
    }
}
