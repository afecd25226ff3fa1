//! Ingest stage tracking

use crate::metrics;
use std::fmt;
use std::time::Instant;

/// Pipeline stages, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IngestStage {
    Received,
    Staged,
    Probed,
    Classified,
    Remuxed,
    KeyAssigned,
    Uploaded,
    Committed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Staged => "staged",
            IngestStage::Probed => "probed",
            IngestStage::Classified => "classified",
            IngestStage::Remuxed => "remuxed",
            IngestStage::KeyAssigned => "key_assigned",
            IngestStage::Uploaded => "uploaded",
            IngestStage::Committed => "committed",
        }
    }

    /// The stage after this one; `None` for [`IngestStage::Committed`]
    pub fn next(&self) -> Option<IngestStage> {
        match self {
            IngestStage::Received => Some(IngestStage::Staged),
            IngestStage::Staged => Some(IngestStage::Probed),
            IngestStage::Probed => Some(IngestStage::Classified),
            IngestStage::Classified => Some(IngestStage::Remuxed),
            IngestStage::Remuxed => Some(IngestStage::KeyAssigned),
            IngestStage::KeyAssigned => Some(IngestStage::Uploaded),
            IngestStage::Uploaded => Some(IngestStage::Committed),
            IngestStage::Committed => None,
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    At(IngestStage),
    /// Terminal; `stage` is the last stage reached before the failure
    Failed {
        stage: IngestStage,
        kind: &'static str,
    },
}

/// Forward-only state machine for one request.
///
/// Each transition observes the time since the previous one in the
/// per-stage duration histogram.
#[derive(Debug)]
pub struct StageTracker {
    state: IngestState,
    entered_at: Instant,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            state: IngestState::At(IngestStage::Received),
            entered_at: Instant::now(),
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    /// Last stage reached, failed or not
    pub fn stage(&self) -> IngestStage {
        match self.state {
            IngestState::At(stage) | IngestState::Failed { stage, .. } => stage,
        }
    }

    /// Move to the next stage.
    ///
    /// Returns `false` and leaves the state untouched if `stage` does not
    /// directly follow the current one or the tracker has failed.
    pub fn advance(&mut self, stage: IngestStage) -> bool {
        match self.state {
            IngestState::At(current) if current.next() == Some(stage) => {
                self.state = IngestState::At(stage);
                metrics::record_stage_duration(
                    stage.as_str(),
                    self.entered_at.elapsed().as_secs_f64(),
                );
                self.entered_at = Instant::now();
                tracing::Span::current().record("ingest.stage", stage.as_str());
                tracing::debug!(stage = stage.as_str(), "ingest stage reached");
                true
            }
            _ => {
                tracing::warn!(
                    from = ?self.state,
                    to = stage.as_str(),
                    "ignored out-of-order ingest stage transition"
                );
                false
            }
        }
    }

    /// Enter the terminal failed state
    pub fn fail(&mut self, kind: &'static str) -> IngestState {
        self.state = IngestState::Failed {
            stage: self.stage(),
            kind,
        };
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == IngestState::At(IngestStage::Committed)
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
