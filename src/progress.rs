use serde::{Deserialize, Serialize};

/// Represents the current phase of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Source and sink are open; `message` holds the run summary
    Opened,
    /// Frames are being converted
    Converting,
    /// Every frame has been written and the output closed
    Complete,
}

/// Progress information for one conversion, suitable for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub phase: ProgressPhase,
    /// Frames written so far
    pub completed: u64,
    /// Frames the source reported, if it knew
    pub total: Option<u64>,
    /// Percentage complete, only when `total` is known
    pub percentage: Option<f64>,
    /// Human-readable status
    pub message: String,
}

impl Progress {
    /// Source and sink are open; `summary` describes the run.
    pub fn opened(total: Option<u64>, summary: String) -> Self {
        Self {
            phase: ProgressPhase::Opened,
            completed: 0,
            total,
            percentage: total.map(|_| 0.0),
            message: summary,
        }
    }

    /// Periodic update after `completed` frames.
    pub fn converting(completed: u64, total: Option<u64>) -> Self {
        let percentage = total.map(|t| completed as f64 * 100.0 / t as f64);
        let message = match (total, percentage) {
            (Some(t), Some(p)) => format!("Progress: {}/{} frames ({:.1}%)", completed, t, p),
            _ => format!("Progress: {} frames", completed),
        };
        Self {
            phase: ProgressPhase::Converting,
            completed,
            total,
            percentage,
            message,
        }
    }

    /// Final report once the output is closed.
    pub fn complete(completed: u64, total: Option<u64>) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed,
            total,
            percentage: total.map(|_| 100.0),
            message: format!("Conversion complete! Total frames: {}", completed),
        }
    }
}
