//! Page state for one submission. Transitions are pure: each takes the
//! current state by value and returns the next one.

use crate::models::{DesignReport, FabricAnalysisResult};

pub const GENERIC_FAILURE: &str = "An error occurred while generating designs.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Loading,
    Success(DesignReport),
    Error {
        message: String,
        /// Present when the fabric was classified before the failure.
        analysis: Option<FabricAnalysisResult>,
    },
}

impl FlowState {
    /// Start a submission. Whatever was displayed before is dropped.
    pub fn submit(self) -> Self {
        FlowState::Loading
    }

    pub fn succeed(self, report: DesignReport) -> Self {
        match self {
            FlowState::Loading => FlowState::Success(report),
            other => other,
        }
    }

    pub fn fail(self, message: impl Into<String>, analysis: Option<FabricAnalysisResult>) -> Self {
        match self {
            FlowState::Loading => {
                let message = message.into();
                let message = if message.trim().is_empty() { GENERIC_FAILURE.to_string() } else { message };
                FlowState::Error { message, analysis }
            }
            other => other,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FlowState::Loading)
    }

    pub fn analysis(&self) -> Option<&FabricAnalysisResult> {
        match self {
            FlowState::Success(report) => Some(&report.analysis),
            FlowState::Error { analysis, .. } => analysis.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FlowState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}
