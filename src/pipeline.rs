//! Two-stage design pipeline: classify the fabric, then design suits from
//! the classification. Both stages run under one deadline and one
//! cancellation token.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{FlowError, PipelineError};
use crate::fabric::analyze_fabric;
use crate::generative::{GenerativeModel, Task};
use crate::models::{DesignReport, FabricAnalysisRequest, FabricAnalysisResult, SuitDesignInput};
use crate::schema::validate_suit_design_input;
use crate::suit_design::generate_suit_designs;

#[derive(Clone)]
pub struct DesignPipeline {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl DesignPipeline {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model(&self) -> &dyn GenerativeModel {
        self.model.as_ref()
    }

    pub async fn run(&self, request: FabricAnalysisRequest, cancel: &CancellationToken) -> Result<DesignReport, PipelineError> {
        let submission_id = Uuid::new_v4();
        let span = info_span!("submission", %submission_id, url = %request.fabric_image_url);
        let mut progress = Progress::default();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlowError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.stages(submission_id, request, &mut progress).instrument(span)) => {
                res.unwrap_or(Err(FlowError::TimedOut(self.timeout)))
            }
        };

        outcome.map_err(|source| PipelineError { stage: progress.stage, analysis: progress.analysis, source })
    }

    async fn stages(
        &self,
        submission_id: Uuid,
        request: FabricAnalysisRequest,
        progress: &mut Progress,
    ) -> Result<DesignReport, FlowError> {
        info!("🚀 Analyzing fabric");
        let analysis = analyze_fabric(self.model(), &request).await?;
        progress.stage = Task::SuitDesign;
        progress.analysis = Some(analysis.clone());

        let suit_request = validate_suit_design_input(&SuitDesignInput {
            fabric_description: analysis.describe(),
            fabric_image_url: request.fabric_image_url.to_string(),
        })?;
        let batch = generate_suit_designs(self.model(), &suit_request).await?;

        info!("✅ Submission finished with {} designs", batch.designs.len());
        Ok(DesignReport {
            submission_id,
            fabric_image_url: request.fabric_image_url,
            analysis,
            fabric_description: suit_request.fabric_description,
            designs: batch.designs,
            generated_at: Utc::now(),
        })
    }
}

#[derive(Debug)]
struct Progress {
    stage: Task,
    analysis: Option<FabricAnalysisResult>,
}

impl Default for Progress {
    fn default() -> Self {
        Self { stage: Task::FabricAnalysis, analysis: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generative::testing::ScriptedModel;
    use pretty_assertions::assert_eq;

    fn request() -> FabricAnalysisRequest {
        FabricAnalysisRequest { fabric_image_url: "https://example.com/silk.jpg".parse().unwrap() }
    }

    fn pipeline(model: Arc<ScriptedModel>) -> DesignPipeline {
        DesignPipeline::new(model, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn runs_both_stages_in_order() {
        let model = Arc::new(ScriptedModel::happy());
        let report = pipeline(model.clone()).run(request(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.analysis.material_composition, "Silk Blend");
        assert_eq!(report.fabric_description, "Fabric is Silk Blend with 85.00% confidence");
        assert_eq!(report.designs.len(), 3);
        let tasks: Vec<_> = model.calls.all().iter().map(|c| c.task).collect();
        assert_eq!(tasks, [Task::FabricAnalysis, Task::SuitDesign]);
    }

    #[tokio::test]
    async fn analysis_failure_skips_design_stage() {
        let model = Arc::new(ScriptedModel::new(
            || Err(GenerationError::Http("connection refused".into())),
            || panic!("suit design stage must not run"),
        ));
        let err = pipeline(model.clone()).run(request(), &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.stage, Task::FabricAnalysis);
        assert!(err.analysis.is_none());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
        assert_eq!(model.calls.count(Task::SuitDesign), 0);
    }

    #[tokio::test]
    async fn design_failure_keeps_the_analysis() {
        let model = Arc::new(ScriptedModel::new(
            || Ok(serde_json::json!({ "materialComposition": "Tweed", "confidenceScore": 0.4 })),
            || Ok(serde_json::json!({ "designs": [] })),
        ));
        let err = pipeline(model).run(request(), &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.stage, Task::SuitDesign);
        assert_eq!(err.analysis.map(|a| a.material_composition), Some("Tweed".to_string()));
        assert!(matches!(err.source, FlowError::Generation(GenerationError::NoDesigns)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_spans_both_stages() {
        // each call takes 20s, the budget is 30s: the second stage overruns
        let model = Arc::new(ScriptedModel::happy().with_delay(Duration::from_secs(20)));
        let err = pipeline(model.clone()).run(request(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err.source, FlowError::TimedOut(d) if d == Duration::from_secs(30)));
        assert_eq!(err.stage, Task::SuitDesign);
        assert!(err.analysis.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_run() {
        let model = Arc::new(ScriptedModel::happy().with_delay(Duration::from_secs(10)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = pipeline(model.clone()).run(request(), &cancel).await.unwrap_err();
        assert!(matches!(err.source, FlowError::Cancelled));
        assert_eq!(err.stage, Task::FabricAnalysis);
        assert_eq!(model.calls.count(Task::SuitDesign), 0);
    }
}
