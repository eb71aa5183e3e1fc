//! The generative completion service as seen by the adapters: a typed
//! request goes in, a JSON value matching the requested schema comes out.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::info;
use url::Url;

use crate::error::GenerationError;

/// Which prompt is being run. Doubles as the pipeline stage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    FabricAnalysis,
    SuitDesign,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::FabricAnalysis => write!(f, "fabric analysis"),
            Task::SuitDesign => write!(f, "suit design"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: Task,
    pub prompt: String,
    /// Image handed to the model as media alongside the prompt.
    pub image_url: Option<Url>,
    pub response_schema: Value,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

/// Canned answers for running without an API key.
#[derive(Debug, Default)]
pub struct DemoModel;

#[async_trait]
impl GenerativeModel for DemoModel {
    fn name(&self) -> &str {
        "demo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        info!("Using demo mode - returning canned {} output", request.task);
        Ok(match request.task {
            Task::FabricAnalysis => json!({
                "materialComposition": "Silk Blend",
                "confidenceScore": 0.85
            }),
            Task::SuitDesign => json!({
                "designs": [
                    {
                        "designName": "Moonlit Column",
                        "description": "A single-breasted, softly structured blazer with a longline cut, paired with high-waisted wide-leg trousers that let the fabric drape.",
                        "keyProperties": ["Peak lapels", "Single covered button", "Wide-leg trousers", "Half-lined for breathability"]
                    },
                    {
                        "designName": "Gallery Opening",
                        "description": "A cropped boxy jacket with dropped shoulders over a slim ankle-length trouser, easy to dress up or down.",
                        "keyProperties": ["Cropped length", "Collarless neckline", "Patch pockets"]
                    },
                    {
                        "designName": "Evening Wrap",
                        "description": "A double-breasted wrap blazer that ties at the waist, worn with a fluid midi skirt for a polished evening look.",
                        "keyProperties": ["Self-tie belt", "Shawl collar", "Midi skirt", "Hidden closures", "Sheen-friendly seams"]
                    }
                ]
            }),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Per-task scripted responses plus a record of every call made.
    pub(crate) struct ScriptedModel {
        fabric: Box<dyn Fn() -> Result<Value, GenerationError> + Send + Sync>,
        suit: Box<dyn Fn() -> Result<Value, GenerationError> + Send + Sync>,
        delay: Option<Duration>,
        pub(crate) calls: Recorder,
    }

    impl ScriptedModel {
        pub(crate) fn new(
            fabric: impl Fn() -> Result<Value, GenerationError> + Send + Sync + 'static,
            suit: impl Fn() -> Result<Value, GenerationError> + Send + Sync + 'static,
        ) -> Self {
            Self { fabric: Box::new(fabric), suit: Box::new(suit), delay: None, calls: Recorder::default() }
        }

        /// Silk Blend at 0.85 and three designs.
        pub(crate) fn happy() -> Self {
            Self::new(
                || Ok(json!({ "materialComposition": "Silk Blend", "confidenceScore": 0.85 })),
                || Ok(json!({ "designs": [
                    { "designName": "First", "description": "One", "keyProperties": ["a", "b", "c"] },
                    { "designName": "Second", "description": "Two", "keyProperties": ["d", "e", "f"] },
                    { "designName": "Third", "description": "Three", "keyProperties": ["g", "h", "i"] }
                ]})),
            )
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
            self.calls.push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match request.task {
                Task::FabricAnalysis => (self.fabric)(),
                Task::SuitDesign => (self.suit)(),
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct Recorder(Mutex<Vec<GenerationRequest>>);

    impl Recorder {
        fn push(&self, request: GenerationRequest) {
            self.0.lock().unwrap().push(request);
        }

        pub(crate) fn all(&self) -> Vec<GenerationRequest> {
            self.0.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, task: Task) -> usize {
            self.0.lock().unwrap().iter().filter(|r| r.task == task).count()
        }
    }
}
