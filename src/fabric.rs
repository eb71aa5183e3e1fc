use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::GenerationError;
use crate::generative::{GenerationRequest, GenerativeModel, Task};
use crate::models::{FabricAnalysisRequest, FabricAnalysisResult};
use crate::schema::fabric_analysis_schema;

pub fn build_fabric_prompt() -> String {
    "You are an expert in fabric analysis. Analyze the provided fabric image and determine its material composition \
     and provide a confidence score for your analysis.\n\n\
     Material Composition: The identified material composition of the fabric (e.g., Silk Blend).\n\
     Confidence Score: The confidence score (0-1) for the material detection (e.g., 0.85)."
        .to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    material_composition: Option<String>,
    confidence_score: Option<f64>,
}

/// Classify the fabric shown at the request's image URL. One model call, no retry.
#[instrument(skip(model, request), fields(url = %request.fabric_image_url))]
pub async fn analyze_fabric(
    model: &dyn GenerativeModel,
    request: &FabricAnalysisRequest,
) -> Result<FabricAnalysisResult, GenerationError> {
    let generation = GenerationRequest {
        task: Task::FabricAnalysis,
        prompt: build_fabric_prompt(),
        image_url: Some(request.fabric_image_url.clone()),
        response_schema: fabric_analysis_schema(),
    };

    let output = model.generate(&generation).await?;
    if output.is_null() {
        return Err(GenerationError::EmptyOutput);
    }
    let raw: RawAnalysis = serde_json::from_value(output)
        .map_err(|e| GenerationError::Malformed(format!("fabric analysis: {e}")))?;

    let material_composition = raw
        .material_composition
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| GenerationError::Malformed("missing material composition".into()))?;
    let confidence_score = raw
        .confidence_score
        .ok_or_else(|| GenerationError::Malformed("missing confidence score".into()))?;
    if !(0.0..=1.0).contains(&confidence_score) {
        return Err(GenerationError::Malformed(format!("confidence score {confidence_score} is outside 0..=1")));
    }

    info!("🧵 Fabric identified as '{}' ({:.2})", material_composition, confidence_score);
    Ok(FabricAnalysisResult { material_composition, confidence_score })
}
