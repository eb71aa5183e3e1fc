use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::GenerationError;
use crate::generative::{GenerationRequest, GenerativeModel, Task};
use crate::models::{SuitDesign, SuitDesignBatch, SuitDesignRequest};
use crate::schema::suit_design_schema;

pub fn build_suit_prompt(request: &SuitDesignRequest) -> String {
    format!(
        "You are a professional fashion designer. Generate women's suit designs based on:\n\n\
         Fabric Description: {description}\n\
         Fabric Image: {url}\n\n\
         For each design provide:\n\
         1. Creative name\n\
         2. Detailed description (cut, style, features) - make sure it's easy to understand for an average user\n\
         3. 3-5 key properties\n\n\
         Output must be valid JSON matching the schema.",
        description = request.fabric_description,
        url = request.fabric_image_url,
    )
}

#[derive(Debug, Deserialize)]
struct RawDesigns {
    #[serde(default)]
    designs: Option<Vec<SuitDesign>>,
}

/// Ask the model for suit designs. The image is referenced by URL in the
/// prompt text only; the fabric was already classified.
#[instrument(skip(model, request))]
pub async fn generate_suit_designs(
    model: &dyn GenerativeModel,
    request: &SuitDesignRequest,
) -> Result<SuitDesignBatch, GenerationError> {
    let generation = GenerationRequest {
        task: Task::SuitDesign,
        prompt: build_suit_prompt(request),
        image_url: None,
        response_schema: suit_design_schema(),
    };

    let output = model.generate(&generation).await?;
    if output.is_null() {
        return Err(GenerationError::NoDesigns);
    }
    let raw: RawDesigns = serde_json::from_value(output)
        .map_err(|e| GenerationError::Malformed(format!("suit designs: {e}")))?;

    let designs = match raw.designs {
        Some(designs) if !designs.is_empty() => designs,
        _ => return Err(GenerationError::NoDesigns),
    };

    info!("👗 Generated {} suit designs", designs.len());
    Ok(SuitDesignBatch { designs, errors: None })
}
