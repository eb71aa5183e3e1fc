//! Input validation and the structured-output contracts sent to the model.

use serde_json::{json, Value};
use url::Url;

use crate::error::ValidationError;
use crate::models::{FabricAnalysisInput, FabricAnalysisRequest, SuitDesignInput, SuitDesignRequest};

pub const FABRIC_IMAGE_URL_FIELD: &str = "fabricImageUrl";
pub const SUIT_IMAGE_URL_FIELD: &str = "fabricImageURL";
pub const FABRIC_DESCRIPTION_FIELD: &str = "fabricDescription";

/// Absolute http(s) URL with a host.
pub fn parse_url(raw: &str, field: &'static str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim()).map_err(|_| ValidationError::InvalidUrl { field })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        _ => Err(ValidationError::InvalidUrl { field }),
    }
}

pub fn validate_fabric_analysis_input(raw: &FabricAnalysisInput) -> Result<FabricAnalysisRequest, ValidationError> {
    Ok(FabricAnalysisRequest {
        fabric_image_url: parse_url(&raw.fabric_image_url, FABRIC_IMAGE_URL_FIELD)?,
    })
}

pub fn validate_suit_design_input(raw: &SuitDesignInput) -> Result<SuitDesignRequest, ValidationError> {
    let fabric_description = raw.fabric_description.trim();
    if fabric_description.is_empty() {
        return Err(ValidationError::Empty { field: FABRIC_DESCRIPTION_FIELD });
    }
    Ok(SuitDesignRequest {
        fabric_description: fabric_description.to_string(),
        fabric_image_url: parse_url(&raw.fabric_image_url, SUIT_IMAGE_URL_FIELD)?,
    })
}

/// Response schema for the fabric analysis prompt (Gemini OpenAPI subset).
pub fn fabric_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "materialComposition": {
                "type": "STRING",
                "description": "The identified material composition of the fabric (e.g., Silk Blend)."
            },
            "confidenceScore": {
                "type": "NUMBER",
                "description": "The confidence score (0-1) for the material detection (e.g., 0.85)."
            }
        },
        "required": ["materialComposition", "confidenceScore"]
    })
}

pub fn suit_design_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "designs": {
                "type": "ARRAY",
                "description": "Unique women's suit designs.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "designName": { "type": "STRING", "description": "Creative name for the suit design." },
                        "description": { "type": "STRING", "description": "Detailed description of the suit design." },
                        "keyProperties": {
                            "type": "ARRAY",
                            "description": "Key properties of the suit design.",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["designName", "description", "keyProperties"],
                    "propertyOrdering": ["designName", "description", "keyProperties"]
                }
            }
        },
        "required": ["designs"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fabric(url: &str) -> FabricAnalysisInput {
        FabricAnalysisInput { fabric_image_url: url.to_string() }
    }

    #[test]
    fn accepts_well_formed_urls() {
        for url in [
            "https://example.com/fabric.jpg",
            "http://cdn.example.org:8080/img/silk.png?size=large",
            "  https://picsum.photos/400/600  ",
        ] {
            let req = validate_fabric_analysis_input(&fabric(url)).unwrap();
            assert_eq!(req.fabric_image_url.as_str(), Url::parse(url.trim()).unwrap().as_str());
        }
    }

    #[test]
    fn rejects_non_urls_with_field_message() {
        for url in ["", "   ", "not a url", "example.com/fabric.jpg", "ftp://example.com/f.jpg", "mailto:someone@example.com", "https://"] {
            let err = validate_fabric_analysis_input(&fabric(url)).unwrap_err();
            assert_eq!(err, ValidationError::InvalidUrl { field: FABRIC_IMAGE_URL_FIELD }, "input {url:?}");
            assert_eq!(err.to_string(), "Please enter a valid URL");
        }
    }

    #[test]
    fn suit_design_input_requires_description() {
        let input = SuitDesignInput {
            fabric_description: "  ".into(),
            fabric_image_url: "https://example.com/f.jpg".into(),
        };
        assert_eq!(
            validate_suit_design_input(&input).unwrap_err(),
            ValidationError::Empty { field: FABRIC_DESCRIPTION_FIELD }
        );
    }

    #[test]
    fn suit_design_input_requires_url() {
        let input = SuitDesignInput {
            fabric_description: "Fabric is Wool".into(),
            fabric_image_url: "wool.jpg".into(),
        };
        assert_eq!(validate_suit_design_input(&input).unwrap_err().field(), SUIT_IMAGE_URL_FIELD);
    }

    #[test]
    fn suit_design_input_trims_description() {
        let input = SuitDesignInput {
            fabric_description: " Fabric is Wool \n".into(),
            fabric_image_url: "https://example.com/f.jpg".into(),
        };
        assert_eq!(validate_suit_design_input(&input).unwrap().fabric_description, "Fabric is Wool");
    }

    #[test]
    fn schemas_require_every_field() {
        assert_eq!(fabric_analysis_schema()["required"], json!(["materialComposition", "confidenceScore"]));
        assert_eq!(suit_design_schema()["properties"]["designs"]["items"]["required"].as_array().map(Vec::len), Some(3));
    }
}
