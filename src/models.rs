use serde::{Serialize, Deserialize};
use serde_with::skip_serializing_none;
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

/// Raw fabric analysis input as submitted by the form or the JSON API.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FabricAnalysisInput {
    #[serde(default)]
    pub fabric_image_url: String,
}

/// Validated fabric analysis request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FabricAnalysisRequest {
    pub fabric_image_url: Url,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FabricAnalysisResult {
    pub material_composition: String,
    /// Between 0.0 and 1.0 inclusive.
    pub confidence_score: f64,
}

impl FabricAnalysisResult {
    /// Confidence as a percentage with exactly two decimals, e.g. `85.00%`.
    /// Ties round up (`50.125` becomes `50.13`), not to even.
    pub fn confidence_percent(&self) -> String {
        let percent = (self.confidence_score * 100.0 * 100.0).round() / 100.0;
        format!("{:.2}%", percent)
    }

    /// Fabric description handed to the suit design stage.
    pub fn describe(&self) -> String {
        format!("Fabric is {} with {} confidence", self.material_composition, self.confidence_percent())
    }
}

/// Raw suit design input. `fabricImageURL` keeps its upper-case suffix on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SuitDesignInput {
    #[serde(default, rename = "fabricDescription")]
    pub fabric_description: String,
    #[serde(default, rename = "fabricImageURL")]
    pub fabric_image_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SuitDesignRequest {
    #[serde(rename = "fabricDescription")]
    pub fabric_description: String,
    #[serde(rename = "fabricImageURL")]
    pub fabric_image_url: Url,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuitDesign {
    pub design_name: String,
    pub description: String,
    #[serde(default)]
    pub key_properties: Vec<String>, // 3-5 expected, not enforced
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SuitDesignBatch {
    #[serde(default)]
    pub designs: Vec<SuitDesign>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

impl SuitDesignBatch {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self { designs: Vec::new(), errors: Some(vec![message.into()]) }
    }
}

/// Everything one full submission produced.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DesignReport {
    pub submission_id: Uuid,
    pub fabric_image_url: Url,
    pub analysis: FabricAnalysisResult,
    pub fabric_description: String,
    pub designs: Vec<SuitDesign>,
    pub generated_at: DateTime<Utc>,
}
