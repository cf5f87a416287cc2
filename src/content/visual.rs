//! Visual analysis of product images via a multimodal model.
//!
//! Degrades rather than fails: any error along the way (unresolvable Drive
//! link, non-image download, model error, unparseable JSON) falls back to a
//! URL-keyword heuristic so callers always get an analysis.

use crate::content::json_repair::parse_llm_json;
use crate::content::llm::VisionModel;
use crate::content::prompts::VISUAL_ANALYSIS_PROMPT;
use crate::errors::ServiceError;
use base64::Engine;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const HEAD_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Anything smaller is a redirect stub or an error page, not an image.
const MIN_IMAGE_BYTES: usize = 100;

/// Minaki collection taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Collection {
    Kundan,
    Crystal,
    Eleganza,
    Xclusive,
    Temple,
    Modern,
}

impl Collection {
    /// Maps the model's label onto the taxonomy; unknown labels default to
    /// Eleganza.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "KUNDAN" => Self::Kundan,
            "CRYSTAL" => Self::Crystal,
            "XCLUSIVE" => Self::Xclusive,
            "TEMPLE" => Self::Temple,
            "MODERN" => Self::Modern,
            _ => Self::Eleganza,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WeightCategory {
    Delicate,
    MediumWeight,
    HeavyOrnate,
    BridalHeavy,
}

impl WeightCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "delicate" => Self::Delicate,
            "heavy_ornate" => Self::HeavyOrnate,
            "bridal_heavy" => Self::BridalHeavy,
            _ => Self::MediumWeight,
        }
    }

    fn is_bridal_weight(&self) -> bool {
        matches!(self, Self::HeavyOrnate | Self::BridalHeavy)
    }
}

/// Result of analyzing one product image.
#[derive(Clone, Debug, Serialize)]
pub struct VisualAnalysis {
    pub jewelry_type: String,
    pub collection: Collection,
    pub stone_type: Option<String>,
    pub neckline_compatibility: Option<String>,
    pub weight_category: WeightCategory,
    pub naming_theme: String,
    pub bridal_suitability: &'static str,
    /// True when the analysis came from the URL heuristic instead of the
    /// vision model.
    pub from_fallback: bool,
}

impl VisualAnalysis {
    /// Compact one-line summary for inclusion in downstream prompts.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("Visual: {}", self.jewelry_type),
            format!("Collection: {}", self.collection),
            format!("Weight: {}", self.weight_category),
            format!("Naming: {} theme", self.naming_theme),
        ];
        if let Some(stones) = &self.stone_type {
            parts.push(format!("Stones: {stones}"));
        }
        if let Some(necklines) = &self.neckline_compatibility {
            parts.push(format!("Necklines: {necklines}"));
        }
        if self.bridal_suitability != "not_typically_bridal" {
            parts.push(format!("Bridal: {}", self.bridal_suitability));
        }
        parts.join(". ") + "."
    }
}

/// Bridal suitability from the fixed (collection, weight) lookup.
pub fn bridal_suitability(collection: Collection, weight: WeightCategory) -> &'static str {
    if !weight.is_bridal_weight() {
        return "not_typically_bridal";
    }
    match collection {
        Collection::Kundan => "primary_bridal_choice",
        Collection::Crystal => "cocktail_bridal_option",
        Collection::Temple => "traditional_bridal_option",
        Collection::Xclusive => "special_occasion_bridal",
        _ => "not_typically_bridal",
    }
}

#[derive(Clone)]
pub struct VisualAnalysisService {
    vision: Arc<dyn VisionModel>,
    http: reqwest::Client,
}

impl VisualAnalysisService {
    pub fn new(vision: Arc<dyn VisionModel>) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("HTTP client init failed: {e}")))?;
        Ok(Self { vision, http })
    }

    /// Analyzes the image behind `image_url`. Never fails; any error path
    /// yields the URL-heuristic fallback.
    #[instrument(skip(self))]
    pub async fn analyze(&self, image_url: &str) -> VisualAnalysis {
        match self.analyze_inner(image_url).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Vision analysis failed, using URL fallback: {}", e);
                fallback_from_url(image_url)
            }
        }
    }

    async fn analyze_inner(&self, image_url: &str) -> Result<VisualAnalysis, ServiceError> {
        let direct_url = self.resolve_drive_url(image_url).await;
        let data_url = self.download_image_as_data_url(&direct_url).await?;
        let response = self
            .vision
            .analyze_image(VISUAL_ANALYSIS_PROMPT, &data_url)
            .await?;
        let json = parse_llm_json(&response)?;

        let collection = Collection::from_label(
            json.get("collection_fit")
                .and_then(|v| v.as_str())
                .unwrap_or("ELEGANZA"),
        );
        let weight = WeightCategory::from_label(
            json.get("weight_category")
                .and_then(|v| v.as_str())
                .unwrap_or("medium_weight"),
        );
        Ok(VisualAnalysis {
            jewelry_type: json
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("jewelry piece")
                .to_string(),
            collection,
            stone_type: non_null_string(&json, "stone_type"),
            neckline_compatibility: non_null_string(&json, "neckline_compatibility"),
            weight_category: weight,
            naming_theme: json
                .get("naming_theme")
                .and_then(|v| v.as_str())
                .unwrap_or("modern_minimalist")
                .to_string(),
            bridal_suitability: bridal_suitability(collection, weight),
            from_fallback: false,
        })
    }

    /// Rewrites a Google Drive share link to a direct-download URL by probing
    /// the known rewrite formats with a HEAD request until one serves an
    /// image. Non-Drive URLs pass through unchanged, as do Drive URLs none of
    /// whose rewrites resolve.
    pub async fn resolve_drive_url(&self, url: &str) -> String {
        if !url.contains("drive.google.com") {
            return url.to_string();
        }
        let Some(file_id) = extract_drive_file_id(url) else {
            warn!("Could not extract file id from Drive URL");
            return url.to_string();
        };

        let candidates = [
            format!("https://drive.google.com/uc?export=download&id={file_id}"),
            format!("https://drive.google.com/uc?id={file_id}&export=download"),
            format!("https://docs.google.com/uc?export=download&id={file_id}"),
            format!("https://lh3.googleusercontent.com/d/{file_id}"),
        ];
        for candidate in candidates {
            let probe = self
                .http
                .head(&candidate)
                .timeout(HEAD_TIMEOUT)
                .send()
                .await;
            if let Ok(response) = probe {
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if content_type.starts_with("image/") {
                    info!("Resolved Drive link to {}", candidate);
                    return candidate;
                }
            }
        }
        warn!("No Drive rewrite served an image, keeping original URL");
        url.to_string()
    }

    /// Downloads the image and returns it as a `data:image/...;base64,` URL.
    pub async fn download_image_as_data_url(&self, url: &str) -> Result<String, ServiceError> {
        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .header(reqwest::header::ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Image download failed: {e}")))?
            .error_for_status()
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("Image download failed: {e}"))
            })?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ServiceError::ExternalServiceError(format!(
                "Downloaded content is not an image: {content_type}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Image download failed: {e}"))
        })?;
        if bytes.len() < MIN_IMAGE_BYTES {
            return Err(ServiceError::ExternalServiceError(format!(
                "Downloaded data is too small ({} bytes)",
                bytes.len()
            )));
        }

        let mut format = content_type
            .split('/')
            .next_back()
            .unwrap_or("jpeg")
            .to_string();
        if format == "jpeg" {
            format = "jpg".to_string();
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:image/{format};base64,{encoded}"))
    }
}

fn non_null_string(json: &serde_json::Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

/// Pulls the file id out of the share-link formats Drive hands out.
pub(crate) fn extract_drive_file_id(url: &str) -> Option<&str> {
    if let Some(rest) = url.split("/file/d/").nth(1) {
        return rest.split('/').next().filter(|s| !s.is_empty());
    }
    if let Some(rest) = url.split("/open?id=").nth(1) {
        return rest.split('&').next().filter(|s| !s.is_empty());
    }
    if let Some(rest) = url.split("id=").nth(1) {
        return rest.split('&').next().filter(|s| !s.is_empty());
    }
    None
}

/// URL-keyword heuristic used when vision analysis is unavailable.
pub(crate) fn fallback_from_url(image_url: &str) -> VisualAnalysis {
    let url = image_url.to_lowercase();
    let jewelry_type = if url.contains("necklace") || url.contains("neck") {
        "necklace"
    } else if url.contains("earring") || url.contains("ear") {
        "earrings"
    } else if url.contains("ring") {
        "ring"
    } else if url.contains("bracelet") || url.contains("bangle") {
        "bracelet"
    } else if url.contains("set") {
        "jewelry set"
    } else {
        "jewelry piece"
    };

    VisualAnalysis {
        jewelry_type: jewelry_type.to_string(),
        collection: Collection::Eleganza,
        stone_type: None,
        neckline_compatibility: None,
        weight_category: WeightCategory::MediumWeight,
        naming_theme: "modern_minimalist".to_string(),
        bridal_suitability: "not_typically_bridal",
        from_fallback: true,
    }
}
