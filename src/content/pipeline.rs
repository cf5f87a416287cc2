//! Sequential content-generation pipeline.
//!
//! Four stages run in order for each product row: preprocess, keyword
//! filtering, prompt selection, generation. A failing stage records its
//! error on the returned state; nothing propagates past the pipeline
//! boundary. The only cross-call state is the list of names already
//! generated in the batch, used to request uniqueness from the model.

use crate::config::LlmConfig;
use crate::content::json_repair::parse_llm_json;
use crate::content::keyword_filter::{
    KeywordFilter, KeywordRecord, ProductAttributes, ProductLine, RankedKeyword,
};
use crate::content::llm::ChatModel;
use crate::content::prompts::{PromptParams, PromptTemplate};
use crate::content::retry::{is_rate_limit, retry_with_backoff, RetryPolicy};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Image-URL columns tried in order; the first populated one wins.
const IMAGE_URL_FIELDS: [&str; 4] = ["high_resolution_1", "image_url", "image_1", "primary_image"];

/// State accumulated as a product row moves through the stages.
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    pub category: String,
    pub line: String,
    pub colors: String,
    pub image_url: Option<String>,
    pub product_line: Option<ProductLine>,
    pub keywords: Vec<RankedKeyword>,
    pub template: Option<PromptTemplate>,
    pub generated_content: Option<Value>,
    pub error: Option<String>,
}

pub struct ContentPipeline {
    chat: Arc<dyn ChatModel>,
    event_sender: Arc<EventSender>,
    filter: KeywordFilter,
    llm: LlmConfig,
    used_names: Vec<String>,
}

impl ContentPipeline {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        event_sender: Arc<EventSender>,
        min_search_volume: i64,
        llm: LlmConfig,
    ) -> Self {
        Self {
            chat,
            event_sender,
            filter: KeywordFilter::new(min_search_volume),
            llm,
            used_names: Vec::new(),
        }
    }

    pub fn used_names(&self) -> &[String] {
        &self.used_names
    }

    /// Runs all stages for one product row against the given keyword table.
    #[instrument(skip(self, product, keyword_table))]
    pub async fn run(&mut self, product: &Value, keyword_table: &[KeywordRecord]) -> PipelineState {
        let mut state = PipelineState::default();

        self.preprocess(product, &mut state);
        self.filter_keywords(keyword_table, &mut state);
        self.select_prompt(&mut state);
        self.generate(product, &mut state).await;

        if state.error.is_none() {
            let sku = field(product, "sku");
            info!("Generated content for {}", sku);
            self.event_sender
                .send_or_log(Event::ContentGenerated { sku })
                .await;
        }
        state
    }

    fn preprocess(&self, product: &Value, state: &mut PipelineState) {
        state.category = field(product, "category");
        state.line = field(product, "line");

        let primary = field(product, "primary_color");
        let secondary = field(product, "secondary_color");
        state.colors = format!("{primary} {secondary}").trim().to_string();

        state.image_url = IMAGE_URL_FIELDS
            .iter()
            .map(|f| field(product, f))
            .find(|v| !v.is_empty());
        state.product_line = ProductLine::classify(&state.line);
    }

    /// Unsupported product lines yield an empty keyword list, not an error.
    fn filter_keywords(&self, keyword_table: &[KeywordRecord], state: &mut PipelineState) {
        let Some(line) = state.product_line else {
            warn!("No keyword strategy for line {:?}", state.line);
            return;
        };
        let attrs = ProductAttributes {
            color: (!state.colors.is_empty()).then(|| state.colors.clone()),
            style: None,
        };
        state.keywords = self.filter.rank(keyword_table, line, &attrs);
    }

    fn select_prompt(&self, state: &mut PipelineState) {
        state.template = Some(PromptTemplate::select(&state.category, state.product_line));
    }

    async fn generate(&mut self, product: &Value, state: &mut PipelineState) {
        let Some(template) = state.template else {
            state.error = Some("No prompt template selected".to_string());
            return;
        };

        let params = self.prompt_params(product, state);
        let prompt = template.fill(&params);

        // Provider pacing: a fixed delay before every call keeps a batch
        // under the per-minute request limit.
        tokio::time::sleep(Duration::from_secs(self.llm.precall_delay_secs)).await;

        let policy = RetryPolicy::new(
            self.llm.max_retries,
            Duration::from_secs(self.llm.backoff_step_secs),
        );
        let chat = Arc::clone(&self.chat);
        let response =
            retry_with_backoff(policy, is_rate_limit, || chat.complete(&prompt)).await;

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                state.error = Some(format!("Content generation failed: {e}"));
                return;
            }
        };

        match self.parse_content(&raw, state) {
            Ok(content) => state.generated_content = Some(content),
            Err(e) => state.error = Some(e.to_string()),
        }
    }

    fn parse_content(&mut self, raw: &str, state: &PipelineState) -> Result<Value, ServiceError> {
        let parsed = parse_llm_json(raw)?;
        let mut content = match parsed.get("action_input") {
            Some(Value::Object(inner)) => Value::Object(inner.clone()),
            Some(other) if !other.is_null() => {
                return Err(ServiceError::ParseError(format!(
                    "action_input is not an object: {other}"
                )))
            }
            _ => parsed,
        };
        if !content.is_object() {
            return Err(ServiceError::ParseError(
                "Generated content is not a JSON object".to_string(),
            ));
        }

        if let Some(url) = &state.image_url {
            content["image_url"] = Value::String(url.clone());
        }

        if let Some(title) = content.get("title").and_then(|v| v.as_str()) {
            let name = strip_title_suffix(title);
            if !name.is_empty() {
                self.used_names.push(name);
            }
        }
        Ok(content)
    }

    fn prompt_params(&self, product: &Value, state: &PipelineState) -> PromptParams {
        let keywords = state
            .keywords
            .iter()
            .map(|k| k.keyword.clone())
            .collect::<Vec<_>>()
            .join(", ");
        let used_names = if self.used_names.is_empty() {
            "None".to_string()
        } else {
            self.used_names.join(", ")
        };

        PromptParams {
            category: state.category.clone(),
            jewelry_line: state.line.clone(),
            finish: field(product, "finish"),
            work: field(product, "work"),
            components: field(product, "components"),
            finding: field(product, "finding"),
            primary_color: field(product, "primary_color"),
            secondary_color: field(product, "secondary_color"),
            occasions: field(product, "occasions"),
            necklace_design: field(product, "necklace_design"),
            bracelet_design: field(product, "bracelet_design"),
            earring_design: field(product, "earring_design"),
            ring_design: field(product, "ring_design"),
            keywords,
            used_names,
        }
    }
}

fn field(product: &Value, key: &str) -> String {
    product
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Titles come back as "<Name> Jewellery Set" or "<Name> Set"; the bare name
/// is what gets tracked for batch uniqueness.
fn strip_title_suffix(title: &str) -> String {
    title
        .replace(" Jewellery Set", "")
        .replace(" Set", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use async_trait::async_trait;

    struct FixedChat(String);

    #[async_trait]
    impl ChatModel for FixedChat {
        async fn complete(&self, _prompt: &str) -> Result<String, ServiceError> {
            Ok(self.0.clone())
        }
    }

    fn test_pipeline(response: &str) -> ContentPipeline {
        let (sender, _receiver) = event_channel(16);
        let llm = LlmConfig {
            precall_delay_secs: 0,
            backoff_step_secs: 0,
            ..LlmConfig::default()
        };
        ContentPipeline::new(
            Arc::new(FixedChat(response.to_string())),
            Arc::new(sender),
            1000,
            llm,
        )
    }

    #[test]
    fn strips_title_suffixes() {
        assert_eq!(strip_title_suffix("Divyani Jewellery Set"), "Divyani");
        assert_eq!(strip_title_suffix("Mayura Set"), "Mayura");
        assert_eq!(strip_title_suffix("Aarna"), "Aarna");
    }

    #[tokio::test]
    async fn full_run_generates_content_and_tracks_name() {
        let response = r#"{"action": "generate_product_content", "action_input": {"title": "Aarna Jewellery Set", "description": "d", "seo_meta_title": "t", "seo_meta_description": "m", "styling_tip": "s"}}"#;
        let mut pipeline = test_pipeline(response);

        let product = serde_json::json!({
            "sku": "MJ-100",
            "category": "Jewellery Set",
            "line": "Kundan Polki",
            "primary_color": "Green",
            "secondary_color": "Gold",
            "high_resolution_1": "https://cdn.example.com/mj-100.jpg",
        });
        let keywords = vec![KeywordRecord {
            keyword: "kundan jewellery set".to_string(),
            avg_monthly_searches: 5000,
            three_month_change_pct: 60.0,
            yoy_change_pct: 120.0,
            competition_index: 40.0,
        }];

        let state = pipeline.run(&product, &keywords).await;
        assert!(state.error.is_none());
        let content = state.generated_content.unwrap();
        assert_eq!(content["title"], "Aarna Jewellery Set");
        assert_eq!(content["image_url"], "https://cdn.example.com/mj-100.jpg");
        assert_eq!(pipeline.used_names(), ["Aarna"]);
        assert_eq!(state.template, Some(PromptTemplate::Kundan));
        assert_eq!(state.keywords.len(), 1);
    }

    #[tokio::test]
    async fn unsupported_line_yields_empty_keywords_not_error() {
        let response = r#"{"action_input": {"title": "Luna Set"}}"#;
        let mut pipeline = test_pipeline(response);

        let product = serde_json::json!({
            "sku": "MJ-101",
            "category": "Anklets",
            "line": "Silver",
        });
        let state = pipeline.run(&product, &[]).await;
        assert!(state.keywords.is_empty());
        assert!(state.error.is_none());
        assert_eq!(state.template, Some(PromptTemplate::Crystal));
    }

    #[tokio::test]
    async fn unparseable_response_lands_in_state_error() {
        let mut pipeline = test_pipeline("sorry, I cannot help with that");
        let product = serde_json::json!({
            "sku": "MJ-102",
            "category": "Jewellery Set",
            "line": "Crystal",
        });
        let state = pipeline.run(&product, &[]).await;
        assert!(state.error.is_some());
        assert!(state.generated_content.is_none());
    }
}
