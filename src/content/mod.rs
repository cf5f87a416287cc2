//! SEO content generation: keyword ranking, prompt templating, LLM calls
//! with rate-limit pacing, and visual analysis of product images.

pub mod json_repair;
pub mod keyword_filter;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod visual;

pub use keyword_filter::{KeywordFilter, KeywordRecord, ProductLine, RankedKeyword};
pub use llm::{ChatModel, GroqClient, VisionModel};
pub use pipeline::{ContentPipeline, PipelineState};
pub use visual::{Collection, VisualAnalysis, VisualAnalysisService, WeightCategory};
