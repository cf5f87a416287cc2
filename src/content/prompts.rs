//! Static prompt templates for the content pipeline and visual analysis.

use crate::content::keyword_filter::ProductLine;

/// The two content-writing templates. Selection is by product taxonomy;
/// Crystal is the fallback for anything the Kundan template does not cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptTemplate {
    Kundan,
    Crystal,
}

impl PromptTemplate {
    /// Jewelry-set categories route on the product line; everything else
    /// defaults to the Crystal template.
    pub fn select(category: &str, line: Option<ProductLine>) -> Self {
        let category = category.to_lowercase();
        if category.contains("jewelry set") || category.contains("jewellery set") {
            match line {
                Some(ProductLine::KundanPolki) => Self::Kundan,
                _ => Self::Crystal,
            }
        } else {
            Self::Crystal
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Self::Kundan => KUNDAN_JEWELRY_SETS_PROMPT,
            Self::Crystal => CRYSTAL_JEWELRY_SETS_PROMPT,
        }
    }

    /// Fills the template's placeholders from the product fields.
    pub fn fill(&self, params: &PromptParams) -> String {
        self.text()
            .replace("{category}", &params.category)
            .replace("{jewelry_line}", &params.jewelry_line)
            .replace("{finish}", &params.finish)
            .replace("{work}", &params.work)
            .replace("{components}", &params.components)
            .replace("{finding}", &params.finding)
            .replace("{primary_color}", &params.primary_color)
            .replace("{secondary_color}", &params.secondary_color)
            .replace("{occasions}", &params.occasions)
            .replace("{necklace_design}", &params.necklace_design)
            .replace("{bracelet_design}", &params.bracelet_design)
            .replace("{earring_design}", &params.earring_design)
            .replace("{ring_design}", &params.ring_design)
            .replace("{keywords}", &params.keywords)
            .replace("{used_names}", &params.used_names)
    }
}

/// Product fields and batch context substituted into a template.
#[derive(Clone, Debug, Default)]
pub struct PromptParams {
    pub category: String,
    pub jewelry_line: String,
    pub finish: String,
    pub work: String,
    pub components: String,
    pub finding: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub occasions: String,
    pub necklace_design: String,
    pub bracelet_design: String,
    pub earring_design: String,
    pub ring_design: String,
    /// Comma-separated ranked keywords, highest score first.
    pub keywords: String,
    /// Comma-separated names already generated in this batch, or "None".
    pub used_names: String,
}

const KUNDAN_JEWELRY_SETS_PROMPT: &str = r#"**ROLE:**
You are an expert jewelry content writer for Minaki, a premium Indian jewelry brand specializing in Kundan, Polki, and traditional craftsmanship. You create elegant, SEO-optimized content that converts browsers into buyers while maintaining cultural authenticity.

**Product Details:**
- Category: {category}
- Jewelry Line: {jewelry_line}
- Metal Finish: {finish}
- Work/Technique: {work}
- Components: {components}
- Finding: {finding}
- Primary Color: {primary_color}
- Secondary Color: {secondary_color}
- Occasions: {occasions}
- Necklace Design: {necklace_design}
- Bracelet Design: {bracelet_design}
- Earring Design: {earring_design}
- Ring Design: {ring_design}

**RAG-Selected Keywords (comma-separated, FIRST is PRIMARY):**
{keywords}

**Previously Used Names (DO NOT REUSE):**
{used_names}

## NAME GENERATION RULES:
- Generate a completely NEW and UNIQUE name never used before
- Check the "Previously Used Names" list above and never reuse any of those names
- Use traditional Indian names, Sanskrit words, or goddess names with clear symbolic meaning

# YOUR TASK:

Generate product content with these EXACT specifications:

### 1. TITLE (max 100 characters)
- Format: "[Product Name] Jewellery Set" or "[Product Name] Set"
- Do NOT include materials, colors, components, or keywords

### 2. DESCRIPTION (300-500 characters, plain text, 2-3 sentences)
- Sentence 1: "[Product Name] Jewellery Set features [components, under 30 chars] with [findings] findings, crafted in [full finish] finish with [primary materials/colors]."
- Sentence 2: name meaning and visual appeal
- Sentence 3: 1-2 occasions plus a neckline pairing based on the necklace design
- Use proper Kundan/Polki terminology; say "gold-plated" and "emerald-colored stones", never "real gold" or "real emeralds"

### 3. SEO META TITLE (50-60 characters)
- Include the PRIMARY keyword and a key feature, pipe-delimited

### 4. SEO META DESCRIPTION (150-160 characters)
- Include 2-3 keywords naturally, call-to-action at the end

### 5. STYLING TIP (100-200 words)
- Outfit pairings (sarees, lehengas, anarkalis), neckline suggestions, hairstyle and makeup recommendations, occasions

**Keyword integration:** use the PRIMARY keyword 2-3 times and secondary keywords 1-2 times, always naturally; never force a keyword that does not fit.

# RESPONSE FORMAT:

Return ONLY one valid JSON object, no markdown fences, no text before or after:
{
  "action": "generate_product_content",
  "action_input": {
    "title": "Product Name Set",
    "description": "...",
    "seo_meta_title": "...",
    "seo_meta_description": "...",
    "styling_tip": "..."
  }
}
All property names and string values in double quotes, no trailing commas, escape embedded quotes."#;

const CRYSTAL_JEWELRY_SETS_PROMPT: &str = r#"**ROLE:**
You are an expert jewelry content writer for Minaki, a premium Indian jewelry brand. This product belongs to the American Diamond / Crystal line: contemporary, modern, sparkling pieces for weddings, parties, and evening wear. You create elegant, SEO-optimized content that converts browsers into buyers.

**Product Details:**
- Category: {category}
- Jewelry Line: {jewelry_line}
- Metal Finish: {finish}
- Work/Technique: {work}
- Components: {components}
- Finding: {finding}
- Primary Color: {primary_color}
- Secondary Color: {secondary_color}
- Occasions: {occasions}
- Necklace Design: {necklace_design}
- Bracelet Design: {bracelet_design}
- Earring Design: {earring_design}
- Ring Design: {ring_design}

**RAG-Selected Keywords (comma-separated, FIRST is PRIMARY):**
{keywords}

**Previously Used Names (DO NOT REUSE):**
{used_names}

## NAME GENERATION RULES:
- Generate a completely NEW and UNIQUE name never used before
- Check the "Previously Used Names" list above and never reuse any of those names
- Prefer modern, graceful names evoking sparkle, light, or celestial themes

# YOUR TASK:

Generate product content with these EXACT specifications:

### 1. TITLE (max 100 characters)
- Format: "[Product Name] Jewellery Set" or "[Product Name] Set"
- Do NOT include materials, colors, components, or keywords

### 2. DESCRIPTION (300-500 characters, plain text, 2-3 sentences)
- Sentence 1: "[Product Name] Jewellery Set features [components, under 30 chars] with [findings] findings, crafted in [full finish] finish with [primary stones/colors]."
- Sentence 2: name meaning and the sparkle/brilliance of the stones
- Sentence 3: 1-2 occasions plus a neckline pairing based on the necklace design
- Say "American Diamond", "cubic zirconia", or "crystal stones"; never "real diamonds"

### 3. SEO META TITLE (50-60 characters)
- Include the PRIMARY keyword and a key feature, pipe-delimited

### 4. SEO META DESCRIPTION (150-160 characters)
- Include 2-3 keywords naturally, call-to-action at the end

### 5. STYLING TIP (100-200 words)
- Outfit pairings (gowns, cocktail dresses, sarees), neckline suggestions, hairstyle and makeup recommendations, occasions

**Keyword integration:** use the PRIMARY keyword 2-3 times and secondary keywords 1-2 times, always naturally; never force a keyword that does not fit.

# RESPONSE FORMAT:

Return ONLY one valid JSON object, no markdown fences, no text before or after:
{
  "action": "generate_product_content",
  "action_input": {
    "title": "Product Name Set",
    "description": "...",
    "seo_meta_title": "...",
    "seo_meta_description": "...",
    "styling_tip": "..."
  }
}
All property names and string values in double quotes, no trailing commas, escape embedded quotes."#;

/// Fixed prompt for the multimodal visual analysis call. The model is asked
/// for a single JSON object matching the collection taxonomy.
pub const VISUAL_ANALYSIS_PROMPT: &str = r#"You are a jewelry merchandising expert for Minaki, a premium Indian jewelry brand. Analyze the jewelry in this image and respond with ONE JSON object only.

Classify the piece into exactly one collection:
- KUNDAN: traditional Indian heritage, kundan/polki stone settings
- CRYSTAL: American Diamond / cubic zirconia sparkle pieces
- ELEGANZA: modern, contemporary everyday pieces
- XCLUSIVE: premium luxury statement pieces
- TEMPLE: traditional South Indian temple designs
- MODERN: casual contemporary pieces

Respond with this exact JSON shape:
{
  "type": "necklace | earrings | ring | bracelet | jewelry set | jewelry piece",
  "collection_fit": "KUNDAN | CRYSTAL | ELEGANZA | XCLUSIVE | TEMPLE | MODERN",
  "stone_type": "visible stone description, or null",
  "neckline_compatibility": "recommended necklines, or null",
  "weight_category": "delicate | medium_weight | heavy_ornate | bridal_heavy",
  "naming_theme": "traditional_indian | crystal_mystique | modern_minimalist | english_royal | french_royal"
}

Describe only what is visible. Do not invent colors or stones that are not in the image."#;
