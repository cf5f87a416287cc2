//! Keyword ranking for SEO content generation.
//!
//! Takes a keyword-planner export (keyword, monthly searches, trend columns)
//! and a product line, and returns the top keywords by a weighted score of
//! search volume, term relevance, and trend momentum.

use serde::Serialize;

/// Product line taxonomy. Routing between the two keyword strategies and the
/// two prompt templates happens on this tag, never on free-text matching at
/// the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductLine {
    KundanPolki,
    CrystalAd,
}

impl ProductLine {
    /// Classifies a raw "line" attribute. Returns `None` for lines the
    /// content pipeline has no strategy for.
    pub fn classify(line: &str) -> Option<Self> {
        let line = line.to_lowercase();
        if line.contains("kundan") || line.contains("polki") {
            Some(Self::KundanPolki)
        } else if line.contains("american diamond")
            || line.contains("diamond")
            || line.contains("crystal")
            || line.contains("ad")
        {
            Some(Self::CrystalAd)
        } else {
            None
        }
    }
}

/// One row of the keyword-planner export, already normalized to numbers.
#[derive(Clone, Debug)]
pub struct KeywordRecord {
    pub keyword: String,
    pub avg_monthly_searches: i64,
    pub three_month_change_pct: f64,
    pub yoy_change_pct: f64,
    pub competition_index: f64,
}

impl KeywordRecord {
    /// Builds a record from raw CSV fields. The export formats search counts
    /// with thousands separators and trend columns with a trailing percent
    /// sign; unparseable values collapse to zero rather than failing the row.
    pub fn from_csv_fields(
        keyword: &str,
        avg_monthly_searches: &str,
        three_month_change: &str,
        yoy_change: &str,
        competition_index: &str,
    ) -> Self {
        Self {
            keyword: keyword.trim().to_string(),
            avg_monthly_searches: parse_count(avg_monthly_searches),
            three_month_change_pct: parse_percent(three_month_change),
            yoy_change_pct: parse_percent(yoy_change),
            competition_index: parse_percent(competition_index),
        }
    }
}

/// A surviving keyword with its computed score.
#[derive(Clone, Debug, Serialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub avg_monthly_searches: i64,
    pub three_month_change_pct: f64,
    pub yoy_change_pct: f64,
    pub competition_index: f64,
    pub relevance_score: f64,
}

/// Optional product attributes that widen the relevant-term set.
#[derive(Clone, Debug, Default)]
pub struct ProductAttributes {
    pub color: Option<String>,
    pub style: Option<String>,
}

const KUNDAN_POLKI_TERMS: &[&str] = &[
    // primary
    "kundan", "polki", "jadau",
    // occasions
    "bridal", "bride", "wedding", "engagement", "festive", "ceremony",
    // types
    "jewelry set", "jewellery set", "necklace set", "choker set", "set",
    // styles
    "traditional", "indian", "ethnic", "royal", "regal", "temple",
    // techniques
    "meenakari", "antique",
    // materials
    "gold plated", "22k", "pearl",
];

const CRYSTAL_AD_TERMS: &[&str] = &[
    // primary
    "american diamond", "crystal", "ad stones", "cubic zirconia", "cz",
    // occasions
    "bridal", "bride", "wedding", "engagement", "party", "evening", "cocktail", "festive",
    // styles
    "contemporary", "modern", "elegant", "sparkle", "dazzling", "fashion", "chic",
    // types
    "jewelry set", "jewellery set", "necklace set", "choker set", "pendant set", "set",
    // finishes
    "white gold", "rose gold", "gold plated", "rhodium", "14k", "silver plated",
    // aesthetics
    "celestial", "radiant", "brilliant", "luxurious", "versatile",
];

const COMMON_EXCLUDE_TERMS: &[&str] = &[
    "ring", "rings",
    "men", "mens", "man", "groom",
    "boys", "kids", "children", "baby",
    "diamond ring", "engagement ring", "solitaire",
    "gold coin", "gold bar", "bullion",
    "watch", "watches",
    "chain for men", "bracelet for men",
    "tattoo", "piercing",
    "repair", "cleaning", "box", "organizer",
];

/// The contemporary line additionally excludes traditional-line vocabulary.
const CRYSTAL_AD_EXTRA_EXCLUDES: &[&str] = &[
    "kundan", "polki", "jadau", "meenakari", "temple", "south indian", "traditional",
];

const FALLBACK_MIN_SEARCHES: i64 = 100;
const DEFAULT_TOP_N: usize = 30;

#[derive(Clone, Debug)]
pub struct KeywordFilter {
    min_searches: i64,
    top_n: usize,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self {
            min_searches: 1000,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl KeywordFilter {
    pub fn new(min_searches: i64) -> Self {
        Self {
            min_searches,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Filters and ranks keywords for the given product line.
    ///
    /// Keywords survive when they contain at least one relevant term, contain
    /// no excluded term, and meet the search-volume threshold. If nothing
    /// survives the configured threshold, the filter retries once at the
    /// fallback threshold of 100 before giving up. An empty input yields an
    /// empty result.
    pub fn rank(
        &self,
        records: &[KeywordRecord],
        line: ProductLine,
        attrs: &ProductAttributes,
    ) -> Vec<RankedKeyword> {
        let relevant = relevant_terms(line, attrs);
        let excludes = exclude_terms(line);

        let mut survivors = self.survivors(records, &relevant, excludes, self.min_searches);
        if survivors.is_empty() {
            survivors = self.survivors(records, &relevant, excludes, FALLBACK_MIN_SEARCHES);
        }

        let mut ranked: Vec<RankedKeyword> = survivors
            .into_iter()
            .map(|r| {
                let lower = r.keyword.to_lowercase();
                let score = score_keyword(&lower, r, &relevant, line);
                RankedKeyword {
                    keyword: r.keyword.clone(),
                    avg_monthly_searches: r.avg_monthly_searches,
                    three_month_change_pct: r.three_month_change_pct,
                    yoy_change_pct: r.yoy_change_pct,
                    competition_index: r.competition_index,
                    relevance_score: score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.top_n);
        ranked
    }

    fn survivors<'a>(
        &self,
        records: &'a [KeywordRecord],
        relevant: &[String],
        excludes: &[&str],
        min_searches: i64,
    ) -> Vec<&'a KeywordRecord> {
        records
            .iter()
            .filter(|r| {
                let lower = r.keyword.to_lowercase();
                relevant.iter().any(|t| lower.contains(t.as_str()))
                    && !excludes.iter().any(|t| lower.contains(t))
                    && r.avg_monthly_searches >= min_searches
            })
            .collect()
    }
}

fn relevant_terms(line: ProductLine, attrs: &ProductAttributes) -> Vec<String> {
    let base = match line {
        ProductLine::KundanPolki => KUNDAN_POLKI_TERMS,
        ProductLine::CrystalAd => CRYSTAL_AD_TERMS,
    };
    let mut terms: Vec<String> = base.iter().map(|t| t.to_string()).collect();

    if let Some(color) = &attrs.color {
        let color = color.to_lowercase();
        let mut push_if = |needles: &[&str], extra: &[&str]| {
            if needles.iter().any(|n| color.contains(n)) {
                terms.extend(extra.iter().map(|t| t.to_string()));
            }
        };
        push_if(&["green", "emerald"], &["green", "emerald"]);
        push_if(&["red", "ruby"], &["red", "ruby"]);
        push_if(&["blue", "sapphire"], &["blue", "sapphire"]);
        push_if(&["pink", "rose"], &["pink", "rose"]);
        match line {
            ProductLine::KundanPolki => {
                push_if(&["pearl", "white"], &["pearl", "white"]);
            }
            ProductLine::CrystalAd => {
                push_if(
                    &["white", "clear", "diamond"],
                    &["white", "clear", "diamond", "diamond jewelry"],
                );
            }
        }
    }

    if line == ProductLine::CrystalAd {
        if let Some(style) = &attrs.style {
            let style = style.to_lowercase();
            if style.contains("contemporary") {
                terms.extend(["contemporary", "modern", "current"].map(String::from));
            }
            if style.contains("elegant") {
                terms.extend(["elegant", "sophisticate", "graceful"].map(String::from));
            }
            if style.contains("celestial") {
                terms.extend(["celestial", "star", "sparkle", "radiant"].map(String::from));
            }
        }
    }

    terms.sort();
    terms.dedup();
    terms
}

fn exclude_terms(line: ProductLine) -> &'static [&'static str] {
    match line {
        ProductLine::KundanPolki => COMMON_EXCLUDE_TERMS,
        ProductLine::CrystalAd => {
            // The combined list is materialized once; both slices are static.
            use once_cell::sync::Lazy;
            static COMBINED: Lazy<Vec<&'static str>> = Lazy::new(|| {
                CRYSTAL_AD_EXTRA_EXCLUDES
                    .iter()
                    .chain(COMMON_EXCLUDE_TERMS.iter())
                    .copied()
                    .collect()
            });
            &COMBINED
        }
    }
}

/// Weighted score: 40% search volume, 15% relevant-term matches, 15% fixed
/// high-value-term bonuses, 30% trend momentum.
fn score_keyword(
    keyword_lower: &str,
    record: &KeywordRecord,
    relevant: &[String],
    line: ProductLine,
) -> f64 {
    let match_count = relevant
        .iter()
        .filter(|t| keyword_lower.contains(t.as_str()))
        .count() as f64;
    let primary_bonus = match line {
        ProductLine::KundanPolki => kundan_primary_bonus(keyword_lower),
        ProductLine::CrystalAd => crystal_primary_bonus(keyword_lower),
    };
    let trend = trend_boost(record.three_month_change_pct, record.yoy_change_pct);

    let score = record.avg_monthly_searches as f64 * 0.4
        + match_count * 5000.0 * 0.15
        + primary_bonus * 0.15
        + trend * 0.3;
    (score * 100.0).round() / 100.0
}

fn kundan_primary_bonus(keyword: &str) -> f64 {
    let mut bonus = 0.0;
    if keyword.contains("kundan") {
        bonus += 10000.0;
    }
    if keyword.contains("polki") {
        bonus += 10000.0;
    }
    if keyword.contains("bridal") || keyword.contains("bride") {
        bonus += 8000.0;
    }
    if keyword.contains("wedding") {
        bonus += 6000.0;
    }
    if keyword.contains("jewelry set") || keyword.contains("jewellery set") {
        bonus += 5000.0;
    }
    bonus
}

fn crystal_primary_bonus(keyword: &str) -> f64 {
    let mut bonus = 0.0;
    if keyword.contains("american diamond") {
        bonus += 10000.0;
    }
    if keyword.contains("crystal") && !keyword.contains("kundan") {
        bonus += 8000.0;
    }
    if keyword.contains("ad stone") {
        bonus += 7000.0;
    }
    if keyword.contains("cubic zirconia") || keyword.contains("cz") {
        bonus += 6500.0;
    }
    if keyword.contains("bridal") || keyword.contains("bride") {
        bonus += 9000.0;
    }
    if keyword.contains("wedding") {
        bonus += 8500.0;
    }
    if keyword.contains("engagement") {
        bonus += 7000.0;
    }
    if keyword.contains("party") {
        bonus += 6000.0;
    }
    if keyword.contains("contemporary") {
        bonus += 7500.0;
    }
    if keyword.contains("modern") {
        bonus += 7000.0;
    }
    if keyword.contains("elegant") {
        bonus += 6500.0;
    }
    if keyword.contains("jewelry set") || keyword.contains("jewellery set") {
        bonus += 5000.0;
    }
    if keyword.contains("necklace") {
        bonus += 4000.0;
    }
    if keyword.contains("pendant") {
        bonus += 3500.0;
    }
    bonus
}

/// Trend momentum blends the year-over-year bucket (70%) with the
/// three-month bucket (30%).
fn trend_boost(three_month_change: f64, yoy_change: f64) -> f64 {
    let yoy_score = if yoy_change >= 500.0 {
        10000.0
    } else if yoy_change >= 200.0 {
        7000.0
    } else if yoy_change >= 100.0 {
        5000.0
    } else if yoy_change >= 50.0 {
        3000.0
    } else if yoy_change >= 10.0 {
        1500.0
    } else if yoy_change >= 0.0 {
        500.0
    } else if yoy_change >= -20.0 {
        -500.0
    } else {
        -2000.0
    };

    let three_month_score = if three_month_change >= 500.0 {
        5000.0
    } else if three_month_change >= 200.0 {
        3500.0
    } else if three_month_change >= 100.0 {
        2500.0
    } else if three_month_change >= 50.0 {
        1500.0
    } else if three_month_change >= 10.0 {
        700.0
    } else if three_month_change >= 0.0 {
        200.0
    } else if three_month_change >= -20.0 {
        -300.0
    } else {
        -1000.0
    };

    yoy_score * 0.7 + three_month_score * 0.3
}

fn parse_count(raw: &str) -> i64 {
    raw.trim().replace(',', "").parse().unwrap_or(0)
}

fn parse_percent(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches('%')
        .replace(',', "")
        .parse()
        .unwrap_or(0.0)
}
