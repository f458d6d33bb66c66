//! Gemini language model gateway
//!
//! One client serves intent parsing, product enrichment and comparison.
//! Every answer is treated as untrusted text: JSON is cut out of it and
//! coerced into typed values before use.

use super::json::extract_object;
use super::traits::{ComparisonProvider, EnrichmentProvider, IntentProvider};
use crate::config::LlmSettings;
use crate::context::{Language, RequestContext};
use crate::domain::{Comparison, Intent, Product};
use crate::error::{Error, Result};
use crate::network::{preview, ApiRequest, HttpClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "gemini";

/// Terms that make a query ineligible for search
const BLOCKED_TERMS: &[&str] = &[
    "drugs",
    "weapons",
    "firearms",
    "explosives",
    "contraband",
    "porn",
    "sex toys",
    "adult content",
    "erotic",
    "hentai",
    "illegal",
    "smuggled",
    "stolen goods",
    "counterfeit",
    "hate speech",
    "violence",
    "racist",
    "discriminatory",
];

const BUDGET_TERMS: &[&str] = &[
    "price", "cost", "budget", "cheap", "expensive", "affordable", "$", "etb", "birr", "ብር",
];

const DELIVERY_TERMS: &[&str] = &[
    "delivery", "shipping", "arrive", "receive", "days", "time", "fast", "quick", "slow",
];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: String,
}

/// Client for the Gemini generateContent API
pub struct Gemini {
    client: HttpClient,
    api_key: String,
    model_url: String,
    timeout: Duration,
}

impl Gemini {
    pub fn new(client: HttpClient, settings: &LlmSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::upstream(PROVIDER, "missing API key"))?;

        Ok(Self {
            client,
            api_key,
            model_url: settings.model_url.clone(),
            timeout: Duration::from_secs_f64(settings.timeout),
        })
    }

    /// Send a prompt and return the concatenated text of the first
    /// non-empty candidate
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::to_value(GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        })?;

        let request = ApiRequest::post(&self.model_url)
            .param("key", &self.api_key)
            .json(body)
            .timeout(self.timeout);

        debug!("Sending prompt to Gemini ({} chars)", prompt.len());
        let response = self.client.execute(request).await?;

        if !response.is_success() {
            return Err(Error::upstream(
                PROVIDER,
                format!("HTTP {}: {}", response.status, response.preview(300)),
            ));
        }

        let parsed: GenerateResponse = response.json()?;
        for candidate in parsed.candidates {
            let text = candidate
                .content
                .parts
                .iter()
                .map(|p| p.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !text.is_empty() {
                return Ok(text);
            }
        }

        warn!("Empty response from Gemini");
        Err(Error::upstream(PROVIDER, "empty response"))
    }

    /// Send a prompt and parse the JSON object in the answer
    async fn generate_object(&self, prompt: &str, what: &'static str) -> Result<Value> {
        let text = self.generate(prompt).await?;
        let object = extract_object(&text)
            .ok_or_else(|| Error::parse(what, format!("no JSON object in: {}", preview(&text, 200))))?;
        serde_json::from_str(object).map_err(|e| Error::parse(what, e))
    }
}

/// Whether the query mentions blocked content
pub fn is_blocked_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    BLOCKED_TERMS.iter().any(|term| lower.contains(term))
}

fn intent_prompt(query: &str) -> String {
    format!(
        r#"Output only raw JSON. No prose, no code fences.

You turn shopping queries written in English, Amharic or a mix of both into search parameters.
Translate product terms to English. Use null for anything the query does not say.
All prices must be expressed in USD. Understand ranges ("under 1000", "between 100 and 200",
"ከ500 በታች"), price words ("cheap", "ርካሽ", "expensive", "ውድ", "budget", "በጀት") and
numbers written as words ("five hundred", "አምስት መቶ").
Set is_etb to true when the user mentions ETB, birr or ብር or gives no currency, false for USD or $.

Schema:
{{"keywords": string, "category_ids": string|null, "min_sale_price": number|null,
 "max_sale_price": number|null, "delivery_days": number|null, "ship_to_country": "ET",
 "target_currency": "USD", "target_language": "en", "is_etb": boolean}}

Examples:
"gaming laptop under one thousand five hundred dollars" -> {{"keywords":"gaming laptop","category_ids":null,"min_sale_price":null,"max_sale_price":1500.0,"delivery_days":null,"ship_to_country":"ET","target_currency":"USD","target_language":"en","is_etb":false}}
"ውድ ሰዓት በ5 ቀናት ውስጥ" -> {{"keywords":"watch","category_ids":null,"min_sale_price":50.0,"max_sale_price":null,"delivery_days":5,"ship_to_country":"ET","target_currency":"USD","target_language":"en","is_etb":true}}

Query: "{}"
JSON:"#,
        query
    )
}

/// Force the fields the catalog integration depends on
fn normalize_intent_object(object: &mut Map<String, Value>, query: &str) {
    object.insert("ship_to_country".to_string(), json!("ET"));
    object.insert("target_currency".to_string(), json!("USD"));
    object.insert("target_language".to_string(), json!("en"));
    object.entry("is_etb").or_insert(json!(true));

    let keywords = object
        .get("keywords")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(query)
        .to_string();
    object.insert("keywords".to_string(), json!(keywords));
}

#[async_trait]
impl IntentProvider for Gemini {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn parse_intent(&self, ctx: &RequestContext, query: &str) -> Result<Intent> {
        let query = query.trim();
        if is_blocked_query(query) {
            warn!(request_id = ctx.request_id(), "Blocked query: {}", query);
            return Err(Error::Rejected(
                "query contains prohibited content".to_string(),
            ));
        }

        let mut object = match self.generate_object(&intent_prompt(query), "intent").await {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(Error::Parse { .. }) => {
                warn!(
                    request_id = ctx.request_id(),
                    "Unparsable intent answer, using query as keywords"
                );
                Map::new()
            }
            Err(e) => return Err(e),
        };

        normalize_intent_object(&mut object, query);
        debug!(request_id = ctx.request_id(), "Parsed intent: {:?}", object);

        Ok(Intent::from_json_object(&object))
    }
}

fn enhance_prompt(product: &Product, query: &str, language: Language) -> Result<String> {
    let product_json = serde_json::to_string_pretty(product)?;
    let lang = language.code();

    Ok(format!(
        r#"Output only raw JSON. No prose, no code fences.

You improve e-commerce product copy for a shopper who asked: "{query}".
Write every text field in language "{lang}".

Return the complete product object with the same field names.
Only rewrite: title (keep its meaning), description (3-4 sentences), customerHighlights,
customerReview and summaryBullets (3-5 short bullets).
Every other field, including ids, URLs, prices, ratings and numbers, must be copied unchanged.

Product:
{product_json}

JSON:"#
    ))
}

#[async_trait]
impl EnrichmentProvider for Gemini {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn enhance(
        &self,
        ctx: &RequestContext,
        product: &Product,
        query: &str,
        language: Language,
    ) -> Result<Product> {
        let prompt = enhance_prompt(product, query, language)?;
        let value = self.generate_object(&prompt, "enhanced product").await?;
        let mut enhanced: Product =
            serde_json::from_value(value).map_err(|e| Error::parse("enhanced product", e))?;

        if !enhanced.same_identity(product) {
            debug!(
                request_id = ctx.request_id(),
                "Model altered identity fields of {}, restoring", product.id
            );
        }
        enhanced.restore_identity(product);
        enhanced.ai_match_percentage = match_percentage(product, query);

        Ok(enhanced)
    }
}

fn compare_prompt(products: &[Product], language: Language) -> Result<String> {
    let products_json = serde_json::to_string(&json!({ "products": products }))?;
    let language_name = match language {
        Language::Am => "Amharic (am)",
        Language::En => "English (en)",
    };

    Ok(format!(
        r#"Output only raw JSON. No prose, no code fences.

Compare the following e-commerce products. Answer in {language_name}.
Shape:
{{"comparison": [{{"product": <original product>, "synthesis": {{"pros": [string], "cons": [string],
"isBestValue": boolean, "features": {{string: string}}}}}}]}}
Exactly one product has isBestValue true.

Products: {products_json}"#
    ))
}

#[async_trait]
impl ComparisonProvider for Gemini {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn compare(&self, ctx: &RequestContext, products: &[Product]) -> Result<Comparison> {
        if products.is_empty() {
            return Err(Error::InvalidInput(
                "at least one product is required".to_string(),
            ));
        }

        let prompt = compare_prompt(products, ctx.language())?;
        let value = self.generate_object(&prompt, "comparison").await?;
        let mut comparison: Comparison =
            serde_json::from_value(value).map_err(|e| Error::parse("comparison", e))?;

        if comparison.comparison.len() != products.len() {
            return Err(Error::parse(
                "comparison",
                format!(
                    "expected {} entries, got {}",
                    products.len(),
                    comparison.comparison.len()
                ),
            ));
        }

        // keep the caller's products, the model only contributes synthesis
        for (entry, original) in comparison.comparison.iter_mut().zip(products) {
            entry.product = original.clone();
        }

        Ok(comparison)
    }
}

/// Relevance of a product to the query, 0..=100
///
/// Text overlap with the title, description and customer text, plus
/// bonuses for quality signals and for budget or delivery wording.
pub fn match_percentage(product: &Product, query: &str) -> u8 {
    let query = query.to_lowercase();

    let mut score = text_match_score(&product.title, &query, 30)
        + text_match_score(&product.description, &query, 20)
        + text_match_score(
            &format!("{} {}", product.customer_highlights, product.customer_review),
            &query,
            15,
        );

    if product.product_rating >= 4.0 {
        score += 10;
    }
    if product.seller_score >= 90 {
        score += 8;
    }
    if product.number_sold > 1000 {
        score += 7;
    }
    if BUDGET_TERMS.iter().any(|t| query.contains(t)) {
        score += 10;
    }
    if DELIVERY_TERMS.iter().any(|t| query.contains(t)) {
        score += 10;
    }

    score.min(100) as u8
}

/// Share of query words longer than three characters found in `text`
fn text_match_score(text: &str, query: &str, max_score: u32) -> u32 {
    let text = text.to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return 0;
    }

    let matches = words
        .iter()
        .filter(|w| w.chars().count() > 3 && text.contains(*w))
        .count();

    (matches as f64 / words.len() as f64 * max_score as f64) as u32
}
