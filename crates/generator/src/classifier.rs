//! Classification oracle boundary.
//!
//! A bounded sample of discovered programs goes to a language model, which
//! answers in free text that should embed one JSON array of tagged
//! components. Every failure on this path degrades to an empty result.

use crate::fields;
use async_trait::async_trait;
use autoblueprint_common::{hash, Error, Result};
use autoblueprint_workload_schema::{LlmProvenance, Row};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Instruction sent with every classification request.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that classifies software discovered via OSQuery.\n\
Remove default system utilities, drivers, or irrelevant software.\n\
Return only components that are application runtimes, middleware, databases, or app servers.\n\
Tag each remaining entry with one of: 'runtime', 'middleware', 'database', 'app_server'.\n\
Respond only with a valid JSON array.";

/// Oracle connection settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            model: "gpt-4".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            timeout_secs: 60,
            temperature: 0.2,
        }
    }
}

/// Which programs are worth the model's attention.
#[derive(Debug, Clone)]
pub struct SamplingPolicy {
    pub sample_size: usize,
    /// Programs whose publisher mentions this vendor are skipped first.
    pub excluded_publisher: String,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            sample_size: 50,
            excluded_publisher: "microsoft".to_string(),
        }
    }
}

/// Pick the programs to send.
///
/// Programs with a publisher that does not mention the excluded vendor are
/// preferred; if fewer than `sample_size` qualify, the head of the
/// unfiltered list is used instead.
pub fn select_sample<'a>(programs: &'a [Row], policy: &SamplingPolicy) -> Vec<&'a Row> {
    let excluded = policy.excluded_publisher.to_lowercase();
    let interesting: Vec<&Row> = programs
        .iter()
        .filter(|p| {
            fields::PUBLISHER
                .first_text(p)
                .map(|publisher| !publisher.to_lowercase().contains(&excluded))
                .unwrap_or(false)
        })
        .collect();

    if interesting.len() >= policy.sample_size {
        interesting.into_iter().take(policy.sample_size).collect()
    } else {
        programs.iter().take(policy.sample_size).collect()
    }
}

/// Decode the array that starts at the first `[{` in a free-text reply.
///
/// Only the first candidate is tried; if it does not decode the reply is
/// treated as malformed rather than searched further.
pub fn extract_json_array(reply: &str) -> Result<Vec<Row>> {
    static ARRAY_START: OnceLock<Regex> = OnceLock::new();
    let array_start =
        ARRAY_START.get_or_init(|| Regex::new(r"\[\s*\{").expect("valid array-start pattern"));

    let candidate = array_start
        .find(reply)
        .ok_or(Error::NoStructuredDataFound)?;
    let mut stream =
        serde_json::Deserializer::from_str(&reply[candidate.start()..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Array(items))) => {
            let rows: Vec<Row> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect();
            if rows.is_empty() {
                Err(Error::NoStructuredDataFound)
            } else {
                Ok(rows)
            }
        }
        Some(Err(e)) => Err(Error::Classification(format!(
            "malformed JSON array in response: {e}"
        ))),
        _ => Err(Error::NoStructuredDataFound),
    }
}

/// Something that can answer a classification prompt.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Provenance recorded in the workload.
    fn provenance(&self) -> LlmProvenance;

    /// Send the prompts and return the raw reply text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Turn the reply into component rows. Providers with a different
    /// reply convention override this.
    fn extract(&self, reply: &str) -> Result<Vec<Row>> {
        extract_json_array(reply)
    }
}

/// OpenAI-compatible chat completions oracle.
pub struct OpenAiOracle {
    config: ClassifierConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// First choice's content from a chat completions response body.
fn reply_text(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or_else(|| Error::Classification("response has no message content".to_string()))
}

#[async_trait]
impl ClassificationOracle for OpenAiOracle {
    fn provenance(&self) -> LlmProvenance {
        LlmProvenance {
            provider: self.config.provider.clone(),
            model: Some(self.config.model.clone()),
            prompt_hash: None,
        }
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!("POST {} (model {})", self.config.endpoint, self.config.model);
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Classification(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Classification(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Classification(format!("HTTP {status}: {body}")));
        }

        reply_text(&body)
    }
}

/// Outcome of one classification call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub components: Vec<Row>,
    /// Hash of the prompts actually sent; `None` if nothing was sent.
    pub prompt_hash: Option<String>,
    pub sample_size: usize,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Best-effort, single-shot classifier.
pub struct Classifier<O> {
    oracle: O,
    policy: SamplingPolicy,
}

impl<O: ClassificationOracle> Classifier<O> {
    pub fn new(oracle: O, policy: SamplingPolicy) -> Self {
        Self { oracle, policy }
    }

    /// Provenance including the hash of the last prompt.
    pub fn provenance(&self, classification: &Classification) -> LlmProvenance {
        LlmProvenance {
            prompt_hash: classification.prompt_hash.clone(),
            ..self.oracle.provenance()
        }
    }

    /// Classify `programs`. Never fails: any error yields no components.
    pub async fn classify(&self, programs: &[Row]) -> Classification {
        let sample = select_sample(programs, &self.policy);
        if sample.is_empty() {
            info!("No programs to classify");
            return Classification::default();
        }

        let sample_json = match serde_json::to_string_pretty(&sample) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize program sample: {e}");
                return Classification::default();
            }
        };
        let user_prompt = format!("Here is a list of installed programs (JSON):\n\n{sample_json}");
        let prompt_hash = hash::sha256_str(&format!("{SYSTEM_PROMPT}\n{user_prompt}"));

        let components = match self.request(&user_prompt).await {
            Ok(components) => components,
            Err(e) => {
                warn!("Classification failed: {e}");
                Vec::new()
            }
        };

        info!(
            "Classifier kept {} of {} sampled programs",
            components.len(),
            sample.len()
        );
        Classification {
            components,
            prompt_hash: Some(prompt_hash),
            sample_size: sample.len(),
        }
    }

    async fn request(&self, user_prompt: &str) -> Result<Vec<Row>> {
        let reply = self.oracle.complete(SYSTEM_PROMPT, user_prompt).await?;
        debug!("Raw classifier response:\n{reply}");
        self.oracle.extract(&reply)
    }
}
