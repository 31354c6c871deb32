#![allow(dead_code)]

use async_trait::async_trait;
use sift_core::config::{Config, CorpusConfig};
use sift_core::provider::{self, GenerateRequest, Provider, ProviderError};
use sift_core::Chunk;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const EXPANSIONS: &str =
    "1. What pets do people keep?\n2. Which animals live with people?\n3. Describe household pets";

/// Keyword embeddings on two axes: animals and vehicles.
pub fn embed_keywords(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    let animal = ["pet", "cat", "dog", "animal"]
        .iter()
        .filter(|w| text.contains(*w))
        .count() as f32;
    let vehicle = ["car", "vehicle", "fuel", "engine"]
        .iter()
        .filter(|w| text.contains(*w))
        .count() as f32;
    if animal == 0.0 && vehicle == 0.0 {
        vec![0.5, 0.5]
    } else {
        vec![animal, vehicle]
    }
}

/// Provider whose answers and failures are scripted per test.
pub struct ScriptedProvider {
    pub expansion: Result<String, String>,
    pub answer: Result<String, String>,
    pub embed_error: Option<String>,
    pub delay: Duration,
    pub expansion_calls: AtomicUsize,
    pub answer_calls: AtomicUsize,
    pub embed_calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            expansion: Ok(EXPANSIONS.to_string()),
            answer: Ok("Cats and dogs are popular pets. Cats purr and dogs bark.".to_string()),
            embed_error: None,
            delay: Duration::ZERO,
            expansion_calls: AtomicUsize::new(0),
            answer_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedProvider {
    pub fn expansion_calls(&self) -> usize {
        self.expansion_calls.load(Ordering::SeqCst)
    }

    pub fn answer_calls(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.expansion_calls() + self.answer_calls()
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, request: GenerateRequest) -> provider::Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        // Answer requests carry a system prompt; expansion requests do not.
        let is_answer = request.messages.iter().any(|m| m.role == "system");
        let reply = if is_answer {
            self.answer_calls.fetch_add(1, Ordering::SeqCst);
            &self.answer
        } else {
            self.expansion_calls.fetch_add(1, Ordering::SeqCst);
            &self.expansion
        };
        reply.clone().map_err(ProviderError::Api)
    }

    async fn embed(&self, text: &str, _model: &str) -> provider::Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        match &self.embed_error {
            Some(message) => Err(ProviderError::Api(message.clone())),
            None => Ok(embed_keywords(text)),
        }
    }
}

pub fn pet_corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("cats:0", "cats", 0, "Cats are small pets that purr and sleep.", vec![1.0, 0.0]),
        Chunk::new("dogs:0", "dogs", 0, "Dogs are loyal pets that bark and fetch.", vec![0.9, 0.1]),
        Chunk::new("cars:0", "cars", 0, "Cars are vehicles that burn fuel in an engine.", vec![0.0, 1.0]),
    ]
}

pub fn test_config() -> Config {
    let mut config = Config {
        corpus: CorpusConfig::Memory,
        ..Config::default()
    };
    config.retrieval.scoring_threads = 2;
    config.llm.request_timeout_secs = 5;
    config
}
