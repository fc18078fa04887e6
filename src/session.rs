//! Explicit per-session context handed to the interview driver.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::clients::{HttpQuestionGenerator, HttpRegistry, QuestionGenerator, SubjectRegistry};
use crate::config::Config;
use crate::error::Result;
use crate::token::{AccessToken, FileTokenStore, MemoryTokenStore, SessionGate, TokenStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EXPECTED_QUESTIONS: usize = 5;

/// Collaborators and limits for one interview session.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub request_timeout: Duration,
    pub expected_questions: usize,
    registry: Arc<dyn SubjectRegistry>,
    generator: Arc<dyn QuestionGenerator>,
    tokens: Arc<dyn TokenStore>,
}

impl SessionContext {
    pub fn new(
        registry: Arc<dyn SubjectRegistry>,
        generator: Arc<dyn QuestionGenerator>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            request_timeout: DEFAULT_TIMEOUT,
            expected_questions: DEFAULT_EXPECTED_QUESTIONS,
            registry,
            generator,
            tokens,
        }
    }

    /// Wires the HTTP clients and token store described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let registry = HttpRegistry::new(&config.api.base_url, timeout)?;
        let generator = HttpQuestionGenerator::new(config.generator_url(), timeout)?;
        let tokens = token_store_for(config)?;

        Ok(Self::new(Arc::new(registry), Arc::new(generator), tokens)
            .with_request_timeout(timeout)
            .with_expected_questions(config.interview.expected_questions))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_expected_questions(mut self, expected: usize) -> Self {
        self.expected_questions = expected;
        self
    }

    pub fn registry(&self) -> &dyn SubjectRegistry {
        self.registry.as_ref()
    }

    pub fn generator(&self) -> &dyn QuestionGenerator {
        self.generator.as_ref()
    }

    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// Token for an authenticated call, or `Unauthorized`.
    pub fn authorize(&self) -> Result<AccessToken> {
        SessionGate::authorize(self.tokens())
    }
}

/// `LENS_TOKEN` wins; otherwise the token file.
pub fn token_store_for(config: &Config) -> Result<Arc<dyn TokenStore>> {
    if let Some(raw) = &config.runtime.api_token {
        return Ok(Arc::new(MemoryTokenStore::with_token(AccessToken::new(
            raw.clone(),
        )?)));
    }
    match config.token_path() {
        Some(path) => Ok(Arc::new(FileTokenStore::new(path))),
        None => {
            tracing::warn!("no config directory available; token kept in memory only");
            Ok(Arc::new(MemoryTokenStore::new()))
        }
    }
}
