#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use transparency_lens::clients::{QuestionGenerator, QuestionRequest, SubjectRegistry};
use transparency_lens::error::{LensError, Result};
use transparency_lens::subject::{Attributes, ScoredSubject, SubjectDraft, SubjectRecord};
use transparency_lens::token::{AccessToken, MemoryTokenStore, TokenStore};
use transparency_lens::{InterviewDriver, SessionContext};

pub const SUBJECT_ID: &str = "subj-1";

/// In-memory registry that records every call it receives.
pub struct FakeRegistry {
    pub created: Mutex<Vec<SubjectDraft>>,
    pub scored: Mutex<Vec<(String, Attributes)>>,
    pub report_requests: Mutex<Vec<String>>,
    pub create_error: Mutex<Option<(u16, String)>>,
    pub score_failures: AtomicUsize,
    pub score: f64,
    pub delay: Option<Duration>,
}

impl FakeRegistry {
    pub fn scoring(score: f64) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            scored: Mutex::new(Vec::new()),
            report_requests: Mutex::new(Vec::new()),
            create_error: Mutex::new(None),
            score_failures: AtomicUsize::new(0),
            score,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_create(self, status: u16, message: &str) -> Self {
        *self.create_error.lock().unwrap() = Some((status, message.to_string()));
        self
    }

    pub fn failing_scores(self, times: usize) -> Self {
        self.score_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.created.lock().unwrap().len()
            + self.scored.lock().unwrap().len()
            + self.report_requests.lock().unwrap().len()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SubjectRegistry for FakeRegistry {
    async fn create_subject(
        &self,
        _token: &AccessToken,
        draft: &SubjectDraft,
    ) -> Result<SubjectRecord> {
        self.pause().await;
        self.created.lock().unwrap().push(draft.clone());
        if let Some((status, message)) = self.create_error.lock().unwrap().clone() {
            return Err(LensError::Server { status, message });
        }
        Ok(SubjectRecord {
            id: SUBJECT_ID.to_string(),
            name: draft.name.clone(),
            category: draft.category,
            attributes: draft.attributes.clone(),
            questions: Vec::new(),
            score: None,
        })
    }

    async fn submit_score(
        &self,
        _token: &AccessToken,
        subject_id: &str,
        answers: &Attributes,
    ) -> Result<ScoredSubject> {
        self.pause().await;
        self.scored
            .lock()
            .unwrap()
            .push((subject_id.to_string(), answers.clone()));

        let remaining = self.score_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.score_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(LensError::Server {
                status: 502,
                message: "scoring backend unavailable".into(),
            });
        }

        let draft = self.created.lock().unwrap().last().cloned();
        let (name, category) = draft
            .map(|d| (d.name, d.category))
            .unwrap_or_else(|| ("unknown".into(), Default::default()));
        Ok(ScoredSubject {
            product: SubjectRecord {
                id: subject_id.to_string(),
                name,
                category,
                attributes: answers.clone(),
                questions: answers.keys().cloned().collect(),
                score: Some(self.score),
            },
            score: Some(self.score),
        })
    }

    async fn fetch_report(&self, _token: &AccessToken, subject_id: &str) -> Result<Vec<u8>> {
        self.pause().await;
        self.report_requests
            .lock()
            .unwrap()
            .push(subject_id.to_string());
        Ok(b"%PDF-1.4 transparency".to_vec())
    }
}

/// Generator that replays scripted batches, then reports exhaustion.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<Vec<String>, String>>>,
    pub requests: Mutex<Vec<QuestionRequest>>,
    pub delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(batches: Vec<Vec<&str>>) -> Self {
        let script = batches
            .into_iter()
            .map(|b| Ok(b.into_iter().map(str::to_string).collect()))
            .collect();
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Inserts a transport failure as the next response.
    pub fn failing_first(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_front(Err(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<String>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(LensError::Transport { message }),
            None => Ok(Vec::new()),
        }
    }
}

pub fn logged_in() -> Arc<MemoryTokenStore> {
    let store = MemoryTokenStore::new();
    store
        .set(AccessToken::new("test-token").expect("token"))
        .expect("store token");
    Arc::new(store)
}

pub fn driver(
    registry: &Arc<FakeRegistry>,
    generator: &Arc<ScriptedGenerator>,
    tokens: Arc<MemoryTokenStore>,
) -> InterviewDriver {
    let ctx = SessionContext::new(registry.clone(), generator.clone(), tokens)
        .with_request_timeout(Duration::from_secs(5));
    InterviewDriver::new(ctx)
}

pub fn driver_with_timeout(
    registry: &Arc<FakeRegistry>,
    generator: &Arc<ScriptedGenerator>,
    timeout: Duration,
) -> InterviewDriver {
    let ctx = SessionContext::new(registry.clone(), generator.clone(), logged_in())
        .with_request_timeout(timeout);
    InterviewDriver::new(ctx)
}
