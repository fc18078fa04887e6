//! Interview orchestration: foundation, question loop, scoring and report.
//!
//! The driver owns all session state behind a non-reentrant async lock. A
//! transition attempted while another one is still waiting on the network
//! fails fast with [`LensError::Busy`]. Every external call is bounded by the
//! session timeout and can be aborted with [`InterviewDriver::cancel`]; in both
//! cases the state is left exactly as it was before the call.

use std::fmt;
use std::future::Future;
use std::sync::Mutex as StdMutex;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::QuestionRequest;
use crate::error::{LensError, Result};
use crate::ledger::QuestionLedger;
use crate::session::SessionContext;
use crate::subject::{Category, ReportArtifact, ScoreTier, SubjectDraft, SubjectRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Foundation,
    Interviewing,
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Foundation => "product foundation",
            Phase::Interviewing => "transparency interview",
            Phase::Reporting => "analysis complete",
        };
        f.write_str(label)
    }
}

/// What the caller should present after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A question now awaits an answer.
    Question(String),
    /// Fetching the next question failed; nothing awaits an answer until
    /// [`InterviewDriver::request_next_question`] succeeds.
    Stalled { reason: String },
    /// The generator ran out of questions and the subject has been scored.
    Scored(ScoreSummary),
    /// The generator ran out of questions but scoring failed. Answers are kept
    /// and [`InterviewDriver::finalize_report`] retries with them.
    Unscored { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub subject_id: String,
    pub name: String,
    pub score: f64,
    pub tier: ScoreTier,
}

impl ScoreSummary {
    fn from_record(record: &SubjectRecord) -> Result<Self> {
        let score = record.score.ok_or_else(|| LensError::Serialization {
            message: "scored subject carries no score".into(),
        })?;
        Ok(Self {
            subject_id: record.id.clone(),
            name: record.name.clone(),
            score,
            tier: ScoreTier::classify(score),
        })
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct DriverSnapshot {
    pub phase: Phase,
    pub name: String,
    pub category: Category,
    pub subject: Option<SubjectRecord>,
    pub current_question: Option<String>,
    pub asked: Vec<String>,
    pub exhausted: bool,
    pub progress: f32,
}

#[derive(Debug, Default)]
struct DriverState {
    phase: Phase,
    name: String,
    category: Category,
    subject: Option<SubjectRecord>,
    ledger: QuestionLedger,
}

impl DriverState {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        info!("phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn require(&self, phase: Phase, action: &str) -> Result<()> {
        if self.phase() == phase {
            Ok(())
        } else {
            Err(LensError::invalid_state(format!(
                "cannot {} during {}",
                action,
                self.phase()
            )))
        }
    }
}

pub struct InterviewDriver {
    ctx: SessionContext,
    state: Mutex<DriverState>,
    cancel: StdMutex<CancellationToken>,
}

impl InterviewDriver {
    pub fn new(ctx: SessionContext) -> Self {
        info!(session = %ctx.session_id, "interview session opened");
        Self {
            ctx,
            state: Mutex::new(DriverState::default()),
            cancel: StdMutex::new(CancellationToken::new()),
        }
    }

    /// True while a transition is waiting on an external call.
    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    pub fn snapshot(&self) -> Result<DriverSnapshot> {
        let state = self.lock()?;
        let progress = match state.phase() {
            Phase::Reporting => 1.0,
            _ => state.ledger.progress(self.ctx.expected_questions),
        };
        Ok(DriverSnapshot {
            phase: state.phase(),
            name: state.name.clone(),
            category: state.category,
            subject: state.subject.clone(),
            current_question: state.ledger.current().map(str::to_string),
            asked: state.ledger.asked().to_vec(),
            exhausted: state.ledger.is_exhausted(),
            progress,
        })
    }

    /// Edits the foundation fields. Only valid before the subject exists.
    pub fn set_foundation(&self, name: &str, category: Category) -> Result<()> {
        let mut state = self.lock()?;
        state.require(Phase::Foundation, "edit the product foundation")?;
        state.name = name.to_string();
        state.category = category;
        Ok(())
    }

    /// Registers the subject and asks for the first question.
    pub async fn submit_foundation(&self) -> Result<Step> {
        let mut state = self.lock()?;
        state.require(Phase::Foundation, "begin the analysis")?;
        let draft = SubjectDraft::new(&state.name, state.category)?;
        let token = self.ctx.authorize()?;

        let subject = self
            .bounded(
                "create product",
                self.ctx.registry().create_subject(&token, &draft),
            )
            .await?;
        info!(subject_id = %subject.id, name = %subject.name, "subject created");

        state.subject = Some(subject);
        state.ledger = QuestionLedger::new();
        state.enter(Phase::Interviewing);
        self.advance(&mut state).await
    }

    /// Fetches a question when none is outstanding, e.g. after a stalled fetch.
    ///
    /// Returns the outstanding question without a network call if there is one.
    pub async fn request_next_question(&self) -> Result<Step> {
        let mut state = self.lock()?;
        state.require(Phase::Interviewing, "request the next question")?;
        if let Some(current) = state.ledger.current() {
            return Ok(Step::Question(current.to_string()));
        }
        if state.ledger.is_exhausted() {
            return Err(LensError::invalid_state(
                "no further questions remain; finalize the report",
            ));
        }
        self.advance(&mut state).await
    }

    /// Records the answer to the outstanding question and moves on.
    pub async fn submit_answer(&self, answer: &str) -> Result<Step> {
        let mut state = self.lock()?;
        state.require(Phase::Interviewing, "submit an answer")?;
        let Some(question) = state.ledger.current().map(str::to_string) else {
            return Err(LensError::invalid_state("no question is awaiting an answer"));
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(LensError::validation(
                "Please provide an answer before proceeding.",
            ));
        }

        let subject = state.subject.as_mut().ok_or(LensError::MissingSubject)?;
        subject.attributes.insert(question.clone(), answer.to_string());
        state.ledger.answer_current();
        debug!(question = %question, "answer recorded");

        self.advance(&mut state).await
    }

    /// Scores the accumulated answers once no question is outstanding.
    pub async fn finalize_report(&self) -> Result<ScoreSummary> {
        let mut state = self.lock()?;
        if state.subject.is_none() {
            return Err(LensError::MissingSubject);
        }
        state.require(Phase::Interviewing, "finalize the report")?;
        if let Some(current) = state.ledger.current() {
            return Err(LensError::invalid_state(format!(
                "answer '{}' before finalizing",
                current
            )));
        }
        self.finalize_locked(&mut state).await
    }

    /// Downloads the report for the scored subject. The bytes are not inspected.
    pub async fn fetch_report(&self) -> Result<ReportArtifact> {
        let state = self.lock()?;
        state.require(Phase::Reporting, "download the report")?;
        let subject = state.subject.as_ref().ok_or(LensError::MissingSubject)?;
        if subject.score.is_none() {
            return Err(LensError::invalid_state("subject has not been scored"));
        }
        let token = self.ctx.authorize()?;

        let bytes = self
            .bounded(
                "download report",
                self.ctx.registry().fetch_report(&token, &subject.id),
            )
            .await?;
        info!(subject_id = %subject.id, bytes = bytes.len(), "report downloaded");

        Ok(ReportArtifact {
            subject_id: subject.id.clone(),
            file_name: subject.report_file_name(),
            bytes,
            fetched_at: Utc::now(),
        })
    }

    /// Drops the finished analysis and returns to an empty foundation.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.require(Phase::Reporting, "start a new analysis")?;
        *state = DriverState::default();
        info!(session = %self.ctx.session_id, "session reset");
        Ok(())
    }

    /// Aborts the external call currently in flight, if any.
    pub fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }

    fn lock(&self) -> Result<MutexGuard<'_, DriverState>> {
        self.state.try_lock().map_err(|_| LensError::Busy)
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let cancel = self.cancel_token();
        let timeout = self.ctx.request_timeout;
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("{} cancelled", operation);
                Err(LensError::Cancelled { operation: operation.to_string() })
            }
            outcome = tokio::time::timeout(timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(LensError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }),
            },
        }
    }

    /// Asks the generator for the next batch. Assumes no question is outstanding.
    async fn advance(&self, state: &mut DriverState) -> Result<Step> {
        let subject = state.subject.as_ref().ok_or(LensError::MissingSubject)?;
        let request = QuestionRequest {
            product_name: subject.name.clone(),
            category: subject.category,
            attributes: subject.attributes.clone(),
            previous_answers: subject.attributes.clone(),
            asked_questions: state.ledger.asked().to_vec(),
        };

        let batch = match self
            .bounded("generate questions", self.ctx.generator().generate(&request))
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                warn!("Error fetching next question: {}", err);
                return Ok(Step::Stalled {
                    reason: err.to_string(),
                });
            }
        };

        let offered = batch.len();
        let kept = state.ledger.record_proposals(batch);
        debug!(offered, kept, "generator batch received");

        if state.ledger.is_exhausted() {
            info!(
                asked = state.ledger.asked().len(),
                "generator exhausted; scoring"
            );
            return match self.finalize_locked(state).await {
                Ok(summary) => Ok(Step::Scored(summary)),
                Err(err) => {
                    warn!("Error saving answers: {}", err);
                    Ok(Step::Unscored {
                        reason: err.to_string(),
                    })
                }
            };
        }

        match state.ledger.surface()?.map(str::to_string) {
            Some(question) => Ok(Step::Question(question)),
            None => Ok(Step::Stalled {
                reason: "generator returned no usable question".into(),
            }),
        }
    }

    async fn finalize_locked(&self, state: &mut DriverState) -> Result<ScoreSummary> {
        let subject = state.subject.as_ref().ok_or(LensError::MissingSubject)?;
        let token = self.ctx.authorize()?;
        let subject_id = subject.id.clone();
        let answers = subject.attributes.clone();

        let scored = self
            .bounded(
                "submit score",
                self.ctx
                    .registry()
                    .submit_score(&token, &subject_id, &answers),
            )
            .await?;
        let record = scored.into_record()?;
        let summary = ScoreSummary::from_record(&record)?;
        info!(
            subject_id = %summary.subject_id,
            score = summary.score,
            tier = %summary.tier,
            "subject scored"
        );

        state.subject = Some(record);
        state.ledger = QuestionLedger::new();
        state.enter(Phase::Reporting);
        Ok(summary)
    }
}
