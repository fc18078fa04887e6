use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::subject::{Attributes, Category, ScoredSubject, SubjectDraft, SubjectRecord};
use crate::token::AccessToken;

/// Body of `POST /generate-questions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    pub product_name: String,
    pub category: Category,
    pub attributes: Attributes,
    pub previous_answers: Attributes,
    pub asked_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionBatch {
    #[serde(default)]
    pub questions: Option<Vec<String>>,
}

impl QuestionBatch {
    pub fn into_questions(self) -> Vec<String> {
        self.questions.unwrap_or_default()
    }
}

/// Product registry, scorer and report store behind the authenticated API.
#[async_trait]
pub trait SubjectRegistry: Send + Sync {
    async fn create_subject(
        &self,
        token: &AccessToken,
        draft: &SubjectDraft,
    ) -> Result<SubjectRecord>;

    async fn submit_score(
        &self,
        token: &AccessToken,
        subject_id: &str,
        answers: &Attributes,
    ) -> Result<ScoredSubject>;

    async fn fetch_report(&self, token: &AccessToken, subject_id: &str) -> Result<Vec<u8>>;
}

/// Proposes follow-up questions. Called without credentials.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<String>>;
}
