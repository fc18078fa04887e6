use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::clients::http::{build_client, endpoint, parse_base_url, read_json, transport_error};
use crate::clients::traits::{QuestionBatch, QuestionGenerator, QuestionRequest};
use crate::error::Result;

/// Client for `POST /generate-questions`.
///
/// The generator endpoint is called without a bearer token.
#[derive(Clone, Debug)]
pub struct HttpQuestionGenerator {
    base_url: Url,
    timeout: Duration,
    client: Client,
}

impl HttpQuestionGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl QuestionGenerator for HttpQuestionGenerator {
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<String>> {
        const OP: &str = "generate questions";
        let url = endpoint(&self.base_url, &["generate-questions"])?;
        tracing::debug!(
            "POST {} asked={} answered={}",
            url,
            request.asked_questions.len(),
            request.previous_answers.len()
        );

        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(OP, e, self.timeout))?;

        let batch: QuestionBatch = read_json(OP, resp).await?;
        Ok(batch.into_questions())
    }
}
