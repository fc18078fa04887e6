use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::clients::http::{
    build_client, endpoint, ensure_success, parse_base_url, read_json, transport_error,
};
use crate::clients::traits::SubjectRegistry;
use crate::error::{LensError, Result};
use crate::subject::{Attributes, ScoredSubject, SubjectDraft, SubjectRecord};
use crate::token::AccessToken;

/// Registry, scorer and report endpoints under `/api/products`.
#[derive(Clone, Debug)]
pub struct HttpRegistry {
    base_url: Url,
    timeout: Duration,
    client: Client,
}

impl HttpRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl SubjectRegistry for HttpRegistry {
    async fn create_subject(
        &self,
        token: &AccessToken,
        draft: &SubjectDraft,
    ) -> Result<SubjectRecord> {
        const OP: &str = "create product";
        let url = endpoint(&self.base_url, &["api", "products"])?;
        tracing::debug!("POST {} name={} category={}", url, draft.name, draft.category);

        let resp = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(draft)
            .send()
            .await
            .map_err(|e| transport_error(OP, e, self.timeout))?;

        read_json(OP, resp).await
    }

    async fn submit_score(
        &self,
        token: &AccessToken,
        subject_id: &str,
        answers: &Attributes,
    ) -> Result<ScoredSubject> {
        const OP: &str = "submit score";
        let url = endpoint(&self.base_url, &["api", "products", subject_id, "score"])?;
        tracing::debug!("POST {} answers={}", url, answers.len());

        let resp = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(answers)
            .send()
            .await
            .map_err(|e| transport_error(OP, e, self.timeout))?;

        read_json(OP, resp).await
    }

    async fn fetch_report(&self, token: &AccessToken, subject_id: &str) -> Result<Vec<u8>> {
        const OP: &str = "download report";
        let url = endpoint(&self.base_url, &["api", "products", subject_id, "report"])?;
        tracing::debug!("GET {}", url);

        let resp = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| transport_error(OP, e, self.timeout))?;

        let resp = ensure_success(OP, resp).await?;
        let bytes = resp.bytes().await.map_err(|e| LensError::Transport {
            message: format!("{} failed reading body: {}", OP, e),
        })?;
        Ok(bytes.to_vec())
    }
}
