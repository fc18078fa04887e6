//! Session-scoped bookkeeping of which questions were proposed, asked and answered.

use std::collections::VecDeque;

use crate::error::{LensError, Result};

/// Tracks questions for a single interview.
///
/// A question that has been asked never comes back as `pending` or `current`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionLedger {
    asked: Vec<String>,
    pending: VecDeque<String>,
    current: Option<String>,
    exhausted: bool,
}

impl QuestionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn pending(&self) -> impl Iterator<Item = &String> {
        self.pending.iter()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// True when the most recent generator response had no fresh candidates.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn has_asked(&self, question: &str) -> bool {
        self.asked.iter().any(|q| q == question)
    }

    /// Replaces the pending buffer with a new generator batch.
    ///
    /// Blank, already-asked and repeated candidates are dropped. Returns the
    /// number of candidates kept.
    pub fn record_proposals<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut fresh: VecDeque<String> = VecDeque::new();
        for candidate in batch {
            let candidate = candidate.trim().to_string();
            if candidate.is_empty()
                || self.has_asked(&candidate)
                || self.current.as_deref() == Some(candidate.as_str())
                || fresh.contains(&candidate)
            {
                continue;
            }
            fresh.push_back(candidate);
        }
        self.exhausted = fresh.is_empty();
        self.pending = fresh;
        self.pending.len()
    }

    /// Moves the head of `pending` into `current` and marks it asked.
    pub fn surface(&mut self) -> Result<Option<&str>> {
        if let Some(current) = &self.current {
            return Err(LensError::invalid_state(format!(
                "question '{}' is still awaiting an answer",
                current
            )));
        }
        let Some(next) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.mark_asked(&next);
        self.current = Some(next);
        Ok(self.current.as_deref())
    }

    /// Appends to `asked` unless already present. Returns whether it was added.
    pub fn mark_asked(&mut self, question: &str) -> bool {
        if self.has_asked(question) {
            return false;
        }
        self.asked.push(question.to_string());
        self.pending.retain(|q| q != question);
        true
    }

    /// Clears `current`, returning the question that was answered.
    pub fn answer_current(&mut self) -> Option<String> {
        let answered = self.current.take()?;
        self.mark_asked(&answered);
        Some(answered)
    }

    /// Fraction of `expected` questions asked so far, clamped to `[0, 1]`.
    pub fn progress(&self, expected: usize) -> f32 {
        if expected == 0 {
            return 1.0;
        }
        (self.asked.len() as f32 / expected as f32).min(1.0)
    }
}
