use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::classify::backend::ClassifierBackend;
use crate::labels;

enum Reply {
    Scores(Vec<f32>),
    Failure(String),
}

/// Scripted backend for tests, demos, and model-less runs.
///
/// Replies are served in push order; once the script is exhausted the
/// backend falls back to a constant vector (uniform by default, so no
/// class ever clears a realistic confidence gate).
pub struct ScriptedBackend {
    script: VecDeque<Reply>,
    fallback: Vec<f32>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            fallback: vec![1.0 / labels::CLASS_COUNT as f32; labels::CLASS_COUNT],
        }
    }

    /// Backend that keeps recognizing one class at a fixed confidence.
    pub fn constant(class_id: u8, confidence: f32) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: scores_for(class_id, confidence),
        }
    }

    /// Queue one raw score vector (any length, for malformed-output tests).
    pub fn push_scores(&mut self, scores: Vec<f32>) {
        self.script.push_back(Reply::Scores(scores));
    }

    /// Queue one well-formed reply recognizing `class_id` at `confidence`.
    pub fn push_class(&mut self, class_id: u8, confidence: f32) {
        self.push_scores(scores_for(class_id, confidence));
    }

    /// Queue one inference failure.
    pub fn push_failure(&mut self, message: &str) {
        self.script.push_back(Reply::Failure(message.to_string()));
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn predict(&mut self, _input: &[f32]) -> Result<Vec<f32>> {
        match self.script.pop_front() {
            Some(Reply::Scores(scores)) => Ok(scores),
            Some(Reply::Failure(message)) => Err(anyhow!("{}", message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Score vector with `confidence` at `class_id` and the remainder spread
/// evenly over the other classes.
fn scores_for(class_id: u8, confidence: f32) -> Vec<f32> {
    let rest = (1.0 - confidence) / (labels::CLASS_COUNT as f32 - 1.0);
    let mut scores = vec![rest; labels::CLASS_COUNT];
    let idx = usize::from(class_id.clamp(1, labels::CLASS_COUNT as u8)) - 1;
    scores[idx] = confidence;
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replies_are_served_in_order() {
        let mut backend = ScriptedBackend::new();
        backend.push_class(14, 0.8);
        backend.push_failure("boom");

        let first = backend.predict(&[]).unwrap();
        assert_eq!(first.len(), labels::CLASS_COUNT);
        assert!((first[13] - 0.8).abs() < 1e-6);

        assert!(backend.predict(&[]).is_err());

        // Exhausted script falls back to the uniform vector.
        let fallback = backend.predict(&[]).unwrap();
        assert!(fallback.iter().all(|&s| s < 0.1));
    }

    #[test]
    fn constant_backend_always_reports_its_class() {
        let mut backend = ScriptedBackend::constant(15, 0.9);
        for _ in 0..3 {
            let scores = backend.predict(&[]).unwrap();
            assert!((scores[14] - 0.9).abs() < 1e-6);
        }
    }
}
