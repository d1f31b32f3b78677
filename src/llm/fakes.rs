// In-process stand-ins for the model services, used by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{CompletionRequest, CompletionService, EmbeddingService};
use crate::{DeskError, Result};

/// Bag-of-words embedding: each word bumps one bucket, then the vector is unit-normalized
pub(crate) fn bucket_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0_f32; dimension];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(0_usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % dimension;
        vector[bucket] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

pub(crate) struct FakeEmbeddings {
    pub dimension: usize,
    pub overrides: HashMap<String, Vec<f32>>,
    pub fail: bool,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub seen: Mutex<Vec<String>>,
}

impl FakeEmbeddings {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            overrides: HashMap::new(),
            fail: false,
            batch_sizes: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    pub(crate) fn with_override(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), vector);
        self
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().expect("lock").clone()
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("lock").clone()
    }
}

impl EmbeddingService for FakeEmbeddings {
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_sizes.lock().expect("lock").push(texts.len());
        self.seen.lock().expect("lock").extend(texts.iter().cloned());

        if self.fail {
            return Err(DeskError::Embedding("embedding endpoint unavailable".to_string()));
        }

        Ok(texts
            .iter()
            .map(|text| {
                self.overrides
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| bucket_embedding(text, self.dimension))
            })
            .collect())
    }
}

/// Replays canned replies in order; an exhausted script fails like an unreachable API
pub(crate) struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub(crate) fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(reply: &str) -> Self {
        Self::new([Ok(reply.to_string())])
    }

    pub(crate) fn failing() -> Self {
        Self::new([Err(DeskError::Completion("connection timed out".to_string()))])
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().expect("lock").push(request.clone());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(DeskError::Completion("no scripted reply left".to_string())))
    }
}
