//! Stub backends for unit tests.

use std::{
    collections::{
        HashMap,
        HashSet,
        VecDeque,
    },
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    anki::{
        ApiResponse,
        FlashcardBackend,
    },
    core::{
        FlashcardNote,
        YomicardError,
    },
    llm::{
        CompletionRequest,
        ModelBackend,
    },
};

/// Answers each call with the next queued response and records what it was asked.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Option<String>>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn replying(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Some(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The user message of the `n`th request.
    pub fn user_prompt(&self, n: usize) -> String {
        self.requests.lock().unwrap()[n].messages[1].content.clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, YomicardError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| YomicardError::Custom("no scripted response left".to_string()))
    }
}

/// Accepts every note unless told to refuse it or to fail the transport for it.
pub struct StubFlashcards {
    refusals: HashMap<String, String>,
    unreachable: HashSet<String>,
    submitted: Mutex<Vec<String>>,
}

impl StubFlashcards {
    pub fn new() -> Self {
        Self { refusals: HashMap::new(), unreachable: HashSet::new(), submitted: Mutex::new(Vec::new()) }
    }

    pub fn refuse(mut self, word: &str, error: &str) -> Self {
        self.refusals.insert(word.to_string(), error.to_string());
        self
    }

    pub fn unreachable(mut self, word: &str) -> Self {
        self.unreachable.insert(word.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlashcardBackend for StubFlashcards {
    async fn add_note(&self, note: &FlashcardNote) -> Result<ApiResponse<u64>, YomicardError> {
        let word = note.headword().to_string();
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(word.clone());

        if self.unreachable.contains(&word) {
            return Err(YomicardError::Custom("connection refused".to_string()));
        }
        if let Some(error) = self.refusals.get(&word) {
            return Ok(ApiResponse::err(error.clone()));
        }
        Ok(ApiResponse::ok(1_000 + submitted.len() as u64))
    }
}
