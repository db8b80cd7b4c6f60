//! Scripted backend for exercising callers without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::GenerativeBackend;
use crate::outcome::RemoteCallOutcome;
use crate::wire::GenerateRequest;

/// Replays queued outcomes in order and records every request it sees
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<RemoteCallOutcome<String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new(outcomes: impl IntoIterator<Item = RemoteCallOutcome<String>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Successful replies carrying the given model texts
    pub fn replies<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            texts
                .into_iter()
                .map(|t| RemoteCallOutcome::Success(t.into())),
        )
    }

    pub fn push(&self, outcome: RemoteCallOutcome<String>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompt text of the `index`-th request
    pub fn prompt(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index]
            .prompt_text()
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(
        &self,
        _api_key: &str,
        request: &GenerateRequest,
    ) -> RemoteCallOutcome<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RemoteCallOutcome::PermanentFailure {
                status: None,
                message: "script exhausted".to_string(),
            })
    }
}
