use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::service::{CompletionRequest, ServiceFailure, TextParsingService};

/// Canned [`TextParsingService`] for tests. Counts calls.
pub(crate) struct StubService {
    reply: Result<String, u16>,
    calls: AtomicUsize,
}

impl StubService {
    pub(crate) fn replying(text: &str) -> Self {
        StubService {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(status: u16) -> Self {
        StubService {
            reply: Err(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextParsingService for StubService {
    async fn complete(
        &self,
        _credential: &str,
        _request: &CompletionRequest,
    ) -> Result<String, ServiceFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ServiceFailure::Status {
                status: *status,
                body: String::new(),
            }),
        }
    }
}
