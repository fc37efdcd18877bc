pub mod classify;
pub mod delegated;
pub mod extract;
pub mod image;
pub mod segment;
pub mod sort_order;

#[cfg(test)]
pub(crate) mod stub;

use std::future::Future;

use tracing::{debug, info, warn};

pub use classify::classify;
pub use delegated::DelegatedParser;
pub use image::{append_items, ImageAnalysis};
pub use segment::segment;

use crate::error::ParseError;
use crate::model::Item;
use crate::service::TextParsingService;

/// Per-call choice of strategy.
#[derive(Debug, Clone, Default)]
pub struct ParseConfig {
    pub use_delegated: bool,
    pub credential: Option<String>,
}

impl ParseConfig {
    /// A blank credential counts as absent.
    pub fn new(use_delegated: bool, credential: impl Into<String>) -> Self {
        let credential = credential.into();
        let credential = if credential.trim().is_empty() {
            None
        } else {
            Some(credential)
        };
        ParseConfig {
            use_delegated,
            credential,
        }
    }

    pub fn manual() -> Self {
        ParseConfig::default()
    }

    fn delegated_credential(&self) -> Option<&str> {
        if self.use_delegated {
            self.credential.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub items: Vec<Item>,
    /// Set only when delegated parsing was attempted and failed.
    pub warning: Option<ParseError>,
}

/// Text → categorized, sorted items. Tries delegated parsing when configured
/// and falls back to manual segmentation on any failure.
pub struct ListParser<S> {
    delegated: DelegatedParser<S>,
}

impl<S: TextParsingService> ListParser<S> {
    pub fn new(delegated: DelegatedParser<S>) -> Self {
        ListParser { delegated }
    }

    pub fn delegated(&self) -> &DelegatedParser<S> {
        &self.delegated
    }

    pub async fn process(&self, text: &str, config: &ParseConfig) -> ParseOutcome {
        let mut warning = None;

        let names = match config.delegated_credential() {
            Some(credential) if !text.trim().is_empty() => {
                match self.delegated.parse(text, credential).await {
                    Ok(names) => Some(names),
                    Err(e) => {
                        warn!(error = %e, "delegated parsing failed, falling back to manual");
                        warning = Some(e);
                        None
                    }
                }
            }
            _ => None,
        };

        let names = match names {
            Some(names) => names,
            None => {
                let names = segment(text);
                debug!(count = names.len(), "manual segmentation");
                names
            }
        };

        let items = categorize(names);
        info!("Parsed {} items (fallback: {})", items.len(), warning.is_some());
        ParseOutcome { items, warning }
    }

    /// Like [`process`](Self::process), but gives up as soon as `cancelled`
    /// resolves. A result that is ready when cancellation lands is discarded.
    pub async fn process_until<F>(
        &self,
        text: &str,
        config: &ParseConfig,
        cancelled: F,
    ) -> Option<ParseOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancelled => {
                info!("Parsing cancelled by caller");
                None
            }
            outcome = self.process(text, config) => Some(outcome),
        }
    }
}

/// Cancellation future for [`ListParser::process_until`] driven by a signal
/// listener such as `tokio::signal::ctrl_c()`. A listener that fails to
/// install never resolves, so parsing runs to completion.
pub async fn until_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "could not listen for cancellation signal");
        std::future::pending::<()>().await;
    }
}

/// Manual path only; needs no service.
pub fn process_manual(text: &str) -> Vec<Item> {
    categorize(segment(text))
}

fn categorize(names: Vec<String>) -> Vec<Item> {
    let pairs = names
        .into_iter()
        .map(|name| {
            let category = classify(&name);
            (name, category)
        })
        .collect();
    sort_order::assign(pairs)
}
