use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, info, warn};

use crate::catalog::{CatalogError, CatalogProvider, MovieRecord};
use crate::commands::{self, Action, ResultShape};
use crate::formatter::{Formatter, InlineSuggestion, Payload};
use crate::platform::{CommandEvent, InlineQueryEvent, InlineResponder, MessagingGateway};
use crate::tracker::{self, UsageTracker};

pub const FAILURE_MESSAGE: &str =
    "Sorry, the movie catalog is not available right now. Please try again later.";

/// Maps inbound commands and inline queries to catalog calls and formatted payloads.
/// Holds no per-request state, so one instance serves every event concurrently.
pub struct Router {
    provider: Arc<dyn CatalogProvider>,
    tracker: Arc<dyn UsageTracker>,
    formatter: Formatter,
    provider_timeout: Duration,
    tracker_timeout: Duration,
}

impl Router {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        tracker: Arc<dyn UsageTracker>,
        enforce_plain_http_for_images: bool,
        provider_timeout: Duration,
        tracker_timeout: Duration,
    ) -> Self {
        let formatter = Formatter::new(provider.base_detail_url(), enforce_plain_http_for_images);
        Self {
            provider,
            tracker,
            formatter,
            provider_timeout,
            tracker_timeout,
        }
    }

    /// Handle a command end to end and deliver the result through the gateway
    pub async fn handle_command(&self, event: &CommandEvent, gateway: &dyn MessagingGateway) {
        let payloads = self.dispatch(event).await;
        if let Err(e) = gateway.send(event.target, payloads).await {
            error!(
                "Failed to deliver /{} response to chat {}: {:#}",
                event.name, event.target, e
            );
        }
    }

    /// Handle an inline query end to end and answer it through the responder
    pub async fn handle_inline_query(&self, event: &InlineQueryEvent, responder: &dyn InlineResponder) {
        let suggestions = self.inline_query(event).await;
        if let Err(e) = responder.answer(suggestions).await {
            error!(
                "Failed to answer inline query '{}' from {}: {:#}",
                event.query_text, event.requester_id, e
            );
        }
    }

    /// Resolve a command into the payloads to send. Never fails: unknown commands
    /// get the help text and any error or panic becomes a generic failure message.
    pub async fn dispatch(&self, event: &CommandEvent) -> Vec<Payload> {
        info!(
            "Command /{} from {} in chat {}",
            event.name, event.requester_id, event.target
        );

        tracker::spawn_track(
            self.tracker.clone(),
            self.tracker_timeout,
            event.requester_id.clone(),
            event.name.clone(),
            event.raw.clone(),
        );

        match AssertUnwindSafe(self.try_dispatch(&event.name))
            .catch_unwind()
            .await
        {
            Ok(Ok(payloads)) => payloads,
            Ok(Err(e)) => {
                error!(
                    "Command /{} from {} in chat {} failed: {}",
                    event.name, event.requester_id, event.target, e
                );
                vec![Payload::plain(FAILURE_MESSAGE)]
            }
            Err(_) => {
                error!(
                    "Command /{} from {} in chat {} panicked",
                    event.name, event.requester_id, event.target
                );
                vec![Payload::plain(FAILURE_MESSAGE)]
            }
        }
    }

    async fn try_dispatch(&self, name: &str) -> Result<Vec<Payload>, CatalogError> {
        let command = match commands::lookup(name) {
            Some(command) => command,
            None => {
                info!("Unknown command /{}, answering with help", name);
                return Ok(vec![Payload::html(commands::help_text())]);
            }
        };

        match command.action {
            Action::Greet => Ok(vec![Payload::plain(commands::GREETING)]),
            Action::Help => Ok(vec![Payload::html(commands::help_text())]),
            Action::Catalog {
                category,
                shape: ResultShape::List,
            } => {
                let movies = self
                    .bounded(self.provider.fetch_category(category))
                    .await?;
                validate_all(&movies)?;
                if movies.is_empty() {
                    info!("Category '{}' returned no movies", category);
                }
                Ok(vec![self.formatter.format_list(&movies)])
            }
            Action::Catalog {
                category,
                shape: ResultShape::Single,
            } => {
                let movie = self.bounded(self.provider.fetch_random(category)).await?;
                movie.validate()?;
                Ok(self.formatter.format_single(&movie))
            }
        }
    }

    /// Search the catalog for an inline query. Errors are logged and answered
    /// with an empty suggestion list.
    pub async fn inline_query(&self, event: &InlineQueryEvent) -> Vec<InlineSuggestion> {
        let query = event.query_text.trim();
        if query.is_empty() {
            return Vec::new();
        }

        info!("Inline query '{}' from {}", query, event.requester_id);

        let result = AssertUnwindSafe(async {
            let movies = self.bounded(self.provider.search(query)).await?;
            validate_all(&movies)?;
            Ok::<_, CatalogError>(self.formatter.format_inline_batch(&movies))
        })
        .catch_unwind()
        .await;

        match result {
            Ok(Ok(suggestions)) => suggestions,
            Ok(Err(e)) => {
                warn!(
                    "Inline query '{}' from {} failed: {}",
                    query, event.requester_id, e
                );
                Vec::new()
            }
            Err(_) => {
                error!("Inline query '{}' from {} panicked", query, event.requester_id);
                Vec::new()
            }
        }
    }

    /// Bound a provider call by the per-request timeout
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CatalogError>>,
    ) -> Result<T, CatalogError> {
        tokio::time::timeout(self.provider_timeout, call)
            .await
            .map_err(|_| CatalogError::Timeout(self.provider_timeout))?
    }
}

fn validate_all(movies: &[MovieRecord]) -> Result<(), CatalogError> {
    movies.iter().try_for_each(MovieRecord::validate)
}
