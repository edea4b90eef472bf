use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineQuery, InlineQueryResult, InlineQueryResultArticle, InputFile, InputMessageContent,
    InputMessageContentText, ParseMode,
};
use teloxide::update_listeners::webhooks;
use tracing::{debug, info, warn};

use crate::commands;
use crate::config::TelegramConfig;
use crate::formatter::{InlineSuggestion, Markup, Payload};
use crate::platform::{ChatTarget, CommandEvent, InlineQueryEvent, InlineResponder, MessagingGateway};
use crate::router::Router;

/// Telegram rejects messages over 4096 characters
const MAX_MESSAGE_LEN: usize = 4000;

/// Telegram rejects inline answers with more than 50 results
const MAX_INLINE_RESULTS: usize = 50;

/// The bot's own username, used to ignore commands addressed to other bots
#[derive(Debug, Clone)]
struct BotUsername(Option<String>);

/// Split long messages, preferring line boundaries so HTML tags stay balanced per chunk
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Delivers formatted payloads through the Bot API
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_payload(&self, chat_id: ChatId, payload: Payload) -> Result<()> {
        match payload {
            Payload::Text { body, markup } => {
                if body.is_empty() {
                    debug!("Skipping empty text payload for chat {}", chat_id);
                    return Ok(());
                }
                for chunk in split_message(&body, MAX_MESSAGE_LEN) {
                    let request = self.bot.send_message(chat_id, chunk);
                    let sent = match markup {
                        Markup::Html => request.parse_mode(ParseMode::Html).await,
                        Markup::Plain => request.await,
                    };
                    sent.context("Failed to send message")?;
                }
            }
            Payload::Image { url } => {
                let parsed = reqwest::Url::parse(&url)
                    .with_context(|| format!("Invalid image URL: {}", url))?;
                self.bot
                    .send_photo(chat_id, InputFile::url(parsed))
                    .await
                    .with_context(|| format!("Failed to send photo {}", url))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send(&self, target: ChatTarget, payloads: Vec<Payload>) -> Result<()> {
        let chat_id = ChatId(target.0);
        let total = payloads.len();
        let mut failed = 0;

        // Keep going after a failed payload; a missing poster should not swallow the text
        for payload in payloads {
            if let Err(e) = self.send_payload(chat_id, payload).await {
                warn!("Delivery to chat {} failed: {:#}", chat_id, e);
                failed += 1;
            }
        }

        if failed > 0 {
            anyhow::bail!("{} of {} payloads were not delivered", failed, total);
        }
        Ok(())
    }
}

type AnswerFn =
    Box<dyn Fn(Vec<InlineQueryResult>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Answers one inline query; the query id is captured when the responder is built
pub struct TelegramInlineResponder {
    answer: AnswerFn,
}

#[async_trait]
impl InlineResponder for TelegramInlineResponder {
    async fn answer(&self, suggestions: Vec<InlineSuggestion>) -> Result<()> {
        if suggestions.len() > MAX_INLINE_RESULTS {
            debug!(
                "Trimming {} inline suggestions to {}",
                suggestions.len(),
                MAX_INLINE_RESULTS
            );
        }
        let results = suggestions
            .into_iter()
            .take(MAX_INLINE_RESULTS)
            .map(to_article)
            .collect();
        (self.answer)(results).await
    }
}

fn to_article(suggestion: InlineSuggestion) -> InlineQueryResult {
    let content = InputMessageContent::Text(InputMessageContentText::new(
        suggestion.message_body,
    ));
    let mut article = InlineQueryResultArticle::new(suggestion.id, suggestion.title, content);
    if let Ok(url) = reqwest::Url::parse(&suggestion.target_url) {
        article = article.url(url);
    }
    if let Some(thumbnail) = suggestion
        .thumbnail_url
        .as_deref()
        .and_then(|t| reqwest::Url::parse(t).ok())
    {
        article = article.thumbnail_url(thumbnail);
    }
    InlineQueryResult::Article(article)
}

/// Run the Telegram bot, by webhook when configured and long polling otherwise
pub async fn run(router: Arc<Router>, config: &TelegramConfig) -> Result<()> {
    let bot = Bot::new(&config.bot_token);

    info!("Starting Telegram platform...");

    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    let username = BotUsername(me.user.username.clone());
    info!("Running as @{}", username.0.as_deref().unwrap_or("<no username>"));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_inline_query().endpoint(handle_inline_query));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![router, username])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build();

    match config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        Some(base) => {
            let url = webhook_url(base, &config.bot_token)?;
            let address = ([0, 0, 0, 0], config.listen_port).into();
            info!(
                "Receiving updates by webhook on port {}",
                config.listen_port
            );
            let listener = webhooks::axum(bot, webhooks::Options::new(address, url))
                .await
                .context("Failed to set up webhook")?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("webhook"),
                )
                .await;
        }
        None => {
            info!("Receiving updates by long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}

/// The webhook path is the bot token, so only Telegram knows where to post
fn webhook_url(base: &str, token: &str) -> Result<reqwest::Url> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    reqwest::Url::parse(&format!("{}{}", base, token))
        .with_context(|| format!("Invalid webhook_url: {}", base))
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    router: Arc<Router>,
    username: BotUsername,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    // Plain chatter is ignored; only commands are answered
    let name = match commands::parse_command(text, username.0.as_deref()) {
        Some(name) => name,
        None => return Ok(()),
    };

    let requester_id = msg
        .from
        .as_ref()
        .map(|user| user.id.0.to_string())
        .unwrap_or_default();

    bot.send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
        .ok();

    let event = CommandEvent {
        name: name.to_string(),
        target: ChatTarget(msg.chat.id.0),
        requester_id,
        raw: text.to_string(),
    };

    router
        .handle_command(&event, &TelegramGateway::new(bot))
        .await;

    Ok(())
}

async fn handle_inline_query(bot: Bot, q: InlineQuery, router: Arc<Router>) -> ResponseResult<()> {
    let event = InlineQueryEvent {
        query_text: q.query.clone(),
        requester_id: q.from.id.0.to_string(),
    };

    let query_id = q.id;
    let responder = TelegramInlineResponder {
        answer: Box::new(move |results: Vec<InlineQueryResult>| {
            let bot = bot.clone();
            let query_id = query_id.clone();
            async move {
                bot.answer_inline_query(query_id, results)
                    .await
                    .context("Failed to answer inline query")?;
                Ok(())
            }
            .boxed()
        }),
    };

    router.handle_inline_query(&event, &responder).await;

    Ok(())
}
