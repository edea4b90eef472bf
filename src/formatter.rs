use std::collections::HashSet;

use teloxide::utils::html;

use crate::catalog::MovieRecord;

/// How the gateway should interpret a text body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    Html,
}

/// An outbound unit of content for one chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text { body: String, markup: Markup },
    Image { url: String },
}

impl Payload {
    pub fn html(body: impl Into<String>) -> Self {
        Payload::Text {
            body: body.into(),
            markup: Markup::Html,
        }
    }

    pub fn plain(body: impl Into<String>) -> Self {
        Payload::Text {
            body: body.into(),
            markup: Markup::Plain,
        }
    }

    /// Body of a text payload, `None` for images
    #[allow(dead_code)]
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text { body, .. } => Some(body),
            Payload::Image { .. } => None,
        }
    }
}

/// A search result shown directly in the chat input box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSuggestion {
    pub id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub target_url: String,
    pub message_body: String,
}

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(text: &str) -> String {
    html::escape(text)
}

/// Escape a value placed inside a single-quoted attribute such as `href='...'`
fn escape_attribute(text: &str) -> String {
    html::escape(text).replace('\'', "&#39;")
}

/// Rewrite `https://` image URLs to `http://` when the policy asks for it.
/// Telegram's image fetcher historically failed on some TLS setups of poster hosts.
pub fn normalize_image_url(url: &str, enforce_plain_http: bool) -> String {
    if !enforce_plain_http {
        return url.to_string();
    }
    match url.get(..8) {
        Some(scheme) if scheme.eq_ignore_ascii_case("https://") => format!("http://{}", &url[8..]),
        _ => url.to_string(),
    }
}

/// Pure mapping from catalog records to chat payloads
#[derive(Debug, Clone)]
pub struct Formatter {
    base_url: String,
    enforce_plain_http_for_images: bool,
}

impl Formatter {
    pub fn new(base_url: impl Into<String>, enforce_plain_http_for_images: bool) -> Self {
        Self {
            base_url: base_url.into(),
            enforce_plain_http_for_images,
        }
    }

    pub fn detail_url(&self, record: &MovieRecord) -> String {
        detail_url(&self.base_url, record)
    }

    fn image_url(&self, url: &str) -> String {
        normalize_image_url(url, self.enforce_plain_http_for_images)
    }

    /// Numbered HTML list, one linked line per record. Empty input gives an empty body.
    pub fn format_list(&self, records: &[MovieRecord]) -> Payload {
        let mut html = String::new();
        for (index, record) in records.iter().enumerate() {
            let mut label = escape_html(&record.title);
            if let Some(rating) = &record.rating {
                label.push_str(&format!(" ({})", escape_html(rating)));
            }
            html.push_str(&format!(
                "{}.- <a href='{}'>{}</a>\n",
                index + 1,
                escape_attribute(&self.detail_url(record)),
                label
            ));
        }
        Payload::html(html)
    }

    /// Poster (when known) followed by a "title - rating" line
    pub fn format_single(&self, record: &MovieRecord) -> Vec<Payload> {
        let mut payloads = Vec::with_capacity(2);
        if let Some(poster) = &record.poster_url {
            payloads.push(Payload::Image {
                url: self.image_url(poster),
            });
        }
        let rating = record.rating.as_deref().unwrap_or("N/A");
        payloads.push(Payload::html(format!(
            "{} - {}",
            escape_html(&record.title),
            escape_html(rating)
        )));
        payloads
    }

    pub fn format_inline_suggestion(&self, record: &MovieRecord, base_url: &str) -> InlineSuggestion {
        let target_url = detail_url(base_url, record);
        InlineSuggestion {
            id: record.id.clone(),
            title: record.title.clone(),
            thumbnail_url: record.poster_url.as_deref().map(|p| self.image_url(p)),
            message_body: target_url.clone(),
            target_url,
        }
    }

    /// Suggestions in provider order, with repeated ids made unique by a numeric suffix
    pub fn format_inline_batch(&self, records: &[MovieRecord]) -> Vec<InlineSuggestion> {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(|record| {
                let mut suggestion = self.format_inline_suggestion(record, &self.base_url);
                let mut candidate = suggestion.id.clone();
                let mut n = 2;
                while !seen.insert(candidate.clone()) {
                    candidate = format!("{}-{}", suggestion.id, n);
                    n += 1;
                }
                suggestion.id = candidate;
                suggestion
            })
            .collect()
    }
}

fn detail_url(base_url: &str, record: &MovieRecord) -> String {
    format!("{}{}.html", base_url, record.id)
}
