use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    Markdown,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelegramMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_web_page_preview: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelegramPhoto {
    pub chat_id: String,
    pub photo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

#[derive(Debug, Deserialize)]
struct TelegramApiResult {
    ok: bool,
    description: Option<String>,
}

pub type DynTelegramService = Arc<dyn TelegramServiceTrait + Send + Sync>;

/// sends never fail loudly, a missed notification is logged and reported as `false`
#[automock]
#[async_trait]
pub trait TelegramServiceTrait {
    async fn send_message(&self, bot_token: &str, message: &TelegramMessage) -> bool;
    async fn send_photo(&self, bot_token: &str, photo: &TelegramPhoto) -> bool;
}

pub struct TelegramService {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramService {
    pub fn new(http: reqwest::Client, api_base: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn call<T: Serialize + Sync>(&self, bot_token: &str, method: &str, payload: &T) -> bool {
        let url = format!("{}/bot{}/{}", self.api_base, bot_token, method);

        let response = match self.http.post(&url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                // reqwest puts the url (and with it the token) in its errors
                error!(
                    "Failed to call Telegram {}: {}",
                    method,
                    e.without_url()
                );
                return false;
            }
        };

        match response.json::<TelegramApiResult>().await {
            Ok(result) if result.ok => true,
            Ok(result) => {
                error!(
                    "Telegram API error ({}): {}",
                    method,
                    result.description.unwrap_or_default()
                );
                false
            }
            Err(e) => {
                error!(
                    "Unreadable Telegram {} response: {}",
                    method,
                    e.without_url()
                );
                false
            }
        }
    }
}

#[async_trait]
impl TelegramServiceTrait for TelegramService {
    async fn send_message(&self, bot_token: &str, message: &TelegramMessage) -> bool {
        self.call(bot_token, "sendMessage", message).await
    }

    async fn send_photo(&self, bot_token: &str, photo: &TelegramPhoto) -> bool {
        self.call(bot_token, "sendPhoto", photo).await
    }
}

/// html caption for sendMessage
pub fn format_new_episode_message(drama_title: &str, episode_number: u32, watch_url: &str) -> String {
    format!(
        "🆕 <b>Episode Baru!</b>\n\n📺 <b>{}</b>\nEpisode {}\n\n🔗 <a href=\"{}\">Tonton Sekarang</a>",
        escape_html(drama_title),
        episode_number,
        escape_html(watch_url)
    )
}

/// MarkdownV2 caption for sendPhoto
pub fn format_new_episode_photo(drama_title: &str, episode_number: u32, watch_url: &str) -> String {
    format!(
        "🆕 *Episode Baru\\!*\n\n📺 *{}*\nEpisode {}\n\n🔗 [Tonton Sekarang]({})",
        escape_markdown(drama_title),
        episode_number,
        escape_markdown_link(watch_url)
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// every character MarkdownV2 reserves outside of entities
pub fn escape_markdown(text: &str) -> String {
    escape_chars(text, "\\_*[]()~`>#+-=|{}.!")
}

/// inside `(...)` of an inline link only `)` and `\` are special
pub fn escape_markdown_link(url: &str) -> String {
    escape_chars(url, "\\)")
}

fn escape_chars(text: &str, reserved: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if reserved.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
