//! Minimal Telegram Bot API client: the three methods the bot needs

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use slotwatch_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
/// Must exceed the long-poll timeout handed to `getUpdates`
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ─── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    link_preview_options: LinkPreviewOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Debug, Serialize)]
struct ReplyParameters {
    message_id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SetMyCommands<'a> {
    commands: &'a [BotCommand],
}

// ─── Client ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TelegramApi {
    http: Client,
    /// `{api}/bot{token}/`
    endpoint: Url,
}

impl TelegramApi {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    pub fn with_api_url(api_url: &str, token: &str) -> Result<Self> {
        let endpoint = Url::parse(&format!("{}/bot{}/", api_url.trim_end_matches('/'), token))
            .map_err(|e| Error::ConfigError(format!("invalid Telegram API url: {}", e)))?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Ok(Self { http, endpoint })
    }

    /// Send an HTML message, optionally as a reply
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<()> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            link_preview_options: LinkPreviewOptions { is_disabled: true },
            reply_parameters: reply_to.map(|message_id| ReplyParameters { message_id }),
        };
        let _: Message = self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Long-poll for new messages after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &body).await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let _: bool = self.call("setMyCommands", &SetMyCommands { commands }).await?;
        Ok(())
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let url = self
            .endpoint
            .join(method)
            .map_err(|e| Error::InvalidData(format!("invalid method {}: {}", method, e)))?;

        debug!("POST {}", method);
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        // Telegram puts the reason in the body even for error statuses
        let parsed: ApiResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Status {
                    code: status.as_u16(),
                    url: method.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::NotificationError(format!(
                "{} failed: {}",
                method,
                parsed
                    .description
                    .unwrap_or_else(|| format!("status {}", status))
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn spawn_api() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let app = Router::new().route(
            "/{bot}/{method}",
            post(move |Path((_, method)): Path<(String, String)>, Json(body): Json<Value>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push((method.clone(), body.clone()));
                    let reply = match method.as_str() {
                        "sendMessage" if body["chat_id"] == 666 => {
                            json!({ "ok": false, "description": "Forbidden: bot was blocked by the user" })
                        }
                        "sendMessage" => json!({
                            "ok": true,
                            "result": { "message_id": 1, "chat": { "id": body["chat_id"] }, "text": body["text"] }
                        }),
                        "getUpdates" => json!({
                            "ok": true,
                            "result": [
                                { "update_id": 10, "message": { "message_id": 5, "chat": { "id": 42 }, "text": "/list" } },
                                { "update_id": 11 }
                            ]
                        }),
                        _ => json!({ "ok": true, "result": true }),
                    };
                    Json(reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_send_message_posts_html() {
        let (url, seen) = spawn_api().await;
        let api = TelegramApi::with_api_url(&url, "123:abc").unwrap();

        api.send_message(42, "<b>hi</b>", Some(7)).await.unwrap();

        let seen = seen.lock().unwrap();
        let (method, body) = &seen[0];
        assert_eq!(method, "sendMessage");
        assert_eq!(body["chat_id"], 42);
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["reply_parameters"]["message_id"], 7);
        assert_eq!(body["link_preview_options"]["is_disabled"], true);
    }

    #[tokio::test]
    async fn test_api_failure_is_notification_error() {
        let (url, _) = spawn_api().await;
        let api = TelegramApi::with_api_url(&url, "123:abc").unwrap();

        let err = api.send_message(666, "hi", None).await.unwrap_err();
        assert!(matches!(err, Error::NotificationError(ref msg) if msg.contains("blocked")));
    }

    #[tokio::test]
    async fn test_get_updates_decodes_messages() {
        let (url, seen) = spawn_api().await;
        let api = TelegramApi::with_api_url(&url, "123:abc").unwrap();

        let updates = api.get_updates(10, 0).await.unwrap();

        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("/list"));
        assert!(updates[1].message.is_none());
        assert_eq!(seen.lock().unwrap()[0].1["offset"], 10);
    }

    #[tokio::test]
    async fn test_set_my_commands() {
        let (url, seen) = spawn_api().await;
        let api = TelegramApi::with_api_url(&url, "123:abc").unwrap();

        api.set_my_commands(&[BotCommand {
            command: "list".to_string(),
            description: "Shows tracked rewards".to_string(),
        }])
        .await
        .unwrap();

        assert_eq!(seen.lock().unwrap()[0].1["commands"][0]["command"], "list");
    }
}
