//! Blocking Slack Web API client.

use super::{DeletedMessage, HistoryPage, Page, SlackApi, SlackHttpConfig, build_http_client};
use crate::models::{Channel, ChannelKind, FileRecord, Identity, Message};
use crate::{Error, Result};
use chrono::DateTime;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Page size requested from cursor-paginated endpoints.
const PAGE_LIMIT: &str = "200";

/// Slack Web API client.
pub struct SlackClient {
    /// OAuth token.
    token: SecretString,
    /// API base URL.
    endpoint: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl SlackClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://slack.com/api";

    /// Creates a new client for `token`.
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            client: build_http_client(SlackHttpConfig::default()),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: SlackHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoint)
    }

    /// Calls a read method with query parameters.
    fn get<T: DeserializeOwned>(&self, method: &'static str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.client.get(self.url(method)).query(query);
        self.send(method, request)
    }

    /// Calls a write method with form parameters.
    fn post<T: DeserializeOwned>(&self, method: &'static str, form: &[(&str, &str)]) -> Result<T> {
        let request = self.client.post(self.url(method)).form(form);
        self.send(method, request)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T> {
        tracing::debug!(method, "Calling Slack API");

        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else if e.is_request() {
                    "request"
                } else {
                    "unknown"
                };
                tracing::error!(method, error = %e, error_kind, "Slack request failed");
                Error::OperationFailed {
                    operation: method.to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Error::RateLimited {
                operation: method.to_string(),
                retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(method, status = %status, body = %body, "Slack API returned error status");
            return Err(Error::OperationFailed {
                operation: method.to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        let body: serde_json::Value = response.json().map_err(|e| Error::OperationFailed {
            operation: method.to_string(),
            cause: format!("invalid response body: {e}"),
        })?;
        decode_envelope(method, body)
    }
}

/// Unwraps Slack's `{"ok": ..., "error": ...}` envelope.
fn decode_envelope<T: DeserializeOwned>(method: &'static str, body: serde_json::Value) -> Result<T> {
    let ok = body
        .get("ok")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !ok {
        let error = body
            .get("error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown_error");
        if error == "ratelimited" {
            return Err(Error::RateLimited {
                operation: method.to_string(),
                retry_after: None,
            });
        }
        return Err(Error::OperationFailed {
            operation: method.to_string(),
            cause: error.to_string(),
        });
    }

    serde_json::from_value(body).map_err(|e| Error::OperationFailed {
        operation: method.to_string(),
        cause: format!("unexpected response shape: {e}"),
    })
}

impl SlackApi for SlackClient {
    fn list_members(&self) -> Result<Vec<Identity>> {
        let response: UsersListResponse = self.get("users.list", &[])?;
        Ok(response
            .members
            .into_iter()
            .map(|m| Identity::new(m.id, m.name))
            .collect())
    }

    fn list_conversations(
        &self,
        kinds: &[ChannelKind],
        cursor: Option<&str>,
    ) -> Result<Page<Channel>> {
        let types = kinds
            .iter()
            .map(|k| k.api_type())
            .collect::<Vec<_>>()
            .join(",");
        let mut query = vec![("types", types.as_str()), ("limit", PAGE_LIMIT)];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response: ConversationsListResponse = self.get("conversations.list", &query)?;
        let channels = response
            .channels
            .into_iter()
            .filter_map(WireConversation::into_channel)
            .collect();
        Ok(Page::new(channels, response.response_metadata.next_cursor))
    }

    fn list_history(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage> {
        let mut query = vec![("channel", channel_id), ("limit", PAGE_LIMIT)];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response: HistoryResponse = self.get("conversations.history", &query)?;
        Ok(HistoryPage {
            messages: response
                .messages
                .into_iter()
                .map(|m| Message::new(m.ts, m.user, m.text))
                .collect(),
            has_more: response.has_more,
            next_cursor: response.response_metadata.next_cursor,
        })
    }

    fn list_files(&self, owner_id: &str, cursor: Option<&str>) -> Result<Page<FileRecord>> {
        // files.list pages by number; the page number rides in the cursor.
        let page = cursor.unwrap_or("1");
        let response: FilesListResponse =
            self.get("files.list", &[("user", owner_id), ("page", page)])?;

        let next_cursor = next_files_cursor(response.paging.as_ref());
        let files = response
            .files
            .into_iter()
            .map(WireFile::into_record)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(files, next_cursor))
    }

    fn delete_message(&self, channel_id: &str, timestamp: &str) -> Result<DeletedMessage> {
        let response: ChatDeleteResponse =
            self.post("chat.delete", &[("channel", channel_id), ("ts", timestamp)])?;
        Ok(DeletedMessage {
            channel_id: response.channel,
            timestamp: response.ts,
        })
    }

    fn delete_file(&self, file_id: &str) -> Result<()> {
        let _: serde_json::Value = self.post("files.delete", &[("file", file_id)])?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    members: Vec<WireMember>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    channels: Vec<WireConversation>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
struct WireConversation {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_mpim: bool,
    #[serde(default)]
    is_im: bool,
    #[serde(default)]
    user: Option<String>,
}

impl WireConversation {
    fn into_channel(self) -> Option<Channel> {
        let Some(kind) = ChannelKind::from_flags(self.is_im, self.is_mpim, self.is_private) else {
            tracing::debug!(channel_id = %self.id, "Skipping conversation of unsupported kind");
            return None;
        };
        let peer_user_id = match kind {
            ChannelKind::DirectMessage => self.user,
            ChannelKind::GroupDm | ChannelKind::PrivateChannel => None,
        };
        Some(Channel {
            id: self.id,
            name: self.name,
            kind,
            peer_user_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    ts: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct FilesListResponse {
    #[serde(default)]
    files: Vec<WireFile>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    page: u32,
    pages: u32,
}

/// Next `files.list` page number as a cursor, or `None` on the last page.
fn next_files_cursor(paging: Option<&Paging>) -> Option<String> {
    paging
        .filter(|p| p.page < p.pages)
        .map(|p| (p.page + 1).to_string())
}

#[derive(Debug, Deserialize)]
struct WireFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    created: i64,
}

impl WireFile {
    fn into_record(self) -> Result<FileRecord> {
        let created_at =
            DateTime::from_timestamp(self.created, 0).ok_or_else(|| Error::OperationFailed {
                operation: "files.list".to_string(),
                cause: format!("file {} has out-of-range created time {}", self.id, self.created),
            })?;
        Ok(FileRecord::new(self.id, self.name, self.user, created_at))
    }
}

#[derive(Debug, Deserialize)]
struct ChatDeleteResponse {
    channel: String,
    ts: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_configuration() {
        let client = SlackClient::new(SecretString::from("xoxp-test"))
            .with_endpoint("http://localhost:9999/api/");
        assert_eq!(client.url("users.list"), "http://localhost:9999/api/users.list");
    }

    #[test]
    fn test_envelope_error() {
        let result: Result<serde_json::Value> =
            decode_envelope("chat.delete", json!({"ok": false, "error": "message_not_found"}));
        match result {
            Err(Error::OperationFailed { operation, cause }) => {
                assert_eq!(operation, "chat.delete");
                assert_eq!(cause, "message_not_found");
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_ratelimited() {
        let result: Result<serde_json::Value> =
            decode_envelope("conversations.history", json!({"ok": false, "error": "ratelimited"}));
        assert!(matches!(result, Err(Error::RateLimited { .. })));
    }

    #[test]
    fn test_decode_conversations() {
        let body = json!({
            "ok": true,
            "channels": [
                {"id": "C1", "name": "ace-team", "is_private": true},
                {"id": "G1", "name": "mpdm-a--b-1", "is_private": true, "is_mpim": true},
                {"id": "D1", "is_im": true, "user": "U2"},
                {"id": "C2", "name": "general"}
            ],
            "response_metadata": {"next_cursor": "dGVhbTpD"}
        });
        let response: ConversationsListResponse =
            decode_envelope("conversations.list", body).unwrap();
        assert_eq!(response.response_metadata.next_cursor.as_deref(), Some("dGVhbTpD"));

        let channels: Vec<Channel> = response
            .channels
            .into_iter()
            .filter_map(WireConversation::into_channel)
            .collect();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].kind, ChannelKind::PrivateChannel);
        assert_eq!(channels[1].kind, ChannelKind::GroupDm);
        assert_eq!(channels[2], Channel::direct("D1", "U2"));
    }

    #[test]
    fn test_decode_history() {
        let body = json!({
            "ok": true,
            "messages": [
                {"type": "message", "user": "U1", "text": "hi", "ts": "1700000000.000100"},
                {"type": "message", "subtype": "bot_message", "text": "beep", "ts": "1700000000.000050"}
            ],
            "has_more": true,
            "response_metadata": {"next_cursor": "bmV4dA=="}
        });
        let response: HistoryResponse = decode_envelope("conversations.history", body).unwrap();
        assert!(response.has_more);
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].user, "U1");
        assert!(response.messages[1].user.is_empty());
    }

    #[test]
    fn test_decode_files() {
        let body = json!({
            "ok": true,
            "files": [{"id": "F1", "name": "a.png", "user": "U1", "created": 1_700_000_000}],
            "paging": {"count": 100, "total": 1, "page": 1, "pages": 2}
        });
        let response: FilesListResponse = decode_envelope("files.list", body).unwrap();
        let paging = response.paging.unwrap();
        assert_eq!((paging.page, paging.pages), (1, 2));

        let record = response
            .files
            .into_iter()
            .next()
            .unwrap()
            .into_record()
            .unwrap();
        assert_eq!(record.owner_id, "U1");
        assert_eq!(record.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_files_cursor_advances_until_last_page() {
        let paging = |page, pages| Paging { page, pages };
        assert_eq!(next_files_cursor(Some(&paging(1, 3))).as_deref(), Some("2"));
        assert_eq!(next_files_cursor(Some(&paging(2, 3))).as_deref(), Some("3"));
        assert_eq!(next_files_cursor(Some(&paging(3, 3))), None);
        assert_eq!(next_files_cursor(Some(&paging(1, 0))), None);
        assert_eq!(next_files_cursor(None), None);
    }

    #[test]
    fn test_decoded_files_paging_yields_next_page() {
        let body = json!({
            "ok": true,
            "files": [],
            "paging": {"count": 100, "total": 250, "page": 2, "pages": 3}
        });
        let response: FilesListResponse = decode_envelope("files.list", body).unwrap();
        assert_eq!(next_files_cursor(response.paging.as_ref()).as_deref(), Some("3"));
    }
}
