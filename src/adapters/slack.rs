//! Slack Web API client backing `ChatNotifier`.
//!
//! Slack answers almost everything with HTTP 200 and reports failures in the
//! body as `{"ok": false, "error": "..."}`.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::domain::model::{ChatChannel, Page};
use crate::domain::ports::ChatNotifier;
use crate::utils::error::{ActionError, Result};
use crate::utils::http::{ensure_success, read_json, send_with_rate_limit_retry};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";
const CHANNELS_PER_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ConversationsList {
    #[serde(default)]
    channels: Vec<ChannelResponse>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct UserLookup {
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ConversationOpen {
    channel: ChannelResponse,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

#[derive(Debug, Clone)]
pub struct SlackClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn request(&self, method: Method, api_method: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, api_method))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> Result<T> {
        let response = send_with_rate_limit_retry(operation, request).await?;
        let response = ensure_success(operation, response).await?;
        let envelope: Envelope<T> = read_json(operation, response).await?;

        if !envelope.ok {
            return Err(ActionError::upstream(
                operation,
                envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        envelope
            .body
            .ok_or_else(|| ActionError::upstream(operation, "empty response body"))
    }
}

#[async_trait]
impl ChatNotifier for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "chat.postMessage")
            .json(&json!({ "channel": channel, "text": text, "mrkdwn": true }));
        self.call::<Ignored>("post slack message", request).await?;
        Ok(())
    }

    async fn list_channels(&self, cursor: Option<String>) -> Result<Page<ChatChannel>> {
        let mut request = self
            .request(Method::GET, "conversations.list")
            .query(&[("exclude_archived", "true")])
            .query(&[("limit", CHANNELS_PER_PAGE)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let list: ConversationsList = self.call("get slack conversations", request).await?;
        let next = list
            .response_metadata
            .map(|meta| meta.next_cursor)
            .filter(|cursor| !cursor.is_empty());

        Ok(Page {
            items: list
                .channels
                .into_iter()
                .map(|channel| ChatChannel {
                    id: channel.id,
                    name: channel.name,
                })
                .collect(),
            next,
        })
    }

    async fn join_channel(&self, channel_id: &str) -> Result<()> {
        let request = self
            .request(Method::POST, "conversations.join")
            .json(&json!({ "channel": channel_id }));
        self.call::<Ignored>("join slack conversation", request).await?;
        Ok(())
    }

    async fn direct_message(&self, email: &str, text: &str) -> Result<()> {
        let request = self
            .request(Method::GET, "users.lookupByEmail")
            .query(&[("email", email)]);
        let lookup: UserLookup = self.call("retrieve slack identity of committer", request).await?;

        let request = self
            .request(Method::POST, "conversations.open")
            .json(&json!({ "users": lookup.user.id }));
        let open: ConversationOpen = self.call("open slack conversation with committer", request).await?;

        let request = self
            .request(Method::POST, "chat.postMessage")
            .json(&json!({ "channel": open.channel.id, "text": text, "mrkdwn": true }));
        self.call::<Ignored>("send slack message to committer", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error() {
        let envelope: Envelope<Ignored> = serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("channel_not_found"));
    }

    #[test]
    fn test_user_lookup_decodes() {
        let envelope: Envelope<UserLookup> =
            serde_json::from_str(r#"{"ok":true,"user":{"id":"U023BECGF","name":"jdoe","profile":{}}}"#).unwrap();
        assert_eq!(envelope.body.unwrap().user.id, "U023BECGF");
    }

    #[test]
    fn test_conversations_list_decodes() {
        let envelope: Envelope<ConversationsList> = serde_json::from_str(
            r#"{"ok":true,"channels":[{"id":"C1","name":"general","is_archived":false}],"response_metadata":{"next_cursor":"dGVhbTpDMDYxRkE1UEI="}}"#,
        )
        .unwrap();
        let list = envelope.body.unwrap();
        assert_eq!(list.channels[0].id, "C1");
        assert_eq!(list.response_metadata.unwrap().next_cursor, "dGVhbTpDMDYxRkE1UEI=");
    }
}
