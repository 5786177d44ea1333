//! Discord REST client: response cache in front, rate limiter queue behind.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use vaultcord_core::domain::{Channel, DiscordUser, Guild, PartialGuild, Role};
use vaultcord_core::ports::{QuotaTracker, ResponseCache};
use vaultcord_core::DiscordError;

use super::headers::{self, RateLimitHeaders};
use crate::cache::InMemoryResponseCache;
use crate::rate_limit::RateLimiter;

const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Guild listings change rarely; channel and role edits should show up sooner.
const GUILDS_TTL: Duration = Duration::from_secs(15 * 60);
const GUILD_DETAILS_TTL: Duration = Duration::from_secs(5 * 60);

/// Discord client configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token, sent as `Authorization: Bot <token>`.
    pub bot_token: Option<String>,
    /// REST API base URL including the version segment.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DiscordConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            bot_token: std::env::var("DISCORD_BOT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            api_base_url: std::env::var("DISCORD_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("DISCORD_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Read-only Discord REST client used by the dashboard routes.
///
/// Every read checks the response cache first; misses are sent through the
/// rate limiter's queue and the quota headers of each response are reported
/// back to the limiter.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    config: Arc<DiscordConfig>,
    cache: Arc<InMemoryResponseCache<Value>>,
    limiter: RateLimiter,
}

impl DiscordClient {
    pub fn new(
        config: DiscordConfig,
        cache: Arc<InMemoryResponseCache<Value>>,
        limiter: RateLimiter,
    ) -> Result<Self, DiscordError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DiscordError::Http(e.to_string()))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            cache,
            limiter,
        })
    }

    pub fn has_token(&self) -> bool {
        self.config.bot_token.is_some()
    }

    /// The bot's own user.
    pub async fn current_user(&self) -> Result<DiscordUser, DiscordError> {
        self.get_cached("users/@me", "users/@me", Some(GUILDS_TTL))
            .await
    }

    /// Guilds the bot is a member of.
    pub async fn current_user_guilds(&self) -> Result<Vec<PartialGuild>, DiscordError> {
        self.get_cached("users/@me/guilds", "users/@me/guilds", Some(GUILDS_TTL))
            .await
    }

    pub async fn guild(&self, guild_id: &str) -> Result<Guild, DiscordError> {
        let path = format!("guilds/{guild_id}?with_counts=true");
        self.get_cached(&format!("guilds/{guild_id}"), &path, Some(GUILD_DETAILS_TTL))
            .await
    }

    pub async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, DiscordError> {
        let route = format!("guilds/{guild_id}/channels");
        self.get_cached(&route, &route, Some(GUILD_DETAILS_TTL))
            .await
    }

    pub async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, DiscordError> {
        let route = format!("guilds/{guild_id}/roles");
        self.get_cached(&route, &route, Some(GUILD_DETAILS_TTL))
            .await
    }

    /// Drop every cached response for one guild.
    pub async fn invalidate_guild(&self, guild_id: &str) {
        for path in [
            format!("guilds/{guild_id}?with_counts=true"),
            format!("guilds/{guild_id}/channels"),
            format!("guilds/{guild_id}/roles"),
        ] {
            self.cache.delete(&cache_key(&path)).await;
        }
        tracing::debug!(guild_id = %guild_id, "Guild cache invalidated");
    }

    /// Cached GET of `path`, rate limited under `endpoint`.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        ttl: Option<Duration>,
    ) -> Result<T, DiscordError> {
        let key = cache_key(path);

        if let Some(value) = self.cache.get(&key).await {
            tracing::debug!(endpoint = %endpoint, "Discord cache hit");
            return Ok(serde_json::from_value(value)?);
        }

        let token = self
            .config
            .bot_token
            .clone()
            .ok_or(DiscordError::MissingToken)?;

        let client = self.clone();
        let route = endpoint.to_string();
        let url = format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let value: Value = self
            .limiter
            .queue_request(endpoint, move || async move {
                client.fetch(&route, &url, &token).await
            })
            .await?;

        self.cache.set(&key, value.clone(), ttl).await;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch(&self, endpoint: &str, url: &str, token: &str) -> Result<Value, DiscordError> {
        tracing::debug!(endpoint = %endpoint, url = %url, "Discord request");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bot {token}"))
            .header(USER_AGENT, user_agent())
            .send()
            .await
            .map_err(|e| DiscordError::Http(e.to_string()))?;

        let status = response.status();
        let quota = RateLimitHeaders::from_headers(response.headers(), &self.limiter.clock());
        if let Some(quota) = &quota {
            self.limiter
                .update_rate_limit(endpoint, quota.remaining, quota.reset_at, quota.limit)
                .await;
        }

        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| DiscordError::Decode(e.to_string()));
        }

        let response_headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = self
                    .record_throttle(endpoint, &response_headers, &body, quota.as_ref())
                    .await;
                Err(DiscordError::RateLimited { retry_after })
            }
            StatusCode::UNAUTHORIZED => Err(DiscordError::Unauthorized),
            StatusCode::NOT_FOUND => Err(DiscordError::NotFound(endpoint.to_string())),
            other => Err(DiscordError::Status {
                status: other.as_u16(),
                message: error_message(&body),
            }),
        }
    }

    /// Mark `endpoint` exhausted until the 429's retry window has passed.
    async fn record_throttle(
        &self,
        endpoint: &str,
        response_headers: &HeaderMap,
        body: &str,
        quota: Option<&RateLimitHeaders>,
    ) -> Duration {
        let retry_after = headers::retry_after(response_headers)
            .or_else(|| {
                serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|b| headers::retry_after_from_body(&b))
            })
            .unwrap_or(Duration::from_secs(1));

        let limit = quota.map(|q| q.limit).unwrap_or(0);
        let reset_at = self.limiter.clock().millis_after(retry_after);
        self.limiter
            .update_rate_limit(endpoint, 0, reset_at, limit)
            .await;

        tracing::warn!(
            endpoint = %endpoint,
            retry_after_ms = retry_after.as_millis() as u64,
            "Discord returned 429"
        );
        retry_after
    }
}

fn cache_key(path: &str) -> String {
    format!("discord:{}", path.trim_start_matches('/'))
}

fn user_agent() -> String {
    format!(
        "DiscordBot (https://github.com/vaultcord/vaultcord, {})",
        env!("CARGO_PKG_VERSION")
    )
}

/// Discord error bodies look like `{"message": "...", "code": 0}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(token: Option<&str>, base_url: &str) -> DiscordClient {
        let config = DiscordConfig {
            bot_token: token.map(String::from),
            api_base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
        };
        DiscordClient::new(
            config,
            Arc::new(InMemoryResponseCache::new()),
            RateLimiter::default(),
        )
        .unwrap()
    }

    /// Serve `responses` to successive connections on a local port.
    async fn serve(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf[read..]).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read += n;
                }
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        format!("http://{addr}/api/v10")
    }

    fn http_response(status: &str, extra_headers: &[&str], body: &str) -> String {
        let mut response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
            body.len()
        );
        for header in extra_headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str("\r\n");
        response.push_str(body);
        response
    }

    #[tokio::test]
    async fn test_cache_hit_needs_no_token_or_network() {
        let client = client(None, "http://127.0.0.1:9");
        client
            .cache
            .set(
                "discord:users/@me",
                serde_json::json!({ "id": "1", "username": "vaultbot", "bot": true }),
                None,
            )
            .await;

        let user = client.current_user().await.unwrap();
        assert_eq!(user.username, "vaultbot");
        assert!(user.bot);
    }

    #[tokio::test]
    async fn test_cache_miss_without_token_fails() {
        let client = client(None, "http://127.0.0.1:9");
        let err = client.current_user_guilds().await.unwrap_err();
        assert!(matches!(err, DiscordError::MissingToken));
    }

    #[tokio::test]
    async fn test_fetch_records_quota_and_caches_body() {
        let body = r#"[{"id":"42","name":"Second Brain","owner":true,"permissions":"8"}]"#;
        let base_url = serve(vec![http_response(
            "200 OK",
            &[
                "x-ratelimit-limit: 5",
                "x-ratelimit-remaining: 4",
                "x-ratelimit-reset-after: 1.0",
            ],
            body,
        )])
        .await;
        let client = client(Some("token"), &base_url);

        let guilds = client.current_user_guilds().await.unwrap();
        assert_eq!(guilds.len(), 1);
        assert_eq!(guilds[0].name, "Second Brain");

        let status = client.limiter.queue_status();
        let record = status.rate_limits["users/@me/guilds"];
        assert_eq!(record.remaining, 4);
        assert_eq!(record.limit, 5);

        // Served from cache: the test server only answers once
        let again = client.current_user_guilds().await.unwrap();
        assert_eq!(again, guilds);
    }

    #[tokio::test]
    async fn test_too_many_requests_throttles_endpoint() {
        let base_url = serve(vec![http_response(
            "429 Too Many Requests",
            &["retry-after: 3"],
            r#"{"message":"You are being rate limited.","retry_after":3.0,"global":false}"#,
        )])
        .await;
        let client = client(Some("token"), &base_url);

        let err = client.guild_channels("42").await.unwrap_err();
        match err {
            DiscordError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(3))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!client.limiter.can_make_request("guilds/42/channels").await);
        assert!(!client.cache.has("discord:guilds/42/channels").await);
    }

    #[tokio::test]
    async fn test_error_status_maps_message() {
        let base_url = serve(vec![
            http_response("401 Unauthorized", &[], r#"{"message":"401: Unauthorized","code":0}"#),
            http_response("403 Forbidden", &[], r#"{"message":"Missing Access","code":50001}"#),
        ])
        .await;
        let client = client(Some("bad-token"), &base_url);

        assert!(matches!(
            client.current_user().await.unwrap_err(),
            DiscordError::Unauthorized
        ));
        match client.guild_roles("7").await.unwrap_err() {
            DiscordError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Missing Access");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalidate_guild() {
        let client = client(None, "http://127.0.0.1:9");
        client
            .cache
            .set("discord:guilds/42/channels", serde_json::json!([]), None)
            .await;
        client
            .cache
            .set("discord:users/@me/guilds", serde_json::json!([]), None)
            .await;

        client.invalidate_guild("42").await;
        assert!(!client.cache.has("discord:guilds/42/channels").await);
        assert!(client.cache.has("discord:users/@me/guilds").await);
    }
}
