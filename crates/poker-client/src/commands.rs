//! Command endpoints of the remote service.
//!
//! Commands are fire-and-confirm: a failed POST is reported to the caller
//! and never retried here. The authoritative effect of a successful command
//! arrives later on the event stream.

use serde::{Deserialize, Serialize};
use url::Url;

use poker_wire::Vote;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Serialize)]
struct SetNameRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct NameResponse {
    name: String,
}

/// Client for the service-wide endpoints. Identity travels in the session
/// cookie, so the same `reqwest::Client` (with a cookie store) must back
/// every request and stream of one logical user.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Endpoint of the lobby-wide event stream.
    pub fn lobby_stream_url(&self) -> ClientResult<Url> {
        Ok(self.base.join("/stream")?)
    }

    /// Our own display name as the service knows it.
    pub async fn fetch_name(&self) -> ClientResult<String> {
        let url = self.base.join("/name")?;
        let response = expect_ok(self.http.get(url).send().await?).await?;
        let body: NameResponse = response.json().await?;
        Ok(body.name)
    }

    /// Renames us everywhere; rooms hear about it via `name` events.
    pub async fn set_name(&self, name: &str) -> ClientResult<()> {
        let url = self.base.join("/name")?;
        let response = self
            .http
            .post(url)
            .json(&SetNameRequest { name })
            .send()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    /// Scopes the client to one room's command endpoints.
    pub fn room(&self, room_id: &str) -> RoomApi {
        RoomApi {
            http: self.http.clone(),
            base: self.base.clone(),
            room_id: room_id.to_string(),
        }
    }
}

/// Per-room command endpoints.
#[derive(Debug, Clone)]
pub struct RoomApi {
    http: reqwest::Client,
    base: Url,
    room_id: String,
}

impl RoomApi {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Endpoint of this room's event stream. Opening it is also what joins
    /// the room on the server side.
    pub fn stream_url(&self) -> ClientResult<Url> {
        self.endpoint("stream")
    }

    pub async fn cast_vote(&self, vote: &Vote) -> ClientResult<()> {
        self.post_json("vote", vote).await
    }

    pub async fn reveal(&self) -> ClientResult<()> {
        self.post_empty("reveal").await
    }

    pub async fn reset(&self) -> ClientResult<()> {
        self.post_empty("reset").await
    }

    /// Acknowledges a `ping` by echoing its payload back.
    pub async fn keepalive(&self, payload: &serde_json::Value) -> ClientResult<()> {
        self.post_json("keepalive", payload).await
    }

    fn endpoint(&self, action: &str) -> ClientResult<Url> {
        Ok(self.base.join(&format!("/r/{}/{}", self.room_id, action))?)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, action: &str, body: &T) -> ClientResult<()> {
        let url = self.endpoint(action)?;
        let response = self.http.post(url).json(body).send().await?;
        expect_ok(response).await?;
        Ok(())
    }

    async fn post_empty(&self, action: &str) -> ClientResult<()> {
        let url = self.endpoint(action)?;
        let response = self.http.post(url).send().await?;
        expect_ok(response).await?;
        Ok(())
    }
}

async fn expect_ok(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::UnexpectedStatus { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_endpoints_are_rooted_at_the_base() {
        let base = Url::parse("http://poker.local:9991/").unwrap();
        let api = ApiClient::new(reqwest::Client::new(), base).room("ABCD");
        assert_eq!(
            api.stream_url().unwrap().as_str(),
            "http://poker.local:9991/r/ABCD/stream"
        );
        assert_eq!(
            api.endpoint("vote").unwrap().as_str(),
            "http://poker.local:9991/r/ABCD/vote"
        );
    }

    #[test]
    fn lobby_stream_is_service_wide() {
        let base = Url::parse("http://poker.local:9991/").unwrap();
        let api = ApiClient::new(reqwest::Client::new(), base);
        assert_eq!(
            api.lobby_stream_url().unwrap().as_str(),
            "http://poker.local:9991/stream"
        );
    }
}
