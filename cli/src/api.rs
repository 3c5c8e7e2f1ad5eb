//! REST API helpers for communicating with the polling backend.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns `Result<_, ClientError>`. Non-2xx responses become
//! `ClientError::Server` carrying the body's `detail` (or `Server error
//! <status>` when the body has none) so callers can show it verbatim.

use protocol::{
    AnonymousIdResponse, ClosePollRequest, CreatePollRequest, ErrorResponse, MessageResponse, PollSnapshot,
    VoteRequest,
};
use reqwest::{Response, Url};
use tracing::{debug, info};

use crate::error::ClientError;

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct PollApi {
    http: reqwest::Client,
    base: Url,
}

impl PollApi {
    /// Build a client for `base_url` (`http://` or `https://`, optional path prefix).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] for unparseable or non-HTTP URLs.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.to_owned()))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_owned()));
        }
        Ok(Self { http: reqwest::Client::new(), base })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for an API path, keeping any base path prefix.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Absolute URL from path segments under the base path prefix. Each
    /// segment is percent-encoded on its own, so `/` in a poll id stays inside
    /// its segment.
    #[must_use]
    pub fn segment_url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint("/");
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Live-update socket URL for a poll (`http` → `ws`, `https` → `wss`).
    #[must_use]
    pub fn ws_url(&self, poll_id: &str) -> Url {
        let mut url = self.segment_url(&protocol::ws_segments(poll_id));
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) -> ws(s) is always permitted; both are special schemes.
        let _ = url.set_scheme(scheme);
        url
    }

    /// Shareable link that opens the poll: `<base>/?poll=<id>`.
    #[must_use]
    pub fn share_link(&self, poll_id: &str) -> Url {
        let mut url = self.endpoint("/");
        url.query_pairs_mut().append_pair("poll", poll_id);
        url
    }

    /// `POST /api/polls?anon_id=` → poll id.
    ///
    /// # Errors
    ///
    /// Transport, server, and [`ClientError::MissingPollId`] failures.
    pub async fn create_poll(&self, anon_id: &str, question: &str, options: &[String]) -> Result<String, ClientError> {
        let body = CreatePollRequest { question: question.to_owned(), options: options.to_vec() };
        let response = self
            .http
            .post(self.endpoint(&protocol::polls_path()))
            .query(&[("anon_id", anon_id)])
            .json(&body)
            .send()
            .await?;
        debug!(status = response.status().as_u16(), "create poll response");

        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        let poll_id = protocol::parse_create_response(&bytes)?;
        info!(%poll_id, "poll created");
        Ok(poll_id)
    }

    /// `GET /api/polls/{id}?anon_id=` → snapshot.
    ///
    /// # Errors
    ///
    /// Transport, server, and decode failures.
    pub async fn get_poll(&self, poll_id: &str, anon_id: &str) -> Result<PollSnapshot, ClientError> {
        let response = self
            .http
            .get(self.segment_url(&protocol::poll_segments(poll_id)))
            .query(&[("anon_id", anon_id)])
            .send()
            .await?;
        debug!(%poll_id, status = response.status().as_u16(), "get poll response");
        let response = ensure_success(response).await?;
        Ok(response.json::<PollSnapshot>().await?)
    }

    /// `POST /api/polls/{id}/vote` → server message.
    ///
    /// # Errors
    ///
    /// Transport and server failures.
    pub async fn vote(&self, poll_id: &str, option: &str, anon_id: &str) -> Result<String, ClientError> {
        let body = VoteRequest { option: option.to_owned(), anon_id: anon_id.to_owned() };
        let response = self.http.post(self.segment_url(&protocol::vote_segments(poll_id))).json(&body).send().await?;
        let response = ensure_success(response).await?;
        message_of(response).await
    }

    /// `POST /api/polls/{id}/close` → server message.
    ///
    /// # Errors
    ///
    /// Transport and server failures.
    pub async fn close_poll(&self, poll_id: &str, anon_id: &str) -> Result<String, ClientError> {
        let body = ClosePollRequest { anon_id: anon_id.to_owned() };
        let response = self.http.post(self.segment_url(&protocol::close_segments(poll_id))).json(&body).send().await?;
        let response = ensure_success(response).await?;
        message_of(response).await
    }

    /// `GET /api/anonymous-id` → server-minted identity.
    ///
    /// # Errors
    ///
    /// Transport, server, and decode failures.
    pub async fn anonymous_id(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.endpoint(&protocol::anonymous_id_path())).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<AnonymousIdResponse>().await?.anon_id)
    }
}

/// Pass 2xx responses through; turn anything else into [`ClientError::Server`].
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(ClientError::Server { status: status.as_u16(), detail: error_detail(status.as_u16(), &body) })
}

/// `detail` from an error body, else `Server error <status>`.
pub(crate) fn error_detail(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .map(|err| err.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("Server error {status}"))
}

/// Success message from a body; empty when the body has none.
async fn message_of(response: Response) -> Result<String, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice::<MessageResponse>(&bytes)
        .map(|body| body.message)
        .unwrap_or_default())
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
