//! HTTP exchanges against a WHIP/WHEP endpoint and the session resource it creates.

use std::future::Future;

use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH, LINK, LOCATION};
use reqwest::{Method, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::engine::{IceCandidate, IceServer, SessionDescription};
use crate::error::{Result, WhipError};
use crate::protocol::{
    SDP_CONTENT_TYPE, TRICKLE_ICE_CONTENT_TYPE, fragment, link, parse_content_type,
};

const ACCEPT_PATCH: &str = "accept-patch";

/// The endpoint URL a session is created against.
#[derive(Debug, Clone)]
pub struct Endpoint {
    http: reqwest::Client,
    url: Url,
}

/// Parts of a successful session-creation response.
#[derive(Debug)]
pub(crate) struct CreatedSession {
    pub answer: SessionDescription,
    pub location: Option<String>,
    pub etag: String,
    pub patch_supported: bool,
}

impl Endpoint {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Capability discovery: OPTIONS the endpoint and read its ICE servers.
    pub async fn ice_servers(&self, cancel: &CancellationToken) -> Result<Vec<IceServer>> {
        let request = self.http.request(Method::OPTIONS, self.url.clone());
        let response = bound(cancel, request.send()).await?;
        log_response("OPTIONS", &self.url, &response);
        check_status(&response, &[200, 204])?;

        let values = response
            .headers()
            .get_all(LINK)
            .iter()
            .map(|v| {
                v.to_str().map_err(|_| {
                    WhipError::LinkHeader(String::from_utf8_lossy(v.as_bytes()).into_owned())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        link::unmarshal(values)
    }

    /// POST the offer and collect what the session resource needs.
    pub(crate) async fn post_offer(
        &self,
        offer: &SessionDescription,
        cancel: &CancellationToken,
    ) -> Result<CreatedSession> {
        let request = self
            .http
            .request(Method::POST, self.url.clone())
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer.sdp.clone());
        let response = bound(cancel, request.send()).await?;
        log_response("POST", &self.url, &response);
        check_status(&response, &[201])?;

        let content_type = parse_content_type(header(&response, CONTENT_TYPE.as_str()).unwrap_or(""));
        if content_type != SDP_CONTENT_TYPE {
            return Err(WhipError::ContentType {
                expected: SDP_CONTENT_TYPE,
                got: content_type.to_string(),
            });
        }

        let patch_supported = accepts_trickle(header(&response, ACCEPT_PATCH));

        let location = header(&response, LOCATION.as_str()).map(str::to_string);

        let etag = match header(&response, ETAG.as_str()) {
            Some(etag) if !etag.is_empty() => etag.to_string(),
            _ => return Err(WhipError::MissingETag),
        };

        let sdp = bound(cancel, response.text()).await?;

        Ok(CreatedSession {
            answer: SessionDescription::answer(sdp),
            location,
            etag,
            patch_supported,
        })
    }

    /// Resolve the session locator (absolute, or relative to this endpoint).
    /// A missing `Location` keeps the endpoint URL.
    pub(crate) fn resource(&self, created: &CreatedSession) -> Result<Resource> {
        let url = self.url.join(created.location.as_deref().unwrap_or(""))?;

        tracing::info!(
            url = %url,
            etag = %created.etag,
            patch_supported = created.patch_supported,
            "session created"
        );

        Ok(Resource {
            http: self.http.clone(),
            url,
            etag: created.etag.clone(),
            patch_supported: created.patch_supported,
        })
    }
}

/// A server-side session created by a successful POST.
///
/// The ETag is captured once at creation and used as the `If-Match`
/// precondition of every PATCH; it is not refreshed from PATCH responses.
#[derive(Debug, Clone)]
pub struct Resource {
    http: reqwest::Client,
    url: Url,
    etag: String,
    patch_supported: bool,
}

impl Resource {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Whether the server announced trickle ICE support via `Accept-Patch`.
    pub fn patch_supported(&self) -> bool {
        self.patch_supported
    }

    /// Send one local candidate. No-op when the server does not accept PATCH.
    pub(crate) async fn patch_candidate(
        &self,
        offer: &SessionDescription,
        candidate: &IceCandidate,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !self.patch_supported {
            tracing::trace!(candidate = %candidate.candidate, "trickle ICE unsupported, skipping");
            return Ok(());
        }

        let frag = fragment::marshal(&offer.sdp, std::slice::from_ref(candidate))?;

        let request = self
            .http
            .request(Method::PATCH, self.url.clone())
            .header(CONTENT_TYPE, TRICKLE_ICE_CONTENT_TYPE)
            .header(IF_MATCH, &self.etag)
            .body(frag);
        let response = bound(cancel, request.send()).await?;
        log_response("PATCH", &self.url, &response);
        check_status(&response, &[204])
    }

    /// DELETE the session. Not bound to any caller token, so teardown
    /// completes even after the handshake was cancelled.
    pub(crate) async fn delete(&self) -> Result<()> {
        let response = self
            .http
            .request(Method::DELETE, self.url.clone())
            .send()
            .await?;
        log_response("DELETE", &self.url, &response);
        check_status(&response, &[200])
    }
}

/// Run an HTTP future unless the caller cancels first.
async fn bound<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = reqwest::Result<T>>,
{
    tokio::select! {
        result = fut => Ok(result?),
        _ = cancel.cancelled() => Err(WhipError::Cancelled),
    }
}

fn check_status(response: &Response, expected: &'static [u16]) -> Result<()> {
    let got = response.status().as_u16();
    if expected.contains(&got) {
        Ok(())
    } else {
        Err(WhipError::BadStatus { expected, got })
    }
}

/// Trickle ICE is on only when `Accept-Patch` is exactly the fragment type.
fn accepts_trickle(accept_patch: Option<&str>) -> bool {
    accept_patch.is_some_and(|value| value.trim() == TRICKLE_ICE_CONTENT_TYPE)
}

fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn log_response(method: &str, url: &Url, response: &Response) {
    tracing::debug!(method, url = %url, status = response.status().as_u16(), "response");
}
