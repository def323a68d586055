//! ICE server advertisement via `Link` headers (RFC 9725 §4.6).
//!
//! ```text
//! Link: <stun:stun.example.net>; rel="ice-server"
//! Link: <turn:turn.example.net?transport=udp>; rel="ice-server";
//!       username="user"; credential="pass"; credential-type="password"
//! ```
//!
//! Credentials are quoted strings; they are encoded and decoded as JSON
//! strings so that quotes and backslashes survive the round trip.

use crate::engine::IceServer;
use crate::error::{Result, WhipError};

const ICE_SERVER_REL: &str = "ice-server";

/// Encode ICE servers as `Link` header values, one per server.
pub fn marshal(servers: &[IceServer]) -> Vec<String> {
    servers
        .iter()
        .filter_map(|server| {
            let url = server.urls.first()?;
            let mut link = format!("<{url}>; rel=\"{ICE_SERVER_REL}\"");
            if let (Some(username), Some(credential)) = (&server.username, &server.credential) {
                link.push_str(&format!(
                    "; username={}; credential={}; credential-type=\"password\"",
                    quote(username),
                    quote(credential)
                ));
            }
            Some(link)
        })
        .collect()
}

/// Decode every `Link` header value into ICE servers.
///
/// A single value may hold several comma-separated links. Links with a
/// relation other than `ice-server` are skipped.
///
/// ```
/// use whip::protocol::link;
///
/// let servers = link::unmarshal([
///     r#"<stun:stun.example.net>; rel="ice-server""#,
///     r#"<turn:turn.example.net>; rel="ice-server"; username="u"; credential="p"; credential-type="password""#,
/// ]).unwrap();
/// assert_eq!(servers.len(), 2);
/// assert_eq!(servers[1].username.as_deref(), Some("u"));
///
/// assert!(link::unmarshal(["stun:missing-brackets"]).is_err());
/// ```
pub fn unmarshal<'a, I>(values: I) -> Result<Vec<IceServer>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut servers = Vec::new();
    for value in values {
        for link in split_links(value)? {
            if let Some(server) = parse_link(link)? {
                servers.push(server);
            }
        }
    }
    Ok(servers)
}

/// Split a header value on commas that are outside `<...>` and quotes.
fn split_links(value: &str) -> Result<Vec<&str>> {
    let mut links = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '<' => in_brackets = true,
            '>' => in_brackets = false,
            ',' if !in_brackets => {
                links.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes || in_brackets {
        return Err(WhipError::LinkHeader(value.to_string()));
    }

    links.push(value[start..].trim());
    Ok(links.into_iter().filter(|l| !l.is_empty()).collect())
}

fn parse_link(link: &str) -> Result<Option<IceServer>> {
    let invalid = || WhipError::LinkHeader(link.to_string());

    let rest = link.strip_prefix('<').ok_or_else(invalid)?;
    let (url, params) = rest.split_once('>').ok_or_else(invalid)?;
    if url.is_empty() {
        return Err(invalid());
    }

    let mut rel = None;
    let mut username = None;
    let mut credential = None;

    for param in split_params(params) {
        let (key, value) = param.split_once('=').ok_or_else(invalid)?;
        let value = value.trim();
        match key.trim() {
            "rel" => rel = Some(value.trim_matches('"').to_string()),
            "username" => username = Some(unquote(value).ok_or_else(invalid)?),
            "credential" => credential = Some(unquote(value).ok_or_else(invalid)?),
            _ => {}
        }
    }

    if rel.as_deref() != Some(ICE_SERVER_REL) {
        tracing::trace!(link, "ignoring non ICE server link");
        return Ok(None);
    }

    if username.is_some() != credential.is_some() {
        return Err(invalid());
    }

    Ok(Some(IceServer {
        urls: vec![url.to_string()],
        username,
        credential,
    }))
}

/// Split `; a=b; c="d;e"` into `a=b`, `c="d;e"`.
fn split_params(params: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in params.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(params[start..].trim());
    out.into_iter().filter(|p| !p.is_empty()).collect()
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn unquote(value: &str) -> Option<String> {
    serde_json::from_str::<String>(value).ok()
}
