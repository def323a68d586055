//! Minimal SDP (Session Description Protocol) reader (RFC 8866).
//!
//! Only the parts the client inspects are retained: attributes and media
//! lines. Everything else is left to the transport engine, which receives
//! the original text untouched.
//!
//! ```text
//! v=0                                          ← protocol version (must be first)
//! o=- 4215 2 IN IP4 127.0.0.1                  ← ignored
//! s=-                                          ← ignored
//! t=0 0                                        ← ignored
//! a=group:BUNDLE 0 1                           ← session attribute
//! m=video 9 UDP/TLS/RTP/SAVPF 96               ← media line
//! a=mid:0                                      ← media attribute
//! a=ice-ufrag:EsAw                             ← media attribute
//! ```

use std::fmt;

use crate::error::{ParseErrorKind, Result, WhipError};

/// An SDP attribute (`a=<key>[:<value>]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((key, value)) => Attribute {
                key: key.to_string(),
                value: Some(value.to_string()),
            },
            None => Attribute {
                key: raw.to_string(),
                value: None,
            },
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

/// The `m=` line of a media section: `<media> <port> <proto> <fmt> ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaName {
    pub media: String,
    pub port: String,
    pub proto: String,
    pub formats: Vec<String>,
}

impl MediaName {
    fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(ParseErrorKind::InvalidMediaLine(raw.to_string()).into());
        }

        Ok(MediaName {
            media: fields[0].to_string(),
            port: fields[1].to_string(),
            proto: fields[2].to_string(),
            formats: fields[3..].iter().map(|f| f.to_string()).collect(),
        })
    }
}

impl fmt::Display for MediaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.media,
            self.port,
            self.proto,
            self.formats.join(" ")
        )
    }
}

/// One media section: its `m=` line and the attributes that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    pub name: MediaName,
    pub attributes: Vec<Attribute>,
}

impl MediaDescription {
    /// Value of the first attribute named `key` (empty string for flags).
    pub fn attribute(&self, key: &str) -> Option<&str> {
        find_attribute(&self.attributes, key)
    }
}

/// A parsed session description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sdp {
    /// Session-level attributes (before the first `m=` line).
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaDescription>,
}

impl Sdp {
    /// Parse SDP text. Accepts CRLF or bare LF line endings.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim_end).filter(|l| !l.is_empty());

        match lines.next() {
            Some(first) if first.starts_with("v=") => {}
            _ => return Err(ParseErrorKind::MissingVersion.into()),
        }

        let mut sdp = Sdp::default();

        for line in lines {
            let (kind, value) = split_line(line)?;
            match kind {
                'm' => sdp.media.push(MediaDescription {
                    name: MediaName::parse(value)?,
                    attributes: Vec::new(),
                }),
                'a' => {
                    let attribute = Attribute::parse(value);
                    match sdp.media.last_mut() {
                        Some(media) => media.attributes.push(attribute),
                        None => sdp.attributes.push(attribute),
                    }
                }
                _ => {}
            }
        }

        Ok(sdp)
    }

    /// Value of the first session-level attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        find_attribute(&self.attributes, key)
    }
}

fn split_line(line: &str) -> Result<(char, &str)> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(kind), Some('=')) if kind.is_ascii_lowercase() => Ok((kind, &line[2..])),
        _ => Err(WhipError::Parse {
            kind: ParseErrorKind::InvalidLine(line.to_string()),
        }),
    }
}

fn find_attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.key == key)
        .map(|a| a.value.as_deref().unwrap_or(""))
}

/// Check that a remote description only carries tracks the client can read:
/// at most one video and one audio section, nothing else, and at least one
/// of the two.
pub fn validate_tracks(media: &[MediaDescription]) -> Result<()> {
    let mut video = false;
    let mut audio = false;

    for m in media {
        let seen = match m.name.media.as_str() {
            "video" => &mut video,
            "audio" => &mut audio,
            other => {
                return Err(WhipError::InvalidTracks(format!(
                    "unsupported media '{other}'"
                )));
            }
        };

        if *seen {
            return Err(WhipError::InvalidTracks(
                "only a single video and a single audio track are supported".to_string(),
            ));
        }
        *seen = true;
    }

    if !video && !audio {
        return Err(WhipError::InvalidTracks("no valid tracks".to_string()));
    }

    Ok(())
}
