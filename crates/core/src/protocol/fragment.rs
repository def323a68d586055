//! Trickle ICE SDP fragments (RFC 8840, `application/trickle-ice-sdpfrag`).
//!
//! A fragment repeats the ICE credentials of the offer and lists new
//! candidates under the media section they belong to:
//!
//! ```text
//! a=ice-ufrag:EsAw
//! a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1
//! m=video 9 UDP/TLS/RTP/SAVPF 96
//! a=mid:0
//! a=candidate:1 1 UDP 2130706431 192.168.1.10 50000 typ host
//! ```

use std::collections::BTreeMap;

use crate::engine::IceCandidate;
use crate::error::{ParseErrorKind, Result};
use crate::protocol::sdp::{MediaDescription, Sdp};

/// Session header prepended before parsing, since fragments have none.
const FRAGMENT_PREFIX: &str = "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n";

/// Build the fragment body announcing `candidates` for the given offer.
pub fn marshal(offer: &str, candidates: &[IceCandidate]) -> Result<String> {
    let sdp = Sdp::parse(offer)?;
    let first = sdp.media.first().ok_or(ParseErrorKind::NoMedia)?;

    let ufrag = first
        .attribute("ice-ufrag")
        .or_else(|| sdp.attribute("ice-ufrag"))
        .unwrap_or("");
    let pwd = first
        .attribute("ice-pwd")
        .or_else(|| sdp.attribute("ice-pwd"))
        .unwrap_or("");

    let mut by_media: BTreeMap<usize, Vec<&IceCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_media
            .entry(media_index(&sdp.media, candidate)?)
            .or_default()
            .push(candidate);
    }

    let mut frag = format!("a=ice-ufrag:{ufrag}\r\na=ice-pwd:{pwd}\r\n");

    for (index, media) in sdp.media.iter().enumerate() {
        let Some(candidates) = by_media.get(&index) else {
            continue;
        };

        let mid = media
            .attribute("mid")
            .map(str::to_string)
            .unwrap_or_else(|| index.to_string());

        frag.push_str(&format!("m={}\r\na=mid:{}\r\n", media.name, mid));
        for candidate in candidates {
            frag.push_str(&format!("a={}\r\n", candidate.candidate));
        }
    }

    Ok(frag)
}

/// Extract the candidates carried by a fragment body.
pub fn unmarshal(fragment: &str) -> Result<Vec<IceCandidate>> {
    let sdp = Sdp::parse(&format!("{FRAGMENT_PREFIX}{fragment}"))?;
    let username_fragment = sdp.attribute("ice-ufrag").map(str::to_string);

    let mut candidates = Vec::new();

    for media in &sdp.media {
        let mid = media.attribute("mid").ok_or(ParseErrorKind::MissingMid)?;
        let index = mid.parse::<u16>().ok();

        for attribute in media.attributes.iter().filter(|a| a.key == "candidate") {
            candidates.push(IceCandidate {
                candidate: attribute.to_string(),
                sdp_mid: Some(mid.to_string()),
                sdp_mline_index: index,
                username_fragment: username_fragment.clone(),
            });
        }
    }

    Ok(candidates)
}

/// Media section a candidate belongs to: explicit m-line index, then
/// matching mid, then the first section.
fn media_index(media: &[MediaDescription], candidate: &IceCandidate) -> Result<usize> {
    if let Some(index) = candidate.sdp_mline_index {
        if usize::from(index) >= media.len() {
            return Err(ParseErrorKind::UnknownMediaIndex(index).into());
        }
        return Ok(usize::from(index));
    }

    Ok(candidate
        .sdp_mid
        .as_deref()
        .and_then(|mid| media.iter().position(|m| m.attribute("mid") == Some(mid)))
        .unwrap_or(0))
}
