//! In-process WHIP server and scripted engine for handshake tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use whip::engine::{EngineError, Role, Trigger, signal};
use whip::protocol::link;
use whip::{Engine, EngineConfig, EngineEvents, IceCandidate, IceServer, SessionDescription};

pub const OFFER: &str = "v=0\r\n\
    o=- 4215 2 IN IP4 127.0.0.1\r\n\
    s=-\r\n\
    t=0 0\r\n\
    m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
    a=mid:0\r\n\
    a=ice-ufrag:EsAw\r\n\
    a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1\r\n\
    m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
    a=mid:1\r\n\
    a=ice-ufrag:EsAw\r\n\
    a=ice-pwd:P2uYro0UCOQ4zxjKXaWCBui1\r\n";

pub const ANSWER: &str = "v=0\r\n\
    o=- 9876 2 IN IP4 127.0.0.1\r\n\
    s=-\r\n\
    t=0 0\r\n\
    m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
    a=mid:0\r\n\
    m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
    a=mid:1\r\n";

pub const SESSION_PATH: &str = "/sessions/42";

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Canned responses of the fake server.
#[derive(Debug, Clone)]
pub struct ServerScript {
    pub options_status: u16,
    pub ice_servers: Vec<IceServer>,
    pub post_status: u16,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub accept_patch: Option<String>,
    pub location: Option<String>,
    pub answer: String,
    pub patch_status: u16,
    pub delete_status: u16,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            options_status: 204,
            ice_servers: Vec::new(),
            post_status: 201,
            content_type: Some("application/sdp".to_string()),
            etag: Some("\"abc\"".to_string()),
            accept_patch: Some("application/trickle-ice-sdpfrag".to_string()),
            location: Some(SESSION_PATH.to_string()),
            answer: ANSWER.to_string(),
            patch_status: 204,
            delete_status: 200,
        }
    }
}

struct ServerState {
    script: ServerScript,
    requests: Mutex<Vec<Recorded>>,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    state: Arc<ServerState>,
}

impl FakeServer {
    pub async fn start(script: ServerScript) -> Self {
        let state = Arc::new(ServerState {
            script,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/live/whip", self.addr)).unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests_with(method).len()
    }
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.requests.lock().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        headers,
        body,
    });

    let script = &state.script;
    let mut response = Response::builder();

    let (status, body) = match method.as_str() {
        "OPTIONS" => {
            for value in link::marshal(&script.ice_servers) {
                response = response.header("link", value);
            }
            (script.options_status, String::new())
        }
        "POST" => {
            if let Some(content_type) = &script.content_type {
                response = response.header("content-type", content_type);
            }
            if let Some(etag) = &script.etag {
                response = response.header("etag", etag);
            }
            if let Some(accept_patch) = &script.accept_patch {
                response = response.header("accept-patch", accept_patch);
            }
            if let Some(location) = &script.location {
                response = response.header("location", location);
            }
            (script.post_status, script.answer.clone())
        }
        "PATCH" => (script.patch_status, String::new()),
        "DELETE" => (script.delete_status, String::new()),
        _ => (405, String::new()),
    };

    response.status(status).body(Body::from(body)).unwrap()
}

/// Events and results the fake engine produces.
#[derive(Debug, Clone)]
pub struct EngineScript {
    /// Emitted right after the answer is applied.
    pub candidates: Vec<IceCandidate>,
    pub gathering_done: bool,
    pub ready: bool,
    pub fail_start: bool,
    pub fail_offer: bool,
    pub fail_set_answer: bool,
    /// Returned by `gather_incoming_tracks`; `None` blocks until cancelled.
    pub tracks: Option<Vec<String>>,
}

impl Default for EngineScript {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            gathering_done: true,
            ready: true,
            fail_start: false,
            fail_offer: false,
            fail_set_answer: false,
            tracks: Some(vec!["video".to_string(), "audio".to_string()]),
        }
    }
}

#[derive(Default)]
struct Observed {
    calls: Vec<&'static str>,
    ice_servers: Vec<IceServer>,
    role: Option<Role>,
    outgoing_tracks: Vec<String>,
    failed: Option<Trigger>,
}

/// Test-side view of what the engine was asked to do.
#[derive(Clone, Default)]
pub struct Probe(Arc<Mutex<Observed>>);

impl Probe {
    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().calls.clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.0.lock().calls.iter().any(|c| *c == name)
    }

    pub fn times(&self, name: &str) -> usize {
        self.0.lock().calls.iter().filter(|c| **c == name).count()
    }

    pub fn ice_servers(&self) -> Vec<IceServer> {
        self.0.lock().ice_servers.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.0.lock().role
    }

    pub fn outgoing_tracks(&self) -> Vec<String> {
        self.0.lock().outgoing_tracks.clone()
    }

    /// Report an unrecoverable connection failure.
    pub fn fail(&self) {
        if let Some(trigger) = &self.0.lock().failed {
            trigger.fire();
        }
    }

    fn record(&self, call: &'static str) {
        self.0.lock().calls.push(call);
    }
}

pub struct FakeEngine {
    script: EngineScript,
    probe: Probe,
    candidates: Option<mpsc::UnboundedSender<IceCandidate>>,
    gathering_done: Option<Trigger>,
    ready: Option<Trigger>,
}

impl FakeEngine {
    pub fn new(script: EngineScript) -> (Self, Probe) {
        let probe = Probe::default();
        let engine = Self {
            script,
            probe: probe.clone(),
            candidates: None,
            gathering_done: None,
            ready: None,
        };
        (engine, probe)
    }
}

#[async_trait]
impl Engine for FakeEngine {
    type OutgoingTrack = String;
    type IncomingTrack = String;

    async fn start(
        &mut self,
        config: EngineConfig<String>,
    ) -> Result<EngineEvents, EngineError> {
        self.probe.record("start");
        {
            let mut observed = self.probe.0.lock();
            observed.ice_servers = config.ice_servers;
            observed.role = Some(config.role);
            observed.outgoing_tracks = config.outgoing_tracks;
        }

        if self.script.fail_start {
            return Err("engine failed to start".into());
        }

        let (candidates_tx, local_candidates) = mpsc::unbounded_channel();
        let (gathering_tx, gathering_done) = signal();
        let (ready_tx, ready) = signal();
        let (failed_tx, failed) = signal();

        self.candidates = Some(candidates_tx);
        self.gathering_done = Some(gathering_tx);
        self.ready = Some(ready_tx);
        self.probe.0.lock().failed = Some(failed_tx);

        Ok(EngineEvents {
            local_candidates,
            gathering_done,
            ready,
            failed,
        })
    }

    async fn create_partial_offer(&mut self) -> Result<SessionDescription, EngineError> {
        self.probe.record("create_partial_offer");
        if self.script.fail_offer {
            return Err("offer creation failed".into());
        }
        Ok(SessionDescription::offer(OFFER))
    }

    async fn set_answer(&mut self, _answer: &SessionDescription) -> Result<(), EngineError> {
        self.probe.record("set_answer");
        if self.script.fail_set_answer {
            return Err("remote description rejected".into());
        }

        if let Some(tx) = &self.candidates {
            for candidate in &self.script.candidates {
                let _ = tx.send(candidate.clone());
            }
        }
        if self.script.gathering_done {
            if let Some(trigger) = &self.gathering_done {
                trigger.fire();
            }
        }
        if self.script.ready {
            if let Some(trigger) = &self.ready {
                trigger.fire();
            }
        }
        Ok(())
    }

    async fn gather_incoming_tracks(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, EngineError> {
        self.probe.record("gather_incoming_tracks");
        match &self.script.tracks {
            Some(tracks) => Ok(tracks.clone()),
            None => {
                cancel.cancelled().await;
                Err("track gathering cancelled".into())
            }
        }
    }

    fn start_reading(&mut self) {
        self.probe.record("start_reading");
    }

    async fn close(&mut self) {
        self.probe.record("close");
    }
}

pub fn host_candidate(index: u16) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{index} 1 UDP 2130706431 192.168.1.10 5000{index} typ host"),
        sdp_mid: Some((index % 2).to_string()),
        sdp_mline_index: Some(index % 2),
        username_fragment: None,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
