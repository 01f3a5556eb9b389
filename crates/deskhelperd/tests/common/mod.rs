//! Shared fixtures for deskhelperd integration tests
#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use deskhelper_common::UpdateConfig;
use deskhelperd::updater::ProcessControl;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const OLD_BUILD: &[u8] = b"old build";
pub const NEW_BUILD: &[u8] = b"new build";

/// What the mock server answers on `/version.json`
#[derive(Debug, Clone)]
pub enum ManifestReply {
    /// Complete manifest pointing at this server's `/download/client_app.exe`
    Release(&'static str),
    /// Body sent verbatim with HTTP 200
    Raw(&'static str),
    Status(u16),
}

/// What the mock server answers on `/download/client_app.exe`
#[derive(Debug, Clone)]
pub enum BinaryReply {
    Bytes(&'static [u8]),
    Status(u16),
    /// Sends the prefix, then fails the body stream
    Broken(&'static [u8]),
}

struct MockState {
    base: String,
    manifest: ManifestReply,
    binary: BinaryReply,
    manifest_hits: AtomicUsize,
    download_hits: AtomicUsize,
}

/// Local update server on an ephemeral port
pub struct MockUpdateServer {
    state: Arc<MockState>,
}

impl MockUpdateServer {
    pub async fn start(manifest: ManifestReply, binary: BinaryReply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(MockState {
            base,
            manifest,
            binary,
            manifest_hits: AtomicUsize::new(0),
            download_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/version.json", get(manifest_handler))
            .route("/download/client_app.exe", get(binary_handler))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state }
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/version.json", self.state.base)
    }

    pub fn manifest_hits(&self) -> usize {
        self.state.manifest_hits.load(Ordering::SeqCst)
    }

    pub fn download_hits(&self) -> usize {
        self.state.download_hits.load(Ordering::SeqCst)
    }
}

async fn manifest_handler(State(state): State<Arc<MockState>>) -> Response {
    state.manifest_hits.fetch_add(1, Ordering::SeqCst);
    match &state.manifest {
        ManifestReply::Release(version) => json(format!(
            r#"{{"version": "{}", "download_url": "{}/download/client_app.exe"}}"#,
            version, state.base
        )),
        ManifestReply::Raw(body) => json(body.to_string()),
        ManifestReply::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
    }
}

async fn binary_handler(State(state): State<Arc<MockState>>) -> Response {
    state.download_hits.fetch_add(1, Ordering::SeqCst);
    match &state.binary {
        BinaryReply::Bytes(bytes) => bytes.to_vec().into_response(),
        BinaryReply::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
        BinaryReply::Broken(prefix) => {
            let chunks: Vec<Result<Bytes, io::Error>> = vec![
                Ok(Bytes::from_static(*prefix)),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream cut")),
            ];
            Body::from_stream(tokio_stream::iter(chunks)).into_response()
        }
    }
}

fn json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// A URL on localhost where nothing is listening
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/version.json", addr)
}

/// A URL on localhost that accepts connections and never responds.
/// The server task lives as long as the runtime.
pub async fn silent_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{}/version.json", addr)
}

/// Records launches and exits instead of performing them
#[derive(Default)]
pub struct RecordingProcess {
    pub spawned: Mutex<Vec<PathBuf>>,
    pub exits: Mutex<Vec<i32>>,
    pub panic_on_spawn: bool,
}

impl RecordingProcess {
    pub fn panicking() -> Self {
        Self {
            panic_on_spawn: true,
            ..Default::default()
        }
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn exits(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }
}

impl ProcessControl for RecordingProcess {
    fn spawn_detached(&self, program: &Path) -> io::Result<()> {
        if self.panic_on_spawn {
            panic!("launcher exploded");
        }
        self.spawned.lock().unwrap().push(program.to_path_buf());
        Ok(())
    }

    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}

/// Temp install directory holding an executable and its version marker
pub struct Install {
    pub dir: TempDir,
    pub exe: PathBuf,
    pub marker: PathBuf,
}

impl Install {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("client_app.exe");
        let marker = dir.path().join("version.txt");
        fs::write(&exe, OLD_BUILD).unwrap();
        Self { dir, exe, marker }
    }

    pub fn with_marker(version: &str) -> Self {
        let install = Self::new();
        fs::write(&install.marker, version).unwrap();
        install
    }

    pub fn config(&self, manifest_url: &str) -> UpdateConfig {
        UpdateConfig {
            manifest_url: manifest_url.to_string(),
            request_timeout_secs: 5,
            download_timeout_secs: 5,
            marker_path: self.marker.clone(),
            executable_path: Some(self.exe.clone()),
            staging_dir: Some(self.dir.path().to_path_buf()),
            ..UpdateConfig::default()
        }
    }

    pub fn backup(&self) -> PathBuf {
        self.dir.path().join("client_app.exe.old")
    }

    pub fn staged(&self, version: &str) -> PathBuf {
        self.dir.path().join(format!("client_app_v{}.exe", version))
    }

    pub fn marker_contents(&self) -> Option<String> {
        fs::read_to_string(&self.marker).ok()
    }

    pub fn exe_contents(&self) -> Vec<u8> {
        fs::read(&self.exe).unwrap()
    }

    /// File names in the install directory, sorted
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
