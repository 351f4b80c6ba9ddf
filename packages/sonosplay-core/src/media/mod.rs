//! Ephemeral single-file HTTP media server.
//!
//! Speakers cannot read local disks, so the file chosen for playback is
//! exposed over HTTP under a freshly bound port. One [`MediaServer`] owns at
//! most one [`ServerSession`]; starting a new session always stops the
//! previous one first, under a single lock, so two listeners are never bound
//! at the same time.

mod routes;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use self::routes::{create_router, MediaState};
use crate::context::{LocalIpResolver, UrlBuilder};
use crate::protocol_constants::{DEFAULT_AUDIO_MIME, MEDIA_SHUTDOWN_TIMEOUT_MS};

/// Characters left unescaped in the URL path: `A-Z a-z 0-9 _ . - ~`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Errors that can occur when starting a serving session.
#[derive(Debug, Error)]
pub enum MediaServerError {
    /// The path does not name a readable regular file.
    #[error("cannot serve {}: {reason}", .path.display())]
    InvalidFile { path: PathBuf, reason: String },

    /// Binding the ephemeral listener failed.
    #[error("failed to bind media server: {0}")]
    Bind(#[source] std::io::Error),
}

/// The file bound to one serving session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    /// Absolute path of the served file.
    pub file_path: PathBuf,
    /// Basename as shown to users.
    pub file_name: String,
    /// Percent-encoded basename; the only path the server answers on,
    /// compared byte for byte.
    pub url_path: String,
}

impl MediaHandle {
    /// Builds a handle for an absolute file path.
    pub fn new(file_path: PathBuf) -> Result<Self, MediaServerError> {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MediaServerError::InvalidFile {
                path: file_path.clone(),
                reason: "path has no file name".into(),
            })?;

        Ok(Self {
            url_path: encode_basename(&file_name),
            file_name,
            file_path,
        })
    }
}

/// Percent-encodes a basename for use as a single URL path segment.
pub fn encode_basename(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

/// Audio MIME type for a file, by extension.
///
/// Unknown extensions are served as `audio/mpeg`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg" | "oga") => "audio/ogg",
        _ => DEFAULT_AUDIO_MIME,
    }
}

/// One bind-serve-stop lifecycle.
#[derive(Debug)]
pub struct ServerSession {
    port: u16,
    url: String,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerSession {
    /// Whether the serving task is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Owner of the single media listener.
pub struct MediaServer {
    resolver: LocalIpResolver,
    session: Mutex<Option<ServerSession>>,
}

impl MediaServer {
    /// Creates an idle server that advertises addresses from `resolver`.
    pub fn new(resolver: LocalIpResolver) -> Self {
        Self {
            resolver,
            session: Mutex::new(None),
        }
    }

    /// Serves `path` on a fresh ephemeral port and returns its URL.
    ///
    /// Any previous session is fully stopped first. The URL has the form
    /// `http://{lan-ip}:{port}/{percent-encoded basename}`.
    ///
    /// # Errors
    /// `InvalidFile` if `path` is not an existing regular file, `Bind` if no
    /// listener could be bound. Either way no session is left running.
    pub async fn serve(&self, path: impl AsRef<Path>) -> Result<String, MediaServerError> {
        let path = path.as_ref();
        let mut guard = self.session.lock().await;
        Self::stop_locked(&mut guard).await;

        let invalid = |reason: String| MediaServerError::InvalidFile {
            path: path.to_path_buf(),
            reason,
        };
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        if !meta.is_file() {
            return Err(invalid("not a regular file".into()));
        }
        let file_path = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        let handle = Arc::new(MediaHandle::new(file_path)?);

        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .await
            .map_err(MediaServerError::Bind)?;
        let port = listener
            .local_addr()
            .map_err(MediaServerError::Bind)?
            .port();

        let shutdown = CancellationToken::new();
        let router = create_router(MediaState {
            handle: Arc::clone(&handle),
            shutdown: shutdown.clone(),
        });
        let signal = shutdown.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
            {
                log::warn!("[MediaServer] Listener on port {} failed: {}", port, e);
            }
        });

        let url = UrlBuilder::new(self.resolver.resolve(), port).media_url(&handle.url_path);
        log::info!(
            "[MediaServer] Serving {} at {}",
            handle.file_path.display(),
            url
        );

        *guard = Some(ServerSession {
            port,
            url: url.clone(),
            shutdown,
            task,
        });
        Ok(url)
    }

    /// Stops the current session, if any.
    ///
    /// Returns once the listener is closed. Stopping an idle server is a no-op.
    pub async fn stop(&self) {
        let mut guard = self.session.lock().await;
        Self::stop_locked(&mut guard).await;
    }

    async fn stop_locked(slot: &mut Option<ServerSession>) {
        let Some(mut session) = slot.take() else {
            return;
        };

        session.shutdown.cancel();
        let grace = Duration::from_millis(MEDIA_SHUTDOWN_TIMEOUT_MS);
        if tokio::time::timeout(grace, &mut session.task)
            .await
            .is_err()
        {
            log::warn!(
                "[MediaServer] Port {} did not drain within {}ms, aborting",
                session.port,
                MEDIA_SHUTDOWN_TIMEOUT_MS
            );
            session.task.abort();
            let _ = (&mut session.task).await;
        }
        log::info!("[MediaServer] Stopped listener on port {}", session.port);
    }

    /// URL of the live session.
    pub async fn current_url(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.url.clone())
    }

    /// Whether a session is live.
    pub async fn is_running(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(ServerSession::is_running)
    }
}
