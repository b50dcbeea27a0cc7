//! Transport seams: one HTTP round trip and one file upload.
//!
//! Both are traits so the protocol layers can be driven by in-process mocks.
//! Concrete implementations:
//! - [`ReqwestTransport`] posts over reqwest/rustls.
//! - [`FtpTransport`] stores uploads on the remote server over plain FTP.
//! - [`LocalDirTransport`] drops uploads below a staging directory that the
//!   file-transfer daemon (or a mounted share) mirrors to the remote server.
//!   Used for dry runs and tests.

use std::fmt;
use std::io::{self, Cursor};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the peer (DNS, TCP, TLS).
    Connect(String),
    /// The request did not complete in time.
    Timeout(String),
    /// The peer answered with an HTTP status >= 400.
    Status { status: u16, body: String },
    /// Local I/O failure (reading a body, writing an upload).
    Io(String),
    /// Invalid transport settings or request parameters.
    Config(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "connect error: {msg}"),
            TransportError::Timeout(msg) => write!(f, "timeout: {msg}"),
            TransportError::Status { status, .. } => write!(f, "http status {status}"),
            TransportError::Io(msg) => write!(f, "io error: {msg}"),
            TransportError::Config(msg) => write!(f, "transport config error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// One round trip. A status >= 400 is returned as
    /// [`TransportError::Status`], never as a `RawResponse`.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub timeout: Duration,
    /// Accept invalid or self-signed certificates for this client only.
    pub skip_certificate_verification: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            skip_certificate_verification: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(options: HttpOptions) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.skip_certificate_verification)
            .build()
            .map_err(|e| TransportError::Config(format!("build http client: {e}")))?;
        Ok(Self { http })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::Config(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.to_reqwest(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.body(request.body).send().await.map_err(classify)?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = resp.text().await.map_err(classify)?;

        debug!(status, bytes = body.len(), "http response received");

        if status >= 400 {
            return Err(TransportError::Status { status, body });
        }
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// File transfer
// ---------------------------------------------------------------------------

/// Connection parameters for one upload.
#[derive(Clone)]
pub struct TransferSession {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &"<REDACTED>")
            .field("password", &"<REDACTED>")
            .finish()
    }
}

#[async_trait::async_trait]
pub trait FileTransport: Send + Sync {
    /// Connect, put `content` at `remote_path`, close.
    async fn upload(
        &self,
        session: &TransferSession,
        content: Vec<u8>,
        remote_path: &str,
    ) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct LocalDirTransport {
    staging_root: PathBuf,
}

impl LocalDirTransport {
    pub fn new(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
        }
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Map a remote path onto the staging directory. Absolute prefixes are
    /// dropped; `..` is rejected.
    pub fn local_path(&self, remote_path: &str) -> Result<PathBuf, TransportError> {
        let mut out = self.staging_root.clone();
        let mut pushed = false;
        for component in Path::new(remote_path).components() {
            match component {
                Component::Normal(part) => {
                    out.push(part);
                    pushed = true;
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    return Err(TransportError::Config(format!(
                        "remote path escapes staging root: {remote_path}"
                    )))
                }
            }
        }
        if !pushed {
            return Err(TransportError::Config(format!(
                "remote path has no file name: {remote_path:?}"
            )));
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl FileTransport for LocalDirTransport {
    async fn upload(
        &self,
        session: &TransferSession,
        content: Vec<u8>,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        let target = self.local_path(remote_path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransportError::Io(format!("create {}: {e}", parent.display())))?;
        }

        // Write then rename so a watcher never picks up a partial file.
        let mut partial = target.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        tokio::fs::write(&partial, &content)
            .await
            .map_err(|e| TransportError::Io(format!("write {}: {e}", partial.display())))?;
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| TransportError::Io(format!("rename {}: {e}", target.display())))?;

        info!(
            host = %session.host,
            port = session.port,
            remote_path,
            bytes = content.len(),
            "reconciliation file staged"
        );
        Ok(())
    }
}

/// Plain FTP in passive mode with binary transfers. suppaftp's client is
/// blocking, so each upload runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct FtpTransport {
    timeout: Duration,
}

impl FtpTransport {
    /// `timeout` bounds the connect and every control-channel read or write.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn ftp_error(stage: &str, err: FtpError) -> TransportError {
    match err {
        FtpError::ConnectionError(e)
            if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) =>
        {
            TransportError::Timeout(format!("ftp {stage}: {e}"))
        }
        FtpError::ConnectionError(e) => TransportError::Connect(format!("ftp {stage}: {e}")),
        other => TransportError::Io(format!("ftp {stage}: {other}")),
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Connect(format!("resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| TransportError::Connect(format!("no address for {host}:{port}")))
}

fn store_blocking(
    session: &TransferSession,
    content: &[u8],
    remote_path: &str,
    timeout: Duration,
) -> Result<u64, TransportError> {
    let addr = resolve(&session.host, session.port)?;
    let mut ftp = FtpStream::connect_timeout(addr, timeout).map_err(|e| ftp_error("connect", e))?;
    {
        let control = ftp.get_ref();
        control
            .set_read_timeout(Some(timeout))
            .and_then(|()| control.set_write_timeout(Some(timeout)))
            .map_err(|e| TransportError::Io(format!("ftp control timeouts: {e}")))?;
    }

    ftp.login(session.username.as_str(), session.password.as_str())
        .map_err(|e| ftp_error("login", e))?;
    ftp.transfer_type(FileType::Binary).map_err(|e| ftp_error("type", e))?;
    let bytes = ftp
        .put_file(remote_path, &mut Cursor::new(content))
        .map_err(|e| ftp_error("store", e))?;

    // The file is already stored; a refused QUIT does not undo that.
    if let Err(e) = ftp.quit() {
        debug!(error = %e, "ftp quit failed after store");
    }
    Ok(bytes)
}

#[async_trait::async_trait]
impl FileTransport for FtpTransport {
    async fn upload(
        &self,
        session: &TransferSession,
        content: Vec<u8>,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        let owned_session = session.clone();
        let path = remote_path.to_string();
        let timeout = self.timeout;
        let bytes = tokio::task::spawn_blocking(move || {
            store_blocking(&owned_session, &content, &path, timeout)
        })
        .await
        .map_err(|e| TransportError::Io(format!("ftp upload task: {e}")))??;

        debug!(
            host = %session.host,
            port = session.port,
            remote_path,
            bytes,
            "ftp store complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_strips_root_and_rejects_parent() {
        let t = LocalDirTransport::new("/srv/outbox");
        assert_eq!(
            t.local_path("/Agency/UT000011/UT000011_COLLECTION_20240102.csv")
                .unwrap(),
            PathBuf::from("/srv/outbox/Agency/UT000011/UT000011_COLLECTION_20240102.csv")
        );
        assert!(matches!(
            t.local_path("Agency/../../etc/passwd"),
            Err(TransportError::Config(_))
        ));
        assert!(matches!(t.local_path("/"), Err(TransportError::Config(_))));
    }

    #[test]
    fn session_debug_hides_credentials() {
        let s = TransferSession {
            host: "ftp.example.test".to_string(),
            port: 21,
            username: "vendor".to_string(),
            password: "hunter2".to_string(),
        };
        let dbg = format!("{s:?}");
        assert!(dbg.contains("ftp.example.test"));
        assert!(!dbg.contains("vendor"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn status_display_omits_body() {
        let e = TransportError::Status {
            status: 502,
            body: "<html>secret upstream page</html>".to_string(),
        };
        assert_eq!(e.to_string(), "http status 502");
    }

    #[test]
    fn ftp_refusals_are_io_and_socket_failures_are_connect() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            ftp_error("connect", FtpError::ConnectionError(refused)),
            TransportError::Connect(msg) if msg.starts_with("ftp connect:")
        ));
        let slow = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(matches!(
            ftp_error("store", FtpError::ConnectionError(slow)),
            TransportError::Timeout(_)
        ));
        assert!(matches!(
            ftp_error("login", FtpError::BadResponse),
            TransportError::Io(msg) if msg.starts_with("ftp login:")
        ));
    }

    #[tokio::test]
    async fn ftp_upload_to_closed_port_is_a_connect_error() {
        // Bind then drop to get a local port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let session = TransferSession {
            host: "127.0.0.1".to_string(),
            port,
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let err = FtpTransport::new(Duration::from_secs(2))
            .upload(&session, b"x".to_vec(), "f.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
    }

    #[tokio::test]
    async fn local_dir_upload_writes_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let t = LocalDirTransport::new(dir.path());
        let session = TransferSession {
            host: "h".to_string(),
            port: 21,
            username: "u".to_string(),
            password: "p".to_string(),
        };
        t.upload(&session, b"a,b\n".to_vec(), "Agency/UT1/f.csv")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("Agency/UT1/f.csv")).unwrap();
        assert_eq!(written, b"a,b\n");
        assert!(!dir.path().join("Agency/UT1/f.csv.part").exists());
    }
}
