//! Socket, TLS and HTTP/1.1 plumbing for a single probe request.
//!
//! One request per connection. The hyper connection driver runs in a
//! spawned task that is aborted when the exchange future is dropped, so
//! a caller-side timeout tears the socket down with it.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Why a request produced no response.
#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("url has no host")]
    MissingHost,

    #[error("unsupported url scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("connect {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS server name {0:?}")]
    ServerName(String),

    #[error("TLS handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("HTTP handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("request failed: {0}")]
    Send(#[source] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),
}

/// What the probe keeps from a response.
#[derive(Debug)]
pub(crate) struct Response {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body_size: u64,
}

/// Plain or TLS transport, chosen by URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn from_uri(uri: &Uri) -> Result<Self, TransportError> {
        match uri.scheme_str() {
            Some("http") => Ok(Scheme::Http),
            Some("https") => Ok(Scheme::Https),
            other => Err(TransportError::UnsupportedScheme(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

pub(crate) struct Transport {
    tls: TlsConnector,
    user_agent: &'static str,
}

impl Transport {
    /// Build a transport trusting the Mozilla root certificate store.
    pub(crate) fn new(user_agent: &'static str) -> Result<Self, rustls::Error> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let mut config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();
        // Only HTTP/1.1 is spoken over the connection.
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            user_agent,
        })
    }

    /// Issue one `GET` and drain the response body.
    pub(crate) async fn get(&self, uri: &Uri) -> Result<Response, TransportError> {
        let scheme = Scheme::from_uri(uri)?;
        let authority = uri.authority().ok_or(TransportError::MissingHost)?;
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = authority.port_u16().unwrap_or(scheme.default_port());

        // `path()` is "/" for an empty path, so `http://host?q=1` stays origin-form.
        let target = match uri.query() {
            Some(query) => format!("{}?{query}", uri.path()),
            None => uri.path().to_string(),
        };
        // Strip any userinfo from the Host header.
        let host_header = authority
            .as_str()
            .rsplit('@')
            .next()
            .unwrap_or(authority.as_str());

        let request = Request::builder()
            .method(Method::GET)
            .uri(target)
            .header(HOST, host_header)
            .header(USER_AGENT, self.user_agent)
            .body(Empty::<Bytes>::new())?;

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: format!("{host}:{port}"),
                source,
            })?;

        match scheme {
            Scheme::Http => exchange(stream, request).await,
            Scheme::Https => {
                let server_name = ServerName::try_from(host.to_string())
                    .map_err(|_| TransportError::ServerName(host.to_string()))?;
                let stream = self
                    .tls
                    .connect(server_name, stream)
                    .await
                    .map_err(TransportError::Tls)?;
                exchange(stream, request).await
            }
        }
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn exchange<S>(
    stream: S,
    request: Request<Empty<Bytes>>,
) -> Result<Response, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(TransportError::Handshake)?;

    let _driver = AbortOnDrop(tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "probe connection closed with error");
        }
    }));

    let response = sender
        .send_request(request)
        .await
        .map_err(TransportError::Send)?;

    // Count the body as it streams; only its size is kept.
    let (parts, mut body) = response.into_parts();
    let mut body_size = 0u64;
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(TransportError::Body)?;
        if let Some(data) = frame.data_ref() {
            body_size += data.len() as u64;
        }
    }

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in parts.headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    Ok(Response {
        status: parts.status,
        headers,
        body_size,
    })
}
