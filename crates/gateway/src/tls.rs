//! TLS
//!
//! Two concerns share this module. The listener side accepts TLS
//! connections, extracts the verified client certificate's Common Name for
//! role impersonation, and serves each connection through hyper; without
//! certificate material `axum::serve` handles the socket directly. The
//! client side builds the configuration for database connections: every TCP
//! host encrypts, verified against a pinned server certificate, a CA
//! bundle, or the public trust roots; only Unix sockets connect in the
//! clear.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use pgway_config::PostgresConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig, SignatureScheme};
use tokio::net::TcpListener;
use tokio_postgres_rustls::MakeRustlsConnect;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::auth::TlsPeer;
use crate::error::{GatewayError, Result};

/// Build the rustls server configuration from PEM files.
///
/// When a client CA bundle is given, client certificates are requested and
/// verified against it; connections without one still proceed (they fall
/// back to Basic auth or the default role).
pub fn server_config(
    cert_path: &str,
    key_path: &str,
    client_ca_path: Option<&str>,
) -> Result<ServerConfig> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(open(cert_path)?))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| GatewayError::internal(format!("cannot read certificate chain: {e}")))?;

    let key = rustls_pemfile::private_key(&mut BufReader::new(open(key_path)?))
        .map_err(|e| GatewayError::internal(format!("cannot read private key: {e}")))?
        .ok_or_else(|| GatewayError::internal("no private key found"))?;

    let builder = ServerConfig::builder();
    let builder = match client_ca_path {
        Some(path) => {
            let mut roots = RootCertStore::empty();
            for cert in rustls_pemfile::certs(&mut BufReader::new(open(path)?)) {
                let cert =
                    cert.map_err(|e| GatewayError::internal(format!("bad client CA: {e}")))?;
                roots
                    .add(cert)
                    .map_err(|e| GatewayError::internal(format!("bad client CA: {e}")))?;
            }
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .allow_unauthenticated()
                .build()
                .map_err(|e| GatewayError::internal(format!("client verifier: {e}")))?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    builder
        .with_single_cert(certs, key)
        .map_err(|e| GatewayError::internal(format!("invalid certificate/key pair: {e}")))
}

fn open(path: &str) -> Result<File> {
    File::open(path).map_err(|e| GatewayError::internal(format!("cannot open '{path}': {e}")))
}

/// Serve the router over TLS until cancellation
pub async fn serve_tls(
    listener: TcpListener,
    config: ServerConfig,
    app: Router,
    cancel: CancellationToken,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(Arc::new(config));

    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => accepted,
        };

        let (stream, remote) = match accepted {
            Ok(pair) => pair,
            Err(error) => {
                warn!(error = %error, "accept failed");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let app = app.clone();

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(error) => {
                    debug!(remote = %remote, error = %error, "TLS handshake failed");
                    return;
                }
            };

            let peer = TlsPeer {
                common_name: peer_common_name(tls_stream.get_ref().1),
            };

            let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo::<SocketAddr>(remote));
                request.extensions_mut().insert(peer.clone());
                app.clone().oneshot(request)
            });

            let served = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(tls_stream), service)
                .await;
            if let Err(error) = served {
                debug!(remote = %remote, error = %error, "connection error");
            }
        });
    }
}

/// Subject Common Name of the first peer certificate, if any
fn peer_common_name(connection: &rustls::ServerConnection) -> Option<String> {
    let cert = connection.peer_certificates()?.first()?;
    let (_, parsed) = X509Certificate::from_der(cert.as_ref()).ok()?;
    let common_name = parsed
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(|cn| cn.to_string());
    common_name
}

/// TLS connector for database connections, or `None` for Unix sockets.
///
/// A pinned certificate replaces chain verification entirely; a CA bundle
/// verifies normally against those roots; with neither configured the
/// public trust roots apply.
pub fn postgres_tls(config: &PostgresConfig) -> Result<Option<MakeRustlsConnect>> {
    if config.host.starts_with('/') {
        return Ok(None);
    }

    let builder = ClientConfig::builder();
    let client_config = if let Some(path) = &config.server_certificate {
        let verifier = PinnedServerVerifier {
            pinned: load_first_certificate(path)?,
            provider: Arc::new(rustls::crypto::aws_lc_rs::default_provider()),
        };
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        match &config.ca_certificates {
            Some(path) => {
                for cert in rustls_pemfile::certs(&mut BufReader::new(open(path)?)) {
                    let cert = cert
                        .map_err(|e| GatewayError::internal(format!("bad server CA: {e}")))?;
                    roots
                        .add(cert)
                        .map_err(|e| GatewayError::internal(format!("bad server CA: {e}")))?;
                }
            }
            None => {
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            }
        }
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(Some(MakeRustlsConnect::new(client_config)))
}

fn load_first_certificate(path: &str) -> Result<CertificateDer<'static>> {
    rustls_pemfile::certs(&mut BufReader::new(open(path)?))
        .next()
        .transpose()
        .map_err(|e| GatewayError::internal(format!("cannot read server certificate: {e}")))?
        .ok_or_else(|| GatewayError::internal(format!("no certificate found in '{path}'")))
}

/// Accepts exactly the pinned server certificate and nothing else.
/// Handshake signatures still verify against the certificate's key.
#[derive(Debug)]
struct PinnedServerVerifier {
    pinned: CertificateDer<'static>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if !intermediates.is_empty() {
            return Err(rustls::Error::General(format!(
                "one server certificate expected, {} received",
                intermediates.len() + 1
            )));
        }
        if end_entity.as_ref() == self.pinned.as_ref() {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(
                "invalid server certificate".to_string(),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
