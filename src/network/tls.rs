//! TLS session setup and certificate chain inspection.
//!
//! The handshake always completes so the presented chain can be inspected even
//! when it is not trusted; the trust verdict from the Mozilla root set is
//! recorded separately and reported as an advisory.

use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{AppError, Result};

/// Validity window and subject of one presented certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Everything captured from a completed handshake
#[derive(Debug, Clone)]
pub struct TlsInspection {
    pub chain: Vec<CertificateSummary>,
    pub protocol: Option<String>,
    /// Why the chain failed web PKI verification, if it did
    pub trust_error: Option<String>,
}

/// Result of walking a chain against a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    Valid,
    Empty,
    Expired {
        subject: String,
        not_after: DateTime<Utc>,
    },
    NotYetValid {
        subject: String,
        not_before: DateTime<Utc>,
    },
}

/// Check every certificate against `now`, stopping at the first invalid one.
pub fn evaluate_chain(chain: &[CertificateSummary], now: DateTime<Utc>) -> ChainVerdict {
    if chain.is_empty() {
        return ChainVerdict::Empty;
    }

    for cert in chain {
        if now > cert.not_after {
            return ChainVerdict::Expired {
                subject: cert.subject.clone(),
                not_after: cert.not_after,
            };
        }
        if now < cert.not_before {
            return ChainVerdict::NotYetValid {
                subject: cert.subject.clone(),
                not_before: cert.not_before,
            };
        }
    }

    ChainVerdict::Valid
}

/// Open a TLS session to `host:port` and capture the presented chain.
pub async fn inspect(host: &str, port: u16, timeout: Duration) -> Result<TlsInspection> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = Arc::new(RecordingVerifier::new(provider.clone())?);

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| AppError::Network(format!("TLS configuration failed: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(verifier.clone())
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| AppError::Network(format!("Invalid TLS server name '{}': {}", host, e)))?;

    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| AppError::Network(format!("Connection to {}:{} timed out", host, port)))?
        .map_err(|e| AppError::Network(format!("Connection to {}:{} failed: {}", host, port, e)))?;

    let connector = TlsConnector::from(Arc::new(config));
    let mut tls = tokio::time::timeout(timeout, connector.connect(server_name, stream))
        .await
        .map_err(|_| AppError::Network(format!("TLS handshake with {} timed out", host)))?
        .map_err(|e| AppError::Network(format!("TLS handshake with {} failed: {}", host, e)))?;

    let (_, session) = tls.get_ref();
    let protocol = session.protocol_version().map(|v| format!("{:?}", v));
    let chain = session
        .peer_certificates()
        .unwrap_or(&[])
        .iter()
        .map(summarize)
        .collect::<Result<Vec<_>>>()?;

    let _ = tls.shutdown().await;

    Ok(TlsInspection {
        chain,
        protocol,
        trust_error: verifier.take_error(),
    })
}

fn summarize(der: &CertificateDer<'_>) -> Result<CertificateSummary> {
    let (_, cert) = X509Certificate::from_der(der.as_ref())
        .map_err(|e| AppError::Network(format!("Unparseable certificate: {}", e)))?;

    let subject = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| cert.subject().to_string());

    let validity = cert.validity();
    Ok(CertificateSummary {
        subject,
        not_before: from_unix(validity.not_before.timestamp())?,
        not_after: from_unix(validity.not_after.timestamp())?,
    })
}

fn from_unix(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AppError::Network(format!("Certificate time out of range: {}", seconds)))
}

/// Delegates to web PKI verification but never aborts the handshake.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    error: Mutex<Option<String>>,
}

impl RecordingVerifier {
    fn new(provider: Arc<CryptoProvider>) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| AppError::Network(format!("TLS verifier setup failed: {}", e)))?;

        Ok(Self {
            inner,
            error: Mutex::new(None),
        })
    }

    fn take_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if let Err(e) =
            self.inner
                .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            if let Ok(mut slot) = self.error.lock() {
                *slot = Some(e.to_string());
            }
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
