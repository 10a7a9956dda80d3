//! Certificate validation policy for the delivery agent.
//!
//! The collector has historically been served behind a wildcard certificate
//! whose name does not match every ingestion host. The verifier built here
//! performs normal WebPKI validation and accepts exactly one failure: a name
//! mismatch on a certificate whose subject common name equals the configured
//! allow-listed value. Every other error is rejected. The policy belongs to
//! one agent's `ClientConfig` and never affects other TLS clients in the
//! process.

use std::sync::Arc;

use openssl::nid::Nid;
use openssl::x509::X509;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::error::InitError;

fn common_name_bytes(der: &[u8]) -> Option<Vec<u8>> {
    let cert = X509::from_der(der).ok()?;
    let entry = cert.subject_name().entries_by_nid(Nid::COMMONNAME).next()?;
    Some(entry.data().as_slice().to_vec())
}

/// Return the subject common name of a DER-encoded certificate.
///
/// The raw value is returned as is, interior NULs included.
pub fn subject_common_name(der: &[u8]) -> Option<String> {
    common_name_bytes(der).and_then(|cn| String::from_utf8(cn).ok())
}

/// Whether a name mismatch on `der` is tolerated under `allowed_subject`.
///
/// The whole encoded common name must equal `allowed_subject` byte for byte.
pub fn accepts_name_mismatch(der: &[u8], allowed_subject: &str) -> bool {
    common_name_bytes(der).is_some_and(|cn| cn == allowed_subject.as_bytes())
}

fn is_name_mismatch(err: &CertificateError) -> bool {
    matches!(
        err,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

#[derive(Debug)]
struct AllowListedSubjectVerifier {
    inner: Arc<WebPkiServerVerifier>,
    allowed_subject: String,
}

impl ServerCertVerifier for AllowListedSubjectVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(ref err))
                if is_name_mismatch(err)
                    && accepts_name_mismatch(end_entity.as_ref(), &self.allowed_subject) =>
            {
                log::debug!(
                    "accepting certificate for {:?} via allow-listed subject {}",
                    server_name,
                    self.allowed_subject
                );
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn native_roots() -> Result<RootCertStore, InitError> {
    let loaded = rustls_native_certs::load_native_certs();
    for err in &loaded.errors {
        log::debug!("skipping native certificate source: {err}");
    }
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(loaded.certs);
    if ignored > 0 {
        log::debug!("ignored {ignored} unparsable native root certificates");
    }
    if added == 0 {
        return Err(InitError::Tls("no trusted root certificates found".into()));
    }
    Ok(roots)
}

/// Build the rustls client configuration for the delivery agent.
///
/// # Errors
///
/// Returns [`InitError::Tls`] when no root certificates can be loaded or the
/// verifier cannot be constructed.
pub(crate) fn client_config(allowed_subject: Option<&str>) -> Result<Arc<ClientConfig>, InitError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let roots = Arc::new(native_roots()?);
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|err| InitError::Tls(err.to_string()))?;

    let config = match allowed_subject {
        Some(subject) => {
            let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
                .build()
                .map_err(|err| InitError::Tls(err.to_string()))?;
            let verifier: Arc<dyn ServerCertVerifier> = Arc::new(AllowListedSubjectVerifier {
                inner,
                allowed_subject: subject.to_owned(),
            });
            builder
                .dangerous()
                .with_custom_certificate_verifier(verifier)
                .with_no_client_auth()
        }
        None => builder.with_root_certificates(roots).with_no_client_auth(),
    };
    Ok(Arc::new(config))
}
