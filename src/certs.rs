use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::BenchError;

/// Subject names the HTTPS benchmark client dials.
pub const DEFAULT_SUBJECT_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// Write a self-signed certificate and its private key as PEM files.
pub fn generate_self_signed_cert(
    cert_out: &Path,
    key_out: &Path,
    subject_names: &[&str],
) -> Result<(), BenchError> {
    let mut params = rcgen::CertificateParams::new(
        subject_names
            .iter()
            .cloned()
            .map(String::from)
            .collect::<Vec<_>>(),
    );
    params.is_ca = rcgen::IsCa::NoCa;
    let cert = rcgen::Certificate::from_params(params).map_err(cert_error)?;

    let cert_pem = cert.serialize_pem().map_err(cert_error)?;
    let key_pem = cert.serialize_private_key_pem();

    File::create(cert_out)?.write_all(cert_pem.as_bytes())?;
    File::create(key_out)?.write_all(key_pem.as_bytes())?;

    info!(
        "Certificates generated at:\n  cert: {}\n  key: {}",
        cert_out.display(),
        key_out.display()
    );
    Ok(())
}

fn cert_error(e: rcgen::RcgenError) -> BenchError {
    BenchError::Config(format!("certificate generation failed: {}", e))
}
