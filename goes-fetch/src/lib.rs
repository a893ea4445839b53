//! HTTP retrieval of recovery images.
//!
//! Features:
//! - Streaming straight to the destination file (no buffering in memory)
//! - Retry logic with 3 attempts for transient failures
//! - Server errors (5xx) and transport errors retry; client errors do not

use goes_common::{log_info, log_warn};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

const LOG_TAG: &str = "boot:fetch";

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const TIMEOUT: Duration = Duration::from_secs(60);

/// Global HTTP agent with timeout and system certificate verification.
/// Uses platform verifier to trust system CA certificates.
static HTTP_AGENT: LazyLock<ureq::Agent> = LazyLock::new(|| {
    use ureq::tls::{RootCerts, TlsConfig};

    ureq::Agent::config_builder()
        .timeout_global(Some(TIMEOUT))
        .tls_config(
            TlsConfig::builder()
                .root_certs(RootCerts::PlatformVerifier)
                .build(),
        )
        .build()
        .new_agent()
});

#[derive(Debug)]
pub struct FetchError {
    message: String,
    retriable: bool,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for io::Error {
    fn from(e: FetchError) -> Self {
        io::Error::other(e)
    }
}

/// Download `url` to `dest`, retrying transient failures.
///
/// A failed attempt may leave a partial file behind; the next attempt (and
/// any later successful one) truncates it, so callers only see complete
/// destination files paired with an `Ok`.
pub fn fetch(url: &str, dest: &Path) -> Result<(), FetchError> {
    let mut last = None;

    for attempt in 1..=MAX_RETRIES {
        match fetch_once(url, dest) {
            Ok(()) => {
                log_info!(LOG_TAG, "fetched {url} to {}", dest.display());
                return Ok(());
            }
            Err(e) => {
                log_warn!(LOG_TAG, "attempt {attempt}/{MAX_RETRIES} failed: {e}");
                let retriable = e.retriable;
                last = Some(e);
                if !retriable {
                    break;
                }
                if attempt < MAX_RETRIES {
                    thread::sleep(RETRY_DELAY);
                }
            }
        }
    }

    Err(last.unwrap_or_else(|| FetchError {
        message: format!("fetch {url}: no attempt made"),
        retriable: false,
    }))
}

fn fetch_once(url: &str, dest: &Path) -> Result<(), FetchError> {
    let response = HTTP_AGENT.get(url).call().map_err(|e| {
        let retriable = match &e {
            ureq::Error::StatusCode(code) => *code >= 500,
            _ => true, // network/timeout errors are retriable
        };
        FetchError {
            message: format!("HTTP {e} url={url}"),
            retriable,
        }
    })?;

    let mut reader = response.into_body().into_reader();

    let mut file = File::create(dest).map_err(|e| FetchError {
        message: format!("create {}: {e}", dest.display()),
        retriable: false,
    })?;

    io::copy(&mut reader, &mut file).map_err(|e| FetchError {
        message: format!("write {}: {e}", dest.display()),
        retriable: true,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn fetch_writes_destination_file() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/kernel");
            then.status(200).body("vmlinuz-bytes");
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("kernel");
        fetch(&server.url("/kernel"), &dest).unwrap();

        mock.assert();
        assert_eq!(std::fs::read(&dest).unwrap(), b"vmlinuz-bytes");
    }

    #[test]
    fn fetch_truncates_stale_partial_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/initramfs");
            then.status(200).body("ok");
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("initramfs");
        std::fs::write(&dest, "stale partial content").unwrap();

        fetch(&server.url("/initramfs"), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"ok");
    }

    #[test]
    fn client_errors_are_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let dir = tempfile::tempdir().unwrap();
        let err = fetch(&server.url("/missing"), &dir.path().join("missing")).unwrap_err();

        mock.assert_hits(1);
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn server_errors_retry_to_exhaustion() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let dir = tempfile::tempdir().unwrap();
        let err = fetch(&server.url("/flaky"), &dir.path().join("flaky")).unwrap_err();

        mock.assert_hits(MAX_RETRIES as usize);
        assert!(err.to_string().contains("503"));
    }
}
