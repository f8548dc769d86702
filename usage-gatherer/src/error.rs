use reqwest::StatusCode;

pub type Result<T, E = NifiError> = std::result::Result<T, E>;

/// Everything that can go wrong while talking to the NiFi REST API.
///
/// Per-processor problems never surface as a `NifiError` past the retrievers; they are folded into
/// [`crate::CountValue::Unknown`] instead.
#[derive(thiserror::Error, Debug)]
pub enum NifiError {
    #[error("authentication rejected by {url} ({status}), check username and password")]
    Authentication { url: String, status: StatusCode },

    #[error("could not reach {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("TLS certificate validation failed for {url}: {reason} (use verify_ssl: false for self-signed servers)")]
    Tls { url: String, reason: String },

    #[error("process group {0} does not exist")]
    GroupNotFound(String),

    #[error("nested process group {group_id} could not be read: {source}")]
    DescendantLookup {
        group_id: String,
        #[source]
        source: Box<NifiError>,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl NifiError {
    /// Errors after which no further call against the server can succeed.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, NifiError::Authentication { .. } | NifiError::Tls { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NifiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub(crate) fn from_transport(url: impl ToString, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            return NifiError::Connectivity {
                url,
                reason: "request timed out".to_string(),
            };
        }
        // The request URL is part of the message and may itself contain "ssl" or "tls".
        let reason = error_chain(&err.without_url());
        if looks_like_tls(&reason) {
            NifiError::Tls { url, reason }
        } else {
            NifiError::Connectivity { url, reason }
        }
    }
}

/// reqwest hides the underlying TLS error behind several layers of `source()`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

fn looks_like_tls(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| reason.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_credential_and_tls_failures_abort_a_run() {
        let auth = NifiError::Authentication {
            url: "https://nifi/nifi-api/access/token".into(),
            status: StatusCode::UNAUTHORIZED,
        };
        let tls = NifiError::Tls {
            url: "https://nifi".into(),
            reason: "invalid peer certificate: UnknownIssuer".into(),
        };
        let missing = NifiError::GroupNotFound("abc".into());
        let offline = NifiError::Connectivity {
            url: "https://nifi".into(),
            reason: "connection refused".into(),
        };

        assert!(auth.is_fatal_for_run());
        assert!(tls.is_fatal_for_run());
        assert!(!missing.is_fatal_for_run());
        assert!(!offline.is_fatal_for_run());
    }

    #[test]
    fn not_found_is_read_from_the_status_code() {
        let err = NifiError::Status {
            method: "GET".into(),
            url: "https://nifi/nifi-api/flow/process-groups/x".into(),
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!NifiError::GroupNotFound("x".into()).is_not_found());
    }

    #[test]
    fn tls_failures_are_recognised_in_the_error_chain() {
        assert!(looks_like_tls("error sending request: client error (Connect): invalid peer certificate"));
        assert!(looks_like_tls("SSL routines:tls_post_process_server_certificate"));
        assert!(!looks_like_tls("tcp connect error: Connection refused (os error 111)"));
    }
}
