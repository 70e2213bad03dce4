//! # Error Types
//!
//! Error taxonomy for the controller. Transient cluster and network errors
//! are logged and requeued by the reconcile driver; configuration errors
//! stay visible across passes; a Forbidden during CRD installation fails
//! the phase fast.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    /// HTTP error against an admin API (Gitea, ArgoCD)
    #[error("admin api error: {0}")]
    Http(#[from] reqwest::Error),

    /// An admin API rejected the request with a non-success status
    #[error("admin api {api} returned {status}: {body}")]
    AdminApi {
        api: &'static str,
        status: u16,
        body: String,
    },

    /// A git command exited non-zero
    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    /// YAML decode failure in a manifest stream
    #[error("manifest decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON conversion failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest template rendering failure
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// A package name with no registry entry
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// A credential record exists but lacks the expected key
    #[error("secret {secret} is missing key {key}")]
    MissingCredentialKey { secret: String, key: &'static str },

    /// A polled wait ran out of budget
    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// One or more documents in a bundle failed to apply
    #[error("failed to apply {failed} of {total} documents: {details}")]
    ApplyAggregate {
        failed: usize,
        total: usize,
        details: String,
    },

    /// Filesystem error during repository population
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Context-wrapped internal error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// True when the underlying cause is a 403 from the API server.
    /// RBAC misconfiguration is not retryable at the phase layer.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(resp)) if resp.code == 403)
    }

    /// True when an admin API rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::AdminApi {
                status: 401 | 403,
                ..
            }
        )
    }

    /// True for configuration errors (bad package name, broken template)
    /// that will not resolve on a short retry. Looks through phase-name
    /// context wrapping.
    pub fn is_config(&self) -> bool {
        match self {
            Error::UnknownPackage(_) | Error::Template(_) => true,
            Error::Other(inner) => inner.downcast_ref::<Error>().is_some_and(Error::is_config),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_detected_from_api_response() {
        let err = Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        }));
        assert!(err.is_forbidden());
    }

    #[test]
    fn not_found_is_not_forbidden() {
        let err = Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));
        assert!(!err.is_forbidden());
    }

    #[test]
    fn config_errors_are_detected_through_context_wrapping() {
        let inner = Error::UnknownPackage("flux".to_string());
        assert!(inner.is_config());

        let wrapped = Error::Other(anyhow::Error::new(inner).context("core packages phase failed"));
        assert!(wrapped.is_config());

        let transient = Error::Timeout("git server".to_string());
        assert!(!transient.is_config());
    }

    #[test]
    fn unauthorized_covers_both_http_statuses() {
        for status in [401, 403] {
            let err = Error::AdminApi {
                api: "gitea",
                status,
                body: String::new(),
            };
            assert!(err.is_unauthorized());
        }
        let err = Error::AdminApi {
            api: "gitea",
            status: 500,
            body: String::new(),
        };
        assert!(!err.is_unauthorized());
    }
}
