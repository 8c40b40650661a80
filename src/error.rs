use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Capacity probe failed for {url}: {reason}")]
    Probe { url: String, reason: String },

    #[error("Unable to list pods: {0}")]
    PodList(#[source] kube::Error),

    #[error("Owner reference error: {0}")]
    OwnerReference(String),

    #[error("{0} has no namespace")]
    MissingNamespace(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// Determine if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_) | Error::Probe { .. } | Error::PodList(_) | Error::AlreadyExists { .. }
        )
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}
