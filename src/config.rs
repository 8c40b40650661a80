use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 300;
pub const DEFAULT_SHARED_CLAIM_NAME: &str = "kube-dosbox-assets-pvc";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60 * 30;
pub const DEFAULT_SERVER_IMAGE: &str = "nginx:1.27-alpine";
pub const DEFAULT_JS_DOS_URL: &str = "https://v8.js-dos.com/8.3.20";
pub const DEFAULT_INIT_IMAGE: &str = "curlimages/curl:8.10.1";
pub const DEFAULT_SERVICE_TYPE: &str = "NodePort";

/// How many container statuses of a pod have to report ready
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessPolicy {
    /// Every init and main container must be ready
    #[default]
    AllContainers,
    /// Only the first init and the first main container are inspected
    FirstOfEachGroup,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ControllerConfig {
    /// Delay before re-polling a game that is not ready yet
    pub requeue_interval_secs: u64,

    /// Delay after an error that retrying soon will not fix
    pub error_requeue_secs: u64,

    /// Name of the assets claim shared by all games of a namespace
    pub shared_claim_name: String,

    pub readiness_policy: ReadinessPolicy,

    /// Upper bound for the HEAD request that sizes the storage claims
    pub probe_timeout_secs: u64,

    /// Interval of the full resync of all games
    pub resync_interval_secs: u64,

    /// Image serving the js-dos page
    pub server_image: String,

    /// Release the emulator files are fetched from into the shared claim
    pub js_dos_url: String,

    /// Image downloading the game bundle
    pub init_image: String,

    pub service_type: String,

    /// Storage class of both claims, cluster default if unset
    pub storage_class: Option<String>,
}

impl ControllerConfig {
    /// Load defaults overridden by `DOSBOX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_source(::config::Environment::with_prefix("DOSBOX").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        ::config::Config::builder()
            .set_default("requeue_interval_secs", DEFAULT_REQUEUE_INTERVAL_SECS)
            .and_then(|b| b.set_default("error_requeue_secs", DEFAULT_ERROR_REQUEUE_SECS))
            .and_then(|b| b.set_default("shared_claim_name", DEFAULT_SHARED_CLAIM_NAME))
            .and_then(|b| b.set_default("readiness_policy", "all-containers"))
            .and_then(|b| b.set_default("probe_timeout_secs", DEFAULT_PROBE_TIMEOUT_SECS))
            .and_then(|b| b.set_default("resync_interval_secs", DEFAULT_RESYNC_INTERVAL_SECS))
            .and_then(|b| b.set_default("server_image", DEFAULT_SERVER_IMAGE))
            .and_then(|b| b.set_default("js_dos_url", DEFAULT_JS_DOS_URL))
            .and_then(|b| b.set_default("init_image", DEFAULT_INIT_IMAGE))
            .and_then(|b| b.set_default("service_type", DEFAULT_SERVICE_TYPE))
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_interval_secs: DEFAULT_REQUEUE_INTERVAL_SECS,
            error_requeue_secs: DEFAULT_ERROR_REQUEUE_SECS,
            shared_claim_name: DEFAULT_SHARED_CLAIM_NAME.to_string(),
            readiness_policy: ReadinessPolicy::default(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            server_image: DEFAULT_SERVER_IMAGE.to_string(),
            js_dos_url: DEFAULT_JS_DOS_URL.to_string(),
            init_image: DEFAULT_INIT_IMAGE.to_string(),
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            storage_class: None,
        }
    }
}
