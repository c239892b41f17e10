// ── AWS session ──
//
// Binds SDK clients to whatever region and profile the shared
// `ContextState` holds at call time. Loaded configs are memoised per
// (region, profile); switching back to a previous region reuses it.

use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_credential_types::Credentials;
use aws_types::SdkConfig;
use aws_types::region::Region;
use dashmap::DashMap;
use emrscope_core::ContextState;
use tracing::debug;
use url::Url;

use crate::error::Error;

/// Knobs applied to every SDK config the session loads.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Override the service endpoint (local emulators, tests).
    pub endpoint_url: Option<String>,
    /// Static credentials instead of the default provider chain.
    pub credentials: Option<Credentials>,
    /// Per-operation timeout.
    pub timeout: Option<Duration>,
    /// Maximum attempts per operation, including the first.
    pub max_attempts: Option<u32>,
}

impl SessionOptions {
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }
}

type ConfigKey = (String, Option<String>);

/// Context-bound factory for SDK clients.
///
/// Cheaply cloneable via `Arc<SessionInner>`.
#[derive(Clone)]
pub struct AwsSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    context: Arc<ContextState>,
    options: SessionOptions,
    configs: DashMap<ConfigKey, SdkConfig>,
}

impl AwsSession {
    /// Create a session. Fails only if the endpoint override is not a URL.
    pub fn new(context: Arc<ContextState>, options: SessionOptions) -> Result<Self, Error> {
        if let Some(endpoint) = &options.endpoint_url {
            Url::parse(endpoint)?;
        }
        Ok(Self {
            inner: Arc::new(SessionInner {
                context,
                options,
                configs: DashMap::new(),
            }),
        })
    }

    pub fn context(&self) -> &Arc<ContextState> {
        &self.inner.context
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Region calls made right now would go to.
    pub fn region(&self) -> String {
        self.inner.context.region()
    }

    /// SDK config for the current region and profile.
    pub async fn sdk_config(&self) -> SdkConfig {
        let key: ConfigKey = (self.inner.context.region(), self.inner.context.profile());
        if let Some(config) = self.inner.configs.get(&key) {
            return config.clone();
        }

        debug!(region = %key.0, profile = ?key.1, "loading SDK config");
        let config = self.load(&key.0, key.1.as_deref()).await;
        self.inner.configs.insert(key, config.clone());
        config
    }

    async fn load(&self, region: &str, profile: Option<&str>) -> SdkConfig {
        let options = &self.inner.options;
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));

        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &options.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        if let Some(credentials) = &options.credentials {
            loader = loader.credentials_provider(credentials.clone());
        }
        if let Some(timeout) = options.timeout {
            loader = loader.timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        }
        if let Some(attempts) = options.max_attempts {
            loader = loader.retry_config(RetryConfig::standard().with_max_attempts(attempts));
        }

        loader.load().await
    }

    /// Number of distinct (region, profile) configs loaded so far.
    pub fn cached_configs(&self) -> usize {
        self.inner.configs.len()
    }

    pub async fn emr(&self) -> aws_sdk_emr::Client {
        aws_sdk_emr::Client::new(&self.sdk_config().await)
    }

    pub async fn emr_containers(&self) -> aws_sdk_emrcontainers::Client {
        aws_sdk_emrcontainers::Client::new(&self.sdk_config().await)
    }

    pub async fn emr_serverless(&self) -> aws_sdk_emrserverless::Client {
        aws_sdk_emrserverless::Client::new(&self.sdk_config().await)
    }

    pub async fn glue(&self) -> aws_sdk_glue::Client {
        aws_sdk_glue::Client::new(&self.sdk_config().await)
    }
}

impl std::fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSession")
            .field("context", &self.inner.context)
            .field("endpoint_url", &self.inner.options.endpoint_url)
            .field("cached_configs", &self.inner.configs.len())
            .finish_non_exhaustive()
    }
}
