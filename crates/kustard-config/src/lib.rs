//! Facet types for `.config/kustard.styx`.
//!
//! ```styx
//! clusters (
//!   {
//!     uri "https://fabrikam.kusto.windows.net"
//!     filter { db "^sales_" }
//!   }
//!   {
//!     uri "https://contoso.kusto.windows.net"
//!     filter { webhook "https://lookup.example.com/targets", label tier1 }
//!   }
//! )
//! schema { path schema/orders.kql }
//! work_dir target/kustard
//! fail_if_data_loss true
//! ```

use facet::Facet;

pub const DEFAULT_WORK_DIR: &str = ".kustard";
pub const DEFAULT_DELTA_BINARY: &str = "delta-kusto";
pub const DEFAULT_TOKEN_ENV: &str = "KUSTARD_TOKEN";

/// Root configuration.
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Clusters to roll the schema out to.
    #[facet(default)]
    pub clusters: Vec<ClusterConfig>,

    pub schema: Option<SchemaConfig>,

    /// Directory for stored schemas and generated job files.
    pub work_dir: Option<String>,

    /// Passed through to delta-kusto.
    #[facet(default)]
    pub fail_if_data_loss: bool,

    /// Whether a cluster without any filter selects every database.
    /// Defaults to true.
    pub allow_all_databases: Option<bool>,

    pub delta: Option<DeltaConfig>,

    pub auth: Option<AuthConfig>,

    pub registry: Option<RegistryConfig>,

    pub http: Option<HttpConfig>,
}

impl Config {
    pub fn work_dir(&self) -> &str {
        self.work_dir.as_deref().unwrap_or(DEFAULT_WORK_DIR)
    }

    pub fn allow_all_databases(&self) -> bool {
        self.allow_all_databases.unwrap_or(true)
    }

    pub fn delta(&self) -> DeltaConfig {
        self.delta.clone().unwrap_or_default()
    }

    pub fn token_env(&self) -> &str {
        self.auth
            .as_ref()
            .and_then(|auth| auth.token_env.as_deref())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    pub fn http(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }

    /// Look a cluster up by URI or short name.
    pub fn cluster(&self, key: &str) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|c| {
            c.uri == key
                || c.uri
                    .strip_prefix("https://")
                    .and_then(|rest| rest.split(['.', '/', ':']).next())
                    == Some(key)
        })
    }
}

#[derive(Debug, Clone, Default, Facet)]
pub struct ClusterConfig {
    /// `https://<name>.<region>.kusto.windows.net`
    pub uri: String,

    #[facet(default)]
    pub filter: FilterConfig,
}

/// Which databases of a cluster to target. At most one mode should be set;
/// `db` wins over `dbs`, which wins over `webhook`.
#[derive(Debug, Clone, Default, Facet)]
pub struct FilterConfig {
    /// Regular expression over database names.
    pub db: Option<String>,

    #[facet(default)]
    pub dbs: Vec<String>,

    /// Lookup service endpoint.
    pub webhook: Option<String>,

    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Facet)]
pub struct SchemaConfig {
    pub path: String,

    /// `kql` (default) or `csl`.
    pub dialect: Option<String>,
}

#[derive(Debug, Clone, Default, Facet)]
pub struct DeltaConfig {
    /// delta-kusto executable. Defaults to `delta-kusto` on `PATH`.
    pub binary: Option<String>,

    /// External job generator command (program followed by its arguments).
    /// When unset, kustard writes the job file itself.
    pub generator: Option<Vec<String>>,
}

impl DeltaConfig {
    pub fn binary(&self) -> &str {
        self.binary.as_deref().unwrap_or(DEFAULT_DELTA_BINARY)
    }
}

#[derive(Debug, Clone, Default, Facet)]
pub struct AuthConfig {
    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Facet)]
pub struct RegistryConfig {
    /// Event Hubs namespace host, e.g. `myns.servicebus.windows.net`.
    pub endpoint: String,
}

#[derive(Debug, Clone, Default, Facet)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl HttpConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(30)
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(3)
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms.unwrap_or(1000)
    }
}
