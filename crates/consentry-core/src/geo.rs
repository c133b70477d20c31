//! Best-effort region detection.
//!
//! Produces a single advisory output: the consent mode the presentation
//! layer should default to. Sources, in precedence order: a trusted host
//! hint (country code), a timezone table lookup, an optional remote lookup,
//! and finally the configured default. Detection never errors; every failure
//! falls through to the next source.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default timeout for the remote lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

/// EEA members plus the UK and Switzerland: opt-in consent regimes.
const OPT_IN_COUNTRIES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IS", "IE",
    "IT", "LV", "LI", "LT", "LU", "MT", "NL", "NO", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
    "GB", "CH",
];

/// Regimes where tracking is permitted until the user objects.
const OPT_OUT_COUNTRIES: &[&str] = &["US", "CA", "BR", "AU"];

/// Consent mode the presentation layer should default to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentMode {
    /// Blocking dialog before anything optional runs.
    OptIn,
    /// Run with an easy way to object.
    OptOut,
    /// No regime applies.
    #[default]
    None,
}

impl ConsentMode {
    /// Returns the mode as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentMode::OptIn => "opt-in",
            ConsentMode::OptOut => "opt-out",
            ConsentMode::None => "none",
        }
    }
}

impl std::fmt::Display for ConsentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Region information the host already has.
#[derive(Debug, Clone, Default)]
pub struct GeoHints {
    /// Trusted two-letter country code (e.g. from a server-set meta tag).
    pub country: Option<String>,
    /// IANA timezone name reported by the host environment.
    pub timezone: Option<String>,
}

/// Lenient shape of a remote lookup response.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Coarse region classifier.
pub struct GeoDetector {
    default_mode: ConsentMode,
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl GeoDetector {
    /// Creates a detector that falls back to the given mode.
    pub fn new(default_mode: ConsentMode) -> Self {
        Self::with_timeout(default_mode, DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Creates a detector with a custom remote-lookup timeout.
    pub fn with_timeout(default_mode: ConsentMode, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            default_mode,
            endpoint: None,
            client,
        }
    }

    /// Enables the remote lookup against the given endpoint. The endpoint
    /// must answer a GET with JSON carrying a `country_code` or `country`
    /// field.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The configured fallback mode.
    pub fn default_mode(&self) -> ConsentMode {
        self.default_mode
    }

    /// Classifies a two-letter country code. `None` when the code is not a
    /// plausible country code at all.
    pub fn classify_country(code: &str) -> Option<ConsentMode> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if OPT_IN_COUNTRIES.contains(&code.as_str()) {
            Some(ConsentMode::OptIn)
        } else if OPT_OUT_COUNTRIES.contains(&code.as_str()) {
            Some(ConsentMode::OptOut)
        } else {
            Some(ConsentMode::None)
        }
    }

    /// Classifies an IANA timezone name. `None` when the table has no
    /// opinion; the table is deliberately coarse.
    pub fn classify_timezone(timezone: &str) -> Option<ConsentMode> {
        let tz = timezone.trim();
        if tz.starts_with("Europe/")
            || matches!(
                tz,
                "Atlantic/Canary" | "Atlantic/Madeira" | "Atlantic/Reykjavik"
            )
        {
            Some(ConsentMode::OptIn)
        } else if tz.starts_with("America/") || tz.starts_with("Australia/") {
            Some(ConsentMode::OptOut)
        } else {
            None
        }
    }

    /// Resolves the consent mode for the current visitor. Never errors.
    pub async fn detect(&self, hints: &GeoHints) -> ConsentMode {
        if let Some(country) = &hints.country {
            if let Some(mode) = Self::classify_country(country) {
                debug!("consent mode {mode} from country hint {country}");
                return mode;
            }
        }
        if let Some(timezone) = &hints.timezone {
            if let Some(mode) = Self::classify_timezone(timezone) {
                debug!("consent mode {mode} from timezone {timezone}");
                return mode;
            }
        }
        if let Some(endpoint) = &self.endpoint {
            match self.lookup(endpoint).await {
                Ok(code) => {
                    if let Some(mode) = Self::classify_country(&code) {
                        debug!("consent mode {mode} from remote lookup ({code})");
                        return mode;
                    }
                }
                Err(err) => warn!("geo lookup failed: {err}"),
            }
        }
        self.default_mode
    }

    async fn lookup(&self, endpoint: &str) -> anyhow::Result<String> {
        let response: LookupResponse = self
            .client
            .get(endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .country_code
            .or(response.country)
            .ok_or_else(|| anyhow::anyhow!("lookup response carried no country code"))
    }
}
