//! Persisted consent records and schema migration.
//!
//! Two shapes live here: [`ConsentState`] is the complete record written to
//! storage, and [`StoredConsent`] is whatever a backend handed back, every
//! field optional, so legacy and partial records deserialize without error.
//! [`StoredConsent::normalize`] is the single place a partial record becomes
//! a complete one; no other code reasons about missing-versus-false.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::categories::ConsentCategories;

/// Current schema version tag stamped into every saved record.
pub const SCHEMA_VERSION: &str = "2.0";

/// A complete consent record as persisted to a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentState {
    /// Schema version tag.
    pub version: String,
    /// Always true.
    pub necessary: bool,
    /// Functional cookies granted.
    pub functional: bool,
    /// Preference cookies granted.
    pub preferences: bool,
    /// Analytics cookies granted.
    pub analytics: bool,
    /// Marketing cookies granted.
    pub marketing: bool,
    /// ISO-8601 timestamp of the last save.
    pub timestamp: String,
    /// Stable per-decision identifier, if ID generation is enabled.
    #[serde(rename = "consentId", default, skip_serializing_if = "Option::is_none")]
    pub consent_id: Option<Uuid>,
}

impl ConsentState {
    /// Builds a record from the given grant set, stamped with the current
    /// schema version and timestamp.
    pub fn new(categories: ConsentCategories, consent_id: Option<Uuid>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            necessary: true,
            functional: categories.functional,
            preferences: categories.preferences,
            analytics: categories.analytics,
            marketing: categories.marketing,
            timestamp: Utc::now().to_rfc3339(),
            consent_id,
        }
    }

    /// Returns the grant set carried by this record.
    pub fn categories(&self) -> ConsentCategories {
        ConsentCategories {
            functional: self.functional,
            preferences: self.preferences,
            analytics: self.analytics,
            marketing: self.marketing,
        }
    }
}

/// A consent record as read back from a backend, before normalization.
///
/// Every field is optional so that legacy records (pre-five-category, no
/// `version`) and hand-edited records deserialize instead of erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StoredConsent {
    /// Schema version, absent on legacy records.
    #[serde(default)]
    pub version: Option<String>,
    /// Necessary flag as stored; normalization forces it true regardless.
    #[serde(default)]
    pub necessary: Option<bool>,
    /// Functional flag, absent on legacy records.
    #[serde(default)]
    pub functional: Option<bool>,
    /// Preferences flag, absent on legacy records.
    #[serde(default)]
    pub preferences: Option<bool>,
    /// Analytics flag.
    #[serde(default)]
    pub analytics: Option<bool>,
    /// Marketing flag.
    #[serde(default)]
    pub marketing: Option<bool>,
    /// Timestamp of the original save, if present.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Consent identifier, absent on legacy records.
    #[serde(rename = "consentId", default)]
    pub consent_id: Option<Uuid>,
}

impl StoredConsent {
    /// A record without a version tag predates the five-category schema.
    pub fn is_legacy(&self) -> bool {
        self.version.is_none()
    }

    /// Normalizes a possibly-partial record into a complete one.
    ///
    /// Missing category flags default to false, `necessary` is forced true,
    /// a missing version is stamped with [`SCHEMA_VERSION`], and the original
    /// timestamp is preserved when present.
    pub fn normalize(&self) -> ConsentState {
        ConsentState {
            version: self
                .version
                .clone()
                .unwrap_or_else(|| SCHEMA_VERSION.to_string()),
            necessary: true,
            functional: self.functional.unwrap_or(false),
            preferences: self.preferences.unwrap_or(false),
            analytics: self.analytics.unwrap_or(false),
            marketing: self.marketing.unwrap_or(false),
            timestamp: self
                .timestamp
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            consent_id: self.consent_id,
        }
    }
}

impl From<&ConsentState> for StoredConsent {
    fn from(state: &ConsentState) -> Self {
        Self {
            version: Some(state.version.clone()),
            necessary: Some(state.necessary),
            functional: Some(state.functional),
            preferences: Some(state.preferences),
            analytics: Some(state.analytics),
            marketing: Some(state.marketing),
            timestamp: Some(state.timestamp.clone()),
            consent_id: state.consent_id,
        }
    }
}
