//! Cookie-backed storage.
//!
//! The record is carried in a single named cookie. The actual cookie store
//! belongs to the host (a browser, a webview, an HTTP client); this module
//! only renders attribute strings and talks to the host through the
//! [`CookieJar`] seam.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::error::Result;

/// Cookie date format (RFC 1123 with a literal GMT zone).
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Sent on same-site requests and top-level navigations.
    #[default]
    Lax,
    /// Sent on same-site requests only.
    Strict,
    /// Sent everywhere; requires `Secure`.
    None,
}

impl SameSite {
    /// Returns the attribute value as written into the cookie string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied to every consent cookie write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAttributes {
    /// Cookie path.
    pub path: String,
    /// Cookie domain, omitted when `None`.
    pub domain: Option<String>,
    /// Lifetime in days from the moment of writing.
    pub expires_days: u32,
    /// SameSite policy.
    pub same_site: SameSite,
    /// Whether to set the `Secure` flag.
    pub secure: bool,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            expires_days: 365,
            same_site: SameSite::Lax,
            secure: true,
        }
    }
}

impl CookieAttributes {
    fn render(&self, name: &str, value: &str, expires: DateTime<Utc>) -> String {
        let mut cookie = format!(
            "{name}={value}; Expires={}; Path={}",
            expires.format(EXPIRES_FORMAT),
            self.path
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site.as_str());
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// The host's cookie store.
pub trait CookieJar: Send + Sync {
    /// Returns the value of the named cookie, if present and unexpired.
    fn get(&self, name: &str) -> Option<String>;

    /// Accepts a rendered `name=value; attrs…` cookie string. Writing an
    /// already-expired cookie removes it, as a browser would.
    fn set(&self, cookie: &str);
}

/// In-process jar for tests and cookie-less environments.
///
/// Implements enough browser behavior to be honest: an expired `Expires`
/// attribute deletes the cookie instead of storing it.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<HashMap<String, String>>,
}

impl MemoryCookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().unwrap().get(name).cloned()
    }

    fn set(&self, cookie: &str) {
        let mut parts = cookie.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };

        let expired = parts
            .filter_map(|attr| attr.split_once('='))
            .find(|(key, _)| key.eq_ignore_ascii_case("expires"))
            .and_then(|(_, date)| NaiveDateTime::parse_from_str(date, EXPIRES_FORMAT).ok())
            .is_some_and(|date| date.and_utc() <= Utc::now());

        let mut cookies = self.cookies.write().unwrap();
        if expired {
            cookies.remove(name);
        } else {
            cookies.insert(name.to_string(), value.to_string());
        }
    }
}

/// Cookie-backed record store.
pub struct CookieBackend {
    attributes: CookieAttributes,
    jar: Arc<dyn CookieJar>,
}

impl CookieBackend {
    /// Creates a backend over the given jar with default attributes.
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self {
            attributes: CookieAttributes::default(),
            jar,
        }
    }

    /// Sets the cookie attributes used for every write.
    pub fn with_attributes(mut self, attributes: CookieAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// The configured attributes.
    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }
}

impl StorageBackend for CookieBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.jar.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let expires = Utc::now() + Duration::days(i64::from(self.attributes.expires_days));
        self.jar.set(&self.attributes.render(key, value, expires));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        // Deletion writes an already-expired cookie built from a local copy
        // of the attributes; the configured expiry must survive untouched
        // for the next write.
        let attributes = self.attributes.clone();
        self.jar
            .set(&attributes.render(key, "", DateTime::UNIX_EPOCH));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Attribute Rendering Tests ====================

    #[test]
    fn render_includes_all_attributes() {
        let attributes = CookieAttributes {
            domain: Some("example.com".to_string()),
            ..Default::default()
        };
        let expires = DateTime::UNIX_EPOCH + Duration::days(1);
        let cookie = attributes.render("consent", "abc", expires);
        assert!(cookie.starts_with("consent=abc; Expires=Fri, 02 Jan 1970 00:00:00 GMT"));
        assert!(cookie.contains("; Path=/"));
        assert!(cookie.contains("; Domain=example.com"));
        assert!(cookie.contains("; SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn render_omits_optional_parts() {
        let attributes = CookieAttributes {
            secure: false,
            same_site: SameSite::Strict,
            ..Default::default()
        };
        let cookie = attributes.render("consent", "abc", DateTime::UNIX_EPOCH);
        assert!(!cookie.contains("Domain="));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    // ==================== MemoryCookieJar Tests ====================

    #[test]
    fn jar_stores_future_cookie() {
        let jar = MemoryCookieJar::new();
        let expires = Utc::now() + Duration::days(1);
        jar.set(&CookieAttributes::default().render("consent", "abc", expires));
        assert_eq!(jar.get("consent").as_deref(), Some("abc"));
    }

    #[test]
    fn jar_deletes_on_expired_cookie() {
        let jar = MemoryCookieJar::new();
        let expires = Utc::now() + Duration::days(1);
        jar.set(&CookieAttributes::default().render("consent", "abc", expires));
        jar.set(&CookieAttributes::default().render("consent", "", DateTime::UNIX_EPOCH));
        assert_eq!(jar.get("consent"), None);
    }

    // ==================== CookieBackend Tests ====================

    #[test]
    fn backend_round_trips() {
        let jar = Arc::new(MemoryCookieJar::new());
        let backend = CookieBackend::new(jar);
        backend.write("consent", r#"{"version":"2.0"}"#).unwrap();
        assert_eq!(
            backend.read("consent").unwrap().as_deref(),
            Some(r#"{"version":"2.0"}"#)
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let jar = Arc::new(MemoryCookieJar::new());
        let backend = CookieBackend::new(jar);
        backend.write("consent", "abc").unwrap();
        backend.remove("consent").unwrap();
        backend.remove("consent").unwrap();
        assert_eq!(backend.read("consent").unwrap(), None);
    }

    #[test]
    fn remove_does_not_disturb_configured_expiry() {
        let jar = Arc::new(MemoryCookieJar::new());
        let backend = CookieBackend::new(jar);
        let before = backend.attributes().clone();

        backend.write("consent", "abc").unwrap();
        backend.remove("consent").unwrap();
        assert_eq!(backend.attributes(), &before);

        // A later write must land with the original (unexpired) lifetime.
        backend.write("consent", "def").unwrap();
        assert_eq!(backend.read("consent").unwrap().as_deref(), Some("def"));
    }
}
