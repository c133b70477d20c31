//! Consent categories and derived views.
//!
//! Five categories are recognized: `necessary`, `functional`, `preferences`,
//! `analytics`, `marketing`. The `necessary` category is not a stored flag:
//! it is always granted, and the types here make that unrepresentable rather
//! than merely checked.

use serde::{Deserialize, Serialize};

/// A consent category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Strictly required for the site to function. Always granted.
    Necessary,
    /// Optional functionality (embedded media, chat widgets).
    Functional,
    /// Remembered user preferences (language, region).
    Preferences,
    /// Usage measurement and statistics.
    Analytics,
    /// Advertising and cross-site tracking.
    Marketing,
}

impl Category {
    /// Returns all five categories.
    pub fn all() -> &'static [Category] {
        &[
            Category::Necessary,
            Category::Functional,
            Category::Preferences,
            Category::Analytics,
            Category::Marketing,
        ]
    }

    /// Returns the four optional categories (everything but `necessary`).
    pub fn optional() -> &'static [Category] {
        &[
            Category::Functional,
            Category::Preferences,
            Category::Analytics,
            Category::Marketing,
        ]
    }

    /// Returns the category name as used in gating expressions and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Necessary => "necessary",
            Category::Functional => "functional",
            Category::Preferences => "preferences",
            Category::Analytics => "analytics",
            Category::Marketing => "marketing",
        }
    }

    /// Parses a category name. Case-insensitive; unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "necessary" => Some(Category::Necessary),
            "functional" => Some(Category::Functional),
            "preferences" => Some(Category::Preferences),
            "analytics" => Some(Category::Analytics),
            "marketing" => Some(Category::Marketing),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The current grant set: one flag per optional category.
///
/// `necessary` is always granted and therefore carried as a method, not a
/// field. The default value grants nothing optional, matching the state of a
/// visitor who has not decided yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsentCategories {
    /// Functional cookies granted.
    pub functional: bool,
    /// Preference cookies granted.
    pub preferences: bool,
    /// Analytics cookies granted.
    pub analytics: bool,
    /// Marketing cookies granted.
    pub marketing: bool,
}

impl ConsentCategories {
    /// Grant set with nothing optional granted.
    pub fn none() -> Self {
        Self::default()
    }

    /// Grant set with every category granted.
    pub fn all_granted() -> Self {
        Self {
            functional: true,
            preferences: true,
            analytics: true,
            marketing: true,
        }
    }

    /// The `necessary` category is always granted.
    pub fn necessary(&self) -> bool {
        true
    }

    /// Returns whether the given category is currently granted.
    pub fn is_granted(&self, category: Category) -> bool {
        match category {
            Category::Necessary => true,
            Category::Functional => self.functional,
            Category::Preferences => self.preferences,
            Category::Analytics => self.analytics,
            Category::Marketing => self.marketing,
        }
    }

    /// Returns whether a raw expression token names a granted category.
    ///
    /// Unknown tokens never evaluate as granted.
    pub fn grants_token(&self, token: &str) -> bool {
        Category::parse(token).is_some_and(|c| self.is_granted(c))
    }

    /// Classifies the grant set by its four optional categories.
    pub fn status(&self) -> ConsentStatus {
        let granted = [
            self.functional,
            self.preferences,
            self.analytics,
            self.marketing,
        ]
        .iter()
        .filter(|g| **g)
        .count();
        match granted {
            0 => ConsentStatus::Essential,
            4 => ConsentStatus::All,
            _ => ConsentStatus::Partial,
        }
    }

    /// Merges the supplied overrides into this grant set.
    ///
    /// Omitted categories keep their previous value.
    pub fn apply(&mut self, overrides: &CategoryOverrides) {
        if let Some(v) = overrides.functional {
            self.functional = v;
        }
        if let Some(v) = overrides.preferences {
            self.preferences = v;
        }
        if let Some(v) = overrides.analytics {
            self.analytics = v;
        }
        if let Some(v) = overrides.marketing {
            self.marketing = v;
        }
    }

    /// Full five-field copy for callers and callbacks.
    pub fn snapshot(&self) -> ConsentSnapshot {
        ConsentSnapshot {
            necessary: true,
            functional: self.functional,
            preferences: self.preferences,
            analytics: self.analytics,
            marketing: self.marketing,
        }
    }

    /// Three-field view for consumers written against the old contract.
    ///
    /// The reported `analytics` flag is the OR of the three soft categories;
    /// `marketing` passes through unchanged.
    pub fn legacy_snapshot(&self) -> LegacySnapshot {
        LegacySnapshot {
            necessary: true,
            analytics: self.functional || self.preferences || self.analytics,
            marketing: self.marketing,
        }
    }
}

/// Derived classification of a grant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    /// All four optional categories granted.
    All,
    /// No optional category granted.
    Essential,
    /// Any other combination.
    Partial,
}

impl ConsentStatus {
    /// Returns the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::All => "all",
            ConsentStatus::Essential => "essential",
            ConsentStatus::Partial => "partial",
        }
    }
}

impl std::fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial category overrides for a save-preferences operation.
///
/// Each `None` field keeps its previous value. There is deliberately no
/// `necessary` field: it cannot be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryOverrides {
    /// Override for the functional category.
    pub functional: Option<bool>,
    /// Override for the preferences category.
    pub preferences: Option<bool>,
    /// Override for the analytics category.
    pub analytics: Option<bool>,
    /// Override for the marketing category.
    pub marketing: Option<bool>,
}

impl CategoryOverrides {
    /// Creates an empty override set (keeps everything as-is).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the functional override.
    pub fn with_functional(mut self, granted: bool) -> Self {
        self.functional = Some(granted);
        self
    }

    /// Sets the preferences override.
    pub fn with_preferences(mut self, granted: bool) -> Self {
        self.preferences = Some(granted);
        self
    }

    /// Sets the analytics override.
    pub fn with_analytics(mut self, granted: bool) -> Self {
        self.analytics = Some(granted);
        self
    }

    /// Sets the marketing override.
    pub fn with_marketing(mut self, granted: bool) -> Self {
        self.marketing = Some(granted);
        self
    }
}

/// Defensive five-field copy of the current grant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsentSnapshot {
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
}

/// Three-field callback view matching the pre-five-category contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegacySnapshot {
    /// Always true.
    pub necessary: bool,
    /// OR of functional, preferences and analytics.
    pub analytics: bool,
    /// Marketing, passed through unchanged.
    pub marketing: bool,
}

/// The categories object handed to consumer callbacks.
///
/// Which variant a callback receives is a configuration choice; the stored
/// record is always the full five-category shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConsentView {
    /// Full five-category view.
    Full(ConsentSnapshot),
    /// Collapsed three-category view.
    Legacy(LegacySnapshot),
}

impl ConsentView {
    /// Always true.
    pub fn necessary(&self) -> bool {
        true
    }

    /// The reported analytics flag (OR-collapsed in the legacy view).
    pub fn analytics(&self) -> bool {
        match self {
            ConsentView::Full(s) => s.analytics,
            ConsentView::Legacy(s) => s.analytics,
        }
    }

    /// The reported marketing flag.
    pub fn marketing(&self) -> bool {
        match self {
            ConsentView::Full(s) => s.marketing,
            ConsentView::Legacy(s) => s.marketing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Category Tests ====================

    #[test]
    fn category_all_returns_five() {
        assert_eq!(Category::all().len(), 5);
        assert_eq!(Category::optional().len(), 4);
        assert!(!Category::optional().contains(&Category::Necessary));
    }

    #[test]
    fn category_parse_round_trips() {
        for category in Category::all() {
            assert_eq!(Category::parse(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("Analytics"), Some(Category::Analytics));
        assert_eq!(Category::parse("MARKETING"), Some(Category::Marketing));
    }

    #[test]
    fn category_parse_rejects_unknown() {
        assert_eq!(Category::parse("ads"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn category_serialization() {
        assert_eq!(
            serde_json::to_string(&Category::Analytics).unwrap(),
            "\"analytics\""
        );
    }

    // ==================== ConsentCategories Tests ====================

    #[test]
    fn default_grants_nothing_optional() {
        let categories = ConsentCategories::default();
        assert!(categories.necessary());
        for category in Category::optional() {
            assert!(!categories.is_granted(*category));
        }
    }

    #[test]
    fn necessary_is_always_granted() {
        assert!(ConsentCategories::none().is_granted(Category::Necessary));
        assert!(ConsentCategories::all_granted().is_granted(Category::Necessary));
    }

    #[test]
    fn all_granted_grants_everything() {
        let categories = ConsentCategories::all_granted();
        for category in Category::all() {
            assert!(categories.is_granted(*category));
        }
    }

    #[test]
    fn grants_token_unknown_is_false() {
        let categories = ConsentCategories::all_granted();
        assert!(!categories.grants_token("ads"));
        assert!(!categories.grants_token(""));
        assert!(categories.grants_token("marketing"));
        assert!(categories.grants_token("necessary"));
    }

    #[test]
    fn status_classification() {
        assert_eq!(ConsentCategories::none().status(), ConsentStatus::Essential);
        assert_eq!(ConsentCategories::all_granted().status(), ConsentStatus::All);

        let partial = ConsentCategories {
            analytics: true,
            ..Default::default()
        };
        assert_eq!(partial.status(), ConsentStatus::Partial);

        let almost = ConsentCategories {
            functional: true,
            preferences: true,
            analytics: true,
            marketing: false,
        };
        assert_eq!(almost.status(), ConsentStatus::Partial);
    }

    #[test]
    fn status_as_str() {
        assert_eq!(ConsentStatus::All.as_str(), "all");
        assert_eq!(ConsentStatus::Essential.as_str(), "essential");
        assert_eq!(ConsentStatus::Partial.as_str(), "partial");
    }

    #[test]
    fn apply_merges_only_supplied_overrides() {
        let mut categories = ConsentCategories {
            functional: true,
            ..Default::default()
        };
        categories.apply(&CategoryOverrides::new().with_analytics(true));
        assert!(categories.functional);
        assert!(categories.analytics);
        assert!(!categories.marketing);

        categories.apply(&CategoryOverrides::new().with_functional(false));
        assert!(!categories.functional);
        assert!(categories.analytics);
    }

    // ==================== View Tests ====================

    #[test]
    fn snapshot_reports_necessary_true() {
        let snapshot = ConsentCategories::none().snapshot();
        assert!(snapshot.necessary);
        assert!(!snapshot.analytics);
    }

    #[test]
    fn legacy_snapshot_ors_soft_categories() {
        let categories = ConsentCategories {
            functional: true,
            preferences: false,
            analytics: false,
            marketing: true,
        };
        let legacy = categories.legacy_snapshot();
        assert!(legacy.necessary);
        assert!(legacy.analytics);
        assert!(legacy.marketing);

        let none = ConsentCategories::none().legacy_snapshot();
        assert!(!none.analytics);
        assert!(!none.marketing);
    }

    #[test]
    fn legacy_snapshot_serializes_three_fields() {
        let legacy = ConsentCategories::all_granted().legacy_snapshot();
        let json = serde_json::to_value(ConsentView::Legacy(legacy)).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.get("functional").is_none());
        assert!(object.get("preferences").is_none());
        assert_eq!(object.get("analytics"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn full_view_serializes_five_fields() {
        let view = ConsentView::Full(ConsentCategories::none().snapshot());
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 5);
    }
}
