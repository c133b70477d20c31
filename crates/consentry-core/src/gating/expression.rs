//! Gating expression grammar.
//!
//! An expression is a whitespace-separated token list attached to a gated
//! element. A token prefixed with `!` excludes a category; any other token
//! requires one. Evaluation:
//!
//! 1. If any excluded category is currently granted, deny.
//! 2. Otherwise, if there is at least one requirement and none of them is
//!    granted, deny.
//! 3. Otherwise allow. An expression with no requirements (empty, or only
//!    exclusions) allows by default.
//!
//! Requirements use OR semantics (any one suffices); exclusions veto.
//! Parsing never fails: a malformed or empty attribute value degrades to the
//! empty expression, which always allows.

use crate::categories::ConsentCategories;

/// A parsed gating expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatingExpression {
    raw: String,
    requirements: Vec<String>,
    exclusions: Vec<String>,
}

impl GatingExpression {
    /// Parses an expression. Never fails; unknown tokens are kept as-is and
    /// simply never evaluate as granted.
    pub fn parse(raw: &str) -> Self {
        let mut requirements = Vec::new();
        let mut exclusions = Vec::new();
        for token in raw.split_whitespace() {
            match token.strip_prefix('!') {
                Some(excluded) if !excluded.is_empty() => exclusions.push(excluded.to_string()),
                Some(_) => {} // bare "!" carries no category
                None => requirements.push(token.to_string()),
            }
        }
        Self {
            raw: raw.to_string(),
            requirements,
            exclusions,
        }
    }

    /// The original attribute text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Required category tokens (OR semantics).
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// Excluded category tokens (any one granted vetoes).
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// True when the expression carries no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.exclusions.is_empty()
    }

    /// Evaluates against an arbitrary "is this category granted" predicate.
    pub fn allows<P>(&self, granted: P) -> bool
    where
        P: Fn(&str) -> bool,
    {
        if self.exclusions.iter().any(|category| granted(category)) {
            return false;
        }
        if self.requirements.is_empty() {
            return true;
        }
        self.requirements.iter().any(|category| granted(category))
    }

    /// Evaluates against a concrete grant set.
    pub fn allows_categories(&self, categories: &ConsentCategories) -> bool {
        self.allows(|token| categories.grants_token(token))
    }
}
