//! Element locators.
//!
//! A [`Locator`] matches elements either by CSS selector or by their exact
//! (whitespace-collapsed) text. An [`ElementQuery`] chains locators so that
//! each step searches inside the element picked by the previous one, e.g.
//! "the first `a.s-item__link` inside result card #3".

use std::fmt;

use serde::Serialize;

/// One way of matching elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    /// Exact text match after collapsing whitespace. The innermost matching
    /// element wins over its ancestors.
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::Text(t) => write!(f, "text=\"{t}\""),
        }
    }
}

/// One step of an [`ElementQuery`]: a locator and which match to pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryStep {
    pub locator: Locator,
    pub nth: usize,
}

/// A path of locators from the document root to one element.
///
/// Operations that read a single element use the `nth` match of the last
/// step; counting uses every match of the last step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementQuery {
    steps: Vec<QueryStep>,
}

impl ElementQuery {
    pub fn new(locator: Locator) -> Self {
        Self {
            steps: vec![QueryStep { locator, nth: 0 }],
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Locator::css(selector))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Locator::text(text))
    }

    /// Pick the `n`th match (zero-based) of the last step.
    pub fn nth(mut self, n: usize) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.nth = n;
        }
        self
    }

    /// Search for `locator` inside the element this query selects.
    pub fn child(&self, locator: Locator) -> Self {
        let mut steps = self.steps.clone();
        steps.push(QueryStep { locator, nth: 0 });
        Self { steps }
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }
}

impl From<Locator> for ElementQuery {
    fn from(locator: Locator) -> Self {
        Self::new(locator)
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " >> ")?;
            }
            write!(f, "{}", step.locator)?;
            if step.nth > 0 {
                write!(f, " [{}]", step.nth)?;
            }
        }
        Ok(())
    }
}

/// Build queries from a static candidate table.
pub fn css_candidates(selectors: &[&str]) -> Vec<ElementQuery> {
    selectors.iter().map(|s| ElementQuery::css(*s)).collect()
}

/// Scope every candidate selector inside `parent`.
pub fn scoped_candidates(parent: &ElementQuery, selectors: &[&str]) -> Vec<ElementQuery> {
    selectors
        .iter()
        .map(|s| parent.child(Locator::css(*s)))
        .collect()
}
