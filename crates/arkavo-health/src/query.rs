//! Element queries over a live accessibility tree.
//!
//! A query is never resolved once and cached: the backend re-resolves it on
//! every lookup and every action, so a query stays valid across scrolls and
//! layout changes where a resolved node would not.

use crate::backend::{AppId, ElementKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    NavigationBar,
    TabBar,
    Table,
    Cell,
    Picker,
    Alert,
    ScrollView,
}

/// One ancestor step of a scope, optionally pinned to an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,
    pub identifier: Option<String>,
    /// Only the first container matching this step, in tree order, counts.
    /// Backends resolve it before matching; [`Container::matches`] ignores it.
    #[serde(default)]
    pub first_match: bool,
}

impl Container {
    pub fn any(kind: ContainerKind) -> Self {
        Self {
            kind,
            identifier: None,
            first_match: false,
        }
    }

    pub fn named(kind: ContainerKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: Some(identifier.into()),
            first_match: false,
        }
    }

    /// The first container of `kind` on screen, like XCTest's `firstMatch`.
    pub fn first(kind: ContainerKind) -> Self {
        Self {
            first_match: true,
            ..Self::any(kind)
        }
    }

    pub fn matches(&self, other: &Container) -> bool {
        self.kind == other.kind
            && match &self.identifier {
                Some(id) => other.identifier.as_deref() == Some(id.as_str()),
                None => true,
            }
    }
}

/// Ordered chain of containers an element must be nested in. Empty means the
/// whole application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub path: Vec<Container>,
}

impl Scope {
    pub fn app() -> Self {
        Self::default()
    }

    pub fn navigation_bar(identifier: Option<&str>) -> Self {
        Self::app().then(container(ContainerKind::NavigationBar, identifier))
    }

    pub fn tab_bar(identifier: Option<&str>) -> Self {
        Self::app().then(container(ContainerKind::TabBar, identifier))
    }

    pub fn table(identifier: Option<&str>) -> Self {
        Self::app().then(container(ContainerKind::Table, identifier))
    }

    /// Inside the first picker on screen only.
    pub fn first_picker() -> Self {
        Self::app().then(Container::first(ContainerKind::Picker))
    }

    pub fn scroll_view(identifier: Option<&str>) -> Self {
        Self::app().then(container(ContainerKind::ScrollView, identifier))
    }

    pub fn alert() -> Self {
        Self::app().then(Container::any(ContainerKind::Alert))
    }

    pub fn then(mut self, container: Container) -> Self {
        self.path.push(container);
        self
    }

    /// True when `ancestors` (outermost first) contains this scope's path as
    /// an ordered subsequence.
    pub fn contains_path(&self, ancestors: &[Container]) -> bool {
        let mut remaining = ancestors.iter();
        self.path
            .iter()
            .all(|step| remaining.any(|ancestor| step.matches(ancestor)))
    }
}

fn container(kind: ContainerKind, identifier: Option<&str>) -> Container {
    match identifier {
        Some(id) => Container::named(kind, id),
        None => Container::any(kind),
    }
}

/// Match rule over an element's accessible label and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelPredicate {
    /// Case-insensitive substring of the label.
    Contains(String),
    /// Case-insensitive equality with the label.
    Like(String),
    /// Exact identifier or exact label, the way subscripting a query works.
    Named(String),
    AnyOf(Vec<LabelPredicate>),
    Any,
}

impl LabelPredicate {
    pub fn contains(text: impl Into<String>) -> Self {
        LabelPredicate::Contains(text.into())
    }

    pub fn like(text: impl Into<String>) -> Self {
        LabelPredicate::Like(text.into())
    }

    pub fn named(text: impl Into<String>) -> Self {
        LabelPredicate::Named(text.into())
    }

    pub fn matches(&self, label: &str, identifier: Option<&str>) -> bool {
        match self {
            LabelPredicate::Contains(needle) => {
                label.to_lowercase().contains(&needle.to_lowercase())
            }
            LabelPredicate::Like(text) => label.to_lowercase() == text.to_lowercase(),
            LabelPredicate::Named(name) => label == name || identifier == Some(name.as_str()),
            LabelPredicate::AnyOf(options) => {
                options.iter().any(|option| option.matches(label, identifier))
            }
            LabelPredicate::Any => true,
        }
    }
}

impl std::fmt::Display for LabelPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelPredicate::Contains(text) => write!(f, "containing '{}'", text),
            LabelPredicate::Like(text) => write!(f, "like '{}'", text),
            LabelPredicate::Named(text) => write!(f, "named '{}'", text),
            LabelPredicate::AnyOf(options) => {
                let parts: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "{}", parts.join(" or "))
            }
            LabelPredicate::Any => write!(f, "matching anything"),
        }
    }
}

/// (scope, predicate) pair addressed to one application. `index` selects
/// among the matches in tree order; 0 is the first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    pub app: AppId,
    pub scope: Scope,
    pub kind: Option<ElementKind>,
    pub predicate: LabelPredicate,
    pub index: usize,
}

impl ElementQuery {
    pub fn new(app: &AppId, kind: ElementKind, predicate: LabelPredicate) -> Self {
        Self {
            app: app.clone(),
            scope: Scope::app(),
            kind: Some(kind),
            predicate,
            index: 0,
        }
    }

    pub fn static_text(app: &AppId, predicate: LabelPredicate) -> Self {
        Self::new(app, ElementKind::StaticText, predicate)
    }

    pub fn button(app: &AppId, predicate: LabelPredicate) -> Self {
        Self::new(app, ElementKind::Button, predicate)
    }

    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Human-readable form used in logs and error messages.
    pub fn describe(&self) -> String {
        let kind = self
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "element".to_string());
        let mut out = format!("{} {}", kind, self.predicate);
        if !self.scope.path.is_empty() {
            let scope: Vec<String> = self
                .scope
                .path
                .iter()
                .map(|c| match (&c.identifier, c.first_match) {
                    (Some(id), _) => format!("{:?}['{}']", c.kind, id),
                    (None, true) => format!("first {:?}", c.kind),
                    (None, false) => format!("{:?}", c.kind),
                })
                .collect();
            out.push_str(&format!(" in {}", scope.join(" > ")));
        }
        if self.index > 0 {
            out.push_str(&format!(" #{}", self.index));
        }
        out
    }
}
