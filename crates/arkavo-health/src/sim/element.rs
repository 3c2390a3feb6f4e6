use crate::backend::{ElementKind, ElementSnapshot};
use crate::query::{Container, ContainerKind, ElementQuery};
use std::time::Duration;

/// One element on a simulated screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SimElement {
    pub kind: ElementKind,
    pub label: String,
    pub identifier: Option<String>,
    pub value: Option<String>,
    pub containers: Vec<Container>,
    pub hittable: bool,
    /// Scroll gestures on the screen needed before the element is hittable.
    pub scrolls_to_reveal: u32,
    /// Delay after the screen is shown before the element exists.
    pub appears_after: Duration,
}

impl SimElement {
    pub fn new(kind: ElementKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            identifier: None,
            value: None,
            containers: Vec::new(),
            hittable: true,
            scrolls_to_reveal: 0,
            appears_after: Duration::ZERO,
        }
    }

    pub fn static_text(label: impl Into<String>) -> Self {
        Self::new(ElementKind::StaticText, label)
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Button, label)
    }

    pub fn text_field(label: impl Into<String>) -> Self {
        Self::new(ElementKind::TextField, label)
    }

    pub fn switch(label: impl Into<String>) -> Self {
        Self::new(ElementKind::Switch, label)
    }

    /// A picker wheel is labelled by its current value.
    pub fn picker_wheel(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(ElementKind::PickerWheel, value.clone())
            .value(value)
            .inside(Container::any(ContainerKind::Picker))
    }

    /// A picker wheel inside the picker identified by `picker`.
    pub fn wheel_in(picker: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(ElementKind::PickerWheel, value.clone())
            .value(value)
            .inside(Container::named(ContainerKind::Picker, picker))
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Nest inside `container` (outermost first across calls).
    pub fn inside(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn in_navigation_bar(self, identifier: impl Into<String>) -> Self {
        self.inside(Container::named(ContainerKind::NavigationBar, identifier))
    }

    pub fn in_tab_bar(self, identifier: impl Into<String>) -> Self {
        self.inside(Container::named(ContainerKind::TabBar, identifier))
    }

    pub fn in_table(self, identifier: impl Into<String>) -> Self {
        self.inside(Container::named(ContainerKind::Table, identifier))
    }

    /// A row of a scrolling list.
    pub fn in_scroll_view(self) -> Self {
        self.inside(Container::any(ContainerKind::ScrollView))
    }

    pub fn not_hittable(mut self) -> Self {
        self.hittable = false;
        self
    }

    pub fn revealed_after_scrolls(mut self, scrolls: u32) -> Self {
        self.scrolls_to_reveal = scrolls;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    pub(crate) fn matches(&self, query: &ElementQuery) -> bool {
        query.kind.is_none_or(|kind| kind == self.kind)
            && query.scope.contains_path(&self.containers)
            && query
                .predicate
                .matches(&self.label, self.identifier.as_deref())
    }

    /// Whether a tap rule keyed by `key` applies to this element.
    pub(crate) fn answers_to(&self, key: &str) -> bool {
        self.label == key || self.identifier.as_deref() == Some(key)
    }

    pub(crate) fn snapshot(&self, scrolls: u32) -> ElementSnapshot {
        ElementSnapshot {
            kind: self.kind,
            label: self.label.clone(),
            identifier: self.identifier.clone(),
            value: self.value.clone(),
            hittable: self.hittable && scrolls >= self.scrolls_to_reveal,
        }
    }
}

/// A named set of elements shown together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimScreen {
    pub elements: Vec<SimElement>,
}

impl SimScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: SimElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_all(mut self, elements: impl IntoIterator<Item = SimElement>) -> Self {
        self.elements.extend(elements);
        self
    }
}
