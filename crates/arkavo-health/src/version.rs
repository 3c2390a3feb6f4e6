use crate::query::Scope;
use crate::{HealthError, Result};
use serde::{Deserialize, Serialize};

/// OS version of the device under automation. Decides which label set the
/// flows use; nothing else branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PlatformVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse "X", "X.Y" or "X.Y.Z", optionally prefixed with "iOS".
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix("iOS")
            .or_else(|| trimmed.strip_prefix("ios"))
            .unwrap_or(trimmed)
            .trim();

        let mut parts = trimmed.split('.');
        let major = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HealthError::Config(format!("Empty OS version '{}'", input)))?;
        let major = major
            .parse()
            .map_err(|_| HealthError::Config(format!("Invalid OS version '{}'", input)))?;

        let mut rest = [0u32; 2];
        for slot in rest.iter_mut() {
            if let Some(part) = parts.next() {
                *slot = part
                    .parse()
                    .map_err(|_| HealthError::Config(format!("Invalid OS version '{}'", input)))?;
            }
        }
        if parts.next().is_some() {
            return Err(HealthError::Config(format!(
                "OS version '{}' has more than three components",
                input
            )));
        }

        Ok(Self::new(major, rest[0], rest[1]))
    }

    pub fn uses_search_tab(&self) -> bool {
        // The "Browse" tab was renamed "Search" in iOS 26
        self.major >= 26
    }
}

impl Default for PlatformVersion {
    fn default() -> Self {
        Self::new(18, 0, 0)
    }
}

impl std::fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Terminology of the tab that hosts the category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabTerminology {
    Browse,
    Search,
}

/// Label set for one OS generation, resolved once and handed to the flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiProfile {
    pub tab: TabTerminology,
}

impl UiProfile {
    pub fn for_version(version: &PlatformVersion) -> Self {
        let tab = if version.uses_search_tab() {
            TabTerminology::Search
        } else {
            TabTerminology::Browse
        };
        Self { tab }
    }

    /// Label of the root tab-bar button.
    pub fn root_tab_label(&self) -> &'static str {
        match self.tab {
            TabTerminology::Browse => "Browse",
            TabTerminology::Search => "Search",
        }
    }

    /// Title of the navigation bar when the root tab is at its root page.
    pub fn root_title(&self) -> &'static str {
        self.root_tab_label()
    }

    pub fn tab_bar_scope(&self) -> Scope {
        match self.tab {
            TabTerminology::Browse => Scope::tab_bar(Some("Tab Bar")),
            TabTerminology::Search => Scope::tab_bar(None),
        }
    }

    /// Scroll view listing the categories on the root page and the sample
    /// types on a category page. Row lookups and scrolls stay inside it.
    pub fn content_scope(&self) -> Scope {
        Scope::scroll_view(None)
    }

    /// Whether an already visible root page short-circuits the tab step.
    pub fn root_page_short_circuits(&self) -> bool {
        self.tab == TabTerminology::Search
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        assert_eq!(PlatformVersion::parse("26.0.1").unwrap(), PlatformVersion::new(26, 0, 1));
        assert_eq!(PlatformVersion::parse("iOS 17.4").unwrap(), PlatformVersion::new(17, 4, 0));
        assert_eq!(PlatformVersion::parse("18").unwrap(), PlatformVersion::new(18, 0, 0));
        assert!(PlatformVersion::parse("").is_err());
        assert!(PlatformVersion::parse("eighteen").is_err());
        assert!(PlatformVersion::parse("18.x").is_err());
        assert!(PlatformVersion::parse("1.2.3.4").is_err());
        assert!(PlatformVersion::parse("26.0.").is_err());
    }

    #[test]
    fn test_version_comparison() {
        let v1 = PlatformVersion::new(18, 5, 0);
        let v2 = PlatformVersion::new(26, 0, 0);
        assert!(v1 < v2);
        assert!(!v1.uses_search_tab());
        assert!(v2.uses_search_tab());
    }

    #[test]
    fn test_profile_selects_tab_terminology() {
        let legacy = UiProfile::for_version(&PlatformVersion::new(17, 0, 0));
        assert_eq!(legacy.root_tab_label(), "Browse");
        assert_eq!(legacy.tab_bar_scope(), Scope::tab_bar(Some("Tab Bar")));
        assert!(!legacy.root_page_short_circuits());

        let current = UiProfile::for_version(&PlatformVersion::new(26, 1, 0));
        assert_eq!(current.root_tab_label(), "Search");
        assert_eq!(current.tab_bar_scope(), Scope::tab_bar(None));
        assert!(current.root_page_short_circuits());
    }
}
