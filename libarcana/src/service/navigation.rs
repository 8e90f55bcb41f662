//! Page navigation state machine
//!
//! `home` is the initial page and the target of every back transition. The
//! machine itself is unconstrained: page preconditions (a current reading,
//! an active quiz) are checked by the orchestrator before it navigates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    #[default]
    Home,
    ReadingResult,
    Library,
    Shop,
    Quiz,
    History,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::ReadingResult,
        Page::Library,
        Page::Shop,
        Page::Quiz,
        Page::History,
    ];
}

impl std::str::FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "home" => Ok(Page::Home),
            "reading-result" => Ok(Page::ReadingResult),
            "library" => Ok(Page::Library),
            "shop" => Ok(Page::Shop),
            "quiz" => Ok(Page::Quiz),
            "history" => Ok(Page::History),
            _ => Err(format!("Unknown page: '{}'", s)),
        }
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Page::Home => "home",
            Page::ReadingResult => "reading-result",
            Page::Library => "library",
            Page::Shop => "shop",
            Page::Quiz => "quiz",
            Page::History => "history",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    NavigateTo(Page),
    Back,
}

/// Pure transition function
pub fn transition(_current: Page, action: NavAction) -> Page {
    match action {
        NavAction::NavigateTo(page) => page,
        NavAction::Back => Page::Home,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Page,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Page {
        self.current
    }

    /// Apply an action; returns `(from, to)` when the page changed
    pub fn apply(&mut self, action: NavAction) -> Option<(Page, Page)> {
        let from = self.current;
        let to = transition(from, action);
        if from == to {
            return None;
        }
        self.current = to;
        Some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_home() {
        assert_eq!(Navigator::new().current(), Page::Home);
    }

    #[test]
    fn test_back_always_returns_home() {
        for page in Page::ALL {
            assert_eq!(transition(page, NavAction::Back), Page::Home);
        }
    }

    #[test]
    fn test_navigate_reports_change() {
        let mut nav = Navigator::new();
        assert_eq!(
            nav.apply(NavAction::NavigateTo(Page::Shop)),
            Some((Page::Home, Page::Shop))
        );
        assert_eq!(nav.apply(NavAction::NavigateTo(Page::Shop)), None);
        assert_eq!(nav.apply(NavAction::Back), Some((Page::Shop, Page::Home)));
        assert_eq!(nav.apply(NavAction::Back), None);
    }

    #[test]
    fn test_page_names_round_trip() {
        for page in Page::ALL {
            assert_eq!(page.to_string().parse::<Page>().unwrap(), page);
        }
        assert!("settings".parse::<Page>().is_err());
        assert_eq!(
            serde_json::to_value(Page::ReadingResult).unwrap(),
            "reading-result"
        );
    }
}
