use std::sync::Mutex;

use crate::ports::navigator::Navigator;

/// Navigator that keeps the full list of visited locations.
///
/// Used by the CLI, which reports where a command ended up, and by tests asserting
/// redirect sequences.
#[derive(Default)]
pub struct HistoryNavigator {
    visited: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        match self.visited.lock() {
            Ok(visited) => visited.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, location: &str) {
        tracing::info!("Navigating to {}", location);
        match self.visited.lock() {
            Ok(mut visited) => visited.push(location.to_string()),
            Err(poisoned) => poisoned.into_inner().push(location.to_string()),
        }
    }

    fn current(&self) -> Option<String> {
        self.history().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_recorded_in_order() {
        let navigator = HistoryNavigator::new();
        assert!(navigator.current().is_none());

        navigator.navigate("/unauthorized");
        navigator.navigate("/admin/dashboard");

        assert_eq!(navigator.history(), vec!["/unauthorized", "/admin/dashboard"]);
        assert_eq!(navigator.current().as_deref(), Some("/admin/dashboard"));
    }
}
