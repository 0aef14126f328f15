use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: String,
    pub name: String,
}

impl Tab {
    fn new(name: impl Into<String>) -> Self {
        Self { id: format!("tab-{}", Uuid::new_v4().simple()), name: name.into() }
    }
}

/// Ordered tab strip. Position `i` always refers to model `i` of the model
/// store; [`crate::viewer::Viewer`] pairs every mutation here with the store.
#[derive(Debug, Default)]
pub struct TabManager {
    tabs: Vec<Tab>,
    active: usize,
}

impl TabManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Active position, `None` when there are no tabs.
    pub fn active(&self) -> Option<usize> {
        (!self.tabs.is_empty()).then_some(self.active)
    }

    /// Appends a tab and activates it.
    pub fn create(&mut self, name: impl Into<String>) -> usize {
        let tab = Tab::new(name);
        log::info!("[tabs] create {} '{}'", tab.id, tab.name);
        self.tabs.push(tab);
        self.active = self.tabs.len() - 1;
        self.active
    }

    pub fn switch_to(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        self.active = index;
        true
    }

    /// Removes the tab at `index` and clamps the active position into range.
    /// Returns the position to activate next, if any tabs remain.
    pub fn remove(&mut self, index: usize) -> Option<Option<usize>> {
        if index >= self.tabs.len() {
            return None;
        }
        let tab = self.tabs.remove(index);
        log::info!("[tabs] remove {} '{}'", tab.id, tab.name);
        if self.active >= self.tabs.len() {
            self.active = self.tabs.len().saturating_sub(1);
        }
        Some(self.active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_activates_new_tab_with_unique_id() {
        let mut tabs = TabManager::new();
        assert_eq!(tabs.active(), None);
        assert_eq!(tabs.create("a.fbx"), 0);
        assert_eq!(tabs.create("b.fbx"), 1);
        assert_eq!(tabs.active(), Some(1));
        assert!(tabs.tabs()[0].id.starts_with("tab-"));
        assert_ne!(tabs.tabs()[0].id, tabs.tabs()[1].id);
    }

    #[test]
    fn removing_last_clamps_active() {
        let mut tabs = TabManager::new();
        tabs.create("a.fbx");
        tabs.create("b.fbx");
        assert_eq!(tabs.remove(1), Some(Some(0)));
        assert_eq!(tabs.remove(0), Some(None));
        assert!(tabs.is_empty());
    }

    #[test]
    fn removing_other_tab_keeps_active_position() {
        let mut tabs = TabManager::new();
        tabs.create("a.fbx");
        tabs.create("b.fbx");
        tabs.create("c.fbx");
        tabs.switch_to(1);
        assert_eq!(tabs.remove(0), Some(Some(1)));
        assert_eq!(tabs.tabs()[1].name, "c.fbx");
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut tabs = TabManager::new();
        tabs.create("a.fbx");
        assert!(!tabs.switch_to(4));
        assert_eq!(tabs.remove(4), None);
        assert_eq!(tabs.len(), 1);
    }
}
