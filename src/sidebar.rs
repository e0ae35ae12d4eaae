//! Whole-sidebar collapse, persisted as the literal strings `"true"` / `"false"`.

use std::rc::Rc;

use crate::storage::Storage;

pub struct SidebarState {
    storage: Rc<dyn Storage>,
    key: String,
    collapsed: bool,
}

impl SidebarState {
    /// Anything other than exactly `"true"` means expanded.
    pub fn load(storage: Rc<dyn Storage>, key: &str) -> Self {
        let collapsed = storage.get_item(key).as_deref() == Some("true");
        Self {
            storage,
            key: key.to_string(),
            collapsed,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn toggle(&mut self) -> bool {
        self.set_collapsed(!self.collapsed);
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
        let value = if collapsed { "true" } else { "false" };
        if let Err(e) = self.storage.set_item(&self.key, value) {
            log::warn!("[ThemeNative] Could not persist sidebar state: {}", e);
        }
    }
}
