use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

pub type ClientId = Uuid;

/// Open pages in the worker's scope and the worker version controlling each.
#[derive(Clone, Default)]
pub struct Clients {
    controllers: Arc<RwLock<HashMap<ClientId, Option<String>>>>,
}

impl Clients {
    pub fn new() -> Self {
        Clients::default()
    }

    /// Register a newly opened page, controlled by `controller` if any.
    pub fn open(&self, controller: Option<&str>) -> ClientId {
        let id = Uuid::new_v4();
        let mut controllers = self
            .controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        controllers.insert(id, controller.map(str::to_string));
        id
    }

    pub fn controller(&self, id: &ClientId) -> Option<String> {
        let controllers = self
            .controllers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        controllers.get(id).cloned().flatten()
    }

    /// Make `version` the controller of every open page. Returns how many
    /// pages changed controller.
    pub fn claim(&self, version: &str) -> usize {
        let mut controllers = self
            .controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut claimed = 0;
        for controller in controllers.values_mut() {
            if controller.as_deref() != Some(version) {
                *controller = Some(version.to_string());
                claimed += 1;
            }
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_takes_over_open_pages() {
        let clients = Clients::new();
        let fresh = clients.open(None);
        let old = clients.open(Some("v1"));
        let current = clients.open(Some("v2"));

        assert_eq!(clients.claim("v2"), 2);
        for id in [fresh, old, current] {
            assert_eq!(clients.controller(&id).as_deref(), Some("v2"));
        }
    }

    #[test]
    fn test_claim_without_pages() {
        let clients = Clients::new();

        assert_eq!(clients.claim("v1"), 0);
        assert_eq!(clients.controller(&Uuid::new_v4()), None);
    }
}
