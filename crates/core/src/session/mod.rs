use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod gate;
pub mod store;

/// Shared cache slot for the raw, unfiltered catalog snapshot.
pub const CATALOG_CACHE_KEY: &str = "catalog:products";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn system_context_key(&self) -> String {
        format!("session:{}:system_context", self.0)
    }

    pub fn order_key(&self) -> String {
        format!("session:{}:order", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::SessionId;

    #[test]
    fn keys_are_scoped_per_session() {
        let first = SessionId::generate();
        let second = SessionId::generate();

        assert_ne!(first, second);
        assert_ne!(first.order_key(), second.order_key());
        assert_eq!(first.order_key(), format!("session:{first}:order"));
        assert_eq!(first.system_context_key(), format!("session:{first}:system_context"));
    }
}
