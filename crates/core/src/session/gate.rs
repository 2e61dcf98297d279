use serde::{Deserialize, Serialize};

use crate::domain::category::Category;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    #[default]
    Unselected,
    Selected(Category),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateTransition {
    Entered(Category),
    Reselected { previous: Category, current: Category },
}

impl GateTransition {
    pub fn category(self) -> Category {
        match self {
            Self::Entered(category) | Self::Reselected { current: category, .. } => category,
        }
    }
}

/// Which category, if any, is active for a session.
///
/// The gate only tracks state. Callers run the catalog and context pipeline
/// before committing a selection, and clear session data on reset.
#[derive(Clone, Debug, Default)]
pub struct SessionGate {
    state: GateState,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn active_category(&self) -> Option<Category> {
        match self.state {
            GateState::Unselected => None,
            GateState::Selected(category) => Some(category),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.active_category().is_some()
    }

    pub fn select(&mut self, category: Category) -> GateTransition {
        let transition = match self.state {
            GateState::Unselected => GateTransition::Entered(category),
            GateState::Selected(previous) => {
                GateTransition::Reselected { previous, current: category }
            }
        };
        self.state = GateState::Selected(category);
        transition
    }

    /// Returns the category that was active, if any.
    pub fn reset(&mut self) -> Option<Category> {
        let previous = self.active_category();
        self.state = GateState::Unselected;
        previous
    }
}
