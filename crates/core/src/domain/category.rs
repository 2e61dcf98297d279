use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Buyer segment that scopes the catalog and the system prompt of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Agent,
    Property,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Agent, Category::Property];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "Agent",
            Self::Property => "Property",
        }
    }

    /// Exact, case-insensitive comparison against a catalog tag.
    pub fn matches_tag(self, tag: &str) -> bool {
        tag.to_lowercase() == self.as_str().to_lowercase()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "property" => Ok(Self::Property),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Category;
    use crate::errors::DomainError;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("agent".parse::<Category>(), Ok(Category::Agent));
        assert_eq!(" PROPERTY ".parse::<Category>(), Ok(Category::Property));
        assert_eq!(
            "broker".parse::<Category>(),
            Err(DomainError::UnknownCategory("broker".to_string()))
        );
    }

    #[test]
    fn tag_match_ignores_case_but_not_content() {
        assert!(Category::Agent.matches_tag("agent"));
        assert!(Category::Agent.matches_tag("AGENT"));
        assert!(!Category::Agent.matches_tag("agents"));
        assert!(!Category::Agent.matches_tag(" agent"));
        assert!(!Category::Property.matches_tag("Agent"));
    }
}
