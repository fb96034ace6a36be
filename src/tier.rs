//! Input tier identity and priority ordering.

use serde::{Deserialize, Serialize};

/// One of the three prioritized input sources.
///
/// The derived ordering is by increasing override priority: `Overlay`
/// beats `Patch` beats `Base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Base,
    Patch,
    Overlay,
}

impl Tier {
    /// All tiers, lowest priority first.
    pub const ALL: [Tier; 3] = [Tier::Base, Tier::Patch, Tier::Overlay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Patch => "patch",
            Tier::Overlay => "overlay",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_outranks_patch_outranks_base() {
        assert!(Tier::Overlay > Tier::Patch);
        assert!(Tier::Patch > Tier::Base);
    }

    #[test]
    fn all_is_sorted_by_priority() {
        let mut sorted = Tier::ALL;
        sorted.sort();
        assert_eq!(sorted, Tier::ALL);
    }
}
