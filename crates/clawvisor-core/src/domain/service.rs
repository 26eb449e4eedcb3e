//! The two supervised services.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two supervised services a value refers to.
///
/// The Gateway is started first; the Node depends on a ready Gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Gateway,
    Node,
}

impl ServiceKind {
    /// Both kinds, in startup order.
    pub const ALL: [Self; 2] = [Self::Gateway, Self::Node];

    /// Human-readable service name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gateway => "Gateway",
            Self::Node => "Node",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
