//! Static capability table.
//!
//! Automation layers ask [`supports`] before calling optional operations, so
//! the answers here must line up with which domain accessors return
//! [`Error::Unsupported`](crate::Error::Unsupported).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A named optional feature area a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Users,
    Posts,
    Topics,
    Categories,
    Notifications,
    PrivateMessage,
    Chats,
    Formatting,
}

impl Capability {
    /// Every known capability, supported or not.
    pub const ALL: &'static [Capability] = &[
        Self::Users,
        Self::Posts,
        Self::Topics,
        Self::Categories,
        Self::Notifications,
        Self::PrivateMessage,
        Self::Chats,
        Self::Formatting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Posts => "Posts",
            Self::Topics => "Topics",
            Self::Categories => "Categories",
            Self::Notifications => "Notifications",
            Self::PrivateMessage => "PrivateMessage",
            Self::Chats => "Chats",
            Self::Formatting => "Formatting",
        }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED.contains(self)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    /// Exact, case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

/// Capabilities this provider supports.
pub const SUPPORTED: &[Capability] = &[
    Capability::Users,
    Capability::Posts,
    Capability::Topics,
    Capability::Notifications,
    Capability::PrivateMessage,
    Capability::Formatting,
];

/// Membership test for a single capability name.
pub fn supports(name: &str) -> bool {
    name.parse::<Capability>()
        .is_ok_and(|cap| cap.is_supported())
}

/// Something that can be checked against the capability table: one name or
/// a sequence of names.
pub trait SupportQuery {
    fn is_supported(&self) -> bool;
}

impl SupportQuery for str {
    fn is_supported(&self) -> bool {
        supports(self)
    }
}

impl SupportQuery for String {
    fn is_supported(&self) -> bool {
        supports(self)
    }
}

impl SupportQuery for Capability {
    fn is_supported(&self) -> bool {
        Capability::is_supported(self)
    }
}

// Sequences AND every element. All elements are evaluated.
impl<S: AsRef<str>> SupportQuery for [S] {
    fn is_supported(&self) -> bool {
        self.iter()
            .fold(true, |all, name| supports(name.as_ref()) & all)
    }
}

impl<S: AsRef<str>, const N: usize> SupportQuery for [S; N] {
    fn is_supported(&self) -> bool {
        self.as_slice().is_supported()
    }
}

impl<S: AsRef<str>> SupportQuery for Vec<S> {
    fn is_supported(&self) -> bool {
        self.as_slice().is_supported()
    }
}

/// Gate an optional operation on the capability table.
pub fn require(capability: Capability, operation: &'static str) -> crate::Result<()> {
    if capability.is_supported() {
        Ok(())
    } else {
        Err(crate::Error::unsupported(operation))
    }
}
