//! Typed platform identifiers.
//!
//! Discord hands out one numeric snowflake namespace for everything; keeping
//! separate newtypes means a role id can never be passed where a message id
//! is expected.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw snowflake value.
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

id_type!(
    /// Guild scheduled event identifier.
    EventId
);
id_type!(
    /// Guild (server) identifier.
    GuildId
);
id_type!(
    /// Channel identifier. Threads and DM channels are channels too.
    ChannelId
);
id_type!(
    /// Message identifier.
    MessageId
);
id_type!(
    /// Role identifier.
    RoleId
);
id_type!(
    /// User identifier.
    UserId
);

impl UserId {
    /// Render the chat mention for this user.
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    /// Render the chat mention for this role.
    #[must_use]
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}
