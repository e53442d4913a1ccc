//! Discord snowflake identifiers.
//!
//! Snowflakes travel as decimal strings in Discord JSON but some producers
//! (and older exports) write bare numbers, so both forms are accepted when
//! deserializing. Serialization always writes the string form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::ParseIntError;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Text(String),
    Number(u64),
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            derive_more::Display,
            derive_more::From,
        )]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw snowflake value.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// The raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match RawSnowflake::deserialize(deserializer)? {
                    RawSnowflake::Number(n) => Ok(Self(n)),
                    RawSnowflake::Text(s) => s.parse().map_err(serde::de::Error::custom),
                }
            }
        }
    };
}

snowflake_id!(
    /// Discord message id.
    MessageId
);
snowflake_id!(
    /// Discord channel id.
    ChannelId
);
snowflake_id!(
    /// Discord guild (server) id.
    GuildId
);
snowflake_id!(
    /// Discord user id.
    UserId
);
snowflake_id!(
    /// Discord role id.
    RoleId
);
snowflake_id!(
    /// Discord interaction id.
    InteractionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&RoleId::new(1234567890123)).unwrap();
        assert_eq!(json, "\"1234567890123\"");
    }

    #[test]
    fn test_deserializes_string_and_number() {
        let from_text: MessageId = serde_json::from_str("\"42\"").unwrap();
        let from_number: MessageId = serde_json::from_str("42").unwrap();
        assert_eq!(from_text, from_number);
        assert_eq!(from_text.get(), 42);
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(serde_json::from_str::<UserId>("\"abc\"").is_err());
        assert!("abc".parse::<UserId>().is_err());
    }
}
