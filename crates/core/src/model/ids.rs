use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

server_id!(
    /// Server-assigned identifier of a card.
    CardId
);
server_id!(
    /// Server-assigned identifier of a deck.
    DeckId
);
server_id!(
    /// Server-assigned identifier of a user account.
    UserId
);
server_id!(
    /// Server-assigned identifier of a study session.
    SessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&DeckId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: CardId = serde_json::from_str("42").unwrap();
        assert_eq!(back, CardId::new(42));
    }

    #[test]
    fn ids_parse_from_route_segments() {
        assert_eq!(" 12 ".parse::<DeckId>().unwrap(), DeckId::new(12));
        assert!("abc".parse::<UserId>().is_err());
        assert_eq!(format!("{:?}", SessionId::new(3)), "SessionId(3)");
    }
}
