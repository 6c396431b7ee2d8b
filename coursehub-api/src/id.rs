use std::{fmt, str::FromStr};

/// Identifier as handed out by the backend: some tables use integers, others strings
#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    pub fn is_blank(&self) -> bool {
        matches!(self, RawId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Int(i) => write!(f, "{i}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for RawId {
    type Err = std::convert::Infallible;

    /// Anything that reads as an integer becomes `Int`, so that ids typed on
    /// a command line compare equal to the ones the backend returns
    fn from_str(s: &str) -> Result<RawId, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(i) => RawId::Int(i),
            Err(_) => RawId::Text(s.to_string()),
        })
    }
}

impl From<i64> for RawId {
    fn from(i: i64) -> RawId {
        RawId::Int(i)
    }
}

impl From<i32> for RawId {
    fn from(i: i32) -> RawId {
        RawId::Int(i.into())
    }
}

impl From<&str> for RawId {
    fn from(s: &str) -> RawId {
        RawId::Text(s.to_string())
    }
}

impl From<String> for RawId {
    fn from(s: String) -> RawId {
        RawId::Text(s)
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Debug,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Deserialize,
            serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $crate::RawId);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<$name, Self::Err> {
                s.parse().map($name)
            }
        }

        impl From<i64> for $name {
            fn from(i: i64) -> $name {
                $name($crate::RawId::Int(i))
            }
        }

        impl From<i32> for $name {
            fn from(i: i32) -> $name {
                $name($crate::RawId::from(i))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> $name {
                $name($crate::RawId::from(s))
            }
        }
    };
}
pub(crate) use id_type;
