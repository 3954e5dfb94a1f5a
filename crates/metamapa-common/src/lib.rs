// Shared MetaMapa data types used by the map, client, and portal crates.
mod criteria;
mod fact;
mod import;
mod serde_helpers;
mod submission;

pub use criteria::{FilterCriteria, VisibilityMode};
pub use fact::{Fact, MediaAttachment, ModerationStatus, RawPosition};
pub use import::{ImportOutcome, ImportReport, ImportRun};
pub use submission::{Attachment, NewFact, NewFactRequest};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

pub mod ids {
    // Fact ids arrive as JSON numbers from the central store and as strings
    // from the dynamic source; both are held as text.
    use super::{Error, Result};
    use serde::{Deserialize, Deserializer, Serialize};
    use std::fmt;
    use std::str::FromStr;

    #[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct FactId(String);

    impl FactId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for FactId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl FromStr for FactId {
        type Err = Error;

        fn from_str(input: &str) -> Result<Self> {
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidId(input.into()));
            }
            Ok(Self(trimmed.to_string()))
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireId {
        Int(i64),
        Text(String),
    }

    impl<'de> Deserialize<'de> for FactId {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            match WireId::deserialize(deserializer)? {
                WireId::Int(value) => Ok(Self(value.to_string())),
                WireId::Text(value) => Ok(Self(value)),
            }
        }
    }
}
