use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredAcks {
    None,
    Leader,
    #[default]
    All,
}

impl Display for RequiredAcks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredAcks::None => write!(f, "0"),
            RequiredAcks::Leader => write!(f, "1"),
            RequiredAcks::All => write!(f, "all"),
        }
    }
}
