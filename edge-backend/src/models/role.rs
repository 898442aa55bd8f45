use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Founder-team seats. The human user holds one, AI agents fill the others.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    #[serde(rename = "CEO")]
    #[strum(serialize = "CEO")]
    Ceo,
    #[serde(rename = "CTO")]
    #[strum(serialize = "CTO")]
    Cto,
    #[serde(rename = "CMO")]
    #[strum(serialize = "CMO")]
    Cmo,
}

impl Role {
    /// Every role except `taken`, in declaration order.
    pub fn others(taken: Role) -> Vec<Role> {
        Role::iter().filter(|role| *role != taken).collect()
    }
}
