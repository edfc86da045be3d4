use crate::models::Bundle;
use serde::{Deserialize, Serialize};

/// A user-defined book-list style.
///
/// Only the identity and a flat settings bundle travel through an archive;
/// what the settings mean is up to the settings store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub uuid: String,
    pub name: String,
    pub preferred: bool,
    pub settings: Bundle,
}
