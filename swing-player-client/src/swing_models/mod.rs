use serde::{Deserialize, Serialize};

pub mod artist;
pub mod folder;
pub mod track;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
    #[serde(default)]
    pub genrehash: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTrackRequest {
    pub trackhash: String,
    pub duration: u64,
    pub timestamp: i64,
    pub source: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRequest {
    pub hash: String,
    #[serde(rename = "type")]
    pub item_type: String,
}
