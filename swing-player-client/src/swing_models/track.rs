use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackArtist {
    pub name: String,
    #[serde(default)]
    pub artisthash: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub trackhash: String,
    pub title: String,
    #[serde(default)]
    pub duration: u32,
    pub filepath: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default, alias = "genres")]
    pub genre: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub albumhash: String,
    #[serde(default)]
    pub is_favorite: bool,
}
