use serde::{Deserialize, Serialize};

use super::{Genre, track::Track};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub artisthash: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub albumcount: u32,
    #[serde(default)]
    pub trackcount: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllArtists {
    #[serde(default)]
    pub items: Vec<Artist>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistExpanded {
    pub artisthash: String,
    pub name: String,
    #[serde(default)]
    pub albumcount: u32,
    #[serde(default)]
    pub trackcount: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub albumhash: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub date: i64,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumsAndAppearances {
    #[serde(default)]
    pub albums: Vec<Album>,
    #[serde(default)]
    pub appearances: Vec<Album>,
    #[serde(default)]
    pub artistname: String,
    #[serde(default)]
    pub compilations: Vec<Album>,
    #[serde(default)]
    pub singles_and_eps: Vec<Album>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub artist: ArtistExpanded,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub albums: AlbumsAndAppearances,
}
