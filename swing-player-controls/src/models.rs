use std::path::Path;

use swing_player_client::swing_models::track::Track as SwingTrack;

#[derive(Default, Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Track {
    pub track_hash: String,
    pub title: String,
    pub duration_seconds: u32,
    pub filepath: String,
    pub image: String,
    pub artists: Vec<String>,
    pub genres: Vec<String>,
    pub folder: String,
}

impl From<SwingTrack> for Track {
    fn from(value: SwingTrack) -> Self {
        // Older servers leave `folder` out; fall back to the file's directory.
        let folder = if value.folder.is_empty() {
            Path::new(&value.filepath)
                .parent()
                .map(|parent| parent.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            value.folder
        };

        Self {
            track_hash: value.trackhash,
            title: value.title,
            duration_seconds: value.duration,
            filepath: value.filepath,
            image: value.image,
            artists: value.artists.into_iter().map(|a| a.name).collect(),
            genres: value.genre,
            folder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastPlayedTrack {
    pub track_hash: String,
    pub index_in_queue: usize,
    pub last_play_position_ms: u64,
}
