use crate::{
    Error, Result,
    swing_models::{
        FavoriteRequest, LogTrackRequest,
        artist::{AllArtists, Artist, ArtistInfo},
        folder::{FolderContent, FolderRequest},
    },
};
use reqwest::{
    Method, Response, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, instrument, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    access_token: Option<String>,
    client: reqwest::Client,
}

pub fn new(base_url: &str, access_token: Option<String>) -> Result<Client> {
    let mut base_url = Url::parse(base_url)?;

    if base_url.cannot_be_a_base() {
        return Err(Error::InvalidUrl {
            url: base_url.to_string(),
        });
    }

    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let client = reqwest::Client::builder().build()?;

    Ok(Client {
        base_url,
        access_token,
        client,
    })
}

enum Endpoint {
    File,
    Image,
    LogTrack,
    Folder,
    AllArtists,
    Artist,
    FavoriteAdd,
    FavoriteRemove,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoint = match self {
            Endpoint::File => "file",
            Endpoint::Image => "img/t",
            Endpoint::LogTrack => "logger/track/log",
            Endpoint::Folder => "folder",
            Endpoint::AllArtists => "getall/artists",
            Endpoint::Artist => "artist",
            Endpoint::FavoriteAdd => "favorite/add",
            Endpoint::FavoriteRemove => "favorite/remove",
        };

        f.write_str(endpoint)
    }
}

macro_rules! get {
    ($self:ident, $url:expr) => {
        match $self.make_get_call($url).await {
            Ok(response) => match serde_json::from_str(response.as_str()) {
                Ok(item) => Ok(item),
                Err(error) => Err(Error::DeserializeJSON {
                    message: error.to_string(),
                }),
            },
            Err(error) => Err(Error::Api {
                message: error.to_string(),
            }),
        }
    };
}

macro_rules! post {
    ($self:ident, $url:expr, $body:expr) => {
        match $self.make_post_call($url, $body).await {
            Ok(response) => match serde_json::from_str(response.as_str()) {
                Ok(item) => Ok(item),
                Err(error) => Err(Error::DeserializeJSON {
                    message: error.to_string(),
                }),
            },
            Err(error) => Err(Error::Api {
                message: error.to_string(),
            }),
        }
    };
}

impl Client {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Streaming location of a track: `<base>/file/<hash>?filepath=<path>`.
    pub fn track_uri(&self, trackhash: &str, filepath: &str) -> Result<Url> {
        let mut url = self.endpoint_url(Endpoint::File, &[trackhash])?;
        url.query_pairs_mut().append_pair("filepath", filepath);
        Ok(url)
    }

    /// Artwork location of a track: `<base>/img/t/<image>`.
    pub fn artwork_uri(&self, image: &str) -> Result<Url> {
        self.endpoint_url(Endpoint::Image, &[image])
    }

    #[instrument(skip(self))]
    pub async fn log_track(&self, trackhash: &str, duration: u64, source: &str) -> Result<()> {
        let url = self.endpoint_url(Endpoint::LogTrack, &[])?;
        let request = LogTrackRequest {
            trackhash: trackhash.to_string(),
            duration,
            timestamp: chrono::Utc::now().timestamp(),
            source: source.to_string(),
        };

        match self.make_post_call(url, &request).await {
            Ok(_) => Ok(()),
            Err(error) => Err(Error::Api {
                message: error.to_string(),
            }),
        }
    }

    #[instrument(skip(self))]
    pub async fn folder(&self, path: &str) -> Result<FolderContent> {
        let url = self.endpoint_url(Endpoint::Folder, &[])?;
        let request = FolderRequest {
            folder: path.to_string(),
            tracks_only: true,
        };

        post!(self, url, &request)
    }

    #[instrument(skip(self))]
    pub async fn artists(&self, start: u32, limit: u32) -> Result<AllArtists> {
        let mut url = self.endpoint_url(Endpoint::AllArtists, &[])?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("sortby", "name")
            .append_pair("reverse", "0");

        get!(self, url)
    }

    #[instrument(skip(self))]
    pub async fn artist_info(&self, artisthash: &str) -> Result<ArtistInfo> {
        let url = self.endpoint_url(Endpoint::Artist, &[artisthash])?;
        get!(self, url)
    }

    #[instrument(skip(self))]
    pub async fn similar_artists(&self, artisthash: &str) -> Result<Vec<Artist>> {
        let url = self.endpoint_url(Endpoint::Artist, &[artisthash, "similar"])?;
        get!(self, url)
    }

    /// Marks an artist as favorite. Returns the new favorite flag.
    #[instrument(skip(self))]
    pub async fn add_favorite_artist(&self, artisthash: &str) -> Result<bool> {
        self.favorite(Endpoint::FavoriteAdd, artisthash).await?;
        Ok(true)
    }

    /// Removes an artist from favorites. Returns the new favorite flag.
    #[instrument(skip(self))]
    pub async fn remove_favorite_artist(&self, artisthash: &str) -> Result<bool> {
        self.favorite(Endpoint::FavoriteRemove, artisthash).await?;
        Ok(false)
    }

    async fn favorite(&self, endpoint: Endpoint, hash: &str) -> Result<()> {
        let url = self.endpoint_url(endpoint, &[])?;
        let request = FavoriteRequest {
            hash: hash.to_string(),
            item_type: "artist".to_string(),
        };

        match self.make_post_call(url, &request).await {
            Ok(_) => Ok(()),
            Err(error) => Err(Error::Api {
                message: error.to_string(),
            }),
        }
    }

    fn endpoint_url(&self, endpoint: Endpoint, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.join(&endpoint.to_string())?;

        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| Error::InvalidUrl {
                    url: self.base_url.to_string(),
                })?
                .extend(segments);
        }

        Ok(url)
    }

    fn client_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.access_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("access token contains invalid header characters"),
            }
        }

        headers
    }

    async fn make_get_call(&self, url: Url) -> Result<String> {
        let headers = self.client_headers();

        debug!("calling {} endpoint", url);
        let response = self
            .client
            .request(Method::GET, url)
            .headers(headers)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn make_post_call<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<String> {
        let headers = self.client_headers();

        debug!("calling {} endpoint", url);
        let response = self
            .client
            .request(Method::POST, url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response(&self, response: Response) -> Result<String> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.text().await?),
            status => Err(Error::Api {
                message: status.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = new("http://localhost:1980", None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:1980/");

        let client = new("http://localhost:1980/api", None).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:1980/api/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(new("not a url", None).is_err());
        assert!(new("mailto:someone@example.com", None).is_err());
    }

    #[test]
    fn track_uri_escapes_hash_and_filepath() {
        let client = new("http://localhost:1980/", None).unwrap();
        let uri = client
            .track_uri("a1b2c3", "/music/Some Artist/01 - Intro.flac")
            .unwrap();

        assert_eq!(
            uri.as_str(),
            "http://localhost:1980/file/a1b2c3?filepath=%2Fmusic%2FSome+Artist%2F01+-+Intro.flac"
        );

        let uri = client.track_uri("with/slash", "x").unwrap();
        assert_eq!(uri.path(), "/file/with%2Fslash");
    }

    #[test]
    fn artwork_uri_points_to_thumbnails() {
        let client = new("https://music.example.com/swing", None).unwrap();
        let uri = client.artwork_uri("a1b2c3.webp").unwrap();

        assert_eq!(
            uri.as_str(),
            "https://music.example.com/swing/img/t/a1b2c3.webp"
        );
    }

    #[test]
    fn artist_endpoints_append_hash_segments() {
        let client = new("http://localhost:1980", None).unwrap();

        let info = client.endpoint_url(Endpoint::Artist, &["abc"]).unwrap();
        assert_eq!(info.as_str(), "http://localhost:1980/artist/abc");

        let similar = client
            .endpoint_url(Endpoint::Artist, &["abc", "similar"])
            .unwrap();
        assert_eq!(similar.as_str(), "http://localhost:1980/artist/abc/similar");

        let log = client.endpoint_url(Endpoint::LogTrack, &[]).unwrap();
        assert_eq!(log.as_str(), "http://localhost:1980/logger/track/log");
    }

    #[test]
    fn bearer_token_header() {
        let client = new("http://localhost:1980", Some("secret".to_string())).unwrap();
        let headers = client.client_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");

        let anonymous = new("http://localhost:1980", None).unwrap();
        assert!(anonymous.client_headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn log_request_wire_format() {
        let request = LogTrackRequest {
            trackhash: "abc".to_string(),
            duration: 42,
            timestamp: 1_700_000_000,
            source: "T".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "trackhash": "abc",
                "duration": 42,
                "timestamp": 1_700_000_000,
                "source": "T",
            })
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let client = new("http://127.0.0.1:9", Some("token".to_string())).unwrap();
        assert!(client.log_track("abc", 10, "E").await.is_err());
        assert!(client.remove_favorite_artist("abc").await.is_err());
    }
}
