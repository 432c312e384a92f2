use std::sync::Arc;

use swing_player_client::{
    client::Client,
    swing_models::artist::{Artist, ArtistInfo},
};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Resource<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistInfoState {
    pub info: Resource<ArtistInfo>,
    pub similar_artists: Resource<Vec<Artist>>,
    pub requires_reload: bool,
}

impl Default for ArtistInfoState {
    fn default() -> Self {
        Self {
            info: Resource::Loading,
            similar_artists: Resource::Loading,
            requires_reload: true,
        }
    }
}

/// Loads an artist page and keeps it observable.
pub struct ArtistBrowser {
    client: Arc<Client>,
    state: watch::Sender<ArtistInfoState>,
}

impl ArtistBrowser {
    pub fn new(client: Arc<Client>) -> Self {
        let (state, _) = watch::channel(ArtistInfoState::default());
        Self { client, state }
    }

    pub fn state(&self) -> watch::Receiver<ArtistInfoState> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut ArtistInfoState)) {
        let mut state = self.state.borrow().clone();
        f(&mut state);
        self.state.send_replace(state);
    }

    /// Switches to the artist `hash` and fetches its page.
    pub async fn load(&self, hash: &str) {
        self.update(|state| {
            if let Resource::Success(info) = &mut state.info {
                info.artist.artisthash = hash.to_string();
            }
        });

        self.refresh(hash).await;
    }

    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, hash: &str) {
        self.update(|state| {
            state.info = Resource::Loading;
            state.similar_artists = Resource::Loading;
        });

        let (info, similar) = tokio::join!(
            self.client.artist_info(hash),
            self.client.similar_artists(hash)
        );

        self.update(|state| {
            match info {
                Ok(info) => {
                    state.info = Resource::Success(info);
                    state.requires_reload = false;
                }
                Err(err) => {
                    tracing::warn!("Unable to load artist: {err}");
                    state.info = Resource::Error(err.to_string());
                }
            }

            state.similar_artists = match similar {
                Ok(similar) => Resource::Success(similar),
                Err(err) => {
                    tracing::warn!("Unable to load similar artists: {err}");
                    Resource::Error(err.to_string())
                }
            };
        });
    }

    /// Flips the favorite flag right away, then settles it with the server's
    /// answer. The previous value is restored if the request fails.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(&self, hash: &str, is_favorite: bool) {
        self.set_favorite(!is_favorite);

        let response = if is_favorite {
            self.client.remove_favorite_artist(hash).await
        } else {
            self.client.add_favorite_artist(hash).await
        };

        match response {
            Ok(favorite) => self.set_favorite(favorite),
            Err(err) => {
                tracing::error!("Unable to toggle favorite: {err}");
                self.set_favorite(is_favorite);
            }
        }
    }

    fn set_favorite(&self, is_favorite: bool) {
        self.update(|state| {
            let mut info = state.info.data().cloned().unwrap_or_default();
            info.artist.is_favorite = is_favorite;
            state.info = Resource::Success(info);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::post};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use swing_player_client::client;
    use tokio::net::TcpListener;

    type Requests = Arc<Mutex<Vec<(&'static str, Value)>>>;

    async fn favorite_added(State(requests): State<Requests>, Json(body): Json<Value>) {
        requests.lock().unwrap().push(("/favorite/add", body));
    }

    async fn favorite_removed(State(requests): State<Requests>, Json(body): Json<Value>) {
        requests.lock().unwrap().push(("/favorite/remove", body));
    }

    /// Serves the favorite endpoints and records every request body by path.
    async fn favorite_server() -> (String, Requests) {
        let requests = Requests::default();
        let router = Router::new()
            .route("/favorite/add", post(favorite_added))
            .route("/favorite/remove", post(favorite_removed))
            .with_state(requests.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        (format!("http://{address}"), requests)
    }

    fn browser(base_url: &str) -> ArtistBrowser {
        ArtistBrowser::new(Arc::new(client::new(base_url, None).unwrap()))
    }

    #[test]
    fn starts_loading() {
        let state = browser("http://localhost:1980").state().borrow().clone();

        assert_eq!(state.info, Resource::Loading);
        assert_eq!(state.similar_artists, Resource::Loading);
        assert!(state.requires_reload);
    }

    #[tokio::test]
    async fn favorite_is_rolled_back_on_failure() {
        let browser = browser("http://127.0.0.1:9");
        let state = browser.state();

        browser.toggle_favorite("abc", false).await;

        let info = state.borrow().info.data().cloned().unwrap();
        assert!(!info.artist.is_favorite);
        assert_eq!(info.artist.name, "");
    }

    #[tokio::test]
    async fn favorite_takes_server_value_on_success() {
        let (base_url, requests) = favorite_server().await;
        let browser = browser(&base_url);
        let state = browser.state();

        browser.toggle_favorite("abc", false).await;
        assert!(state.borrow().info.data().unwrap().artist.is_favorite);

        browser.toggle_favorite("abc", true).await;
        assert!(!state.borrow().info.data().unwrap().artist.is_favorite);

        let requests = requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ("/favorite/add", json!({ "hash": "abc", "type": "artist" })),
                ("/favorite/remove", json!({ "hash": "abc", "type": "artist" })),
            ]
        );
    }

    #[tokio::test]
    async fn failed_load_is_reported() {
        let browser = browser("http://127.0.0.1:9");
        let state = browser.state();

        browser.load("abc").await;

        let state = state.borrow().clone();
        assert!(matches!(state.info, Resource::Error(_)));
        assert!(matches!(state.similar_artists, Resource::Error(_)));
        assert!(state.requires_reload);
    }
}
