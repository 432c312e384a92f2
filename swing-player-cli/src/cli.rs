use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use snafu::prelude::*;
use swing_player_client::client::{self, Client};
use swing_player_controls::{
    PlaybackState, Player, PlayerUiState,
    artist::{ArtistBrowser, Resource},
    controls::Controls,
    database::Database,
    duration::format_duration,
    history::HistoryLogger,
    models::Track,
    sink::Sink,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Swing Music server address. (overrides any database value)
    #[clap(short, long, env = "SWING_BASE_URL")]
    base_url: Option<String>,

    /// Access token for the server. (overrides any database value)
    #[clap(short, long, env = "SWING_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[clap(long)]
    /// Use a different database file.
    database: Option<PathBuf>,

    #[clap(short, long)]
    /// Log level
    verbosity: Option<tracing::Level>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a folder from the server
    Open {
        folder: String,
        #[clap(short, long, default_value_t = 0)]
        /// Track to start from.
        index: usize,
        #[clap(short, long, default_value_t = false)]
        shuffle: bool,
    },
    /// Continue the last saved queue
    Resume,
    /// List artists
    Artists {
        #[clap(long, default_value_t = 0)]
        start: u32,
        #[clap(long, default_value_t = 50)]
        limit: u32,
    },
    /// Show an artist and similar artists
    Artist { hash: String },
    /// Add an artist to favorites, or remove it with --remove
    Favorite {
        hash: String,
        #[clap(long, default_value_t = false)]
        remove: bool,
    },
    /// Set configuration options
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set server address.
    #[clap(value_parser)]
    BaseUrl { url: Option<String> },
    /// Set access token.
    #[clap(value_parser)]
    Token {},
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{error}"))]
    ClientError { error: String },
    #[snafu(display("{error}"))]
    PlayerError { error: String },
    #[snafu(display("{error}"))]
    TerminalError { error: String },
    #[snafu(display("No server address. Set with `config base-url` or --base-url"))]
    MissingBaseUrl,
}

impl From<swing_player_client::Error> for Error {
    fn from(error: swing_player_client::Error) -> Self {
        Error::ClientError {
            error: error.to_string(),
        }
    }
}

impl From<swing_player_controls::Error> for Error {
    fn from(error: swing_player_controls::Error) -> Self {
        Error::PlayerError {
            error: error.to_string(),
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(error: dialoguer::Error) -> Self {
        Error::TerminalError {
            error: error.to_string(),
        }
    }
}

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    let filter = match cli.verbosity {
        Some(level) => EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
        None => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let database = Arc::new(Database::new(cli.database).await?);

    if let Commands::Config { command } = cli.command {
        return configure(&database, command).await;
    }

    let configuration = database.get_configuration().await?;
    let base_url = cli
        .base_url
        .or(configuration.base_url)
        .context(MissingBaseUrlSnafu)?;
    let token = cli.token.or(configuration.access_token);

    let client = Arc::new(client::new(&base_url, token.clone())?);

    match cli.command {
        Commands::Open {
            folder,
            index,
            shuffle,
        } => {
            let content = client.folder(&folder).await?;
            let tracks: Vec<Track> = content.tracks.into_iter().map(Into::into).collect();

            if tracks.is_empty() {
                println!("No tracks in {folder}");
                return Ok(());
            }

            play(client, database, token, |controls| {
                controls.create_queue_from_folder(tracks, index, &folder);
                if shuffle {
                    controls.toggle_shuffle();
                }
            })
            .await
        }
        Commands::Resume => {
            let tracks = database.get_queue().await?;
            if tracks.is_empty() {
                println!("No saved queue");
                return Ok(());
            }

            let last_played = database.get_last_played().await?;

            play(client, database, token, |controls| {
                let (index, position) = resume_point(&tracks, last_played.as_ref());
                controls.create_new_queue(tracks, index, false);
                if position > 0.0 {
                    controls.seek(position);
                }
            })
            .await
        }
        Commands::Artists { start, limit } => {
            let artists = client.artists(start, limit).await?;
            for artist in &artists.items {
                println!(
                    "{}  {} ({} albums, {} tracks)",
                    artist.artisthash, artist.name, artist.albumcount, artist.trackcount
                );
            }
            println!("{} of {} artists", artists.items.len(), artists.total);
            Ok(())
        }
        Commands::Artist { hash } => {
            let browser = ArtistBrowser::new(client);
            browser.load(&hash).await;

            let state = browser.state().borrow().clone();
            match &state.info {
                Resource::Success(info) => {
                    let favorite = if info.artist.is_favorite { " *" } else { "" };
                    println!("{}{favorite}", info.artist.name);
                    println!(
                        "{} albums, {} tracks, {}",
                        info.artist.albumcount,
                        info.artist.trackcount,
                        format_duration(info.artist.duration.into())
                    );
                    for track in &info.tracks {
                        println!("  {}  {}", format_duration(track.duration.into()), track.title);
                    }
                }
                Resource::Error(error) => println!("Unable to load artist: {error}"),
                Resource::Loading => {}
            }

            if let Resource::Success(similar) = &state.similar_artists
                && !similar.is_empty()
            {
                println!("Similar:");
                for artist in similar {
                    println!("  {}  {}", artist.artisthash, artist.name);
                }
            }

            Ok(())
        }
        Commands::Favorite { hash, remove } => {
            let browser = ArtistBrowser::new(client);
            browser.toggle_favorite(&hash, remove).await;

            let is_favorite = browser
                .state()
                .borrow()
                .info
                .data()
                .is_some_and(|info| info.artist.is_favorite);

            if is_favorite == remove {
                println!("Unable to update favorites");
            } else if is_favorite {
                println!("Added to favorites.");
            } else {
                println!("Removed from favorites.");
            }

            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn configure(database: &Database, command: ConfigCommands) -> Result<(), Error> {
    match command {
        ConfigCommands::BaseUrl { url } => {
            let url = match url {
                Some(url) => url,
                None => Input::<String>::new()
                    .with_prompt("Enter the server address")
                    .interact_text()?,
            };

            client::new(&url, None)?;
            database.set_base_url(&url).await?;

            println!("Server address saved.");
            Ok(())
        }
        ConfigCommands::Token {} => {
            if let Ok(token) = Password::new()
                .with_prompt("Enter your access token (hidden)")
                .interact()
            {
                database.set_access_token(&token).await?;

                println!("Access token saved.");
            }
            Ok(())
        }
    }
}

/// Queue index and seek fraction to continue from.
fn resume_point(
    tracks: &[Track],
    last_played: Option<&swing_player_controls::models::LastPlayedTrack>,
) -> (usize, f32) {
    let Some(last_played) = last_played else {
        return (0, 0.0);
    };

    let index = tracks
        .get(last_played.index_in_queue)
        .filter(|track| track.track_hash == last_played.track_hash)
        .map(|_| last_played.index_in_queue)
        .or_else(|| {
            tracks
                .iter()
                .position(|track| track.track_hash == last_played.track_hash)
        });

    let Some(index) = index else {
        return (0, 0.0);
    };

    let duration_ms = u64::from(tracks[index].duration_seconds) * 1000;
    if duration_ms == 0 {
        return (index, 0.0);
    }

    let position = last_played.last_play_position_ms as f32 / duration_ms as f32;
    (index, position.clamp(0.0, 1.0))
}

async fn play(
    client: Arc<Client>,
    database: Arc<Database>,
    token: Option<String>,
    start: impl FnOnce(&Controls),
) -> Result<(), Error> {
    let history = HistoryLogger::new(client.clone(), Some(database.clone())).spawn();

    let mut player = Player::new(client, Some(history), Some(database));
    player.bind(Sink::new(token.as_deref())?);

    let controls = player.controls();
    start(&controls);

    tokio::spawn(print_state(player.state()));
    tokio::spawn(read_commands(controls));

    println!("p: play/pause  n: next  b: back  s: shuffle  r: repeat  <0-100>: seek  q: quit");

    player.player_loop().await?;
    Ok(())
}

async fn read_commands(controls: Controls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "p" => controls.toggle_play(),
            "n" => controls.next(),
            "b" => controls.previous(),
            "s" => controls.toggle_shuffle(),
            "r" => controls.toggle_repeat(),
            "c" => controls.clear_queue(),
            "q" => break,
            other => match other.parse::<f32>() {
                Ok(percent) => controls.seek(percent / 100.0),
                Err(_) => println!("Unknown command: {other}"),
            },
        }
    }

    controls.quit();
}

async fn print_state(mut state: watch::Receiver<PlayerUiState>) {
    let mut shown = String::new();

    while state.changed().await.is_ok() {
        let line = status_line(&state.borrow_and_update());

        if line != shown {
            println!("{line}");
            shown = line;
        }
    }
}

fn status_line(state: &PlayerUiState) -> String {
    let Some(track) = &state.track else {
        return "Nothing queued".to_string();
    };

    let status = match state.playback_state {
        PlaybackState::Playing if state.is_buffering => "Buffering",
        PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
        PlaybackState::Error => "Error",
    };

    format!(
        "{status} [{}/{}] {} - {} ({})",
        state.playing_track_index + 1,
        state.queue.len(),
        track.artists.join(", "),
        track.title,
        state.track_duration,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_player_controls::models::LastPlayedTrack;

    fn track(hash: &str) -> Track {
        Track {
            track_hash: hash.to_string(),
            title: hash.to_uppercase(),
            duration_seconds: 200,
            artists: vec!["Band".into()],
            ..Default::default()
        }
    }

    #[test]
    fn cli_parses_open() {
        let cli = Cli::try_parse_from([
            "swing-player",
            "--base-url",
            "http://localhost:1980",
            "open",
            "/music/Album",
            "--index",
            "3",
            "--shuffle",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:1980"));
        assert!(matches!(
            cli.command,
            Commands::Open { ref folder, index: 3, shuffle: true } if folder == "/music/Album"
        ));
    }

    #[test]
    fn resume_from_last_played() {
        let tracks = vec![track("a"), track("b"), track("c")];
        let last_played = LastPlayedTrack {
            track_hash: "b".into(),
            index_in_queue: 1,
            last_play_position_ms: 50_000,
        };

        assert_eq!(resume_point(&tracks, Some(&last_played)), (1, 0.25));
    }

    #[test]
    fn resume_finds_moved_track() {
        let tracks = vec![track("a"), track("b"), track("c")];
        let last_played = LastPlayedTrack {
            track_hash: "c".into(),
            index_in_queue: 0,
            last_play_position_ms: 0,
        };

        assert_eq!(resume_point(&tracks, Some(&last_played)), (2, 0.0));
        assert_eq!(resume_point(&tracks, None), (0, 0.0));
    }

    #[test]
    fn status_line_shows_track() {
        let state = PlayerUiState {
            track: Some(track("a")),
            queue: vec![track("a"), track("b")],
            playback_state: PlaybackState::Playing,
            track_duration: "3:20".into(),
            ..Default::default()
        };

        assert_eq!(status_line(&state), "Playing [1/2] Band - A (3:20)");
        assert_eq!(status_line(&PlayerUiState::default()), "Nothing queued");
    }
}
