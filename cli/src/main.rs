// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use directories::ProjectDirs;
use log::LevelFilter;
use tokio::{
    io::{AsyncBufReadExt as _, BufReader},
    sync::mpsc,
    task::JoinHandle,
};
use url::Url;

use vidshelf_app::{
    Environment, OnChanged,
    catalog::{self, Loader},
    notification::Notification,
    settings::{self, Settings},
    source::AnySource,
};

mod input;
use self::input::{PlayInput, WatchInput};

mod render;

/// Default log level for debug builds.
#[cfg(debug_assertions)]
const DEFAULT_LOG_FILTER_LEVEL: LevelFilter = LevelFilter::Info;

/// Reduce log verbosity for release builds.
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_FILTER_LEVEL: LevelFilter = LevelFilter::Warn;

const APP_NAME: &str = "vidshelf";

const CATALOG_URL_ARG: &str = "catalog-url";

const CONFIG_DIR_ARG: &str = "config-dir";

const JSON_ARG: &str = "json";

const INDEX_ARG: &str = "index";

type NotificationSender = mpsc::UnboundedSender<Notification>;

type CatalogLoader = Loader<AnySource, NotificationSender>;

fn new_command() -> Command {
    Command::new(APP_NAME)
        .about("Browse and play a catalog of video streams")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new(CATALOG_URL_ARG)
                .long(CATALOG_URL_ARG)
                .help("The URL of the catalog, either http(s) or file")
                .num_args(1)
                .global(true)
                .value_parser(value_parser!(Url)),
        )
        .arg(
            Arg::new(CONFIG_DIR_ARG)
                .long(CONFIG_DIR_ARG)
                .help("The directory of the settings file")
                .num_args(1)
                .global(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("list")
                .about("Loads the catalog and prints all valid entries")
                .arg(
                    Arg::new(JSON_ARG)
                        .long(JSON_ARG)
                        .help("Print the entries as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Prints the catalog after every change, refresh with an empty line, quit with `q`"),
        )
        .subcommand(
            Command::new("play")
                .about(
                    "Plays an entry of the catalog, control with `p` (play/pause), `m` (mute), \
                     `s <SECONDS>` (seek), and `q` (quit)",
                )
                .arg(
                    Arg::new(INDEX_ARG)
                        .help("The index of the entry as printed by `list`")
                        .required(true)
                        .value_parser(value_parser!(usize)),
                ),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(DEFAULT_LOG_FILTER_LEVEL)
        // Parse environment variables after configuring all default option(s).
        .parse_default_env()
        .init();

    let matches = new_command().get_matches();
    match run(&matches).await {
        Ok(exit_code) => exit_code,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config_dir = matches
        .get_one::<PathBuf>(CONFIG_DIR_ARG)
        .cloned()
        .or_else(app_config_dir);
    let mut settings = if let Some(config_dir) = &config_dir {
        log::info!(
            "Config directory: {dir_path}",
            dir_path = config_dir.display()
        );
        restore_settings(config_dir)
    } else {
        log::warn!("Config directory is unavailable");
        Settings::default()
    };
    if let Some(catalog_url) = matches.get_one::<Url>(CATALOG_URL_ARG) {
        settings.update_catalog_url(Some(catalog_url.clone()));
    }
    let env = Environment::commission(&settings)?;
    log::info!("Catalog URL: {}", env.catalog_url());
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    let (loader, initial_load) = Loader::spawn(env.catalog_source()?, notification_tx);
    match matches.subcommand() {
        Some(("list", matches)) => {
            list(
                &loader,
                initial_load,
                notification_rx,
                matches.get_flag(JSON_ARG),
            )
            .await
        }
        Some(("watch", _)) => watch(&loader, initial_load, notification_rx).await,
        Some(("play", matches)) => {
            let index = matches
                .get_one::<usize>(INDEX_ARG)
                .copied()
                .unwrap_or_default();
            play(&env, &loader, initial_load, notification_rx, index).await
        }
        Some((subcommand, _)) => {
            unreachable!("Unknown subcommand {subcommand}");
        }
        None => {
            unreachable!("Missing subcommand");
        }
    }
}

/// Restore the settings and create the settings file with the
/// defaults for editing if it does not exist yet.
fn restore_settings(config_dir: &Path) -> Settings {
    let settings = Settings::restore_from_dir(config_dir);
    if !settings::new_settings_file_path(config_dir.to_path_buf()).exists()
        && let Err(err) = settings.save(config_dir)
    {
        log::warn!("Failed to save settings: {err:#}");
    }
    settings
}

fn print_notifications(notification_rx: &mut mpsc::UnboundedReceiver<Notification>) {
    while let Ok(notification) = notification_rx.try_recv() {
        eprintln!("{}", render::notification(&notification));
    }
}

fn spawn_print_notifications(mut notification_rx: mpsc::UnboundedReceiver<Notification>) {
    tokio::spawn(async move {
        while let Some(notification) = notification_rx.recv().await {
            eprintln!("{}", render::notification(&notification));
        }
    });
}

async fn load_initially(
    initial_load: JoinHandle<()>,
    notification_rx: &mut mpsc::UnboundedReceiver<Notification>,
) -> anyhow::Result<()> {
    initial_load.await?;
    print_notifications(notification_rx);
    Ok(())
}

async fn list(
    loader: &Arc<CatalogLoader>,
    initial_load: JoinHandle<()>,
    mut notification_rx: mpsc::UnboundedReceiver<Notification>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    load_initially(initial_load, &mut notification_rx).await?;
    let state = loader.observable_state().read();
    if state.error().is_some() {
        return Ok(ExitCode::FAILURE);
    }
    if json {
        println!("{}", render::entries_json(state.entries())?);
    } else {
        for (index, entry) in state.entries().iter().enumerate() {
            println!("{}", render::entry_line(index, entry));
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn watch(
    loader: &Arc<CatalogLoader>,
    initial_load: JoinHandle<()>,
    notification_rx: mpsc::UnboundedReceiver<Notification>,
) -> anyhow::Result<ExitCode> {
    spawn_print_notifications(notification_rx);
    tokio::spawn(catalog::tasklet::on_state_changed(
        loader.observable_state().subscribe(),
        |state| {
            println!("{}", render::catalog_state(state));
            OnChanged::Continue
        },
    ));
    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    tokio::spawn(catalog::tasklet::on_refresh_requested(
        Arc::downgrade(loader),
        refresh_rx,
    ));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match WatchInput::parse(&line) {
            Some(WatchInput::Refresh) => {
                if refresh_tx.send(()).is_err() {
                    break;
                }
            }
            Some(WatchInput::Quit) => break,
            None => {
                eprintln!("Unknown command: {line}");
            }
        }
    }
    initial_load.abort();
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
async fn play(
    env: &Environment,
    loader: &Arc<CatalogLoader>,
    initial_load: JoinHandle<()>,
    mut notification_rx: mpsc::UnboundedReceiver<Notification>,
    index: usize,
) -> anyhow::Result<ExitCode> {
    use vidshelf_app::playback::{self, Session, mpv::MpvBackend};

    load_initially(initial_load, &mut notification_rx).await?;
    let Some(entry) = loader.observable_state().read().entries().get(index).cloned() else {
        eprintln!("No entry with index {index}");
        return Ok(ExitCode::FAILURE);
    };
    spawn_print_notifications(notification_rx);
    let mut session = Session::new(MpvBackend::new(env.player_program()));
    let render_state = tokio::spawn(playback::tasklet::on_state_changed(
        session.observable_state().subscribe(),
        |state| {
            println!("{}", render::playback_state(state));
            OnChanged::Continue
        },
    ));
    println!("{}", render::entry_line(index, &entry));
    session.open(&entry).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match PlayInput::parse(&line) {
            Some(PlayInput::TogglePlay) => session.toggle_play().await,
            Some(PlayInput::ToggleMute) => session.toggle_mute().await,
            Some(PlayInput::Seek(position)) => session.seek(position).await,
            Some(PlayInput::Quit) => break,
            None => {
                eprintln!("Unknown command: {line}");
                continue;
            }
        };
        if let Err(err) = result {
            eprintln!("{err:#}");
        }
    }
    session.close().await?;
    render_state.abort();
    Ok(ExitCode::SUCCESS)
}

#[cfg(not(unix))]
async fn play(
    _env: &Environment,
    _loader: &Arc<CatalogLoader>,
    _initial_load: JoinHandle<()>,
    _notification_rx: mpsc::UnboundedReceiver<Notification>,
    _index: usize,
) -> anyhow::Result<ExitCode> {
    anyhow::bail!("playback is not supported on this platform")
}

#[must_use]
fn app_config_dir() -> Option<PathBuf> {
    let app_dirs = ProjectDirs::from("", "", APP_NAME)?;
    let app_config_dir = app_dirs.config_local_dir();
    if let Err(err) = std::fs::create_dir_all(app_config_dir) {
        log::error!(
            "Failed to create config directory '{dir}': {err}",
            dir = app_config_dir.display(),
        );
        return None;
    }
    Some(app_config_dir.to_path_buf())
}
