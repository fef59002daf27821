mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use url::Url;

use poker_client::{ApiClient, LobbySession, ReconnectConfig, RoomSession, RoomState};
use poker_wire::{label_for_value, Vote};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = Url::parse(&cli.server)?;
    // One cookie jar for everything: the stream and the commands must look
    // like the same user to the service.
    let http = reqwest::Client::builder().cookie_store(true).build()?;
    let api = ApiClient::new(http.clone(), base.clone());

    if let Some(name) = &cli.name {
        api.set_name(name).await?;
    }

    match cli.command {
        Commands::Lobby => run_lobby(http, base).await,
        Commands::Room { code, vote } => run_room(http, base, api, code, vote).await,
    }
}

async fn run_lobby(http: reqwest::Client, base: Url) -> Result<()> {
    let session = LobbySession::connect(http, base, ReconnectConfig::default())?;
    println!("following the lobby (ctrl-c to quit)");

    let mut state_rx = session.state();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let lobby = state_rx.borrow().clone();
                println!();
                if lobby.is_empty() {
                    println!("no occupied rooms");
                } else {
                    for (id, users) in lobby.rooms() {
                        println!("  room {id}: {}", users.join(", "));
                    }
                }
                println!("  new room suggestion: {}", session.suggest_room_id());
            }
        }
    }

    session.close().await;
    Ok(())
}

async fn run_room(
    http: reqwest::Client,
    base: Url,
    api: ApiClient,
    code: String,
    vote: Option<f64>,
) -> Result<()> {
    let session = RoomSession::join(http, base, &code, ReconnectConfig::default())?;
    println!("following room {code} (ctrl-c to leave)");

    if let Some(value) = vote {
        if !Vote::is_valid_value(value) {
            anyhow::bail!("{value} is not a playable card");
        }
        session.cast_vote(value).await?;
    }

    match api.fetch_name().await {
        Ok(name) => println!("you are {name}"),
        Err(err) => debug!(error = %err, "could not fetch own name"),
    }

    let mut state_rx = session.state();
    let vote_rx = session.my_vote();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow().clone();
                let mine = vote_rx.borrow().current();
                render_room(&state, mine);
            }
        }
    }

    session.close().await;
    Ok(())
}

fn render_room(state: &RoomState, mine: Option<Vote>) {
    println!();
    if state.revealed() {
        println!("revealed ({} in the room)", state.len());
        let extremes = state.extremes();
        for (_, participant) in state.roster() {
            let value = participant.current_vote.map(|vote| vote.value);
            let marker = match (extremes, value) {
                (Some((min, max)), Some(v)) if min != max && v == min => "  (low)",
                (Some((min, max)), Some(v)) if min != max && v == max => "  (high)",
                _ => "",
            };
            println!("  {:<20} {}{marker}", participant.name, label_for_value(value));
        }
        if state.unanimous() {
            println!("  unanimous!");
        }
    } else {
        println!("voting ({} in the room)", state.len());
        for (_, participant) in state.roster() {
            let status = if participant.current_vote.is_some() {
                "played"
            } else {
                "waiting"
            };
            println!("  {:<20} {status}", participant.name);
        }
        if let Some(vote) = mine {
            println!("  my pending vote: {}", vote.label());
        }
        if state.all_voted() {
            println!("  everyone has voted; ready to reveal");
        }
    }
}
