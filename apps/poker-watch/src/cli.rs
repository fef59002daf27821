use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poker-watch")]
#[command(about = "Follow a planning-poker room or the lobby from the terminal")]
pub struct Cli {
    /// Base URL of the poker service
    #[arg(long, default_value = "http://127.0.0.1:9991")]
    pub server: String,

    /// Set our display name before following anything
    #[arg(long)]
    pub name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the lobby's room directory
    Lobby,
    /// Join a room and follow its state
    Room {
        /// Room code, e.g. ABCD
        code: String,
        /// Cast this vote right after joining
        #[arg(long)]
        vote: Option<f64>,
    },
}
