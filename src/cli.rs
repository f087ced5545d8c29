use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::database::TournamentFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tournament pairing, brackets and Elo ratings")]
pub struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Create the database schema
    Init {
        /// Drop every table first
        #[arg(long)]
        reset: bool,
    },
    /// Manage players
    Player {
        #[command(subcommand)]
        action: PlayerAction,
    },
    /// Manage game systems
    System {
        #[command(subcommand)]
        action: SystemAction,
    },
    /// Run tournaments
    Tournament {
        #[command(subcommand)]
        action: TournamentAction,
    },
    /// Record results outside tournaments
    Result {
        #[command(subcommand)]
        action: ResultAction,
    },
    /// Apply, rebuild and list ratings
    Ratings {
        #[command(subcommand)]
        action: RatingsAction,
    },
    /// List pairing and tie-break strategy keys
    Strategies,
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PlayerAction {
    Add { name: String },
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SystemAction {
    Add { name: String },
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum FormatArg {
    Open,
    Swiss,
    Elimination,
}

impl From<FormatArg> for TournamentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Open => TournamentFormat::Open,
            FormatArg::Swiss => TournamentFormat::Swiss,
            FormatArg::Elimination => TournamentFormat::Elimination,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum TournamentAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        format: FormatArg,
        /// Game system id
        #[arg(long)]
        system: i64,
        /// Organizer's player id
        #[arg(long)]
        creator: i64,
        #[arg(long)]
        rounds: Option<i32>,
        #[arg(long)]
        pairing: Option<String>,
        #[arg(long)]
        tiebreak1: Option<String>,
        #[arg(long)]
        tiebreak2: Option<String>,
    },
    Configure {
        id: i64,
        #[arg(long)]
        rounds: Option<i32>,
        #[arg(long)]
        pairing: Option<String>,
        #[arg(long)]
        tiebreak1: Option<String>,
        #[arg(long)]
        tiebreak2: Option<String>,
    },
    List,
    Open { id: i64 },
    Register { id: i64, player: i64 },
    Unregister { id: i64, player: i64 },
    CheckIn { id: i64, player: i64 },
    /// Close registration; elimination tournaments get their bracket
    Lock { id: i64 },
    /// Pair the next Swiss/open round
    NextRound { id: i64 },
    /// Report a match score and apply ratings
    Report {
        #[arg(value_name = "MATCH")]
        match_id: i64,
        a_score: i32,
        b_score: i32,
        #[arg(long)]
        a_secondary: Option<i32>,
        #[arg(long)]
        b_secondary: Option<i32>,
    },
    Finalize { id: i64 },
    Standings { id: i64 },
    Bracket { id: i64 },
    Rounds { id: i64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ResultAction {
    Add {
        /// Game system id
        #[arg(long)]
        system: i64,
        player_a: i64,
        score_a: i32,
        player_b: i64,
        score_b: i32,
        #[arg(long)]
        faction_a: Option<String>,
        #[arg(long)]
        faction_b: Option<String>,
        /// Apply ratings right away
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum RatingsAction {
    Apply { result: i64 },
    ApplyPending,
    Rebuild,
    Leaderboard {
        #[arg(long)]
        system: i64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}
