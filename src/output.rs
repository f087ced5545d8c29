use std::collections::HashMap;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::database::{GameSystem, LeaderboardRow, Match, MatchOutcome, Player, PlayerId, Round, Tournament};
use crate::services::tournaments::BracketView;
use crate::tournament::standings::StandingRow;
use crate::tournament::strategy::{PairingStrategy, TiebreakStrategy};

pub type PlayerNames = HashMap<PlayerId, String>;

pub fn player_names(players: &[Player]) -> PlayerNames {
    players.iter().map(|p| (p.id, p.name.clone())).collect()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn header(text: &str) {
    println!("{}", text.bold().cyan());
}

fn name_of(names: &PlayerNames, player: Option<PlayerId>) -> String {
    match player {
        Some(id) => names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", id)),
        None => "-".dimmed().to_string(),
    }
}

pub fn print_players(players: &[Player]) {
    header(&format!("{:>5}  {}", "ID", "NAME"));
    for player in players {
        println!("{:>5}  {}", player.id, player.name);
    }
}

pub fn print_systems(systems: &[GameSystem]) {
    header(&format!("{:>5}  {}", "ID", "SYSTEM"));
    for system in systems {
        println!("{:>5}  {}", system.id, system.name);
    }
}

pub fn print_tournaments(tournaments: &[Tournament]) {
    header(&format!(
        "{:>5}  {:<24} {:<12} {:<13} {:>6}",
        "ID", "NAME", "FORMAT", "STATE", "ROUNDS"
    ));
    for t in tournaments {
        println!(
            "{:>5}  {:<24} {:<12} {:<13} {:>6}",
            t.id,
            t.name,
            t.format.as_str(),
            t.state.as_str(),
            t.rounds_count.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
}

pub fn print_standings(rows: &[StandingRow]) {
    header(&format!(
        "{:>4}  {:<24} {:>7} {:>9} {:>9}",
        "#", "PLAYER", "POINTS", "TB1", "TB2"
    ));
    for row in rows {
        println!(
            "{:>4}  {:<24} {:>7.1} {:>9.1} {:>9.1}",
            row.rank, row.name, row.points, row.tiebreak1, row.tiebreak2
        );
    }
}

pub fn print_leaderboard(rows: &[LeaderboardRow]) {
    header(&format!("{:>4}  {:<24} {:>7} {:>6}", "#", "PLAYER", "RATING", "GAMES"));
    for row in rows {
        println!(
            "{:>4}  {:<24} {:>7} {:>6}",
            row.rank, row.name, row.rating, row.games_played
        );
    }
}

fn outcome_label(outcome: MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Pending => outcome.as_str().yellow().to_string(),
        _ => outcome.as_str().green().to_string(),
    }
}

pub fn print_matches(matches: &[Match], names: &PlayerNames) {
    header(&format!("{:>6}  {:<24} {:<24} {}", "MATCH", "A", "B", "RESULT"));
    for m in matches {
        println!(
            "{:>6}  {:<24} {:<24} {}",
            m.id,
            name_of(names, m.a_player_id),
            name_of(names, m.b_player_id),
            outcome_label(m.result)
        );
    }
}

pub fn print_rounds(rounds: &[(Round, Vec<Match>)], names: &PlayerNames) {
    for (round, matches) in rounds {
        println!("{}", format!("Round {} ({})", round.number, round.state.as_str()).bold());
        print_matches(matches, names);
        println!();
    }
}

pub fn print_bracket(view: &BracketView, names: &PlayerNames) {
    let depth = view.levels.len();
    for (idx, level) in view.levels.iter().enumerate() {
        let title = match depth - idx {
            1 => "Final".to_string(),
            2 => "Semifinals".to_string(),
            remaining => format!("Round of {}", 1usize << remaining),
        };
        println!("{}", title.bold());
        print_matches(level, names);
        println!();
    }
}

pub fn print_strategies() {
    header("Pairing strategies");
    for strategy in PairingStrategy::ALL {
        println!("  {:<22} {}", strategy.as_str(), strategy.label());
    }
    header("Tie-break strategies");
    for strategy in TiebreakStrategy::ALL {
        println!("  {:<22} {}", strategy.as_str(), strategy.label());
    }
}
