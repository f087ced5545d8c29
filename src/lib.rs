pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod output;
pub mod rating;
pub mod services;
pub mod tournament;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use log::info;

use crate::cli::{Cli, PlayerAction, RatingsAction, ResultAction, SystemAction, TournamentAction};
use crate::config::settings::AppConfig;
use crate::database::{DbConn, Participant};
use crate::errors::{rating_context, tournament_context};
use crate::rating::ApplyOutcome;
use crate::services::ratings::RatingService;
use crate::services::tournaments::{NewTournament, ReportedScores, StrategyUpdate, TournamentService};
use crate::tournament::strategy::{PairingStrategy, TiebreakStrategy};

pub fn interpret() -> Cli {
    Cli::parse()
}

pub fn build_config(cli: &Cli) -> AppConfig {
    match &cli.database {
        Some(path) => AppConfig::new().with_database_path(path.clone()),
        None => AppConfig::new(),
    }
}

fn open_database(config: &AppConfig) -> Result<DbConn> {
    let pool = database::create_pool(&config.database)?;
    let conn = database::get_connection(&pool)?;
    database::setup::ensure_schema(&conn)?;
    Ok(conn)
}

pub fn handle_init(config: &AppConfig, reset: bool) -> Result<()> {
    let pool = database::create_pool(&config.database)?;
    let conn = database::get_connection(&pool)?;

    if reset {
        database::setup::reset_database(&conn)?;
    } else {
        database::setup::ensure_schema(&conn)?;
    }

    info!("Database ready at {}", config.database.path);
    Ok(())
}

pub fn handle_player(config: &AppConfig, json: bool, action: &PlayerAction) -> Result<()> {
    let conn = open_database(config)?;

    match action {
        PlayerAction::Add { name } => {
            let player = database::players::insert_player(&conn, name)?;
            info!("Added player {} '{}'", player.id, player.name);
            if json {
                output::print_json(&player)?;
            } else {
                println!("{}", player.id);
            }
        }
        PlayerAction::List => {
            let players = database::players::list_all(&conn).context("Failed to list players")?;
            if json {
                output::print_json(&players)?;
            } else {
                output::print_players(&players);
            }
        }
    }

    Ok(())
}

pub fn handle_system(config: &AppConfig, json: bool, action: &SystemAction) -> Result<()> {
    let conn = open_database(config)?;

    match action {
        SystemAction::Add { name } => {
            let system = database::players::upsert_game_system(&conn, name)?;
            if json {
                output::print_json(&system)?;
            } else {
                println!("{}", system.id);
            }
        }
        SystemAction::List => {
            let systems = database::players::list_systems(&conn).context("Failed to list game systems")?;
            if json {
                output::print_json(&systems)?;
            } else {
                output::print_systems(&systems);
            }
        }
    }

    Ok(())
}

pub fn handle_tournament(config: &AppConfig, json: bool, action: &TournamentAction) -> Result<()> {
    let mut conn = open_database(config)?;
    let service = TournamentService::new(config.clone());

    match action {
        TournamentAction::Create {
            name,
            format,
            system,
            creator,
            rounds,
            pairing,
            tiebreak1,
            tiebreak2,
        } => {
            let new = NewTournament {
                name: name.clone(),
                creator_id: *creator,
                game_system_id: *system,
                format: (*format).into(),
                rounds_count: *rounds,
                pairing_key: pairing.clone(),
                tiebreak1_key: tiebreak1.clone(),
                tiebreak2_key: tiebreak2.clone(),
            };
            let tournament = service
                .create_tournament(&mut conn, &new)
                .context("Failed to create tournament")?;
            if json {
                output::print_json(&tournament)?;
            } else {
                println!("{}", tournament.id);
            }
        }
        TournamentAction::Configure {
            id,
            rounds,
            pairing,
            tiebreak1,
            tiebreak2,
        } => {
            let update = StrategyUpdate {
                rounds_count: *rounds,
                pairing_key: pairing.clone(),
                tiebreak1_key: tiebreak1.clone(),
                tiebreak2_key: tiebreak2.clone(),
            };
            let tournament = service
                .configure(&mut conn, *id, &update)
                .with_context(|| tournament_context("configure", *id))?;
            if json {
                output::print_json(&tournament)?;
            }
        }
        TournamentAction::List => {
            let tournaments = database::tournaments::list_all(&conn).context("Failed to list tournaments")?;
            if json {
                output::print_json(&tournaments)?;
            } else {
                output::print_tournaments(&tournaments);
            }
        }
        TournamentAction::Open { id } => {
            service
                .open_registration(&mut conn, *id)
                .with_context(|| tournament_context("open", *id))?;
        }
        TournamentAction::Register { id, player } => {
            service
                .register(&mut conn, *id, *player)
                .with_context(|| tournament_context("register for", *id))?;
        }
        TournamentAction::Unregister { id, player } => {
            service
                .unregister(&mut conn, *id, *player)
                .with_context(|| tournament_context("unregister from", *id))?;
        }
        TournamentAction::CheckIn { id, player } => {
            service
                .check_in(&mut conn, *id, *player)
                .with_context(|| tournament_context("check in to", *id))?;
        }
        TournamentAction::Lock { id } => {
            let matches = service
                .lock(&mut conn, *id)
                .with_context(|| tournament_context("lock", *id))?;
            if json {
                output::print_json(&matches)?;
            } else if !matches.is_empty() {
                let view = service.bracket(&conn, *id)?;
                output::print_bracket(&view, &load_names(&conn)?);
            }
        }
        TournamentAction::NextRound { id } => {
            let outcome = service
                .next_round(&mut conn, *id)
                .with_context(|| tournament_context("pair next round of", *id))?;
            if json {
                output::print_json(&outcome.matches)?;
            } else if outcome.is_empty() {
                println!("Not enough eligible players to pair a round");
            } else {
                output::print_matches(&outcome.matches, &load_names(&conn)?);
            }
        }
        TournamentAction::Report {
            match_id,
            a_score,
            b_score,
            a_secondary,
            b_secondary,
        } => {
            let scores = ReportedScores {
                a_score: *a_score,
                b_score: *b_score,
                a_secondary: *a_secondary,
                b_secondary: *b_secondary,
            };
            let reported = service
                .report_result(&mut conn, *match_id, scores)
                .with_context(|| format!("Failed to report match {}", match_id))?;

            // Applied inline, standing in for a queued rating job.
            let ratings = RatingService::new(config.rating.clone());
            let applied = ratings
                .apply_result(&mut conn, reported.result_id)
                .with_context(|| rating_context("apply"))?;
            print_apply(json, reported.result_id, &applied)?;
        }
        TournamentAction::Finalize { id } => {
            service
                .finalize(&mut conn, *id)
                .with_context(|| tournament_context("finalize", *id))?;
        }
        TournamentAction::Standings { id } => {
            let rows = service
                .standings(&conn, *id)
                .with_context(|| tournament_context("compute standings of", *id))?;
            if json {
                output::print_json(&rows)?;
            } else {
                output::print_standings(&rows);
            }
        }
        TournamentAction::Bracket { id } => {
            let view = service
                .bracket(&conn, *id)
                .with_context(|| tournament_context("show bracket of", *id))?;
            if json {
                output::print_json(&view.levels)?;
            } else {
                output::print_bracket(&view, &load_names(&conn)?);
            }
        }
        TournamentAction::Rounds { id } => {
            let rounds = service
                .rounds(&conn, *id)
                .with_context(|| tournament_context("list rounds of", *id))?;
            if json {
                output::print_json(&rounds)?;
            } else {
                output::print_rounds(&rounds, &load_names(&conn)?);
            }
        }
    }

    Ok(())
}

pub fn handle_result(config: &AppConfig, json: bool, action: &ResultAction) -> Result<()> {
    let mut conn = open_database(config)?;
    let ratings = RatingService::new(config.rating.clone());

    match action {
        ResultAction::Add {
            system,
            player_a,
            score_a,
            player_b,
            score_b,
            faction_a,
            faction_b,
            apply,
        } => {
            let participants = [
                Participant::new(*player_a, *score_a).with_faction(faction_a.clone()),
                Participant::new(*player_b, *score_b).with_faction(faction_b.clone()),
            ];
            let result = ratings
                .record_result(&mut conn, *system, &participants, Utc::now().naive_utc(), None)
                .context("Failed to record result")?;

            if *apply {
                let applied = ratings
                    .apply_result(&mut conn, result.id)
                    .with_context(|| rating_context("apply"))?;
                print_apply(json, result.id, &applied)?;
            } else if json {
                output::print_json(&result)?;
            } else {
                println!("{}", result.id);
            }
        }
    }

    Ok(())
}

pub fn handle_ratings(config: &AppConfig, json: bool, action: &RatingsAction) -> Result<()> {
    let mut conn = open_database(config)?;
    let ratings = RatingService::new(config.rating.clone());

    match action {
        RatingsAction::Apply { result } => {
            let applied = ratings
                .apply_result(&mut conn, *result)
                .with_context(|| rating_context("apply"))?;
            print_apply(json, *result, &applied)?;
        }
        RatingsAction::ApplyPending => {
            let summary = ratings
                .apply_pending(&mut conn)
                .with_context(|| rating_context("apply pending"))?;
            println!("Applied {} results, skipped {}", summary.applied, summary.skipped);
        }
        RatingsAction::Rebuild => {
            let summary = ratings
                .rebuild_ratings(&mut conn)
                .with_context(|| rating_context("rebuild"))?;
            println!("Replayed {} results, skipped {}", summary.applied, summary.skipped);
        }
        RatingsAction::Leaderboard { system, limit } => {
            let rows = ratings
                .leaderboard(&conn, *system, *limit)
                .with_context(|| rating_context("list"))?;
            if json {
                output::print_json(&rows)?;
            } else {
                output::print_leaderboard(&rows);
            }
        }
    }

    Ok(())
}

pub fn handle_strategies(json: bool) -> Result<()> {
    if !json {
        output::print_strategies();
        return Ok(());
    }

    let pairing: Vec<_> = PairingStrategy::ALL
        .iter()
        .map(|s| serde_json::json!({ "key": s.as_str(), "label": s.label() }))
        .collect();
    let tiebreak: Vec<_> = TiebreakStrategy::ALL
        .iter()
        .map(|s| serde_json::json!({ "key": s.as_str(), "label": s.label() }))
        .collect();
    output::print_json(&serde_json::json!({ "pairing": pairing, "tiebreak": tiebreak }))
}

pub fn handle_completions(shell: clap_complete::Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

fn load_names(conn: &DbConn) -> Result<output::PlayerNames> {
    let players = database::players::list_all(conn).context("Failed to load players")?;
    Ok(output::player_names(&players))
}

fn print_apply(json: bool, result_id: i64, outcome: &ApplyOutcome) -> Result<()> {
    match outcome {
        ApplyOutcome::Applied([a, b]) => {
            if json {
                output::print_json(&serde_json::json!({
                    "result_id": result_id,
                    "ratings": [a.rating_after, b.rating_after],
                    "deltas": [a.delta, b.delta],
                }))?;
            } else {
                println!(
                    "Result {}: {} -> {} ({:+}), {} -> {} ({:+})",
                    result_id, a.rating_before, a.rating_after, a.delta, b.rating_before, b.rating_after, b.delta
                );
            }
        }
        ApplyOutcome::AlreadyApplied => println!("Result {} was already applied", result_id),
    }
    Ok(())
}
