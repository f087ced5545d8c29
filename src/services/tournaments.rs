use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

use crate::config::AppConfig;
use crate::database::{
    self, GameSystemId, Match, MatchId, MatchOutcome, Participant, PlayerId, ResultId,
    Round, Tournament, TournamentFormat, TournamentId, TournamentState,
};
use crate::errors::{EngineError, EngineResult};
use crate::services::ratings::validate_participants;
use crate::tournament::bracket::{self, Entrant};
use crate::tournament::pairing::{round_seed, PairingInput, PlayedPairs};
use crate::tournament::points::{bye_recipients, tally_points};
use crate::tournament::standings::{aggregate_scores, compute_standings, StandingRow};
use crate::tournament::strategy::{PairingStrategy, TiebreakStrategy};

#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    pub creator_id: PlayerId,
    pub game_system_id: GameSystemId,
    pub format: TournamentFormat,
    pub rounds_count: Option<i32>,
    pub pairing_key: Option<String>,
    pub tiebreak1_key: Option<String>,
    pub tiebreak2_key: Option<String>,
}

/// Settings to change on an existing tournament; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct StrategyUpdate {
    pub rounds_count: Option<i32>,
    pub pairing_key: Option<String>,
    pub tiebreak1_key: Option<String>,
    pub tiebreak2_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportedScores {
    pub a_score: i32,
    pub b_score: i32,
    pub a_secondary: Option<i32>,
    pub b_secondary: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub round: Option<Round>,
    pub matches: Vec<Match>,
}

impl RoundOutcome {
    fn empty() -> Self {
        Self {
            round: None,
            matches: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.round.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub result_id: ResultId,
    pub outcome: MatchOutcome,
    pub advanced_to: Option<MatchId>,
}

/// Matches of an elimination tournament grouped by level, leaves first.
#[derive(Debug, Clone, Default)]
pub struct BracketView {
    pub levels: Vec<Vec<Match>>,
}

pub struct TournamentService {
    config: AppConfig,
}

impl TournamentService {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn create_tournament(&self, conn: &mut Connection, new: &NewTournament) -> EngineResult<Tournament> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(EngineError::validation("tournament name must not be empty"));
        }
        validate_rounds_count(new.rounds_count)?;

        let defaults = &self.config.tournament;
        let pairing =
            PairingStrategy::from_key(new.pairing_key.as_deref().unwrap_or(defaults.default_pairing_key))?;
        let tiebreak1 = TiebreakStrategy::from_key(
            new.tiebreak1_key.as_deref().unwrap_or(defaults.default_tiebreak1_key),
        )?;
        let tiebreak2 = TiebreakStrategy::from_key(
            new.tiebreak2_key.as_deref().unwrap_or(defaults.default_tiebreak2_key),
        )?;

        let tx = conn.transaction()?;

        if database::players::find_by_id(&tx, new.creator_id)?.is_none() {
            return Err(EngineError::not_found("player", new.creator_id));
        }
        if database::players::find_system_by_id(&tx, new.game_system_id)?.is_none() {
            return Err(EngineError::not_found("game system", new.game_system_id));
        }

        let tournament = database::tournaments::insert_tournament(
            &tx,
            name,
            new.creator_id,
            new.game_system_id,
            new.format,
            new.rounds_count,
            pairing,
            tiebreak1,
            tiebreak2,
        )?;
        tx.commit()?;

        info!(
            "Created {} tournament {} '{}'",
            tournament.format.as_str(),
            tournament.id,
            tournament.name
        );
        Ok(tournament)
    }

    /// Changes strategies or round count. Keys are checked here so pairing and
    /// standings never meet an unknown key.
    pub fn configure(
        &self,
        conn: &mut Connection,
        tournament_id: TournamentId,
        update: &StrategyUpdate,
    ) -> EngineResult<Tournament> {
        let tx = conn.transaction()?;
        let mut tournament = load(&tx, tournament_id)?;

        if tournament.state == TournamentState::Completed {
            return Err(EngineError::rule("a completed tournament cannot be reconfigured"));
        }

        if let Some(key) = update.pairing_key.as_deref() {
            tournament.pairing = PairingStrategy::from_key(key)?;
        }
        if let Some(key) = update.tiebreak1_key.as_deref() {
            tournament.tiebreak1 = TiebreakStrategy::from_key(key)?;
        }
        if let Some(key) = update.tiebreak2_key.as_deref() {
            tournament.tiebreak2 = TiebreakStrategy::from_key(key)?;
        }
        if update.rounds_count.is_some() {
            validate_rounds_count(update.rounds_count)?;
            tournament.rounds_count = update.rounds_count;
        }

        database::tournaments::update_settings(&tx, &tournament)?;
        tx.commit()?;

        info!(
            "Configured tournament {}: pairing={}, tiebreaks={}/{}",
            tournament.id,
            tournament.pairing.as_str(),
            tournament.tiebreak1.as_str(),
            tournament.tiebreak2.as_str()
        );
        Ok(tournament)
    }

    pub fn open_registration(&self, conn: &mut Connection, tournament_id: TournamentId) -> EngineResult<Tournament> {
        let tx = conn.transaction()?;
        let mut tournament = load(&tx, tournament_id)?;

        if tournament.state != TournamentState::Draft {
            return Err(EngineError::rule(format!(
                "registration opens only from draft, tournament is {}",
                tournament.state.as_str()
            )));
        }

        database::tournaments::update_state(&tx, tournament.id, TournamentState::Registration)?;
        tx.commit()?;
        tournament.state = TournamentState::Registration;

        info!("Opened registration for tournament {}", tournament.id);
        Ok(tournament)
    }

    pub fn register(
        &self,
        conn: &mut Connection,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<database::Registration> {
        let tx = conn.transaction()?;
        let tournament = load(&tx, tournament_id)?;
        ensure_registration_open(&tournament)?;

        if database::players::find_by_id(&tx, player_id)?.is_none() {
            return Err(EngineError::not_found("player", player_id));
        }

        let registration = database::registrations::upsert_registration(&tx, tournament.id, player_id)?;
        tx.commit()?;

        info!("Registered player {} for tournament {}", player_id, tournament.id);
        Ok(registration)
    }

    pub fn unregister(
        &self,
        conn: &mut Connection,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let tx = conn.transaction()?;
        let tournament = load(&tx, tournament_id)?;
        ensure_registration_open(&tournament)?;

        if !database::registrations::delete(&tx, tournament.id, player_id)? {
            return Err(EngineError::not_found("registration", player_id));
        }
        tx.commit()?;

        info!("Unregistered player {} from tournament {}", player_id, tournament.id);
        Ok(())
    }

    pub fn check_in(
        &self,
        conn: &mut Connection,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let tx = conn.transaction()?;
        let tournament = load(&tx, tournament_id)?;
        ensure_registration_open(&tournament)?;

        let registration = database::registrations::find(&tx, tournament.id, player_id)?
            .ok_or_else(|| EngineError::not_found("registration", player_id))?;
        database::registrations::update_status(
            &tx,
            registration.id,
            database::RegistrationStatus::CheckedIn,
        )?;
        tx.commit()?;

        info!("Checked in player {} for tournament {}", player_id, tournament.id);
        Ok(())
    }

    /// Closes registration and starts the tournament. Elimination brackets
    /// are built in the same transaction; the returned matches are the bracket.
    pub fn lock(&self, conn: &mut Connection, tournament_id: TournamentId) -> EngineResult<Vec<Match>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tournament = load(&tx, tournament_id)?;

        if !tournament.state.accepts_registrations() {
            return Err(EngineError::rule(format!(
                "tournament {} is already {}",
                tournament.id,
                tournament.state.as_str()
            )));
        }

        database::tournaments::update_state(&tx, tournament.id, TournamentState::Running)?;

        let matches = if tournament.format == TournamentFormat::Elimination {
            self.build_bracket(&tx, &tournament)?
        } else {
            Vec::new()
        };
        tx.commit()?;

        info!(
            "Locked tournament {} ({} bracket matches)",
            tournament.id,
            matches.len()
        );
        Ok(matches)
    }

    fn build_bracket(&self, conn: &Connection, tournament: &Tournament) -> EngineResult<Vec<Match>> {
        let mut entrants = Vec::new();
        for registration in database::registrations::eligible(conn, tournament.id)? {
            entrants.push(Entrant {
                player_id: registration.player_id,
                rating: database::ratings::rating_of(
                    conn,
                    registration.player_id,
                    tournament.game_system_id,
                )?,
                registration_order: registration.id,
            });
        }

        let bracket = bracket::build_bracket(&entrants, self.config.rating.start_rating);
        debug!(
            "Bracket for tournament {}: {} slots, {} byes",
            tournament.id,
            bracket.size,
            bracket.bye_count()
        );

        let mut ids: Vec<MatchId> = Vec::with_capacity(bracket.nodes.len());
        for node in &bracket.nodes {
            let stored = database::matches::insert_match(
                conn,
                tournament.id,
                None,
                node.a_player,
                node.b_player,
                node.initial_outcome(),
            )?;
            ids.push(stored.id);
        }

        for (idx, node) in bracket.nodes.iter().enumerate() {
            if let (Some(parent), Some(slot)) = (node.parent, node.child_slot) {
                database::matches::set_parent(conn, ids[idx], ids[parent], slot)?;
            }
        }

        Ok(database::matches::list_by_tournament(conn, tournament.id)?)
    }

    /// Pairs the next Swiss/open round. Returns an empty outcome, creating no
    /// round, when fewer than two players are eligible.
    pub fn next_round(&self, conn: &mut Connection, tournament_id: TournamentId) -> EngineResult<RoundOutcome> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tournament = load(&tx, tournament_id)?;

        if tournament.state != TournamentState::Running {
            return Err(EngineError::rule("rounds can only be paired while the tournament is running"));
        }
        if !tournament.format.is_round_based() {
            return Err(EngineError::rule("elimination tournaments advance through the bracket"));
        }

        let previous = database::rounds::latest(&tx, tournament.id)?;
        let previous_number = previous.as_ref().map(|r| r.number).unwrap_or(0);

        if let Some(round) = &previous {
            let pending = database::matches::count_pending_in_round(&tx, round.id)?;
            if pending > 0 {
                return Err(EngineError::rule(format!(
                    "round {} still has {} pending matches",
                    round.number, pending
                )));
            }
        }
        if let Some(limit) = tournament.rounds_count {
            if previous_number >= limit {
                return Err(EngineError::rule(format!(
                    "all {} configured rounds have been played",
                    limit
                )));
            }
        }

        let history = database::matches::list_by_tournament(&tx, tournament.id)?;
        let input = PairingInput {
            players: database::registrations::eligible(&tx, tournament.id)?
                .into_iter()
                .map(|r| r.player_id)
                .collect(),
            points: tally_points(&history),
            previous_byes: bye_recipients(&history),
            history: PlayedPairs::from_matches(&history),
        };

        let pairing = tournament
            .pairing
            .pair(&input, round_seed(tournament.id, previous_number));
        if pairing.is_empty() {
            info!("No pairings for tournament {}: fewer than two eligible players", tournament.id);
            return Ok(RoundOutcome::empty());
        }

        if let Some(round) = &previous {
            database::rounds::close(&tx, round.id)?;
        }
        let round = database::rounds::insert_round(&tx, tournament.id, previous_number + 1)?;

        let mut matches = Vec::with_capacity(pairing.pairs.len() + 1);
        for (a, b) in &pairing.pairs {
            matches.push(database::matches::insert_match(
                &tx,
                tournament.id,
                Some(round.id),
                Some(*a),
                Some(*b),
                MatchOutcome::Pending,
            )?);
        }
        if let Some(bye) = pairing.bye {
            matches.push(database::matches::insert_match(
                &tx,
                tournament.id,
                Some(round.id),
                Some(bye),
                None,
                MatchOutcome::AWin,
            )?);
        }
        tx.commit()?;

        info!(
            "Paired round {} of tournament {}: {} matches{}",
            round.number,
            tournament.id,
            pairing.pairs.len(),
            pairing
                .bye
                .map(|p| format!(", bye for player {}", p))
                .unwrap_or_default()
        );
        Ok(RoundOutcome {
            round: Some(round),
            matches,
        })
    }

    /// Records a match result and links it to the match. Elimination winners
    /// move into the parent match. The returned result id is ready for rating
    /// application.
    pub fn report_result(
        &self,
        conn: &mut Connection,
        match_id: MatchId,
        scores: ReportedScores,
    ) -> EngineResult<ReportOutcome> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let m = database::matches::find_by_id(&tx, match_id)?
            .ok_or_else(|| EngineError::not_found("match", match_id))?;
        let tournament = load(&tx, m.tournament_id)?;

        if tournament.state != TournamentState::Running {
            return Err(EngineError::rule("results can only be reported while the tournament is running"));
        }
        if m.result != MatchOutcome::Pending {
            return Err(EngineError::rule(format!("match {} is already decided", m.id)));
        }
        let (Some(a), Some(b)) = (m.a_player_id, m.b_player_id) else {
            return Err(EngineError::rule(format!("match {} is still waiting for a player", m.id)));
        };

        let outcome = MatchOutcome::from_scores(scores.a_score, scores.b_score);
        if outcome == MatchOutcome::Draw && tournament.format == TournamentFormat::Elimination {
            return Err(EngineError::rule("elimination matches cannot end in a draw"));
        }

        let participants = [
            Participant::new(a, scores.a_score).with_secondary(scores.a_secondary),
            Participant::new(b, scores.b_score).with_secondary(scores.b_secondary),
        ];
        validate_participants(&participants)?;

        let now = Utc::now().naive_utc();
        let result = database::results::insert_result(
            &tx,
            tournament.game_system_id,
            Some(tournament.id),
            now,
            &participants,
        )?;
        database::matches::record_outcome(&tx, m.id, outcome, result.id, now)?;

        let mut advanced_to = None;
        if tournament.format == TournamentFormat::Elimination {
            let winner = if outcome == MatchOutcome::AWin { a } else { b };
            if let (Some(parent), Some(slot)) = (m.parent_match_id, m.child_slot) {
                database::matches::fill_slot(&tx, parent, slot, winner)?;
                advanced_to = Some(parent);
                debug!(
                    "Player {} advances to match {} slot {}",
                    winner,
                    parent,
                    slot.as_str()
                );
            }
        }
        tx.commit()?;

        info!(
            "Reported match {} ({}) as result {}",
            m.id,
            outcome.as_str(),
            result.id
        );
        Ok(ReportOutcome {
            result_id: result.id,
            outcome,
            advanced_to,
        })
    }

    pub fn finalize(&self, conn: &mut Connection, tournament_id: TournamentId) -> EngineResult<Tournament> {
        let tx = conn.transaction()?;
        let mut tournament = load(&tx, tournament_id)?;

        if tournament.state != TournamentState::Running {
            return Err(EngineError::rule(format!(
                "only a running tournament can be finalized, tournament is {}",
                tournament.state.as_str()
            )));
        }

        database::tournaments::update_state(&tx, tournament.id, TournamentState::Completed)?;
        tx.commit()?;
        tournament.state = TournamentState::Completed;

        info!("Finalized tournament {}", tournament.id);
        Ok(tournament)
    }

    pub fn standings(&self, conn: &Connection, tournament_id: TournamentId) -> EngineResult<Vec<StandingRow>> {
        let tournament = load(conn, tournament_id)?;

        let mut players = Vec::new();
        for registration in database::registrations::list_by_tournament(conn, tournament.id)? {
            let player = database::players::find_by_id(conn, registration.player_id)?
                .ok_or_else(|| EngineError::not_found("player", registration.player_id))?;
            players.push(player);
        }

        let matches = database::matches::list_by_tournament(conn, tournament.id)?;
        let result_ids: Vec<ResultId> = matches.iter().filter_map(|m| m.result_id).collect();
        let participants = database::results::participants_by_result(conn, &result_ids)?;
        let aggregates = aggregate_scores(&matches, &participants);

        Ok(compute_standings(
            &players,
            &matches,
            &aggregates,
            tournament.tiebreak1,
            tournament.tiebreak2,
        ))
    }

    pub fn bracket(&self, conn: &Connection, tournament_id: TournamentId) -> EngineResult<BracketView> {
        let tournament = load(conn, tournament_id)?;
        if tournament.format != TournamentFormat::Elimination {
            return Err(EngineError::rule(format!(
                "tournament {} is {}, not elimination",
                tournament.id,
                tournament.format.as_str()
            )));
        }

        let matches = database::matches::list_by_tournament(conn, tournament.id)?;
        Ok(group_levels(matches))
    }

    /// Every round with its matches, in round order.
    pub fn rounds(&self, conn: &Connection, tournament_id: TournamentId) -> EngineResult<Vec<(Round, Vec<Match>)>> {
        let tournament = load(conn, tournament_id)?;

        let mut rounds = Vec::new();
        for round in database::rounds::list_by_tournament(conn, tournament.id)? {
            let matches = database::matches::list_by_round(conn, round.id)?;
            rounds.push((round, matches));
        }
        Ok(rounds)
    }
}

fn load(conn: &Connection, tournament_id: TournamentId) -> EngineResult<Tournament> {
    database::tournaments::find_by_id(conn, tournament_id)?
        .ok_or_else(|| EngineError::not_found("tournament", tournament_id))
}

fn ensure_registration_open(tournament: &Tournament) -> EngineResult<()> {
    if tournament.state.accepts_registrations() {
        Ok(())
    } else {
        Err(EngineError::rule(format!(
            "registration for tournament {} is closed",
            tournament.id
        )))
    }
}

fn validate_rounds_count(rounds_count: Option<i32>) -> EngineResult<()> {
    match rounds_count {
        Some(n) if n <= 0 => Err(EngineError::validation(format!(
            "rounds count must be positive, got {}",
            n
        ))),
        _ => Ok(()),
    }
}

/// Leaves are matches nothing points to; each next level is their parents.
fn group_levels(matches: Vec<Match>) -> BracketView {
    let parents: HashSet<MatchId> = matches.iter().filter_map(|m| m.parent_match_id).collect();
    let mut levels: Vec<Vec<Match>> = Vec::new();

    let mut current: Vec<Match> = matches
        .iter()
        .filter(|m| !parents.contains(&m.id))
        .cloned()
        .collect();

    while !current.is_empty() {
        let next_ids: Vec<MatchId> = current.iter().filter_map(|m| m.parent_match_id).collect();
        levels.push(current);

        let mut seen = HashSet::new();
        current = next_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| matches.iter().find(|m| m.id == id).cloned())
            .collect();
    }

    BracketView { levels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, get_connection, setup, DbConn, DbPool};
    use crate::services::ratings::RatingService;

    struct Fixture {
        _pool: DbPool,
        conn: DbConn,
        system: GameSystemId,
        players: Vec<PlayerId>,
        service: TournamentService,
    }

    fn fixture(player_count: usize) -> Fixture {
        let pool = create_memory_pool().unwrap();
        let conn = get_connection(&pool).unwrap();
        setup::reset_database(&conn).unwrap();

        let system = database::players::upsert_game_system(&conn, "Warmachine").unwrap().id;
        let players = (0..player_count)
            .map(|idx| {
                database::players::insert_player(&conn, &format!("Player {}", idx + 1))
                    .unwrap()
                    .id
            })
            .collect();

        Fixture {
            _pool: pool,
            conn,
            system,
            players,
            service: TournamentService::new(AppConfig::new()),
        }
    }

    impl Fixture {
        fn create(&mut self, format: TournamentFormat, rounds_count: Option<i32>) -> Tournament {
            let new = NewTournament {
                name: "Spring Open".to_string(),
                creator_id: self.players[0],
                game_system_id: self.system,
                format,
                rounds_count,
                pairing_key: None,
                tiebreak1_key: None,
                tiebreak2_key: None,
            };
            self.service.create_tournament(&mut self.conn, &new).unwrap()
        }

        fn register_all(&mut self, tournament: TournamentId) {
            for player in self.players.clone() {
                self.service.register(&mut self.conn, tournament, player).unwrap();
            }
        }

        fn set_rating(&self, player: PlayerId, rating: i32) {
            self.conn
                .execute(
                    "INSERT INTO ratings (player_id, game_system_id, rating, games_played) VALUES (?1, ?2, ?3, 0)",
                    rusqlite::params![player, self.system, rating],
                )
                .unwrap();
        }

        fn report(&mut self, match_id: MatchId, a: i32, b: i32) -> EngineResult<ReportOutcome> {
            let scores = ReportedScores {
                a_score: a,
                b_score: b,
                ..ReportedScores::default()
            };
            self.service.report_result(&mut self.conn, match_id, scores)
        }

        fn report_all_pending(&mut self, matches: &[Match]) {
            for m in matches.iter().filter(|m| m.result == MatchOutcome::Pending) {
                self.report(m.id, 10, 5).unwrap();
            }
        }
    }

    #[test]
    fn test_create_validates_input() {
        let mut fx = fixture(2);

        let mut new = NewTournament {
            name: "  ".to_string(),
            creator_id: fx.players[0],
            game_system_id: fx.system,
            format: TournamentFormat::Swiss,
            rounds_count: None,
            pairing_key: None,
            tiebreak1_key: None,
            tiebreak2_key: None,
        };
        let err = fx.service.create_tournament(&mut fx.conn, &new).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        new.name = "League".to_string();
        new.rounds_count = Some(0);
        let err = fx.service.create_tournament(&mut fx.conn, &new).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        new.rounds_count = Some(3);
        new.tiebreak1_key = Some("buchholz".to_string());
        let err = fx.service.create_tournament(&mut fx.conn, &new).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        new.tiebreak1_key = None;
        let created = fx.service.create_tournament(&mut fx.conn, &new).unwrap();
        assert_eq!(created.state, TournamentState::Draft);
        assert_eq!(created.pairing, PairingStrategy::PointsGroups);
        assert_eq!(created.tiebreak1, TiebreakStrategy::ScoreSum);
        assert_eq!(created.tiebreak2, TiebreakStrategy::Disabled);
    }

    #[test]
    fn test_configure_rejects_unknown_keys() {
        let mut fx = fixture(2);
        let tournament = fx.create(TournamentFormat::Swiss, None);

        let update = StrategyUpdate {
            pairing_key: Some("dutch".to_string()),
            ..StrategyUpdate::default()
        };
        let err = fx.service.configure(&mut fx.conn, tournament.id, &update).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let update = StrategyUpdate {
            tiebreak2_key: Some("secondary_score_sum".to_string()),
            rounds_count: Some(4),
            ..StrategyUpdate::default()
        };
        let configured = fx.service.configure(&mut fx.conn, tournament.id, &update).unwrap();
        assert_eq!(configured.tiebreak2, TiebreakStrategy::SecondaryScoreSum);
        assert_eq!(configured.rounds_count, Some(4));

        let stored = load(&fx.conn, tournament.id).unwrap();
        assert_eq!(stored.tiebreak2, TiebreakStrategy::SecondaryScoreSum);
    }

    #[test]
    fn test_registration_rules() {
        let mut fx = fixture(3);
        let tournament = fx.create(TournamentFormat::Swiss, None);
        let (p1, p2, p3) = (fx.players[0], fx.players[1], fx.players[2]);

        fx.service.open_registration(&mut fx.conn, tournament.id).unwrap();
        let first = fx.service.register(&mut fx.conn, tournament.id, p1).unwrap();
        let again = fx.service.register(&mut fx.conn, tournament.id, p1).unwrap();
        assert_eq!(first.id, again.id);

        let err = fx.service.check_in(&mut fx.conn, tournament.id, p2).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "registration", .. }));

        fx.service.register(&mut fx.conn, tournament.id, p2).unwrap();
        fx.service.unregister(&mut fx.conn, tournament.id, p2).unwrap();
        let err = fx.service.unregister(&mut fx.conn, tournament.id, p2).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        fx.service.lock(&mut fx.conn, tournament.id).unwrap();
        let err = fx.service.register(&mut fx.conn, tournament.id, p3).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));

        let err = fx.service.open_registration(&mut fx.conn, tournament.id).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));
    }

    #[test]
    fn test_elimination_lock_builds_seeded_bracket() {
        let mut fx = fixture(5);
        for (player, rating) in fx.players.clone().into_iter().zip([1600, 1550, 1500, 1450, 1400]) {
            fx.set_rating(player, rating);
        }
        let tournament = fx.create(TournamentFormat::Elimination, None);
        fx.register_all(tournament.id);

        let matches = fx.service.lock(&mut fx.conn, tournament.id).unwrap();
        assert_eq!(matches.len(), 7);

        let view = fx.service.bracket(&fx.conn, tournament.id).unwrap();
        assert_eq!(view.levels.len(), 3);
        assert_eq!(view.levels[0].len(), 4);

        let byes: Vec<&Match> = view.levels[0].iter().filter(|m| m.bye_player().is_some()).collect();
        assert_eq!(byes.len(), 3);

        let top = fx.players[0];
        let top_leaf = view.levels[0].iter().find(|m| m.involves(top)).unwrap();
        assert_eq!(top_leaf.bye_player(), Some(top));
        assert_eq!(top_leaf.result, MatchOutcome::AWin);

        let parent = database::matches::find_by_id(&fx.conn, top_leaf.parent_match_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(parent.a_player_id, Some(top));
        assert_eq!(parent.result, MatchOutcome::Pending);

        let stored = load(&fx.conn, tournament.id).unwrap();
        assert_eq!(stored.state, TournamentState::Running);

        let err = fx.service.next_round(&mut fx.conn, tournament.id).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));
    }

    #[test]
    fn test_elimination_report_advances_winner_and_rejects_draws() {
        let mut fx = fixture(5);
        for (player, rating) in fx.players.clone().into_iter().zip([1600, 1550, 1500, 1450, 1400]) {
            fx.set_rating(player, rating);
        }
        let tournament = fx.create(TournamentFormat::Elimination, None);
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let view = fx.service.bracket(&fx.conn, tournament.id).unwrap();
        let contested = view.levels[0]
            .iter()
            .find(|m| m.has_both_players())
            .cloned()
            .unwrap();

        let err = fx.report(contested.id, 7, 7).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));
        let unchanged = database::matches::find_by_id(&fx.conn, contested.id).unwrap().unwrap();
        assert_eq!(unchanged.result, MatchOutcome::Pending);
        let results: i64 = fx
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))
            .unwrap();
        assert_eq!(results, 0);

        let outcome = fx.report(contested.id, 3, 9).unwrap();
        assert_eq!(outcome.outcome, MatchOutcome::BWin);
        assert_eq!(outcome.advanced_to, contested.parent_match_id);

        let parent = database::matches::find_by_id(&fx.conn, contested.parent_match_id.unwrap())
            .unwrap()
            .unwrap();
        let winner = contested.b_player_id.unwrap();
        assert!(parent.involves(winner));
        assert!(parent.has_both_players());

        let err = fx.report(contested.id, 9, 3).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));

        let ratings = RatingService::new(AppConfig::new().rating);
        assert!(ratings.apply_result(&mut fx.conn, outcome.result_id).unwrap().was_applied());
    }

    #[test]
    fn test_swiss_rounds_flow() {
        let mut fx = fixture(4);
        let tournament = fx.create(TournamentFormat::Swiss, Some(2));
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let first = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        assert_eq!(first.round.as_ref().unwrap().number, 1);
        assert_eq!(first.matches.len(), 2);

        let err = fx.service.next_round(&mut fx.conn, tournament.id).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));

        let opening = &first.matches[0];
        let (a, b) = (opening.a_player_id.unwrap(), opening.b_player_id.unwrap());
        assert!(database::matches::existing_pairing(&fx.conn, tournament.id, b, a).unwrap());

        fx.report_all_pending(&first.matches);
        let second = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        assert_eq!(second.round.as_ref().unwrap().number, 2);

        for m in &second.matches {
            let (a, b) = (m.a_player_id.unwrap(), m.b_player_id.unwrap());
            assert!(!first.matches.iter().any(|p| p.involves(a) && p.involves(b)));
        }

        let rounds = fx.service.rounds(&fx.conn, tournament.id).unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].0.state, database::RoundState::Closed);

        fx.report_all_pending(&second.matches);
        let err = fx.service.next_round(&mut fx.conn, tournament.id).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));

        let standings = fx.service.standings(&fx.conn, tournament.id).unwrap();
        assert_eq!(standings.len(), 4);
        assert_eq!(standings[0].points, 2.0);
        assert_eq!(standings[3].points, 0.0);

        fx.service.finalize(&mut fx.conn, tournament.id).unwrap();
        let err = fx.service.finalize(&mut fx.conn, tournament.id).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));
    }

    #[test]
    fn test_swiss_odd_count_rotates_byes() {
        let mut fx = fixture(3);
        let tournament = fx.create(TournamentFormat::Swiss, None);
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let first = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        let first_bye = first.matches.iter().find_map(|m| m.bye_player()).unwrap();
        let bye_match = first.matches.iter().find(|m| m.bye_player().is_some()).unwrap();
        assert_eq!(bye_match.result, MatchOutcome::AWin);
        assert_eq!(bye_match.b_player_id, None);

        fx.report_all_pending(&first.matches);
        let second = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        let second_bye = second.matches.iter().find_map(|m| m.bye_player()).unwrap();
        assert_ne!(first_bye, second_bye);

        let standings = fx.service.standings(&fx.conn, tournament.id).unwrap();
        let bye_row = standings.iter().find(|r| r.player_id == first_bye).unwrap();
        assert!(bye_row.points >= 1.0);
    }

    #[test]
    fn test_checked_in_players_are_the_only_ones_paired() {
        let mut fx = fixture(4);
        let tournament = fx.create(TournamentFormat::Open, None);
        fx.register_all(tournament.id);
        fx.service.check_in(&mut fx.conn, tournament.id, fx.players[1]).unwrap();
        fx.service.check_in(&mut fx.conn, tournament.id, fx.players[3]).unwrap();
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let round = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        assert_eq!(round.matches.len(), 1);
        assert!(round.matches[0].involves(fx.players[1]));
        assert!(round.matches[0].involves(fx.players[3]));
    }

    #[test]
    fn test_single_player_gets_no_round() {
        let mut fx = fixture(1);
        let tournament = fx.create(TournamentFormat::Swiss, None);
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let outcome = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        assert!(outcome.is_empty());
        assert!(fx.service.rounds(&fx.conn, tournament.id).unwrap().is_empty());
    }

    #[test]
    fn test_standings_use_configured_tiebreak() {
        let mut fx = fixture(4);
        let tournament = fx.create(TournamentFormat::Swiss, Some(1));
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();

        let round = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        fx.report(round.matches[0].id, 30, 10).unwrap();
        fx.report(round.matches[1].id, 12, 11).unwrap();

        let standings = fx.service.standings(&fx.conn, tournament.id).unwrap();
        let big_winner = round.matches[0].a_player_id.unwrap();
        assert_eq!(standings[0].player_id, big_winner);
        assert_eq!(standings[0].tiebreak1, 30.0);
        assert_eq!(standings[1].points, 1.0);
    }

    #[test]
    fn test_report_requires_running_tournament() {
        let mut fx = fixture(2);
        let tournament = fx.create(TournamentFormat::Swiss, None);
        fx.register_all(tournament.id);
        fx.service.lock(&mut fx.conn, tournament.id).unwrap();
        let round = fx.service.next_round(&mut fx.conn, tournament.id).unwrap();
        fx.service.finalize(&mut fx.conn, tournament.id).unwrap();

        let err = fx.report(round.matches[0].id, 1, 0).unwrap_err();
        assert!(matches!(err, EngineError::RuleViolation(_)));

        let err = fx.report(9999, 1, 0).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "match", .. }));
    }
}
