use chrono::NaiveDateTime;
use serde::Serialize;

use crate::tournament::strategy::{PairingStrategy, TiebreakStrategy};

pub type PlayerId = i64;
pub type GameSystemId = i64;
pub type TournamentId = i64;
pub type ResultId = i64;
pub type MatchId = i64;
pub type RoundId = i64;

/// Implements text-column conversions for a fieldless enum with `as_str`/`parse`.
macro_rules! text_column {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                <$ty>::parse(text)
                    .ok_or_else(|| rusqlite::types::FromSqlError::Other(text.to_string().into()))
            }
        }
    };
}

pub(crate) use text_column;

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSystem {
    pub id: GameSystemId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rating {
    pub id: i64,
    pub player_id: PlayerId,
    pub game_system_id: GameSystemId,
    pub rating: i32,
    pub games_played: i32,
    pub last_updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct RatingChange {
    pub id: i64,
    pub result_id: ResultId,
    pub player_id: PlayerId,
    pub game_system_id: GameSystemId,
    pub rating_before: i32,
    pub rating_after: i32,
    pub expected_score: f64,
    pub actual_score: f64,
    pub k_factor: i32,
}

/// One side of a head-to-head result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub player_id: PlayerId,
    pub score: Option<i32>,
    pub secondary_score: Option<i32>,
    pub faction: Option<String>,
}

impl Participant {
    pub fn new(player_id: PlayerId, score: i32) -> Self {
        Self {
            player_id,
            score: Some(score),
            secondary_score: None,
            faction: None,
        }
    }

    pub fn with_secondary(mut self, secondary_score: Option<i32>) -> Self {
        self.secondary_score = secondary_score;
        self
    }

    pub fn with_faction(mut self, faction: Option<String>) -> Self {
        self.faction = faction;
        self
    }
}

/// A finished head-to-head game.
#[derive(Debug, Clone, Serialize)]
pub struct GameResult {
    pub id: ResultId,
    pub game_system_id: GameSystemId,
    pub tournament_id: Option<TournamentId>,
    pub played_at: NaiveDateTime,
    pub applied: bool,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    Open,
    Swiss,
    Elimination,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::Open => "open",
            TournamentFormat::Swiss => "swiss",
            TournamentFormat::Elimination => "elimination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(TournamentFormat::Open),
            "swiss" => Some(TournamentFormat::Swiss),
            "elimination" => Some(TournamentFormat::Elimination),
            _ => None,
        }
    }

    /// Formats that advance round by round through the pairing engine.
    pub fn is_round_based(&self) -> bool {
        !matches!(self, TournamentFormat::Elimination)
    }
}

text_column!(TournamentFormat);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    Draft,
    Registration,
    Running,
    Completed,
}

impl TournamentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentState::Draft => "draft",
            TournamentState::Registration => "registration",
            TournamentState::Running => "running",
            TournamentState::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(TournamentState::Draft),
            "registration" => Some(TournamentState::Registration),
            "running" => Some(TournamentState::Running),
            "completed" => Some(TournamentState::Completed),
            _ => None,
        }
    }

    pub fn accepts_registrations(&self) -> bool {
        matches!(self, TournamentState::Draft | TournamentState::Registration)
    }
}

text_column!(TournamentState);

#[derive(Debug, Clone, Serialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub creator_id: PlayerId,
    pub game_system_id: GameSystemId,
    pub format: TournamentFormat,
    pub state: TournamentState,
    pub rounds_count: Option<i32>,
    pub pairing: PairingStrategy,
    pub tiebreak1: TiebreakStrategy,
    pub tiebreak2: TiebreakStrategy,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    CheckedIn,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::CheckedIn => "checked_in",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RegistrationStatus::Pending),
            "checked_in" => Some(RegistrationStatus::CheckedIn),
            _ => None,
        }
    }
}

text_column!(RegistrationStatus);

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub id: i64,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub status: RegistrationStatus,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    Pending,
    Closed,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Pending => "pending",
            RoundState::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RoundState::Pending),
            "closed" => Some(RoundState::Closed),
            _ => None,
        }
    }
}

text_column!(RoundState);

#[derive(Debug, Clone, Serialize)]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub number: i32,
    pub state: RoundState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Pending,
    AWin,
    BWin,
    Draw,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::Pending => "pending",
            MatchOutcome::AWin => "a_win",
            MatchOutcome::BWin => "b_win",
            MatchOutcome::Draw => "draw",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchOutcome::Pending),
            "a_win" => Some(MatchOutcome::AWin),
            "b_win" => Some(MatchOutcome::BWin),
            "draw" => Some(MatchOutcome::Draw),
            _ => None,
        }
    }

    pub fn from_scores(a_score: i32, b_score: i32) -> Self {
        if a_score > b_score {
            MatchOutcome::AWin
        } else if b_score > a_score {
            MatchOutcome::BWin
        } else {
            MatchOutcome::Draw
        }
    }
}

text_column!(MatchOutcome);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildSlot {
    A,
    B,
}

impl ChildSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildSlot::A => "a",
            ChildSlot::B => "b",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "a" => Some(ChildSlot::A),
            "b" => Some(ChildSlot::B),
            _ => None,
        }
    }
}

text_column!(ChildSlot);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_id: Option<RoundId>,
    pub a_player_id: Option<PlayerId>,
    pub b_player_id: Option<PlayerId>,
    pub result: MatchOutcome,
    pub result_id: Option<ResultId>,
    pub parent_match_id: Option<MatchId>,
    pub child_slot: Option<ChildSlot>,
}

impl Match {
    /// The lone player of a one-sided match.
    pub fn bye_player(&self) -> Option<PlayerId> {
        match (self.a_player_id, self.b_player_id) {
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            _ => None,
        }
    }

    pub fn has_both_players(&self) -> bool {
        self.a_player_id.is_some() && self.b_player_id.is_some()
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.a_player_id == Some(player_id) || self.b_player_id == Some(player_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: String,
    pub rating: i32,
    pub games_played: i32,
}
