#[derive(Debug, Clone)]
pub struct RatingSettings {
    pub start_rating: i32,
    pub k_factor: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            start_rating: 1200,
            k_factor: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub path: String,
    pub busy_timeout_ms: u64,
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "tournament_ranking.db".to_string()),
            busy_timeout_ms: 5_000,
            pool_size: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TournamentSettings {
    pub default_pairing_key: &'static str,
    pub default_tiebreak1_key: &'static str,
    pub default_tiebreak2_key: &'static str,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            default_pairing_key: "points_groups",
            default_tiebreak1_key: "score_sum",
            default_tiebreak2_key: "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rating: RatingSettings,
    pub database: DatabaseSettings,
    pub tournament: TournamentSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            rating: RatingSettings::default(),
            database: DatabaseSettings::default(),
            tournament: TournamentSettings::default(),
        }
    }

    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database.path = path.into();
        self
    }
}
