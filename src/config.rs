//! Application configuration.
//!
//! Runtime settings are resolved with priority: config.toml > .env / process
//! environment > defaults. Tuning constants that are not meant to change per
//! deployment live here as named constants.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;
use crate::srs::{SchedulerKind, SrsSettings};

// ==================== Config File ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseConfig>,
    pub server: Option<ServerConfig>,
    pub llm: Option<LlmConfig>,
    pub srs: Option<SrsConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub addr: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SrsConfig {
    pub use_fsrs: Option<bool>,
    pub desired_retention: Option<f64>,
    pub focus_mode: Option<bool>,
}

/// LLM provider settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub server_addr: String,
    pub server_port: u16,
    pub llm: LlmSettings,
    pub srs: SrsSettings,
}

impl Settings {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

/// Load settings from config.toml, .env and the process environment
pub fn load_settings() -> Settings {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file = match std::fs::read_to_string("config.toml") {
        Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config.toml");
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed config.toml: {}", e);
                None
            }
        },
        Err(_) => None,
    };

    resolve_settings(file.unwrap_or_default(), |key| std::env::var(key).ok())
}

/// Merge a parsed config file with environment lookups.
pub fn resolve_settings(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Settings {
    let database = file.database.unwrap_or_default();
    let server = file.server.unwrap_or_default();
    let llm = file.llm.unwrap_or_default();
    let srs = file.srs.unwrap_or_default();

    let database_path = database
        .path
        .or_else(|| env("DATABASE_PATH"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(paths::db_path()));
    tracing::info!("Using database path: {}", database_path.display());

    let server_port = server
        .port
        .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
        .unwrap_or(SERVER_PORT);

    let use_fsrs = srs
        .use_fsrs
        .or_else(|| env("USE_FSRS").map(|v| v == "true" || v == "1"))
        .unwrap_or(true);

    Settings {
        database_path,
        server_addr: server.addr.unwrap_or_else(|| SERVER_ADDR.to_string()),
        server_port,
        llm: LlmSettings {
            api_key: llm.api_key.or_else(|| env("GEMINI_API_KEY")),
            model: llm
                .model
                .or_else(|| env("GEMINI_MODEL"))
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: llm
                .base_url
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
        },
        srs: SrsSettings {
            scheduler: if use_fsrs { SchedulerKind::Fsrs } else { SchedulerKind::Sm2 },
            desired_retention: srs
                .desired_retention
                .unwrap_or(DEFAULT_DESIRED_RETENTION)
                .clamp(0.7, 0.99),
            focus_mode: srs.focus_mode.unwrap_or(false),
        },
    }
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Header carrying the identity provider's user id
pub const USER_ID_HEADER: &str = "x-user-id";

// ==================== LLM Configuration ====================

pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";

pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout for completions, in seconds
pub const LLM_TIMEOUT_SECS: u64 = 60;

// ==================== Learning Metrics ====================

/// Topic accuracy at or above this ratio counts as mastered
pub const MASTERY_THRESHOLD: f64 = 0.8;

/// Evaluation accuracy (0-100) at or above which an assistant answer is correct
pub const EVALUATION_PASS_ACCURACY: f64 = 80.0;

/// Number of most recent answers used for the frustration proxy
pub const FRUSTRATION_WINDOW: usize = 10;

/// Timeline and engagement entries kept per learner, oldest dropped first
pub const MAX_HISTORY_ENTRIES: usize = 500;

/// Confidence scores are on a 1-5 scale
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 5;

// ==================== Normalizer ====================

/// Answers up to this many words are classified as easy
pub const EASY_MAX_WORDS: usize = 8;

/// Answers up to this many words are classified as medium
pub const MEDIUM_MAX_WORDS: usize = 25;

/// Explanations up to this many words count as short
pub const SHORT_EXPLANATION_WORDS: usize = 60;

/// Explanations up to this many words count as medium
pub const MEDIUM_EXPLANATION_WORDS: usize = 180;

// ==================== Assistant ====================

/// Chat sessions expire after this many hours without activity
pub const CHAT_SESSION_EXPIRY_HOURS: i64 = 1;

/// Chance (out of 255) that a chat session lookup also sweeps expired sessions
pub const CHAT_SESSION_CLEANUP_THRESHOLD: u8 = 25;

// ==================== Courses ====================

/// Upper bound on chapters per generated course
pub const MAX_CHAPTERS: u32 = 25;

/// Length of generated course ids
pub const COURSE_ID_LEN: usize = 32;

// ==================== Progress ====================

/// Quiz results closer together than this are treated as duplicates
pub const QUIZ_DEDUPE_WINDOW_MS: i64 = 1000;

// ==================== SRS ====================

pub const DEFAULT_DESIRED_RETENTION: f64 = 0.9;

/// Learning step at which a card graduates to FSRS
pub const GRADUATING_STEP: i64 = 4;

/// SM-2 ease factor floor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Longest review interval the schedulers will produce (~100 years)
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Normal learning steps in minutes: 1min → 10min → 1hr → 4hr (~5 hours to graduate)
pub const LEARNING_STEPS_NORMAL: [i64; 4] = [1, 10, 60, 240];

/// Focus mode learning steps in minutes: 1min → 5min → 15min → 30min (~50 minutes to graduate)
pub const LEARNING_STEPS_FOCUS: [i64; 4] = [1, 5, 15, 30];

/// Get learning steps based on focus mode
pub fn get_learning_steps(focus_mode: bool) -> &'static [i64; 4] {
    if focus_mode {
        &LEARNING_STEPS_FOCUS
    } else {
        &LEARNING_STEPS_NORMAL
    }
}
