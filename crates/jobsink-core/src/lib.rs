pub mod app_config;
pub mod config;
pub mod feeds;
pub mod job;
pub mod outcome;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use feeds::{load_feeds_config, FeedsConfig};
pub use job::{
    JobCandidate, JobType, StoredJob, MAX_CATEGORY_LEN, MAX_COMPANY_LEN, MAX_DESCRIPTION_LEN,
    MAX_EXTERNAL_ID_LEN, MAX_LOCATION_LEN, MAX_TITLE_LEN, MAX_URL_LEN,
};
pub use outcome::{BatchSummary, JobProcessor, Outcome};
pub use store::{
    success_rate_pct, FetchPhase, ImportRun, JobStore, RunStats, RunStatus, RunStore, StoreError,
};
