use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    /// Seconds between wall-clock re-evaluations of elapsed-time figures
    /// for employees still clocked in.
    pub refresh_interval_secs: u64,

    pub log_dir: String,

    /// Key of the organization's own record inside the employees
    /// collection, excluded from every roster view.
    pub org_root_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            org_root_id: env::var("ORG_ROOT_ID").ok(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            log_dir: "logs".to_string(),
            org_root_id: None,
        }
    }
}
