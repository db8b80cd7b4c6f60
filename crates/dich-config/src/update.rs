use std::env;

use serde::{Deserialize, Serialize};

fn default_check_on_startup() -> bool {
    // Release builds only
    !cfg!(debug_assertions)
}

fn default_startup_delay_ms() -> u64 {
    3000
}

fn default_repo_owner() -> String {
    "dich-app".to_string()
}

fn default_repo_name() -> String {
    "dich".to_string()
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpdateConfig {
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
}

impl UpdateConfig {
    pub fn new() -> Self {
        let check_on_startup = env::var("UPDATE_CHECK_ON_STARTUP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_check_on_startup);

        Self {
            check_on_startup,
            repo_owner: env::var("UPDATE_REPO_OWNER").unwrap_or_else(|_| default_repo_owner()),
            repo_name: env::var("UPDATE_REPO_NAME").unwrap_or_else(|_| default_repo_name()),
            ..Self::default()
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_startup: default_check_on_startup(),
            startup_delay_ms: default_startup_delay_ms(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
        }
    }
}
