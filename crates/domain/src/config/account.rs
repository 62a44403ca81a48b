use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Vendor account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Survey vendor account settings.
///
/// The API token itself never lives in the YAML file. It is read from the
/// environment variable named by `token_env`, or from the dotenv-style
/// `token_file` when the variable is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Data center prefix, e.g. `yul1` for `https://yul1.qualtrics.com`.
    #[serde(rename = "DATA_CENTER", default)]
    pub data_center: String,
    #[serde(rename = "DEFAULT_DIRECTORY", default)]
    pub default_directory: String,
    /// Message library holding the invitation texts.
    #[serde(rename = "LIBRARY_ID", default)]
    pub library_id: Option<String>,
    #[serde(default = "d_token_env")]
    pub token_env: String,
    #[serde(default = "d_token_file")]
    pub token_file: PathBuf,
    /// Set to `false` only for intercepting proxies in development.
    #[serde(default = "d_true")]
    pub verify_tls: bool,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            data_center: String::new(),
            default_directory: String::new(),
            library_id: None,
            token_env: d_token_env(),
            token_file: d_token_file(),
            verify_tls: true,
        }
    }
}

impl AccountConfig {
    /// Base URL of the vendor REST API for this data center.
    pub fn base_url(&self) -> String {
        format!("https://{}.qualtrics.com", self.data_center)
    }
}

fn d_token_env() -> String {
    "QUALTRICS_APITOKEN".into()
}

fn d_token_file() -> PathBuf {
    PathBuf::from("qualtrics_token")
}

fn d_true() -> bool {
    true
}
