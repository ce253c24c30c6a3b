use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub canvas_api_url: String,
    pub oauth_token: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv();

        let lookup = |name: &str| env::var(name).ok();
        let canvas_api_url = required("CANVAS_API_URL", lookup)?;
        let oauth_token = required("OAUTH_TOKEN", lookup)?;

        Ok(Config {
            canvas_api_url,
            oauth_token,
        })
    }
}

/// Where cache, results and log files go. `LATENESS_OUTPUT_DIR`, else `.`
pub fn output_dir() -> PathBuf {
    load_dotenv();
    env::var("LATENESS_OUTPUT_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_dotenv() {
    // Load .env file if it exists
    dotenv::dotenv().ok();
}

fn required(name: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let value = lookup(name).with_context(|| {
        format!("{} not found. Please set it in .env file or environment", name)
    })?;

    if value.trim().is_empty() {
        anyhow::bail!("{} is empty", name);
    }

    Ok(value)
}
