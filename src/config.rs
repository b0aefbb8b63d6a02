use serde::Deserialize;
use std::{env, fs, path::PathBuf};

use crate::auth::{Account, AuthConfig};
use crate::registry::RegistryConfig;

/// Console settings, read from `console.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_bind() -> String {
    "0.0.0.0:8899".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            bind: default_bind(),
            auth: AuthConfig::default(),
        }
    }
}

/// Locate the console config file, if there is one.
pub fn resolve_console_json_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("JOB_LIFECYCLE_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("job-lifecycle").join("console.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("console.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_account(account: &mut Account) {
    account.username = expand_env_vars(&account.username);
    account.password = expand_env_vars(&account.password);
}

fn expand_config(mut cfg: ConsoleConfig) -> ConsoleConfig {
    cfg.registry.url = expand_env_vars(&cfg.registry.url);
    for val in [&mut cfg.registry.username, &mut cfg.registry.password]
        .into_iter()
        .flatten()
    {
        *val = expand_env_vars(val);
    }
    expand_account(&mut cfg.auth.root);
    expand_account(&mut cfg.auth.guest);
    cfg.auth.accounts.iter_mut().for_each(expand_account);
    cfg
}

/// Parse a console config document, expanding `${VAR}` references.
pub fn parse_console_config(raw: &str) -> anyhow::Result<ConsoleConfig> {
    let cfg: ConsoleConfig = serde_json::from_str(raw)?;
    Ok(expand_config(cfg))
}

/// Load the console config from the resolved path, or defaults when no
/// config file exists.
pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    match resolve_console_json_path() {
        Some(path) => {
            tracing::info!("Loading console config from {}", path.display());
            let raw = fs::read_to_string(&path)?;
            parse_console_config(&raw)
        }
        None => Ok(ConsoleConfig::default()),
    }
}
