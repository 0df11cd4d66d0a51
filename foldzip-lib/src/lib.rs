use serde::{Deserialize, Serialize};

/// Root used when neither the CLI, the environment nor a config file names one.
pub const DEFAULT_ROOT: &str = "./";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub root: Option<String>,
    pub config: Option<String>,
    pub dry: Option<bool>,
    pub deep_clean: Option<bool>,
}

impl Config {
    pub fn root_or_default(&self) -> &str {
        self.root
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROOT)
    }

    pub fn is_dry(&self) -> bool {
        self.dry.unwrap_or(false)
    }

    pub fn is_deep_clean(&self) -> bool {
        self.deep_clean.unwrap_or(false)
    }
}
