use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The flag configuration document served by the remote flag store.
///
/// The document maps flag names to definitions; each definition carries a
/// default and named rules that flip the flag when all their conditions
/// match the evaluation context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagsDocument {
    #[serde(flatten)]
    pub flags: HashMap<String, FlagDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagDefinition {
    pub default: bool,
    #[serde(default)]
    pub rules: HashMap<String, FlagRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRule {
    pub when_match: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub action: ConditionAction,
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionAction {
    Equals,
    In,
}

/// Source of the flag configuration document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagProvider: Send + Sync {
    async fn fetch_flags(&self) -> Result<FlagsDocument>;
}

/// HTTP client for the remote flag store.
///
/// The document is fetched per evaluation; there is no local cache.
pub struct HttpFlagStore {
    http: reqwest::Client,
    base_url: String,
    environment: String,
    application: String,
    name: String,
}

impl HttpFlagStore {
    pub fn new(
        base_url: impl Into<String>,
        environment: impl Into<String>,
        application: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            environment: environment.into(),
            application: application.into(),
            name: name.into(),
        }
    }

    fn configuration_url(&self) -> String {
        format!(
            "{}/applications/{}/environments/{}/configurations/{}",
            self.base_url, self.application, self.environment, self.name
        )
    }
}

#[async_trait]
impl FlagProvider for HttpFlagStore {
    async fn fetch_flags(&self) -> Result<FlagsDocument> {
        let url = self.configuration_url();

        let response = self.http.get(&url).send().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("flag store unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "flag store returned status {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("flag store returned malformed body: {}", e))
        })
    }
}
