use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::flags::store::{Condition, ConditionAction, FlagProvider, FlagRule};

/// Context a flag is evaluated against, e.g. `{"tenant_id": "xyz"}`.
pub type EvaluationContext = HashMap<String, serde_json::Value>;

/// Boolean feature flag evaluator backed by a remote flag store.
#[derive(Clone)]
pub struct FeatureFlags {
    provider: Arc<dyn FlagProvider>,
}

impl FeatureFlags {
    pub fn new(provider: Arc<dyn FlagProvider>) -> Self {
        Self { provider }
    }

    /// Evaluates the named flag against the context.
    ///
    /// A missing flag yields the caller-supplied default. A rule whose
    /// conditions all match the context yields its `when_match`; with no
    /// matching rule the flag's own default applies.
    pub async fn evaluate(
        &self,
        name: &str,
        context: &EvaluationContext,
        default: bool,
    ) -> Result<bool> {
        let document = self.provider.fetch_flags().await?;

        let Some(flag) = document.flags.get(name) else {
            tracing::debug!(flag = name, "flag not present in store, using default");
            return Ok(default);
        };

        for (label, rule) in &flag.rules {
            if rule_matches(rule, context) {
                tracing::debug!(flag = name, rule = label.as_str(), "flag rule matched");
                return Ok(rule.when_match);
            }
        }

        Ok(flag.default)
    }
}

fn rule_matches(rule: &FlagRule, context: &EvaluationContext) -> bool {
    !rule.conditions.is_empty()
        && rule
            .conditions
            .iter()
            .all(|condition| condition_matches(condition, context))
}

fn condition_matches(condition: &Condition, context: &EvaluationContext) -> bool {
    let Some(context_value) = context.get(&condition.key) else {
        return false;
    };

    match condition.action {
        ConditionAction::Equals => context_value == &condition.value,
        ConditionAction::In => condition
            .value
            .as_array()
            .map(|candidates| candidates.contains(context_value))
            .unwrap_or(false),
    }
}
