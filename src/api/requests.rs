use serde::{Deserialize, Serialize};

/// Request body for POST /idempotency/:
///
/// ```json
/// {
///     "order": {
///         "id": 1
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRequest {
    pub order: OrderPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Accepts a string or integer id; normalized to its string form.
    pub id: serde_json::Value,
}

impl IdempotencyRequest {
    /// Extracts the order id the idempotency key is derived from.
    pub fn order_id(&self) -> Result<String, Vec<ValidationError>> {
        match &self.order.id {
            serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            _ => Err(vec![ValidationError {
                field: "order.id".to_string(),
                message: "order id must be a non-empty string or a number".to_string(),
            }]),
        }
    }
}

/// Request body for POST /feature_flag/:
///
/// ```json
/// {
///     "tenant_id": "xyz"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlagRequest {
    pub tenant_id: String,
}

impl FeatureFlagRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.tenant_id.trim().is_empty() {
            errors.push(ValidationError {
                field: "tenant_id".to_string(),
                message: "tenant_id cannot be empty".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}
