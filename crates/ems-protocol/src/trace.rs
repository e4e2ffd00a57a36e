//! Tool invocation records — what was consulted while answering a question.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Result of one tool invocation: the fetched payload or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutcome {
    Payload(serde_json::Value),
    Error(String),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Payload(v) => Some(v),
            Self::Error(_) => None,
        }
    }

    /// JSON handed back to the model as the tool message content.
    pub fn to_model_content(&self) -> serde_json::Value {
        match self {
            Self::Payload(v) => v.clone(),
            Self::Error(msg) => json!({ "error": msg }),
        }
    }
}

/// One endpoint consulted while answering a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name as requested (may be unknown to the registry).
    pub tool_name: String,
    /// Arguments exactly as parsed from the model, `{}` when unparseable.
    pub arguments: serde_json::Value,
    pub outcome: ToolOutcome,
}

impl ToolInvocation {
    pub fn new(
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        outcome: ToolOutcome,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_outcome_model_content() {
        let outcome = ToolOutcome::Error("Herramienta desconocida: x".into());
        assert!(outcome.is_error());
        assert!(outcome.payload().is_none());
        assert_eq!(
            outcome.to_model_content(),
            json!({"error": "Herramienta desconocida: x"})
        );
    }

    #[test]
    fn payload_outcome_passes_through() {
        let data = json!([{"molde": "A", "SECn": 1.2}]);
        let outcome = ToolOutcome::Payload(data.clone());
        assert!(!outcome.is_error());
        assert_eq!(outcome.to_model_content(), data);
    }

    #[test]
    fn model_content_keeps_field_order() {
        let data: serde_json::Value =
            serde_json::from_str(r#"[{"molde":"B","SECn":3.4,"kwh":120.0}]"#).unwrap();
        let content = ToolOutcome::Payload(data).to_model_content().to_string();
        assert_eq!(content, r#"[{"molde":"B","SECn":3.4,"kwh":120.0}]"#);
    }

    #[test]
    fn invocation_serializes_tagged_outcome() {
        let inv = ToolInvocation::new(
            "obtener_datos_moldes",
            json!({"dateStart": "2024-01-01", "dateEnd": "2024-01-07"}),
            ToolOutcome::Payload(json!({"ok": true})),
        );
        let v = serde_json::to_value(&inv).unwrap();
        assert_eq!(v["tool_name"], "obtener_datos_moldes");
        assert_eq!(v["outcome"]["kind"], "payload");
        assert_eq!(v["outcome"]["value"]["ok"], true);
    }
}
