//! Agent record types.

use serde::{Deserialize, Serialize};

/// A stored agent configuration.
///
/// Every field defaults when absent so a record written by hand (or by
/// an older version) still loads; required-field checks happen in
/// [`AgentDraft::validate`] at the edges, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// `agent_NNN`, assigned by the registry on create.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Target model identifier; not validated by the store.
    #[serde(default)]
    pub model: String,
    /// Tool identifiers in selection order; duplicates are kept.
    #[serde(default)]
    pub tools: Vec<String>,
    /// System prompt given to the model.
    #[serde(default)]
    pub prompt: String,
    /// `YYYY-MM-DD`, set once on create.
    #[serde(default)]
    pub created_at: String,
}

impl AgentRecord {
    /// Build a record from a draft plus the generated fields.
    pub fn from_draft(id: String, created_at: String, draft: AgentDraft) -> Self {
        Self {
            id,
            name: draft.name,
            author: draft.author,
            description: draft.description,
            model: draft.model,
            tools: draft.tools,
            prompt: draft.prompt,
            created_at,
        }
    }

    /// The user-editable part of this record (used for cloning).
    pub fn to_draft(&self) -> AgentDraft {
        AgentDraft {
            name: self.name.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            model: self.model.clone(),
            tools: self.tools.clone(),
            prompt: self.prompt.clone(),
        }
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Input to `create`: everything except the generated `id` / `created_at`.
///
/// Unknown keys (including `id` and `created_at`) are ignored when a
/// draft is deserialized from raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub prompt: String,
}

impl AgentDraft {
    /// Names of required fields that are blank, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("author", &self.author),
            ("description", &self.description),
            ("model", &self.model),
            ("prompt", &self.prompt),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// Reject drafts with blank required fields.
    pub fn validate(&self) -> anyhow::Result<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            anyhow::bail!("missing required fields: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_record_loads_with_defaults() {
        let r: AgentRecord = serde_json::from_str(r#"{"id":"agent_001","name":"A"}"#).unwrap();
        assert_eq!(r.id, "agent_001");
        assert!(r.tools.is_empty());
        assert!(r.created_at.is_empty());
    }

    #[test]
    fn draft_ignores_generated_fields() {
        let d: AgentDraft =
            serde_json::from_str(r#"{"id":"x","created_at":"1999-01-01","name":"N"}"#).unwrap();
        assert_eq!(d.name, "N");
    }

    #[test]
    fn missing_fields_reported_in_order() {
        let d = AgentDraft {
            name: "N".into(),
            model: "  ".into(),
            ..Default::default()
        };
        assert_eq!(d.missing_fields(), vec!["author", "description", "model", "prompt"]);
        assert!(d.validate().is_err());
    }
}
