//! Agent registry: CRUD, search and marketplace views over [`AgentStore`].
//!
//! Every operation reloads the list from disk, transforms it and (for
//! mutations) writes it back.  Nothing is cached between calls.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::{AgentDraft, AgentRecord, AgentStore};

// ── Search filters ───────────────────────────────────────────

/// Attribute filters applied after the text query.  All set filters
/// must pass; within `tools` one shared tool is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Exact author match.
    #[serde(default)]
    pub author: Option<String>,
    /// Exact model match.
    #[serde(default)]
    pub model: Option<String>,
    /// Record passes if it has at least one of these tools.
    #[serde(default)]
    pub tools: Vec<String>,
}

impl SearchFilters {
    /// True when no filter would remove anything.  Blank strings count
    /// as unset.
    pub fn is_empty(&self) -> bool {
        self.author_filter().is_none() && self.model_filter().is_none() && self.tools.is_empty()
    }

    fn author_filter(&self) -> Option<&str> {
        self.author.as_deref().filter(|s| !s.is_empty())
    }

    fn model_filter(&self) -> Option<&str> {
        self.model.as_deref().filter(|s| !s.is_empty())
    }

    fn matches(&self, record: &AgentRecord) -> bool {
        if let Some(author) = self.author_filter() {
            if record.author != author {
                return false;
            }
        }
        if let Some(model) = self.model_filter() {
            if record.model != model {
                return false;
            }
        }
        if !self.tools.is_empty() && !self.tools.iter().any(|t| record.has_tool(t)) {
            return false;
        }
        true
    }
}

/// Case-insensitive substring match over name, description, author and
/// tool identifiers.  `query_lower` must already be lowercased.
fn matches_query(record: &AgentRecord, query_lower: &str) -> bool {
    record.name.to_lowercase().contains(query_lower)
        || record.description.to_lowercase().contains(query_lower)
        || record.author.to_lowercase().contains(query_lower)
        || record
            .tools
            .iter()
            .any(|t| t.to_lowercase().contains(query_lower))
}

/// Apply the text query then the filters to `records`, keeping order.
pub fn filter_records(
    records: Vec<AgentRecord>,
    query: &str,
    filters: Option<&SearchFilters>,
) -> Vec<AgentRecord> {
    let filters = filters.filter(|f| !f.is_empty());
    if query.is_empty() && filters.is_none() {
        return records;
    }

    let query_lower = query.to_lowercase();
    records
        .into_iter()
        .filter(|r| query.is_empty() || matches_query(r, &query_lower))
        .filter(|r| filters.map_or(true, |f| f.matches(r)))
        .collect()
}

// ── Sorting ──────────────────────────────────────────────────

/// Marketplace sort orders.  All sorts are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Stored order, unchanged.
    #[default]
    Stored,
    /// `created_at` descending.
    NewestFirst,
    /// Name A–Z, case-insensitive.
    NameAsc,
    /// Name Z–A, case-insensitive.
    NameDesc,
    /// Author A–Z, case-insensitive.
    Author,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "stored" => Ok(SortOrder::Stored),
            "newest" | "newest_first" => Ok(SortOrder::NewestFirst),
            "name" | "name_asc" => Ok(SortOrder::NameAsc),
            "name_desc" => Ok(SortOrder::NameDesc),
            "author" => Ok(SortOrder::Author),
            other => Err(format!(
                "unknown sort order '{other}' (expected stored, newest, name, name_desc, author)"
            )),
        }
    }
}

/// Sort `records` in place.
pub fn sort_records(records: &mut [AgentRecord], order: SortOrder) {
    match order {
        SortOrder::Stored => {}
        SortOrder::NewestFirst => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::NameAsc => records.sort_by_key(|r| r.name.to_lowercase()),
        SortOrder::NameDesc => {
            records.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()))
        }
        SortOrder::Author => records.sort_by_key(|r| r.author.to_lowercase()),
    }
}

// ── Stats ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolUsage {
    pub tool: String,
    pub count: usize,
}

/// Marketplace summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStats {
    pub total: usize,
    /// Most used first; ties ordered by tool id.
    pub tool_usage: Vec<ToolUsage>,
}

/// Count tool usage across `records`.  Duplicate tools within one
/// record each count.
pub fn compute_stats(records: &[AgentRecord]) -> MarketStats {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tool in records.iter().flat_map(|r| r.tools.iter()) {
        *counts.entry(tool.as_str()).or_default() += 1;
    }
    let mut tool_usage: Vec<ToolUsage> = counts
        .into_iter()
        .map(|(tool, count)| ToolUsage {
            tool: tool.to_string(),
            count,
        })
        .collect();
    tool_usage.sort_by(|a, b| b.count.cmp(&a.count));
    MarketStats {
        total: records.len(),
        tool_usage,
    }
}

// ── Id generation ────────────────────────────────────────────

/// `agent_` + zero-padded `(count + 1)`, probing upward past ids that
/// are already taken.
pub fn next_agent_id(records: &[AgentRecord]) -> String {
    let mut n = records.len() + 1;
    loop {
        let id = format!("agent_{n:03}");
        if !records.iter().any(|r| r.id == id) {
            return id;
        }
        n += 1;
    }
}

// ── Registry ─────────────────────────────────────────────────

/// CRUD and search API layered on an [`AgentStore`].
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    store: AgentStore,
}

impl AgentRegistry {
    pub fn new(store: AgentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    /// All records in stored order.
    pub async fn list(&self) -> Vec<AgentRecord> {
        self.store.load_all().await
    }

    /// Create a record with a generated id and today's date.
    pub async fn create(&self, draft: AgentDraft) -> anyhow::Result<AgentRecord> {
        let mut records = self.store.load_all().await;
        let id = next_agent_id(&records);
        let created_at = chrono::Local::now().format("%Y-%m-%d").to_string();
        let record = AgentRecord::from_draft(id, created_at, draft);

        records.push(record.clone());
        self.store.save_all(&records).await?;

        info!(id = %record.id, name = %record.name, "agent created");
        Ok(record)
    }

    /// First record whose id matches.
    pub async fn get_by_id(&self, id: &str) -> Option<AgentRecord> {
        self.store.load_all().await.into_iter().find(|r| r.id == id)
    }

    /// First record whose name matches.  Names are not unique, so this
    /// depends on stored order.
    pub async fn get_by_name(&self, name: &str) -> Option<AgentRecord> {
        self.store.load_all().await.into_iter().find(|r| r.name == name)
    }

    /// Replace the record `id` with `record`, keeping the stored `id` and
    /// `created_at` whatever `record` carries.  Returns `false` (and
    /// writes nothing) when `id` is unknown.
    pub async fn update(&self, id: &str, mut record: AgentRecord) -> anyhow::Result<bool> {
        let mut records = self.store.load_all().await;
        let Some(slot) = records.iter_mut().find(|r| r.id == id) else {
            debug!(id = %id, "update: agent not found");
            return Ok(false);
        };

        record.id = id.to_string();
        record.created_at = slot.created_at.clone();
        *slot = record;

        self.store.save_all(&records).await?;
        info!(id = %id, "agent updated");
        Ok(true)
    }

    /// Remove every record with `id`.  Persists only when something was
    /// removed.
    pub async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let mut records = self.store.load_all().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            debug!(id = %id, "delete: agent not found");
            return Ok(false);
        }
        self.store.save_all(&records).await?;
        info!(id = %id, "agent deleted");
        Ok(true)
    }

    /// Text search plus attribute filters, in stored order.
    pub async fn search(&self, query: &str, filters: Option<&SearchFilters>) -> Vec<AgentRecord> {
        filter_records(self.store.load_all().await, query, filters)
    }

    /// Search, then sort.
    pub async fn browse(
        &self,
        query: &str,
        filters: Option<&SearchFilters>,
        order: SortOrder,
    ) -> Vec<AgentRecord> {
        let mut records = self.search(query, filters).await;
        sort_records(&mut records, order);
        records
    }

    /// Sorted distinct authors; blank authors show as `Unknown`.
    pub async fn authors(&self) -> Vec<String> {
        let mut authors: Vec<String> = self
            .store
            .load_all()
            .await
            .into_iter()
            .map(|r| {
                if r.author.trim().is_empty() {
                    "Unknown".to_string()
                } else {
                    r.author
                }
            })
            .collect();
        authors.sort();
        authors.dedup();
        authors
    }

    pub async fn stats(&self) -> MarketStats {
        compute_stats(&self.store.load_all().await)
    }

    /// Editable copy of an existing record, for "clone agent".
    pub async fn clone_template(&self, id: &str) -> Option<AgentDraft> {
        self.get_by_id(id).await.map(|r| r.to_draft())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, name: &str, author: &str, model: &str, tools: &[&str], created: &str) -> AgentRecord {
        AgentRecord {
            id: id.into(),
            name: name.into(),
            author: author.into(),
            description: format!("{name} description"),
            model: model.into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            prompt: "p".into(),
            created_at: created.into(),
        }
    }

    fn fixture() -> Vec<AgentRecord> {
        vec![
            rec("agent_001", "Python Expert", "Alice", "m1", &["FileOpsTool"], "2024-01-02"),
            rec("agent_002", "web scout", "Bob", "m2", &["WebSearchTool"], "2024-03-01"),
            rec("agent_003", "Calculator", "Alice", "m2", &["MathTool", "WebSearchTool"], "2024-02-01"),
        ]
    }

    #[test]
    fn next_id_counts_from_len() {
        assert_eq!(next_agent_id(&[]), "agent_001");
        assert_eq!(next_agent_id(&fixture()), "agent_004");
    }

    #[test]
    fn next_id_probes_past_collisions() {
        // After deleting agent_002 from three, count+1 = 3 collides.
        let records = vec![
            rec("agent_001", "a", "x", "m", &[], ""),
            rec("agent_003", "c", "x", "m", &[], ""),
        ];
        assert_eq!(next_agent_id(&records), "agent_004");
    }

    #[test]
    fn next_id_widens_past_three_digits() {
        let records: Vec<AgentRecord> = (1..=999)
            .map(|n| rec(&format!("agent_{n:03}"), "a", "x", "m", &[], ""))
            .collect();
        assert_eq!(next_agent_id(&records), "agent_1000");
    }

    #[test]
    fn empty_query_no_filters_returns_all_in_order() {
        let all = fixture();
        assert_eq!(filter_records(all.clone(), "", None), all);
        assert_eq!(filter_records(all.clone(), "", Some(&SearchFilters::default())), all);
    }

    #[test]
    fn query_is_case_insensitive_across_fields() {
        let by_name = filter_records(fixture(), "PYTHON", None);
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "agent_001");

        let by_author = filter_records(fixture(), "bob", None);
        assert_eq!(by_author[0].id, "agent_002");

        let by_tool = filter_records(fixture(), "websearch", None);
        assert_eq!(by_tool.len(), 2);

        let by_description = filter_records(fixture(), "calculator desc", None);
        assert_eq!(by_description[0].id, "agent_003");
    }

    #[test]
    fn filters_combine_with_and() {
        let f = SearchFilters {
            author: Some("Alice".into()),
            model: Some("m2".into()),
            tools: vec![],
        };
        let out = filter_records(fixture(), "", Some(&f));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "agent_003");
    }

    #[test]
    fn tools_filter_is_any_overlap() {
        let f = SearchFilters {
            tools: vec!["WebSearchTool".into(), "Nope".into()],
            ..Default::default()
        };
        let ids: Vec<String> = filter_records(fixture(), "", Some(&f))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["agent_002", "agent_003"]);
    }

    #[test]
    fn author_filter_is_exact() {
        let f = SearchFilters {
            author: Some("alice".into()),
            ..Default::default()
        };
        assert!(filter_records(fixture(), "", Some(&f)).is_empty());
    }

    #[test]
    fn query_then_filter() {
        let f = SearchFilters {
            author: Some("Bob".into()),
            ..Default::default()
        };
        let out = filter_records(fixture(), "websearch", Some(&f));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "agent_002");
    }

    #[test]
    fn sort_orders() {
        let mut r = fixture();
        sort_records(&mut r, SortOrder::NewestFirst);
        assert_eq!(r[0].id, "agent_002");
        assert_eq!(r[2].id, "agent_001");

        sort_records(&mut r, SortOrder::NameAsc);
        let names: Vec<&str> = r.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Calculator", "Python Expert", "web scout"]);

        sort_records(&mut r, SortOrder::NameDesc);
        assert_eq!(r[0].name, "web scout");

        sort_records(&mut r, SortOrder::Author);
        assert_eq!(r[2].author, "Bob");
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!("newest".parse::<SortOrder>().unwrap(), SortOrder::NewestFirst);
        assert_eq!("Name_Desc".parse::<SortOrder>().unwrap(), SortOrder::NameDesc);
        assert_eq!("".parse::<SortOrder>().unwrap(), SortOrder::Stored);
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn stats_count_tools() {
        let stats = compute_stats(&fixture());
        assert_eq!(stats.total, 3);
        assert_eq!(
            stats.tool_usage[0],
            ToolUsage {
                tool: "WebSearchTool".into(),
                count: 2
            }
        );
        assert_eq!(stats.tool_usage.len(), 3);
        assert_eq!(stats.tool_usage[1].tool, "FileOpsTool");
    }
}
