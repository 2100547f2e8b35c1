use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::engine::OpResult;
use crate::errors::FuzzError;
use crate::graph::{Node, NodeKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityStatus {
    pub is_vulnerable: bool,
    pub potentially_vulnerable: bool,
}

/// Counters for one run, persisted as `stats.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub number_of_queries: usize,
    pub number_of_mutations: usize,
    pub number_of_objects: usize,
    pub number_of_successes: usize,
    pub number_of_failures: usize,
    /// Keyed `Kind|name`.
    pub successful_nodes: BTreeMap<String, usize>,
    pub failed_nodes: BTreeMap<String, usize>,
    /// Result type, then node name.
    pub results: BTreeMap<String, BTreeMap<String, usize>>,
    /// Status code, then node name.
    pub http_status_codes: BTreeMap<u16, BTreeMap<String, usize>>,
    /// Detector name, then node name.
    pub vulnerabilities: BTreeMap<String, BTreeMap<String, VulnerabilityStatus>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            end_time: None,
            number_of_queries: 0,
            number_of_mutations: 0,
            number_of_objects: 0,
            number_of_successes: 0,
            number_of_failures: 0,
            successful_nodes: BTreeMap::new(),
            failed_nodes: BTreeMap::new(),
            results: BTreeMap::new(),
            http_status_codes: BTreeMap::new(),
            vulnerabilities: BTreeMap::new(),
        }
    }
}

impl Stats {
    pub fn new(queries: usize, mutations: usize, objects: usize) -> Self {
        Self {
            number_of_queries: queries,
            number_of_mutations: mutations,
            number_of_objects: objects,
            ..Default::default()
        }
    }

    pub fn add_success(&mut self, node: &Node) {
        self.number_of_successes += 1;
        *self.successful_nodes.entry(node.key()).or_default() += 1;
    }

    pub fn add_failure(&mut self, node: &Node) {
        self.number_of_failures += 1;
        *self.failed_nodes.entry(node.key()).or_default() += 1;
    }

    pub fn add_http_status_code(&mut self, node_name: &str, status: u16) {
        *self
            .http_status_codes
            .entry(status)
            .or_default()
            .entry(node_name.to_string())
            .or_default() += 1;
    }

    pub fn update_from_result(&mut self, node: &Node, result: &OpResult) {
        if result.is_success() {
            self.add_success(node);
        } else {
            self.add_failure(node);
        }
        *self
            .results
            .entry(result.kind.as_str().to_string())
            .or_default()
            .entry(node.name.clone())
            .or_default() += 1;
        if let Some(status) = result.status_code {
            self.add_http_status_code(&node.name, status);
        }
    }

    /// Findings only ever upgrade; a later clean run does not clear them.
    pub fn add_vulnerability(&mut self, detector: &str, node_name: &str, confirmed: bool, potential: bool) {
        let status = self
            .vulnerabilities
            .entry(detector.to_string())
            .or_default()
            .entry(node_name.to_string())
            .or_default();
        status.is_vulnerable |= confirmed;
        status.potentially_vulnerable |= potential;
    }

    /// Distinct queries and mutations with at least one success.
    pub fn unique_operation_successes(&self) -> usize {
        Self::count_operations(&self.successful_nodes)
    }

    pub fn unique_operation_failures(&self) -> usize {
        Self::count_operations(&self.failed_nodes)
    }

    fn count_operations(nodes: &BTreeMap<String, usize>) -> usize {
        nodes
            .iter()
            .filter(|(key, count)| {
                **count > 0
                    && (key.starts_with(&format!("{}|", NodeKind::Query))
                        || key.starts_with(&format!("{}|", NodeKind::Mutation)))
            })
            .count()
    }

    pub fn operation_count(&self) -> usize {
        self.number_of_queries + self.number_of_mutations
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn summary(&self) -> String {
        let elapsed = self.end_time.unwrap_or_else(Utc::now) - self.start_time;
        let mut out = format!(
            "Time taken: {}s\nQueries: {}\nMutations: {}\nObjects: {}\nUnique query/mutation successes: {}/{}\nUnique query/mutation failures: {}/{}\n",
            elapsed.num_seconds(),
            self.number_of_queries,
            self.number_of_mutations,
            self.number_of_objects,
            self.unique_operation_successes(),
            self.operation_count(),
            self.unique_operation_failures(),
            self.operation_count(),
        );
        for (detector, nodes) in &self.vulnerabilities {
            let flagged: Vec<String> = nodes
                .iter()
                .filter(|(_, s)| s.is_vulnerable || s.potentially_vulnerable)
                .map(|(node, s)| {
                    let label = if s.is_vulnerable { "vulnerable" } else { "potentially vulnerable" };
                    format!("  {node}: {label}")
                })
                .collect();
            if !flagged.is_empty() {
                out.push_str(&format!("{detector}:\n{}\n", flagged.join("\n")));
            }
        }
        out
    }

    pub async fn save(&self, path: &Path) -> Result<(), FuzzError> {
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultKind;
    use crate::schema::{ObjectType, Operation};
    use serde_json::json;

    fn query_node(name: &str) -> Node {
        let op: Operation = serde_yaml::from_str("output: {kind: SCALAR, name: Int, type: Int}").unwrap();
        Node::operation(&Operation { name: name.into(), ..op })
    }

    #[test]
    fn test_counts_by_node_key() {
        let mut stats = Stats::new(2, 1, 1);
        let node = query_node("getUser");
        let ok = OpResult {
            kind: ResultKind::GeneralSuccess,
            payload: String::new(),
            status_code: Some(200),
            response: json!({"data": {"getUser": 1}}),
        };
        stats.update_from_result(&node, &ok);
        stats.update_from_result(&node, &OpResult::internal_failure(""));

        assert_eq!(stats.successful_nodes["Query|getUser"], 1);
        assert_eq!(stats.failed_nodes["Query|getUser"], 1);
        assert_eq!(stats.http_status_codes[&200]["getUser"], 1);
        assert_eq!(stats.results["internal_failure"]["getUser"], 1);
        assert_eq!(stats.unique_operation_successes(), 1);

        let object: ObjectType = serde_yaml::from_str("name: User\nfields: []").unwrap();
        let object = Node::object(&object);
        stats.add_success(&object);
        assert_eq!(stats.unique_operation_successes(), 1);
    }

    #[test]
    fn test_vulnerabilities_only_upgrade() {
        let mut stats = Stats::default();
        stats.add_vulnerability("SQL Injection", "search", false, true);
        stats.add_vulnerability("SQL Injection", "search", false, false);
        let status = stats.vulnerabilities["SQL Injection"]["search"];
        assert!(status.potentially_vulnerable);
        assert!(!status.is_vulnerable);
        assert!(stats.summary().contains("search: potentially vulnerable"));
    }

    #[tokio::test]
    async fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        Stats::new(1, 0, 0).save(&path).await.unwrap();
        let saved: Stats = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.number_of_queries, 1);
        assert!(!dir.path().join("stats.json.tmp").exists());
    }
}
