use serde::Serialize;
use tracing::{info, warn};

use super::Fuzzer;
use crate::engine::ResultKind;
use crate::graph::NodeId;

/// Operations that returned data when replayed with another user's objects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdorReport {
    pub checked: usize,
    pub possible_idor_nodes: Vec<String>,
}

impl Fuzzer {
    /// Replays every operation against the loaded bucket under the current
    /// credentials. Any operation that still returns data is flagged.
    pub async fn run_idor(&mut self) -> IdorReport {
        info!(objects = self.bucket.instance_count(), "Starting IDOR check");
        if self.bucket.is_empty() {
            warn!("Objects bucket is empty, every request will use generated values");
        }

        let mut report = IdorReport::default();
        let ids: Vec<NodeId> = (0..self.graph.node_count())
            .filter(|&id| self.graph.node(id).is_operation())
            .collect();

        for id in ids {
            let mut result = self.evaluate_node(id, false).await;
            report.checked += 1;
            if result.is_success() && result.has_non_empty_data() {
                result.kind = ResultKind::HasDataSuccess;
                let name = self.graph.node(id).name.clone();
                info!(node = %name, "Possible IDOR");
                report.possible_idor_nodes.push(name);
            }
            self.stats.update_from_result(self.graph.node(id), &result);
            self.progress.update(&self.graph.node(id).name, &self.stats);
        }

        self.stats.finish();
        info!(possible = report.possible_idor_nodes.len(), checked = report.checked, "IDOR check finished");
        report
    }
}
