//! Drives a run: walks the dependency graph so producers execute before
//! consumers, then fuzzes and attacks every operation it reaches.

mod idor;
pub mod progress;
pub mod stats;

pub use idor::IdorReport;
pub use progress::FuzzProgress;
pub use stats::{Stats, VulnerabilityStatus};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bucket::ObjectsBucket;
use crate::config::RunConfig;
use crate::detectors::DEngine;
use crate::engine::{FEngine, OpResult, ResultKind};
use crate::errors::FuzzError;
use crate::graph::{build_dependency_graph, DependencyGraph, NodeId};
use crate::schema::{CompiledSchema, MutationType};
use crate::transport::Transport;

pub const OBJECTS_BUCKET_FILE: &str = "objects_bucket.json";
pub const STATS_FILE: &str = "stats.json";

/// Mutation types held back in each of the three traversal passes.
pub const PASS_FILTERS: [&[MutationType]; 3] = [
    &[MutationType::Update, MutationType::Delete, MutationType::Unknown],
    &[MutationType::Delete, MutationType::Unknown],
    &[],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    TimedOut,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::TimedOut => "timed_out",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one traversal pass did.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Nodes evaluated, in order, including re-evaluations.
    pub executed: Vec<NodeId>,
    /// Requeue count per node when the pass ended.
    pub requeues: HashMap<NodeId, u32>,
    pub succeeded: HashSet<NodeId>,
    pub budget_exhausted: bool,
}

pub struct Fuzzer {
    config: RunConfig,
    schema: Arc<CompiledSchema>,
    graph: DependencyGraph,
    fengine: FEngine,
    dengine: DEngine,
    bucket: ObjectsBucket,
    stats: Stats,
    rng: StdRng,
    dfs_ran_nodes: HashSet<NodeId>,
    cancel_token: CancellationToken,
    progress: FuzzProgress,
}

impl Fuzzer {
    pub fn new(schema: CompiledSchema, transport: Arc<dyn Transport>, url: &str, config: RunConfig) -> Self {
        let schema = Arc::new(schema);
        let graph = build_dependency_graph(&schema);
        let fengine = FEngine::new(Arc::clone(&schema), transport, url, &config);
        let dengine = DEngine::new(&config);
        let stats = Stats::new(schema.queries.len(), schema.mutations.len(), schema.objects.len());
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let progress = FuzzProgress::new(config.show_progress);

        info!(
            url = %url,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Fuzzer initialized"
        );

        Self {
            config,
            schema,
            graph,
            fengine,
            dengine,
            bucket: ObjectsBucket::new(),
            stats,
            rng,
            dfs_ran_nodes: HashSet::new(),
            cancel_token: CancellationToken::new(),
            progress,
        }
    }

    /// Starts from a bucket recorded by an earlier run.
    pub fn with_bucket(mut self, bucket: ObjectsBucket) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn with_dengine(mut self, dengine: DEngine) -> Self {
        self.dengine = dengine;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn bucket(&self) -> &ObjectsBucket {
        &self.bucket
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Nodes any traversal pass has evaluated so far.
    pub fn dfs_ran_nodes(&self) -> &HashSet<NodeId> {
        &self.dfs_ran_nodes
    }

    /// Full run under the configured wall-clock budget. Whatever the bucket
    /// and stats hold when the budget runs out or the token fires is kept.
    pub async fn run(&mut self) -> RunStatus {
        let max_time = self.config.max_time;
        let cancel = self.cancel_token.clone();

        let status = tokio::select! {
            finished = tokio::time::timeout(max_time, self.run_steps()) => match finished {
                Ok(()) => RunStatus::Completed,
                Err(_) => {
                    warn!(max_time_secs = max_time.as_secs(), "Reached max time, stopping");
                    RunStatus::TimedOut
                }
            },
            _ = cancel.cancelled() => {
                warn!("Run cancelled");
                RunStatus::Cancelled
            }
        };

        self.stats.finish();
        self.progress.finish(&self.stats);
        info!(status = %status, objects = self.bucket.instance_count(), "Fuzzing finished");
        status
    }

    async fn run_steps(&mut self) {
        if !self.config.use_dependency_graph {
            self.run_no_dfs().await;
            return;
        }

        let starters = self.graph.starter_nodes(&mut self.rng);
        info!(
            starters = ?starters.iter().map(|&id| self.graph.node(id).key()).collect::<Vec<_>>(),
            "Selected starter nodes"
        );

        for (pass, filter) in PASS_FILTERS.iter().enumerate() {
            let report = self.perform_dfs(&starters, filter).await;
            info!(
                pass = pass + 1,
                executed = report.executed.len(),
                succeeded = report.succeeded.len(),
                objects = self.bucket.instance_count(),
                "Completed traversal pass"
            );
        }

        let islands: Vec<NodeId> = (0..self.graph.node_count())
            .filter(|id| !self.dfs_ran_nodes.contains(id))
            .collect();
        info!(count = islands.len(), "Running nodes no pass reached");
        self.run_nodes(&islands).await;
    }

    /// Runs every operation once in graph order, ignoring dependencies.
    pub async fn run_no_dfs(&mut self) {
        let all: Vec<NodeId> = (0..self.graph.node_count()).collect();
        self.run_nodes(&all).await;
        info!("Completed run without dependency ordering");
    }

    /// Runs one query or mutation with a minimal payload.
    pub async fn run_single(&mut self, name: &str) -> Result<OpResult, FuzzError> {
        let id = self
            .graph
            .find_operation(name)
            .ok_or_else(|| FuzzError::UnknownNode(name.to_string()))?;
        let result = self.evaluate_node(id, false).await;
        self.stats.update_from_result(self.graph.node(id), &result);
        self.stats.finish();
        Ok(result)
    }

    async fn run_nodes(&mut self, ids: &[NodeId]) {
        for &id in ids {
            let node = self.graph.node(id);
            if !node.is_operation() || self.config.is_skipped(&node.name) {
                continue;
            }
            debug!(node = %node.key(), "Running node");
            let result = self.evaluate_node(id, false).await;
            self.stats.update_from_result(self.graph.node(id), &result);
            self.progress.update(&self.graph.node(id).name, &self.stats);
        }
    }

    fn is_filtered(&self, id: NodeId, filter: &[MutationType]) -> bool {
        let node = self.graph.node(id);
        self.config.is_skipped(&node.name) || node.mutation_type.is_some_and(|t| filter.contains(&t))
    }

    /// One depth-first pass from `starters`. Failed nodes go to the bottom of
    /// the stack to be retried after everything else, at most
    /// `max_requeues` times.
    pub async fn perform_dfs(&mut self, starters: &[NodeId], filter: &[MutationType]) -> PassReport {
        let mut report = PassReport::default();
        let mut to_visit: VecDeque<Vec<NodeId>> = starters.iter().map(|&id| vec![id]).collect();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let budget = (self.graph.node_count() + self.graph.edge_count()) * 10;
        let mut run_times = 0usize;

        while let Some(path) = to_visit.pop_back() {
            let Some(&current) = path.last() else {
                continue;
            };

            if !visited.contains(&current) && !self.is_filtered(current, filter) {
                let result = self.evaluate_node(current, true).await;
                self.fuzz_node(current).await;
                self.stats.update_from_result(self.graph.node(current), &result);
                self.progress.update(&self.graph.node(current).name, &self.stats);
                report.executed.push(current);

                if result.is_success() {
                    debug!(node = %self.graph.node(current).key(), "Node succeeded");
                    for &next in self.graph.successors(current) {
                        let mut extended = path.clone();
                        extended.push(next);
                        to_visit.push_back(extended);
                    }
                    visited.insert(current);
                    report.succeeded.insert(current);
                    report.requeues.remove(&current);
                } else {
                    let count = report.requeues.entry(current).or_insert(0);
                    if *count < self.config.max_requeues {
                        *count += 1;
                        debug!(node = %self.graph.node(current).key(), requeues = *count, "Node failed, requeued");
                        to_visit.push_front(path);
                    } else {
                        debug!(node = %self.graph.node(current).key(), "Node failed, dropped for this pass");
                    }
                }
                self.dfs_ran_nodes.insert(current);
            }

            run_times += 1;
            if run_times >= budget {
                info!(budget, "Hit traversal budget, ending pass");
                report.budget_exhausted = true;
                break;
            }
        }
        report
    }

    /// Object nodes succeed when the bucket holds an instance; operations are
    /// sent with a minimal payload.
    async fn evaluate_node(&mut self, id: NodeId, strict: bool) -> OpResult {
        let node = self.graph.node(id);
        match node.as_operation() {
            None => {
                let kind = if self.bucket.is_object_in_bucket(&node.name) {
                    ResultKind::GeneralSuccess
                } else {
                    ResultKind::InternalFailure
                };
                OpResult {
                    kind,
                    ..OpResult::internal_failure("")
                }
            }
            Some(op) => {
                self.fengine
                    .run_minimal_payload(op, &mut self.bucket, &mut self.rng, strict)
                    .await
            }
        }
    }

    /// Negative-path requests. Results feed the stats only.
    async fn fuzz_node(&mut self, id: NodeId) {
        let node = self.graph.node(id);
        let Some(op) = node.as_operation() else {
            return;
        };

        if !self.config.skip_maximal_payloads {
            let result = self.fengine.run_maximal_payload(op, &self.bucket, &mut self.rng).await;
            self.stats.update_from_result(node, &result);
        }

        if !self.config.skip_dos_attacks {
            for result in self.fengine.run_dos_payloads(op, &self.bucket, &mut self.rng).await {
                self.stats.update_from_result(node, &result);
            }
        }

        let detections = self
            .dengine
            .run_detections(&self.fengine, op, &self.bucket, &mut self.rng)
            .await;
        for detection in detections {
            if let Some(status) = detection.result.status_code {
                self.stats.add_http_status_code(&detection.node, status);
            }
            self.stats
                .add_vulnerability(detection.detector, &detection.node, detection.confirmed, detection.potential);
        }
    }

    /// Writes the bucket snapshot and stats into `dir`.
    pub async fn save(&self, dir: &Path) -> Result<(), FuzzError> {
        tokio::fs::create_dir_all(dir).await?;
        self.bucket.save(&dir.join(OBJECTS_BUCKET_FILE)).await?;
        self.stats.save(&dir.join(STATS_FILE)).await?;
        info!(dir = %dir.display(), "Saved run results");
        Ok(())
    }
}
