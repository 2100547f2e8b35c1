use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration file contents. Every section and field is optional.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GqlFuzzConfig {
    pub materializer: Option<MaterializerConfig>,
    pub fuzzing: Option<FuzzingConfig>,
    pub request: Option<RequestConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MaterializerConfig {
    pub max_object_cycles: Option<usize>,
    pub max_output_depth: Option<usize>,
    pub max_input_depth: Option<usize>,
    pub hard_cutoff_depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FuzzingConfig {
    pub no_data_count_as_success: Option<bool>,
    pub allow_deletion_of_objects: Option<bool>,
    pub max_fuzzing_iterations: Option<usize>,
    pub max_time_secs: Option<u64>,
    pub skip_maximal_payloads: Option<bool>,
    pub skip_dos_attacks: Option<bool>,
    pub skip_injection_attacks: Option<bool>,
    pub skip_misc_attacks: Option<bool>,
    pub skip_nodes: Option<Vec<String>>,
    pub use_dependency_graph: Option<bool>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RequestConfig {
    pub timeout_secs: Option<u64>,
    pub time_between_requests_ms: Option<u64>,
    pub headers: Option<BTreeMap<String, String>>,
    pub authorization: Option<String>,
    pub proxy: Option<String>,
}

/// Bounds applied while rendering payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializerLimits {
    pub max_object_cycles: usize,
    pub max_output_depth: usize,
    pub max_input_depth: usize,
    pub hard_cutoff_depth: usize,
}

impl Default for MaterializerLimits {
    fn default() -> Self {
        Self {
            max_object_cycles: 5,
            max_output_depth: 5,
            max_input_depth: 20,
            hard_cutoff_depth: 20,
        }
    }
}

/// Fully resolved settings for one run: file values over built-in defaults,
/// with CLI overrides applied by the caller.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub limits: MaterializerLimits,
    pub no_data_count_as_success: bool,
    pub allow_deletion_of_objects: bool,
    pub max_fuzzing_iterations: usize,
    pub max_time: Duration,
    pub skip_maximal_payloads: bool,
    pub skip_dos_attacks: bool,
    pub skip_injection_attacks: bool,
    pub skip_misc_attacks: bool,
    pub skip_nodes: Vec<String>,
    pub use_dependency_graph: bool,
    pub seed: Option<u64>,
    pub request_timeout: Duration,
    pub time_between_requests: Duration,
    pub headers: BTreeMap<String, String>,
    pub authorization: Option<String>,
    pub proxy: Option<String>,
    /// Maximum orchestrator requeues for a failing node within one pass.
    pub max_requeues: u32,
    /// Maximum Retrier repair attempts for one response.
    pub max_retries: u32,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limits: MaterializerLimits::default(),
            no_data_count_as_success: false,
            allow_deletion_of_objects: false,
            max_fuzzing_iterations: 5,
            max_time: Duration::from_secs(3600),
            skip_maximal_payloads: false,
            skip_dos_attacks: true,
            skip_injection_attacks: false,
            skip_misc_attacks: false,
            skip_nodes: Vec::new(),
            use_dependency_graph: true,
            seed: None,
            request_timeout: Duration::from_secs(120),
            time_between_requests: Duration::from_millis(1),
            headers: BTreeMap::new(),
            authorization: None,
            proxy: None,
            max_requeues: 3,
            max_retries: 3,
            show_progress: false,
        }
    }
}

impl RunConfig {
    pub fn from_file(file: Option<&GqlFuzzConfig>) -> Self {
        let mut config = RunConfig::default();
        let Some(file) = file else {
            return config;
        };

        if let Some(m) = &file.materializer {
            let limits = &mut config.limits;
            limits.max_object_cycles = m.max_object_cycles.unwrap_or(limits.max_object_cycles);
            limits.max_output_depth = m.max_output_depth.unwrap_or(limits.max_output_depth);
            limits.max_input_depth = m.max_input_depth.unwrap_or(limits.max_input_depth);
            limits.hard_cutoff_depth = m.hard_cutoff_depth.unwrap_or(limits.hard_cutoff_depth);
        }

        if let Some(f) = &file.fuzzing {
            config.no_data_count_as_success = f.no_data_count_as_success.unwrap_or(config.no_data_count_as_success);
            config.allow_deletion_of_objects = f.allow_deletion_of_objects.unwrap_or(config.allow_deletion_of_objects);
            config.max_fuzzing_iterations = f.max_fuzzing_iterations.unwrap_or(config.max_fuzzing_iterations);
            if let Some(secs) = f.max_time_secs {
                config.max_time = Duration::from_secs(secs);
            }
            config.skip_maximal_payloads = f.skip_maximal_payloads.unwrap_or(config.skip_maximal_payloads);
            config.skip_dos_attacks = f.skip_dos_attacks.unwrap_or(config.skip_dos_attacks);
            config.skip_injection_attacks = f.skip_injection_attacks.unwrap_or(config.skip_injection_attacks);
            config.skip_misc_attacks = f.skip_misc_attacks.unwrap_or(config.skip_misc_attacks);
            if let Some(nodes) = &f.skip_nodes {
                config.skip_nodes = nodes.clone();
            }
            config.use_dependency_graph = f.use_dependency_graph.unwrap_or(config.use_dependency_graph);
            config.seed = f.seed.or(config.seed);
        }

        if let Some(r) = &file.request {
            if let Some(secs) = r.timeout_secs {
                config.request_timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = r.time_between_requests_ms {
                config.time_between_requests = Duration::from_millis(ms);
            }
            if let Some(headers) = &r.headers {
                config.headers = headers.clone();
            }
            config.authorization = r.authorization.clone();
            config.proxy = r.proxy.clone();
        }

        config
    }

    pub fn is_skipped(&self, node_name: &str) -> bool {
        self.skip_nodes.iter().any(|n| n == node_name)
    }
}
