//! Vulnerability detectors run against each operation alongside the positive
//! traversal. Detections never change the objects bucket.

mod introspection;
mod os_command;
mod sql_injection;

pub use introspection::IntrospectionDetector;
pub use os_command::{OsCommandInjectionDetector, OsCommandInjectionGetter};
pub use sql_injection::{SqlInjectionDetector, SqlInjectionGetter, SQL_INJECTION_STRING};

use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info};

use crate::bucket::ObjectsBucket;
use crate::config::RunConfig;
use crate::engine::{FEngine, OpResult};
use crate::materializer::{Getter, MaterializeOptions};
use crate::schema::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorCategory {
    Injection,
    Misc,
}

impl DetectorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorCategory::Injection => "injection",
            DetectorCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for DetectorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> DetectorCategory;

    fn only_once_for_node(&self) -> bool {
        true
    }

    fn only_once_for_api(&self) -> bool {
        false
    }

    /// Value source used to materialize the attack payload.
    fn getter(&self) -> &dyn Getter;

    /// A request sent verbatim instead of materializing the operation.
    fn fixed_payload(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// Returns `(confirmed, potential)`.
    fn evaluate(&self, payload: &str, result: &OpResult) -> (bool, bool);
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub detector: &'static str,
    pub node: String,
    pub confirmed: bool,
    pub potential: bool,
    pub result: OpResult,
}

/// Runs detectors and remembers which already ran where.
pub struct DEngine {
    detectors: Vec<Box<dyn Detector>>,
    ran: HashMap<String, HashSet<&'static str>>,
    skip_injection: bool,
    skip_misc: bool,
}

impl DEngine {
    pub fn new(config: &RunConfig) -> Self {
        Self::with_detectors(config, default_detectors())
    }

    pub fn with_detectors(config: &RunConfig, detectors: Vec<Box<dyn Detector>>) -> Self {
        Self {
            detectors,
            ran: HashMap::new(),
            skip_injection: config.skip_injection_attacks,
            skip_misc: config.skip_misc_attacks,
        }
    }

    fn is_enabled(&self, category: DetectorCategory) -> bool {
        match category {
            DetectorCategory::Injection => !self.skip_injection,
            DetectorCategory::Misc => !self.skip_misc,
        }
    }

    fn should_run(&self, detector: &dyn Detector, node: &str) -> bool {
        let name = detector.name();
        if detector.only_once_for_node() && self.ran.get(node).is_some_and(|set| set.contains(name)) {
            return false;
        }
        if detector.only_once_for_api() && self.ran.values().any(|set| set.contains(name)) {
            return false;
        }
        true
    }

    pub fn has_run(&self, node: &str, detector: &str) -> bool {
        self.ran.get(node).is_some_and(|set| set.contains(detector))
    }

    pub async fn run_detections(
        &mut self,
        fengine: &FEngine,
        op: &Operation,
        bucket: &ObjectsBucket,
        rng: &mut StdRng,
    ) -> Vec<Detection> {
        let mut detections = Vec::new();
        let options = MaterializeOptions::detection(fengine.limits());

        for detector in &self.detectors {
            let detector = detector.as_ref();
            if !self.is_enabled(detector.category()) || !self.should_run(detector, &op.name) {
                continue;
            }

            debug!(node = %op.name, detector = detector.name(), "Running detector");
            let result = match detector.fixed_payload() {
                Some((response_key, payload)) => fengine.send_payload(response_key, payload).await,
                None => {
                    fengine
                        .run_with_getter(op, bucket, rng, detector.getter(), options)
                        .await
                }
            };
            let (confirmed, potential) = detector.evaluate(&result.payload, &result);
            info!(
                node = %op.name,
                detector = detector.name(),
                confirmed,
                potential,
                "Detector finished"
            );

            self.ran.entry(op.name.clone()).or_default().insert(detector.name());
            detections.push(Detection {
                detector: detector.name(),
                node: op.name.clone(),
                confirmed,
                potential,
                result,
            });
        }
        detections
    }
}

pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(SqlInjectionDetector::default()),
        Box::new(OsCommandInjectionDetector::default()),
        Box::new(IntrospectionDetector::default()),
    ]
}
