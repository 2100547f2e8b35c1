use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::result::{classify_response, OpResult, SuccessPolicy};
use crate::bucket::{ObjectsBucket, UsedValue};
use crate::config::{MaterializerLimits, RunConfig};
use crate::errors::FuzzError;
use crate::materializer::{DefaultGetter, Getter, MaterializeOptions, Materializer, Payload};
use crate::retrier::Retrier;
use crate::schema::{CompiledSchema, MutationType, Operation, OperationKind};
use crate::transport::Transport;

/// Aliased copies of the operation in a batching payload.
pub const DOS_BATCH_SIZE: usize = 10;

/// Materializes payloads, sends them and folds successful responses into
/// the objects bucket.
pub struct FEngine {
    schema: Arc<CompiledSchema>,
    transport: Arc<dyn Transport>,
    url: String,
    limits: MaterializerLimits,
    policy: SuccessPolicy,
    allow_deletion: bool,
    dos_iterations: usize,
    retrier: Retrier,
}

impl FEngine {
    pub fn new(schema: Arc<CompiledSchema>, transport: Arc<dyn Transport>, url: &str, config: &RunConfig) -> Self {
        Self {
            schema,
            transport,
            url: url.to_string(),
            limits: config.limits,
            policy: SuccessPolicy {
                no_data_counts_as_success: config.no_data_count_as_success,
            },
            allow_deletion: config.allow_deletion_of_objects,
            dos_iterations: config.max_fuzzing_iterations,
            retrier: Retrier::new(config.max_retries),
        }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn limits(&self) -> &MaterializerLimits {
        &self.limits
    }

    /// Positive-path run. The only call that changes the bucket.
    pub async fn run_minimal_payload(
        &self,
        op: &Operation,
        bucket: &mut ObjectsBucket,
        rng: &mut StdRng,
        strict: bool,
    ) -> OpResult {
        info!(node = %op.name, kind = %op.kind.as_str(), "Running minimal payload");
        let options = MaterializeOptions::minimal(&self.limits, strict);
        let payload = match self.materialize(op, bucket, rng, &DefaultGetter, options) {
            Ok(payload) => payload,
            Err(result) => return result,
        };

        let result = self.send_payload(&op.name, &payload.text).await;
        if result.is_success() {
            self.apply_to_bucket(op, &result, &payload.used_objects, bucket);
        }
        result
    }

    pub async fn run_maximal_payload(&self, op: &Operation, bucket: &ObjectsBucket, rng: &mut StdRng) -> OpResult {
        info!(node = %op.name, "Running maximal payload");
        let options = MaterializeOptions::maximal(&self.limits);
        match self.materialize(op, bucket, rng, &DefaultGetter, options) {
            Ok(payload) => self.send_payload(&op.name, &payload.text).await,
            Err(result) => result,
        }
    }

    /// Deep-recursion payloads at random depths, then one batching payload.
    pub async fn run_dos_payloads(&self, op: &Operation, bucket: &ObjectsBucket, rng: &mut StdRng) -> Vec<OpResult> {
        let ceiling = self.limits.hard_cutoff_depth.min(self.limits.max_input_depth).max(1);
        let mut results = Vec::with_capacity(self.dos_iterations + 1);

        for _ in 0..self.dos_iterations {
            let depth = rng.gen_range(1..=ceiling);
            info!(node = %op.name, depth, "Running deep recursion payload");
            let options = MaterializeOptions::deep_recursion(&self.limits, depth);
            let result = match self.materialize(op, bucket, rng, &DefaultGetter, options) {
                Ok(payload) => self.send_payload(&op.name, &payload.text).await,
                Err(result) => result,
            };
            results.push(result);
        }

        info!(node = %op.name, copies = DOS_BATCH_SIZE, "Running batch payload");
        let options = MaterializeOptions::batched(&self.limits, DOS_BATCH_SIZE);
        let result = match self.materialize(op, bucket, rng, &DefaultGetter, options) {
            Ok(payload) => self.send_payload("a0", &payload.text).await,
            Err(result) => result,
        };
        results.push(result);
        results
    }

    /// Materializes with a detector's getter and sends the result. Never touches
    /// the bucket.
    pub async fn run_with_getter(
        &self,
        op: &Operation,
        bucket: &ObjectsBucket,
        rng: &mut StdRng,
        getter: &dyn Getter,
        options: MaterializeOptions,
    ) -> OpResult {
        match self.materialize(op, bucket, rng, getter, options) {
            Ok(payload) => self.send_payload(&op.name, &payload.text).await,
            Err(result) => result,
        }
    }

    /// Sends `text` and classifies the response for the field `response_key`,
    /// repairing recoverable errors on the way.
    pub async fn send_payload(&self, response_key: &str, text: &str) -> OpResult {
        debug!(node = %response_key, payload = %text, "Sending payload");
        let response = match self.transport.send_request(&self.url, text).await {
            Ok(response) => response,
            Err(e) => {
                warn!(node = %response_key, error_type = e.classify().error_type, error = %e, "Request failed");
                return OpResult::internal_failure(text);
            }
        };
        debug!(status = response.status, "Response code");

        let (payload, response) = if response.has_errors() {
            info!(
                node = %response_key,
                error = %response.errors().first().unwrap_or(&serde_json::Value::Null),
                "Request returned errors, retrying"
            );
            match self
                .retrier
                .retry(self.transport.as_ref(), &self.url, text, response)
                .await
            {
                Ok(outcome) => (outcome.payload, outcome.response),
                Err(e) => {
                    warn!(node = %response_key, error = %e, "Retry failed");
                    return OpResult::internal_failure(text);
                }
            }
        } else {
            (text.to_string(), response)
        };

        let kind = classify_response(&response, response_key, self.policy);
        debug!(node = %response_key, result = %kind, "Classified response");
        OpResult {
            kind,
            payload,
            status_code: Some(response.status),
            response: response.body,
        }
    }

    fn materialize(
        &self,
        op: &Operation,
        bucket: &ObjectsBucket,
        rng: &mut StdRng,
        getter: &dyn Getter,
        options: MaterializeOptions,
    ) -> Result<Payload, OpResult> {
        Materializer::new(&self.schema, getter, options)
            .materialize(op, bucket, rng)
            .map_err(|e| {
                let error_type = e.classify().error_type;
                match &e {
                    FuzzError::HardDependencyNotMet(_) => info!(node = %op.name, error = %e, "Skipping node"),
                    _ => warn!(node = %op.name, error_type, error = %e, "Materialization failed"),
                }
                OpResult::internal_failure("")
            })
    }

    fn apply_to_bucket(
        &self,
        op: &Operation,
        result: &OpResult,
        used_objects: &BTreeMap<String, UsedValue>,
        bucket: &mut ObjectsBucket,
    ) {
        let Some(data) = result.data() else {
            return;
        };
        let returned_object = matches!(data.get(&op.name), Some(Value::Object(_) | Value::Array(_)));

        match (op.kind, op.mutation_type) {
            (OperationKind::Query, _) | (OperationKind::Mutation, Some(MutationType::Create)) => {
                if returned_object {
                    bucket.put(data, &self.schema);
                }
            }
            (OperationKind::Mutation, Some(MutationType::Delete)) if self.allow_deletion => {
                for (object, used) in used_objects {
                    let removed = bucket.remove_instance(object, used);
                    debug!(node = %op.name, object = %object, field = %used.field, removed, "Removed deleted instance");
                }
            }
            _ => {}
        }
    }
}
