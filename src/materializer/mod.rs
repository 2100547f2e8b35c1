//! Turns an operation description plus the current bucket into a request.

pub mod getter;
mod input;
mod output;
pub mod render;

pub use getter::{DefaultGetter, Getter};

use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::trace;

use crate::bucket::{ObjectsBucket, UsedValue};
use crate::config::MaterializerLimits;
use crate::errors::FuzzError;
use crate::schema::{CompiledSchema, Operation};

/// Input depth used when materializing with detector getters.
pub const DETECTION_INPUT_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOptions {
    pub max_input_depth: usize,
    pub max_output_depth: usize,
    pub max_object_cycles: usize,
    pub hard_cutoff_depth: usize,
    /// Keep only scalar fields where an object has any.
    pub minimal_output: bool,
    /// Fail with `HardDependencyNotMet` instead of generating a value.
    pub strict_dependencies: bool,
    /// Number of aliased copies of the operation in one request.
    pub batch: usize,
}

impl MaterializeOptions {
    fn base(limits: &MaterializerLimits) -> Self {
        Self {
            max_input_depth: limits.max_input_depth,
            max_output_depth: limits.max_output_depth,
            max_object_cycles: limits.max_object_cycles,
            hard_cutoff_depth: limits.hard_cutoff_depth,
            minimal_output: true,
            strict_dependencies: false,
            batch: 1,
        }
    }

    pub fn minimal(limits: &MaterializerLimits, strict_dependencies: bool) -> Self {
        Self {
            strict_dependencies,
            ..Self::base(limits)
        }
    }

    pub fn maximal(limits: &MaterializerLimits) -> Self {
        Self {
            minimal_output: false,
            ..Self::base(limits)
        }
    }

    /// Full expansion down to `depth`, letting recursive types nest as far as
    /// the cycle guard allows.
    pub fn deep_recursion(limits: &MaterializerLimits, depth: usize) -> Self {
        Self {
            minimal_output: false,
            max_output_depth: depth.clamp(1, limits.hard_cutoff_depth),
            ..Self::base(limits)
        }
    }

    pub fn batched(limits: &MaterializerLimits, count: usize) -> Self {
        Self {
            batch: count.max(1),
            ..Self::base(limits)
        }
    }

    pub fn detection(limits: &MaterializerLimits) -> Self {
        Self {
            max_input_depth: DETECTION_INPUT_DEPTH.min(limits.max_input_depth),
            ..Self::base(limits)
        }
    }
}

/// A rendered request and the bucket values it consumed, keyed by object name.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub text: String,
    pub used_objects: BTreeMap<String, UsedValue>,
}

/// Mutable state threaded through one materialization.
struct Context<'b, 'r> {
    bucket: &'b ObjectsBucket,
    rng: &'r mut StdRng,
    used_objects: BTreeMap<String, UsedValue>,
}

pub struct Materializer<'a> {
    schema: &'a CompiledSchema,
    getter: &'a dyn Getter,
    options: MaterializeOptions,
}

impl<'a> Materializer<'a> {
    pub fn new(schema: &'a CompiledSchema, getter: &'a dyn Getter, options: MaterializeOptions) -> Self {
        Self { schema, getter, options }
    }

    pub fn options(&self) -> &MaterializeOptions {
        &self.options
    }

    /// Renders `op` as a pretty-printed request.
    pub fn materialize(&self, op: &Operation, bucket: &ObjectsBucket, rng: &mut StdRng) -> Result<Payload, FuzzError> {
        let mut ctx = Context {
            bucket,
            rng,
            used_objects: BTreeMap::new(),
        };

        let inputs = self.materialize_inputs(op, &op.inputs, &mut ctx, 0, true)?;
        let selection = self.materialize_output(op, &mut ctx)?;

        let mut call = op.name.clone();
        if !inputs.is_empty() {
            call.push_str(&format!("({inputs})"));
        }
        if !selection.is_empty() {
            call.push(' ');
            call.push_str(&selection);
        }

        let body = if self.options.batch > 1 {
            (0..self.options.batch)
                .map(|i| format!("a{i}: {call}"))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            call
        };

        let raw = format!("{} {{ {} }}", op.kind.as_str(), body);
        trace!(operation = %op.name, payload = %raw, "Materialized raw payload");
        let text = render::prettify(&raw)?;

        Ok(Payload {
            text,
            used_objects: ctx.used_objects,
        })
    }
}
