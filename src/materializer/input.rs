use serde_json::Value;
use tracing::warn;

use super::{Context, Materializer};
use crate::bucket::quote;
use crate::errors::FuzzError;
use crate::schema::{InputValue, Operation, TypeRef, UNKNOWN_PRODUCER};

impl Materializer<'_> {
    /// Renders `name: value` pairs for a list of inputs. Dependency lookups
    /// apply to the operation's own inputs and the input objects nested in
    /// them, never to field arguments inside the selection.
    pub(super) fn materialize_inputs(
        &self,
        op: &Operation,
        inputs: &[InputValue],
        ctx: &mut Context<'_, '_>,
        depth: usize,
        resolve_dependencies: bool,
    ) -> Result<String, FuzzError> {
        if depth >= self.options.max_input_depth {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(inputs.len());
        for input in inputs {
            let value = self.input_value(op, &input.name, &input.ty, ctx, depth, resolve_dependencies)?;
            parts.push(format!("{}: {}", input.name, value));
        }
        Ok(parts.join(", "))
    }

    fn input_value(
        &self,
        op: &Operation,
        input_name: &str,
        ty: &TypeRef,
        ctx: &mut Context<'_, '_>,
        depth: usize,
        resolve_dependencies: bool,
    ) -> Result<String, FuzzError> {
        if resolve_dependencies {
            if let Some(target) = op.hard_depends_on.get(input_name) {
                if target != UNKNOWN_PRODUCER {
                    if let Some(literal) = self.dependency_value(input_name, target, ty, ctx) {
                        return Ok(literal);
                    }
                    if self.options.strict_dependencies {
                        return Err(FuzzError::HardDependencyNotMet(format!(
                            "{} needs a {} for input '{}'",
                            op.name, target, input_name
                        )));
                    }
                    warn!(operation = %op.name, input = %input_name, object = %target, "Hard dependency not met, generating a value");
                }
            } else if let Some(target) = op.soft_depends_on.get(input_name) {
                if target != UNKNOWN_PRODUCER {
                    if let Some(literal) = self.dependency_value(input_name, target, ty, ctx) {
                        return Ok(literal);
                    }
                }
            }
        }

        self.input_literal(op, input_name, ty, ctx, depth, resolve_dependencies)
    }

    /// Generated literal for `ty`. Wrappers reuse the name's lookup result, so
    /// only input object fields are looked up again.
    fn input_literal(
        &self,
        op: &Operation,
        input_name: &str,
        ty: &TypeRef,
        ctx: &mut Context<'_, '_>,
        depth: usize,
        resolve_dependencies: bool,
    ) -> Result<String, FuzzError> {
        match ty {
            TypeRef::NonNull(inner) => self.input_literal(op, input_name, inner, ctx, depth, resolve_dependencies),
            TypeRef::List(inner) => Ok(format!(
                "[{}]",
                self.input_literal(op, input_name, inner, ctx, depth, resolve_dependencies)?
            )),
            TypeRef::InputObject(name) => {
                let input_object = self
                    .schema
                    .input_object(name)
                    .ok_or_else(|| FuzzError::Materialization(format!("Unknown input object: {name}")))?;
                let fields =
                    self.materialize_inputs(op, &input_object.input_fields, ctx, depth + 1, resolve_dependencies)?;
                Ok(format!("{{{fields}}}"))
            }
            TypeRef::Scalar(name) => Ok(self.getter.scalar_value(input_name, name, ctx.bucket, ctx.rng)),
            TypeRef::Enum(name) => {
                let enum_type = self
                    .schema
                    .enum_type(name)
                    .ok_or_else(|| FuzzError::Materialization(format!("Unknown enum: {name}")))?;
                self.getter
                    .enum_value(input_name, &enum_type.values, ctx.rng)
                    .ok_or_else(|| FuzzError::Materialization(format!("Enum {name} has no values")))
            }
            // Output-only kinds cannot be sent as input
            TypeRef::Object(_) | TypeRef::Union(_) | TypeRef::Interface(_) => Ok("null".to_string()),
        }
    }

    /// Literal taken from a stored instance of `object_name`, recorded in the
    /// used-objects map.
    fn dependency_value(
        &self,
        input_name: &str,
        object_name: &str,
        ty: &TypeRef,
        ctx: &mut Context<'_, '_>,
    ) -> Option<String> {
        if !ctx.bucket.is_object_in_bucket(object_name) {
            return None;
        }
        let used = ctx.bucket.get_closest_field(input_name, object_name, ctx.rng)?;
        let literal = bucket_literal(&used.value, ty);
        ctx.used_objects.insert(object_name.to_string(), used);
        Some(literal)
    }
}

/// Renders a stored value as a literal matching the input's base type.
fn bucket_literal(value: &Value, ty: &TypeRef) -> String {
    let literal = match (ty.base(), value) {
        (TypeRef::Scalar(name), Value::Number(n)) if name == "Int" || name == "Float" => n.to_string(),
        (TypeRef::Scalar(name), Value::Bool(b)) if name == "Boolean" => b.to_string(),
        (TypeRef::Enum(_), Value::String(s)) => s.clone(),
        (_, Value::String(s)) => quote(s),
        (_, other) => quote(&other.to_string()),
    };
    if ty.is_list() {
        format!("[{literal}]")
    } else {
        literal
    }
}
