use tracing::debug;

use super::render::{clean_output_selectors, is_valid_selection};
use super::{Context, Materializer};
use crate::errors::FuzzError;
use crate::schema::{Field, Operation, TypeRef};

impl Materializer<'_> {
    /// Selection set for the operation's output, or an empty string for
    /// scalar outputs. Escalates the depth limit until something selectable
    /// shows up. An object output with nothing selectable within the hard
    /// cutoff is an error, since a bare composite field is not a valid request.
    pub(super) fn materialize_output(&self, op: &Operation, ctx: &mut Context<'_, '_>) -> Result<String, FuzzError> {
        if op.output.is_simple_scalar() {
            return Ok(String::new());
        }

        let mut max_depth = self.options.max_output_depth;
        loop {
            let mut path = Vec::new();
            let raw = self.output_type(op, &op.output, ctx, &mut path, 0, max_depth)?;
            let selection = clean_output_selectors(&raw);
            if !selection.is_empty() && is_valid_selection(&selection) {
                return Ok(selection);
            }
            if max_depth >= self.options.hard_cutoff_depth {
                debug!(operation = %op.name, "No selectable output within the hard cutoff depth");
                return Err(FuzzError::Materialization(format!(
                    "No selectable output for {} within depth {}",
                    op.name, self.options.hard_cutoff_depth
                )));
            }
            max_depth += 1;
        }
    }

    fn output_type(
        &self,
        op: &Operation,
        ty: &TypeRef,
        ctx: &mut Context<'_, '_>,
        path: &mut Vec<String>,
        depth: usize,
        max_depth: usize,
    ) -> Result<String, FuzzError> {
        match ty {
            TypeRef::NonNull(inner) | TypeRef::List(inner) => self.output_type(op, inner, ctx, path, depth, max_depth),
            TypeRef::Object(name) => {
                let fields = self.object_fields(op, name, ctx, path, depth, max_depth)?;
                Ok(if fields.is_empty() { fields } else { format!("{{ {fields} }}") })
            }
            TypeRef::Union(_) | TypeRef::Interface(_) => {
                let mut fragments = Vec::new();
                for object_name in self.schema.possible_objects(ty) {
                    let fields = self.object_fields(op, object_name, ctx, path, depth, max_depth)?;
                    if !fields.is_empty() {
                        fragments.push(format!("... on {object_name} {{ {fields} }}"));
                    }
                }
                if fragments.is_empty() {
                    return Ok(String::new());
                }
                Ok(format!("{{ __typename {} }}", fragments.join(" ")))
            }
            TypeRef::Scalar(_) | TypeRef::Enum(_) | TypeRef::InputObject(_) => Ok(String::new()),
        }
    }

    /// Space-separated field selections of one object. Refuses to enter an
    /// object already on the path `max_object_cycles` times.
    fn object_fields(
        &self,
        op: &Operation,
        object_name: &str,
        ctx: &mut Context<'_, '_>,
        path: &mut Vec<String>,
        depth: usize,
        max_depth: usize,
    ) -> Result<String, FuzzError> {
        let Some(object) = self.schema.object(object_name) else {
            return Ok(String::new());
        };
        if path.iter().filter(|p| *p == object_name).count() >= self.options.max_object_cycles {
            return Ok(String::new());
        }

        let has_scalars = object.fields.iter().any(|f| f.ty.is_simple_scalar());
        let scalars_only = depth >= max_depth || (self.options.minimal_output && has_scalars);
        let fields: Vec<&Field> = object
            .fields
            .iter()
            .filter(|f| !scalars_only || f.ty.is_simple_scalar())
            .collect();

        path.push(object_name.to_string());
        let mut selections = Vec::with_capacity(fields.len());
        for field in fields {
            let selection = self.field_selection(op, field, ctx, path, depth, max_depth)?;
            if !selection.is_empty() {
                selections.push(selection);
            }
        }
        path.pop();

        Ok(selections.join(" "))
    }

    fn field_selection(
        &self,
        op: &Operation,
        field: &Field,
        ctx: &mut Context<'_, '_>,
        path: &mut Vec<String>,
        depth: usize,
        max_depth: usize,
    ) -> Result<String, FuzzError> {
        let mut head = field.name.clone();
        if !field.inputs.is_empty() {
            let args = self.materialize_inputs(op, &field.inputs, ctx, 0, false)?;
            if !args.is_empty() {
                head.push_str(&format!("({args})"));
            }
        }

        if field.ty.is_simple_scalar() {
            return Ok(head);
        }

        let sub = self.output_type(op, &field.ty, ctx, path, depth + 1, max_depth)?;
        if sub.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{head} {sub}"))
    }
}
