pub mod loader;
mod ordered;
pub mod types;

pub use loader::{load_compiled_schema, SchemaSources};
pub use types::*;

use std::collections::BTreeMap;

/// The compiled schema a run is driven from, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    pub queries: BTreeMap<String, Operation>,
    pub mutations: BTreeMap<String, Operation>,
    pub objects: BTreeMap<String, ObjectType>,
    pub input_objects: BTreeMap<String, InputObject>,
    pub enums: BTreeMap<String, EnumType>,
    pub unions: BTreeMap<String, AbstractType>,
    pub interfaces: BTreeMap<String, AbstractType>,
}

impl CompiledSchema {
    /// Fills in names from map keys, operation kinds, and inferred mutation
    /// types where the compiled files left them out.
    pub(crate) fn normalize(&mut self) {
        for (name, op) in self.queries.iter_mut() {
            op.name = name.clone();
            op.kind = OperationKind::Query;
            op.mutation_type = None;
        }
        for (name, op) in self.mutations.iter_mut() {
            op.name = name.clone();
            op.kind = OperationKind::Mutation;
            if op.mutation_type.is_none() {
                op.mutation_type = Some(MutationType::infer(name, op.description.as_deref()));
            }
        }
        for (name, object) in self.objects.iter_mut() {
            object.name = name.clone();
        }
        for (name, input) in self.input_objects.iter_mut() {
            input.name = name.clone();
        }
    }

    pub fn operation(&self, kind: OperationKind, name: &str) -> Option<&Operation> {
        match kind {
            OperationKind::Query => self.queries.get(name),
            OperationKind::Mutation => self.mutations.get(name),
        }
    }

    /// Looks a name up among queries first, then mutations.
    pub fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.queries.get(name).or_else(|| self.mutations.get(name))
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    pub fn input_object(&self, name: &str) -> Option<&InputObject> {
        self.input_objects.get(name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    /// Concrete object names a union or interface type can resolve to.
    pub fn possible_objects(&self, ty: &TypeRef) -> Vec<&str> {
        let entry = match ty.base() {
            TypeRef::Union(name) => self.unions.get(name),
            TypeRef::Interface(name) => self.interfaces.get(name),
            _ => None,
        };
        entry.map(|e| e.object_names().collect()).unwrap_or_default()
    }

    pub fn operation_count(&self) -> usize {
        self.queries.len() + self.mutations.len()
    }
}
