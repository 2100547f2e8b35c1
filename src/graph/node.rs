use serde::Serialize;
use std::fmt;

use crate::schema::{MutationType, ObjectType, Operation, OperationKind};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeKind {
    Object,
    Query,
    Mutation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Object => "Object",
            NodeKind::Query => "Query",
            NodeKind::Mutation => "Mutation",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OperationKind> for NodeKind {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Query => NodeKind::Query,
            OperationKind::Mutation => NodeKind::Mutation,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeBody {
    Object(ObjectType),
    Operation(Operation),
}

/// One vertex of the dependency graph. Identity is `(kind, name)`.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
    pub body: NodeBody,
    pub mutation_type: Option<MutationType>,
}

impl Node {
    pub fn object(object: &ObjectType) -> Self {
        Self {
            kind: NodeKind::Object,
            name: object.name.clone(),
            body: NodeBody::Object(object.clone()),
            mutation_type: None,
        }
    }

    pub fn operation(op: &Operation) -> Self {
        Self {
            kind: op.kind.into(),
            name: op.name.clone(),
            body: NodeBody::Operation(op.clone()),
            mutation_type: op.mutation_type,
        }
    }

    /// Key used in stats and ledgers, e.g. `Mutation|createUser`.
    pub fn key(&self) -> String {
        format!("{}|{}", self.kind, self.name)
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match &self.body {
            NodeBody::Operation(op) => Some(op),
            NodeBody::Object(_) => None,
        }
    }

    pub fn operation_kind(&self) -> Option<OperationKind> {
        self.as_operation().map(|op| op.kind)
    }

    pub fn is_operation(&self) -> bool {
        self.kind != NodeKind::Object
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.kind, self.name)
    }
}
