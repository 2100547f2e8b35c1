use tracing::debug;

use super::{DependencyGraph, Node, NodeKind, HARD_EDGE_WEIGHT, SOFT_EDGE_WEIGHT};
use crate::schema::{CompiledSchema, UNKNOWN_PRODUCER};

/// Builds the dependency graph for a compiled schema.
///
/// Operation -> Object edges mean the operation produces the object. Object ->
/// Operation edges mean the operation consumes it, hard (weight 100) or soft
/// (weight 1). Names that resolve to nothing are skipped.
pub fn build_dependency_graph(schema: &CompiledSchema) -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    for op in schema.queries.values().chain(schema.mutations.values()) {
        graph.add_node(Node::operation(op));
    }
    for object in schema.objects.values() {
        graph.add_node(Node::object(object));
    }

    // Operation -> Object: producers
    for object in schema.objects.values() {
        let Some(object_id) = graph.find(NodeKind::Object, &object.name) else {
            continue;
        };
        let producers = object
            .associated_queries
            .iter()
            .map(|name| (NodeKind::Query, name))
            .chain(object.associated_mutations.iter().map(|name| (NodeKind::Mutation, name)));
        for (kind, name) in producers {
            if name == UNKNOWN_PRODUCER {
                continue;
            }
            match graph.find(kind, name) {
                Some(op_id) => graph.add_edge(op_id, object_id, HARD_EDGE_WEIGHT),
                None => debug!(object = %object.name, operation = %name, "Associated operation not in schema"),
            }
        }
    }

    // Object -> Operation: consumers
    for op in schema.queries.values().chain(schema.mutations.values()) {
        let Some(op_id) = graph.find(op.kind.into(), &op.name) else {
            continue;
        };
        let dependencies = op
            .hard_depends_on
            .values()
            .map(|target| (target, HARD_EDGE_WEIGHT))
            .chain(op.soft_depends_on.values().map(|target| (target, SOFT_EDGE_WEIGHT)));
        for (target, weight) in dependencies {
            if target == UNKNOWN_PRODUCER {
                continue;
            }
            if let Some(object_id) = graph.find(NodeKind::Object, target) {
                graph.add_edge(object_id, op_id, weight);
            }
        }
    }

    debug!(nodes = graph.node_count(), edges = graph.edge_count(), "Built dependency graph");
    graph
}
