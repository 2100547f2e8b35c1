use super::{DependencyGraph, NodeKind, HARD_EDGE_WEIGHT};

/// Renders the graph in Graphviz DOT format.
pub fn to_dot(graph: &DependencyGraph) -> String {
    let mut out = String::from("digraph dependencies {\n  rankdir=LR;\n");
    for (id, node) in graph.nodes().iter().enumerate() {
        let shape = match node.kind {
            NodeKind::Object => "ellipse",
            NodeKind::Query => "box",
            NodeKind::Mutation => "diamond",
        };
        let label = match node.mutation_type {
            Some(mt) => format!("{}\\n{}", node.name, mt),
            None => node.name.clone(),
        };
        out.push_str(&format!("  n{id} [label=\"{label}\", shape={shape}];\n"));
    }
    for edge in graph.edges() {
        let style = if edge.weight >= HARD_EDGE_WEIGHT { "solid" } else { "dashed" };
        out.push_str(&format!(
            "  n{} -> n{} [weight={}, style={style}];\n",
            edge.from, edge.to, edge.weight
        ));
    }
    out.push_str("}\n");
    out
}
