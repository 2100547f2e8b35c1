use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use gqlfuzz::graph::dot::to_dot;
use gqlfuzz::graph::{build_dependency_graph, NodeId, NodeKind};
use gqlfuzz::schema::load_compiled_schema;

use crate::cli::commands::GraphArgs;

pub async fn handle_graph(args: GraphArgs) -> Result<()> {
    let schema = load_compiled_schema(Path::new(&args.path)).await?;
    let graph = build_dependency_graph(&schema);

    let count = |kind: NodeKind| graph.nodes().iter().filter(|n| n.kind == kind).count();
    println!(
        "Nodes: {} ({} queries, {} mutations, {} objects)",
        graph.node_count(),
        count(NodeKind::Query),
        count(NodeKind::Mutation),
        count(NodeKind::Object)
    );
    println!("Edges: {}", graph.edge_count());

    let starters = graph.starter_nodes(&mut StdRng::from_entropy());
    println!("Starter nodes:");
    for id in starters {
        println!("  {}", graph.node(id).key());
    }

    let mut ranked: Vec<NodeId> = (0..graph.node_count()).filter(|&id| graph.in_degree(id) > 0).collect();
    ranked.sort_by(|&a, &b| graph.in_degree_centrality(b).total_cmp(&graph.in_degree_centrality(a)));
    if !ranked.is_empty() {
        println!("Most depended on:");
        for id in ranked.into_iter().take(5) {
            println!("  {} ({:.2})", graph.node(id).key(), graph.in_degree_centrality(id));
        }
    }

    if let Some(dot) = &args.dot {
        tokio::fs::write(dot, to_dot(&graph))
            .await
            .with_context(|| format!("Writing {dot}"))?;
        println!("Wrote {dot}");
    }
    Ok(())
}
