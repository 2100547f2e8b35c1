use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use gqlfuzz::bucket::ObjectsBucket;
use gqlfuzz::config::{parse_config, validate_run_config, RunConfig};
use gqlfuzz::fuzzer::{Fuzzer, OBJECTS_BUCKET_FILE};
use gqlfuzz::schema::{load_compiled_schema, CompiledSchema};
use gqlfuzz::transport::HttpTransport;

use crate::cli::commands::{FuzzArgs, SingleArgs, TargetArgs};

pub const IDOR_REPORT_FILE: &str = "idor_report.json";

/// Loads the compiled schema and merges config file values with CLI flags.
async fn prepare(target: &TargetArgs) -> Result<(CompiledSchema, RunConfig)> {
    let file = match &target.config {
        Some(path) => Some(parse_config(Path::new(path)).await?),
        None => None,
    };
    let mut config = RunConfig::from_file(file.as_ref());
    if let Some(auth) = &target.auth {
        config.authorization = Some(auth.clone());
    }
    if let Some(proxy) = &target.proxy {
        config.proxy = Some(proxy.clone());
    }

    let schema = load_compiled_schema(Path::new(&target.path)).await?;
    Ok((schema, config))
}

fn build_fuzzer(target: &TargetArgs, schema: CompiledSchema, config: RunConfig) -> Result<Fuzzer> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    Ok(Fuzzer::new(schema, transport, &target.url, config))
}

pub async fn handle_fuzz(args: FuzzArgs) -> Result<()> {
    let (schema, mut config) = prepare(&args.target).await?;
    if args.no_dfs {
        config.use_dependency_graph = false;
    }
    if let Some(secs) = args.max_time {
        config.max_time = Duration::from_secs(secs);
    }
    config.show_progress = args.progress;
    validate_run_config(&config, None)?;

    let mut fuzzer = build_fuzzer(&args.target, schema, config)?;
    let token = fuzzer.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let status = fuzzer.run().await;
    let dir = Path::new(&args.target.path);
    fuzzer.save(dir).await.context("Saving run results")?;

    println!("{}", fuzzer.stats().summary());
    println!("Run {}: results written to {}", status, dir.display());
    Ok(())
}

pub async fn handle_single(args: SingleArgs) -> Result<()> {
    let (schema, config) = prepare(&args.target).await?;
    validate_run_config(&config, Some(args.node.as_str()))?;

    let mut fuzzer = build_fuzzer(&args.target, schema, config)?;
    let result = fuzzer.run_single(&args.node).await?;
    fuzzer
        .save(Path::new(&args.target.path))
        .await
        .context("Saving run results")?;

    println!("{}: {}", args.node, result.kind);
    println!("{}", result.payload);
    if let Some(status) = result.status_code {
        println!("HTTP {}: {}", status, result.response);
    }
    Ok(())
}

pub async fn handle_idor(args: TargetArgs) -> Result<()> {
    let (schema, config) = prepare(&args).await?;
    validate_run_config(&config, None)?;

    let dir = Path::new(&args.path);
    let bucket_path = dir.join(OBJECTS_BUCKET_FILE);
    let bucket = ObjectsBucket::load(&bucket_path)
        .await
        .with_context(|| format!("Loading objects bucket from {}", bucket_path.display()))?;
    info!(objects = bucket.instance_count(), "Loaded objects bucket");

    let mut fuzzer = build_fuzzer(&args, schema, config)?.with_bucket(bucket);
    let report = fuzzer.run_idor().await;

    let report_path = dir.join(IDOR_REPORT_FILE);
    tokio::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .await
        .with_context(|| format!("Writing {}", report_path.display()))?;

    println!("Checked {} operations", report.checked);
    if report.possible_idor_nodes.is_empty() {
        println!("No possible IDOR found");
    } else {
        println!("Possible IDOR:");
        for node in &report.possible_idor_nodes {
            println!("  {node}");
        }
    }
    Ok(())
}
