#![allow(clippy::print_stderr)]
use crate::cli::{Args, Command, Strategy};
use anyhow::{bail, Context};
use clap::Parser;
use itertools::Itertools;
use oxrdfio::{RdfFormat, RdfSerializer};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{stdout, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tpf_join_engine::{JoinOptions, JoinScheduler};
use tpf_join_model::{GraphPattern, Query, TriplePattern};
use tpf_join_storage::{MemoryFragmentSource, MemoryResultStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

/// Number of rounds after which the broadcast strategy stops if no limit is given.
const DEFAULT_BROADCAST_ROUNDS: usize = 1000;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    init_logging();

    let matches = Args::parse();
    match matches.command {
        Command::Run {
            data,
            format,
            query,
            query_file,
            page_size,
            strategy,
            max_rounds,
            no_bound_filters,
            bindings,
        } => {
            let format = if let Some(format) = format {
                rdf_format_from_name(&format)?
            } else {
                rdf_format_from_path(&data)?
            };
            let query = read_query(query, query_file)?;
            let patterns = basic_graph_pattern(&query)?;

            let file = File::open(&data)
                .with_context(|| format!("Failed to open data file {}", data.display()))?;
            let source = MemoryFragmentSource::load(BufReader::new(file), format)
                .with_context(|| format!("Failed to load data file {}", data.display()))?
                .with_page_size(page_size);
            info!(
                triples = source.len(),
                page_size = source.page_size(),
                "loaded {}",
                data.display()
            );

            let store = Arc::new(MemoryResultStore::new());
            let mut options = JoinOptions::new(Arc::new(source))
                .with_sink(Arc::clone(&store) as _)
                .with_bound_filters(!no_bound_filters);
            if let Some(max_rounds) = max_rounds {
                options = options.with_max_rounds(max_rounds);
            }

            let mut scheduler = JoinScheduler::create(patterns, options).await?;
            let summary = match strategy {
                Strategy::Greedy => scheduler.run().await?,
                Strategy::Broadcast => {
                    scheduler
                        .run_broadcast(max_rounds.unwrap_or(DEFAULT_BROADCAST_ROUNDS))
                        .await?
                }
            };
            info!(
                rounds = summary.rounds,
                reads = summary.reads,
                exhausted = summary.exhausted,
                "join finished"
            );

            let mut serializer =
                RdfSerializer::from_format(RdfFormat::NTriples).for_writer(stdout().lock());
            for triple in store.triples().await {
                serializer.serialize_triple(&triple)?;
            }
            serializer.finish()?.flush()?;

            if bindings {
                for cluster in scheduler.clusters() {
                    eprintln!(
                        "{}: {}",
                        cluster.variable(),
                        cluster.bindings().iter().map(ToString::to_string).sorted().join(" ")
                    );
                    if let Some(bounds) = cluster.bounds() {
                        eprintln!(
                            "{} bounds: {}",
                            cluster.variable(),
                            bounds.iter().map(ToString::to_string).sorted().join(" ")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tpf_join_engine=info,tpf_join_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_query(query: Option<String>, query_file: Option<PathBuf>) -> anyhow::Result<String> {
    match (query, query_file) {
        (Some(query), None) => Ok(query),
        (None, Some(file)) => fs::read_to_string(&file)
            .with_context(|| format!("Failed to read query file {}", file.display())),
        _ => bail!("Exactly one of --query and --query-file must be given"),
    }
}

/// Extracts the triple patterns of the basic graph pattern that a SELECT or ASK query evaluates.
///
/// Projection, DISTINCT, REDUCED and slicing around the basic graph pattern are ignored.
fn basic_graph_pattern(query: &str) -> anyhow::Result<Vec<TriplePattern>> {
    let query = Query::parse(query, None).context("Invalid SPARQL query")?;
    let mut pattern = match &query {
        Query::Select { pattern, .. } | Query::Ask { pattern, .. } => pattern,
        Query::Construct { .. } | Query::Describe { .. } => {
            bail!("Only SELECT and ASK queries are supported")
        }
    };
    loop {
        match pattern {
            GraphPattern::Bgp { patterns } => return Ok(patterns.clone()),
            GraphPattern::Project { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. } => pattern = inner.as_ref(),
            _ => bail!("The query must consist of a single basic graph pattern"),
        }
    }
}

fn format_from_path<T>(
    path: &Path,
    from_extension: impl FnOnce(&str) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        from_extension(ext).map_err(|e| {
            e.context(format!(
                "Not able to guess the file format from file name extension '{ext}'"
            ))
        })
    } else {
        bail!(
            "The path {} has no extension to guess a file format from",
            path.display()
        )
    }
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    format_from_path(path, |ext| {
        RdfFormat::from_extension(ext)
            .with_context(|| format!("The file extension '{ext}' is unknown"))
    })
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    if let Some(t) = RdfFormat::from_extension(name) {
        return Ok(t);
    }
    if let Some(t) = RdfFormat::from_media_type(name) {
        return Ok(t);
    }
    bail!("The file format '{name}' is unknown")
}
