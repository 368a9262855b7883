use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use websim_core::cluster::{DEFAULT_K, DEFAULT_MAX_ITERATIONS};
use websim_core::persist::{append_id, save_snapshot_with_meta, SnapshotPaths, VectorMap};
use websim_core::{
    cluster_graph, load_or_rebuild, most_similar, path_cost, path_steps, rank_against, shortest_path, BuildConfig,
    ClusterConfig, Clusterer, Fetcher, FrequencyVector, SimilarityGraph, Tokenization, VectorBuilder,
};
use websim_crawler::{normalize_id, FetcherConfig, HttpFetcher};

#[derive(Parser)]
#[command(name = "analyzer")]
#[command(about = "Query a web-document similarity snapshot", long_about = None)]
struct Cli {
    /// Snapshot directory written by the crawler
    #[arg(long, global = true, default_value = "./data")]
    data: String,
    /// Maximum fetches in flight when the snapshot has to be rebuilt
    #[arg(long, global = true, default_value_t = 16)]
    concurrency: usize,
    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lowest summed-similarity route between two documents
    Path {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Connected components of the similarity graph
    Components,
    /// K-means clusters of all documents
    Clusters {
        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Every document ranked against a reference
    Rank {
        #[arg(long)]
        reference: String,
    },
    /// Closest documents to a reference
    Similar {
        #[arg(long)]
        reference: String,
        #[arg(long, default_value_t = 5)]
        top: usize,
        /// Only consider documents in the reference's k-means cluster
        #[arg(long, default_value_t = false)]
        within_cluster: bool,
        #[arg(long, default_value_t = DEFAULT_K)]
        k: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Fetch one more page and add it to the snapshot
    Add {
        #[arg(long)]
        url: String,
    },
}

#[derive(Serialize)]
struct ComponentsOut {
    count: usize,
    components: Vec<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let paths = SnapshotPaths::new(&cli.data);
    let fetcher = Arc::new(HttpFetcher::new(FetcherConfig::default())?);
    let builder = VectorBuilder::new(BuildConfig { max_concurrency: cli.concurrency });
    let loaded = load_or_rebuild(&paths, &builder, Arc::clone(&fetcher)).await?;
    let mut graph = SimilarityGraph::from_documents(loaded.documents());

    match cli.command {
        Commands::Path { from, to } => {
            for id in [&from, &to] {
                if !graph.contains(id) {
                    bail!("unknown document {id}");
                }
            }
            let path = shortest_path(&graph, &from, &to);
            let steps = path_steps(&from, &path);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&steps)?);
            } else if steps.is_empty() {
                println!("no path from {from} to {to}");
            } else {
                for s in &steps {
                    println!("{} -> {}  {:.4}  (total {:.4})", s.from, s.to, s.weight, s.cumulative);
                }
                println!("cost {:.4} over {} hops", path_cost(&path), steps.len());
            }
        }
        Commands::Components => {
            let out = ComponentsOut { count: graph.disjoint_set_count(), components: graph.components() };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{} components", out.count);
                for (i, members) in out.components.iter().enumerate() {
                    println!("[{i}] {}", members.join(" "));
                }
            }
        }
        Commands::Clusters { k, max_iterations, seed } => {
            let clusterer = Clusterer::new(ClusterConfig { k, max_iterations, seed });
            let clustering = cluster_graph(&graph, &clusterer)?;
            let views = clustering.views(5);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                println!(
                    "{} clusters after {} iterations{}",
                    views.len(),
                    clustering.run.iterations,
                    if clustering.run.converged { "" } else { " (not converged)" }
                );
                for (i, view) in views.iter().enumerate() {
                    let words: Vec<String> = view.top_words.iter().map(|(w, n)| format!("{w}:{n}")).collect();
                    println!("[{i}] {}  {{{}}}", view.members.join(" "), words.join(", "));
                }
            }
        }
        Commands::Rank { reference } => {
            if !graph.contains(&reference) {
                bail!("unknown document {reference}");
            }
            print_ranked(cli.json, &rank_against(&graph, &reference))?;
        }
        Commands::Similar { reference, top, within_cluster, k, seed } => {
            if !graph.contains(&reference) {
                bail!("unknown document {reference}");
            }
            let ranked = if within_cluster {
                let clusterer = Clusterer::new(ClusterConfig { k, seed, ..ClusterConfig::default() });
                cluster_graph(&graph, &clusterer)?.most_similar(&reference, top)
            } else {
                most_similar(&graph, &reference, top)
            };
            print_ranked(cli.json, &ranked)?;
        }
        Commands::Add { url } => {
            let Some(id) = normalize_id(&url) else { bail!("not a usable url: {url}") };
            if graph.contains(&id) {
                bail!("{id} is already in the snapshot");
            }
            let incremental = HttpFetcher::new(FetcherConfig::default())?.with_tokenization(Tokenization::Whitespace);
            let vector = FrequencyVector::from_words(incremental.fetch(&id).await?);
            graph.insert_document(id.clone(), vector);

            if !loaded.ids.contains(&id) {
                append_id(&paths, &id)?;
            }
            let vectors: VectorMap = graph.vectors().map(|(id, v)| (id.to_string(), v.clone())).collect();
            save_snapshot_with_meta(&paths, &vectors)?;
            tracing::info!(%id, sites = graph.len(), components = graph.disjoint_set_count(), "document added");
            println!("added {id} ({} documents, {} components)", graph.len(), graph.disjoint_set_count());
        }
    }
    Ok(())
}

fn print_ranked(json: bool, ranked: &[websim_core::RankedSite]) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ranked)?);
    } else {
        for r in ranked {
            println!("{:.4}  {}", r.similarity, r.id);
        }
    }
    Ok(())
}
