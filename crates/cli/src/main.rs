//! streamprep CLI - Water layer preparation for stream mapping

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use streamprep_algorithms::vector::DEFAULT_WORKERS;
use streamprep_algorithms::water::{
    clean_network, list_regions, load_regions, merge_tables,
    remove_disconnected, write_output, LandUseQuery, DEFAULT_LAYER, ESTUARY_REGIONS,
};
use streamprep_core::{FeatureTable, CRS};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "streamprep")]
#[command(author, version, about = "Water layer preparation for stream mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lotic water and reservoirs connected to the stream network
    Lotic(LoticArgs),
    /// Estuarine and marine water of the Delaware Bay / Atlantic regions
    Estuary(EstuaryArgs),
    /// Stream network without isolated segments
    CleanNetwork(NetworkArgs),
    /// Run every stage; a failing stage does not stop the others
    All(AllArgs),
}

#[derive(Args)]
struct LoticArgs {
    /// Directory holding one subdirectory per region
    #[arg(long)]
    source_root: PathBuf,
    /// Directory receiving the output file
    #[arg(long)]
    output_root: PathBuf,
    /// Reference stream network
    #[arg(long)]
    network: PathBuf,
    /// Minimum lotic water size in acres (reservoirs are exempt)
    #[arg(long, default_value = "25")]
    threshold: f64,
    /// Worker threads for the spatial join
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Source file relative to each region directory
    #[arg(long)]
    source_file: Option<PathBuf>,
    /// Layer name inside multi-layer sources
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,
    /// Output file name under the output root
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EstuaryArgs {
    /// Directory holding one subdirectory per region
    #[arg(long)]
    source_root: PathBuf,
    /// Directory receiving the output file
    #[arg(long)]
    output_root: PathBuf,
    /// Regions to read, comma separated
    #[arg(long, value_delimiter = ',')]
    regions: Option<Vec<String>>,
    /// Source file relative to each region directory
    #[arg(long)]
    source_file: Option<PathBuf>,
    /// Layer name inside multi-layer sources
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,
    /// Output file name under the output root
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct NetworkArgs {
    /// Directory receiving the output file
    #[arg(long)]
    output_root: PathBuf,
    /// Reference stream network
    #[arg(long)]
    network: PathBuf,
    /// Worker threads for the spatial join
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Output file name under the output root
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AllArgs {
    #[arg(long)]
    source_root: PathBuf,
    #[arg(long)]
    output_root: PathBuf,
    #[arg(long)]
    network: PathBuf,
    #[arg(long, default_value = "25")]
    threshold: f64,
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    #[arg(long, value_delimiter = ',')]
    regions: Option<Vec<String>>,
    #[arg(long)]
    source_file: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_LAYER)]
    layer: String,
}

impl AllArgs {
    fn lotic(&self) -> LoticArgs {
        LoticArgs {
            source_root: self.source_root.clone(),
            output_root: self.output_root.clone(),
            network: self.network.clone(),
            threshold: self.threshold,
            workers: self.workers,
            source_file: self.source_file.clone(),
            layer: self.layer.clone(),
            output: None,
        }
    }

    fn estuary(&self) -> EstuaryArgs {
        EstuaryArgs {
            source_root: self.source_root.clone(),
            output_root: self.output_root.clone(),
            regions: self.regions.clone(),
            source_file: self.source_file.clone(),
            layer: self.layer.clone(),
            output: None,
        }
    }

    fn network(&self) -> NetworkArgs {
        NetworkArgs {
            output_root: self.output_root.clone(),
            network: self.network.clone(),
            workers: self.workers,
            output: None,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn output_extension() -> &'static str {
    if cfg!(feature = "gdal") {
        "shp"
    } else {
        "geojson"
    }
}

fn output_path(root: &Path, output: Option<&PathBuf>, stem: &str) -> PathBuf {
    match output {
        Some(name) => root.join(name),
        None => root.join(format!("{}.{}", stem, output_extension())),
    }
}

fn query(base: LandUseQuery, source_file: Option<&PathBuf>, layer: &str) -> LandUseQuery {
    let query = base.with_layer(layer);
    match source_file {
        Some(file) => query.with_source_file(file),
        None => query,
    }
}

fn save(table: &FeatureTable, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    let result = write_output(table, path)
        .with_context(|| format!("Failed to write {}", path.display()));
    pb.finish_and_clear();
    result
}

fn done(name: &str, path: &Path, records: usize, elapsed: std::time::Duration) {
    println!("{} saved to: {} ({} records)", name, path.display(), records);
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Stages ─────────────────────────────────────────────────────────────

fn run_lotic(args: &LoticArgs) -> Result<()> {
    let start = Instant::now();
    let regions = list_regions(&args.source_root)
        .with_context(|| format!("Failed to list regions in {}", args.source_root.display()))?;
    info!("Loading lotic water from {} regions", regions.len());

    let query = query(
        LandUseQuery::lotic(args.threshold),
        args.source_file.as_ref(),
        &args.layer,
    );
    let pb = spinner("Reading regions...");
    let tables = load_regions(&args.source_root, &regions, &query);
    pb.finish_and_clear();

    let merged = merge_tables(tables.context("Failed to load regions")?, &CRS::albers_conus())
        .context("Failed to merge lotic water")?;
    info!("Merged {} lotic water records", merged.len());

    let connected = remove_disconnected(merged, &args.network, args.workers)
        .context("Failed to remove disconnected water")?;

    let path = output_path(&args.output_root, args.output.as_ref(), "lotic_reservoirs_1m");
    save(&connected, &path)?;
    done("Lotic water", &path, connected.len(), start.elapsed());
    Ok(())
}

fn run_estuary(args: &EstuaryArgs) -> Result<()> {
    let start = Instant::now();
    let regions: Vec<String> = match &args.regions {
        Some(regions) => regions.clone(),
        None => ESTUARY_REGIONS.iter().map(|r| r.to_string()).collect(),
    };
    info!("Loading estuarine water from {} regions", regions.len());

    let query = query(LandUseQuery::estuarine(), args.source_file.as_ref(), &args.layer);
    let pb = spinner("Reading regions...");
    let tables = load_regions(&args.source_root, &regions, &query);
    pb.finish_and_clear();

    let merged = merge_tables(tables.context("Failed to load regions")?, &CRS::albers_conus())
        .context("Failed to merge estuarine water")?;

    let path = output_path(&args.output_root, args.output.as_ref(), "DelawareAtlantic_1m");
    save(&merged, &path)?;
    done("Estuarine water", &path, merged.len(), start.elapsed());
    Ok(())
}

fn run_clean_network(args: &NetworkArgs) -> Result<()> {
    let start = Instant::now();
    let pb = spinner("Cleaning stream network...");
    let cleaned = clean_network(&args.network, args.workers);
    pb.finish_and_clear();
    let cleaned = cleaned
        .with_context(|| format!("Failed to clean network {}", args.network.display()))?;

    let path = output_path(
        &args.output_root,
        args.output.as_ref(),
        "FACET_100k_gapfilled_cleaned",
    );
    save(&cleaned, &path)?;
    done("Stream network", &path, cleaned.len(), start.elapsed());
    Ok(())
}

fn run_all(args: &AllArgs) -> Result<()> {
    let stages: [(&str, Box<dyn Fn() -> Result<()>>); 3] = [
        ("lotic", Box::new(|| run_lotic(&args.lotic()))),
        ("estuary", Box::new(|| run_estuary(&args.estuary()))),
        ("clean-network", Box::new(|| run_clean_network(&args.network()))),
    ];

    let mut failed = Vec::new();
    for (name, stage) in stages.iter() {
        if let Err(e) = stage() {
            error!("Stage {} failed: {:#}", name, e);
            failed.push(*name);
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} of 3 stages failed: {}", failed.len(), failed.join(", "))
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Lotic(args) => run_lotic(&args),
        Commands::Estuary(args) => run_estuary(&args),
        Commands::CleanNetwork(args) => run_clean_network(&args),
        Commands::All(args) => run_all(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_regions_split_on_commas() {
        let cli = Cli::try_parse_from([
            "streamprep",
            "estuary",
            "--source-root",
            "/data/lulc",
            "--output-root",
            "/data/out",
            "--regions",
            "kent_10001,suss_10005",
        ])
        .unwrap();
        match cli.command {
            Commands::Estuary(args) => {
                assert_eq!(args.regions.unwrap(), vec!["kent_10001", "suss_10005"]);
                assert_eq!(args.layer, DEFAULT_LAYER);
            }
            _ => panic!("expected estuary"),
        }
    }

    #[test]
    fn test_lotic_defaults() {
        let cli = Cli::try_parse_from([
            "streamprep",
            "-v",
            "lotic",
            "--source-root",
            "a",
            "--output-root",
            "b",
            "--network",
            "n.geojson",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Lotic(args) => {
                assert_eq!(args.threshold, 25.0);
                assert_eq!(args.workers, DEFAULT_WORKERS);
                let path = output_path(&args.output_root, args.output.as_ref(), "lotic_reservoirs_1m");
                assert_eq!(
                    path,
                    PathBuf::from("b").join(format!("lotic_reservoirs_1m.{}", output_extension()))
                );
            }
            _ => panic!("expected lotic"),
        }
    }
}
