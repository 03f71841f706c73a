use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "terrapath", version)]
struct Cli {
    /// Log pipeline stages at debug level (overridden by `RUST_LOG`).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full least-cost path analysis described by a JSON config.
    Analyze(AnalyzeArgs),
    /// Score a single layer image and write its cost as a PNG.
    Layer(LayerArgs),
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Analysis config JSON. Layer paths are resolved relative to its directory.
    #[arg(long)]
    config: PathBuf,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Also write the raw result grids as `analysis.json`.
    #[arg(long)]
    json: bool,

    /// Worker threads for weight-variant batches (defaults to the config value, then to rayon).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct LayerArgs {
    /// Layer kind: altitude, water, roads or housing_density.
    #[arg(long)]
    kind: String,

    /// Input layer PNG. Housing density maps are read white for empty land.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Cell side length in metres.
    #[arg(long, default_value_t = 30.0)]
    cell_size: f64,

    /// Metres per raw altitude unit.
    #[arg(long, default_value_t = 1.0)]
    altitude_scale: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Analyze(args) => cmd_analyze(args),
        Command::Layer(args) => cmd_layer(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "terrapath=debug"
    } else {
        "terrapath=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = terrapath::AnalysisConfig::load(&args.config)?;
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));
    let requests = config.load_requests(base_dir)?;

    if let [request] = requests.as_slice() {
        let analysis = terrapath::Analysis::run(request)?;
        return write_outputs(&args, &args.out, request, &analysis);
    }

    let threads = args.threads.or(config.threads);
    let results = terrapath::run_batch(&requests, threads)?;
    let mut failed = 0usize;
    for (i, (request, result)) in requests.iter().zip(results).enumerate() {
        let dir = args.out.join(format!("variant-{i}"));
        match result {
            Ok(analysis) => write_outputs(&args, &dir, request, &analysis)?,
            Err(e) => {
                eprintln!("variant {i} failed: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} weight variants failed", requests.len());
    }
    Ok(())
}

fn write_outputs(
    args: &AnalyzeArgs,
    dir: &Path,
    request: &terrapath::AnalysisRequest,
    analysis: &terrapath::Analysis,
) -> anyhow::Result<()> {
    let composite_path = dir.join("composite_cost.png");
    terrapath::raster::save_png(
        terrapath::raster::cost_ramp(analysis.composite_cost())?,
        &composite_path,
    )?;
    eprintln!("wrote {}", composite_path.display());

    let accumulated_path = dir.join("accumulated_cost.png");
    terrapath::raster::save_png(
        terrapath::raster::cost_ramp(analysis.accumulated_cost())?,
        &accumulated_path,
    )?;
    eprintln!("wrote {}", accumulated_path.display());

    let base = request
        .layers
        .get(&terrapath::LayerKind::Altitude)
        .unwrap_or(analysis.composite_cost());
    let path_png = dir.join("path.png");
    terrapath::raster::save_png(
        terrapath::raster::path_overlay(analysis.path(), base)?,
        &path_png,
    )?;
    eprintln!("wrote {}", path_png.display());

    if args.json {
        let json_path = dir.join("analysis.json");
        let f = File::create(&json_path)
            .with_context(|| format!("create '{}'", json_path.display()))?;
        let report = serde_json::json!({
            "weights": &request.weights,
            "params": &request.params,
            "start": request.start,
            "analysis": analysis,
        });
        serde_json::to_writer_pretty(BufWriter::new(f), &report)
            .with_context(|| format!("write '{}'", json_path.display()))?;
        eprintln!("wrote {}", json_path.display());
    }
    Ok(())
}

fn cmd_layer(args: LayerArgs) -> anyhow::Result<()> {
    let params = terrapath::AnalysisParams {
        cell_size: args.cell_size,
        altitude_scale: args.altitude_scale,
        ..terrapath::AnalysisParams::default()
    };
    params.validate()?;

    let kind = terrapath::LayerKind::from(args.kind.as_str());
    let raw = terrapath::raster::load_layer_as(&kind, &args.in_path)?;
    let Some(cost) = terrapath::score_layer(&kind, &raw, params.cell_size, params.altitude_scale)?
    else {
        anyhow::bail!("no scorer for layer kind '{kind}'");
    };

    terrapath::raster::save_png(terrapath::raster::cost_ramp(&cost)?, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
