//! basinmask CLI - region parsing and basin delineation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use basinmask_algorithms::hydrology::{
    get_basin_geometry, BasinIndex, D8Encoding, FeatureBasinIndex, FlowNetwork, LayerNames,
};
use basinmask_algorithms::region::{Region, RegionDescriptor, RegionParser};
use basinmask_core::io::{read_geojson, read_geotiff, write_geojson};
use basinmask_core::{DataCatalog, LocalCatalog, RasterDataset, StaticModelRegistry};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "basinmask")]
#[command(author, version, about = "Basin delineation on D8 flow networks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a flow direction raster
    Info {
        /// Input flow direction raster
        input: PathBuf,
        /// Flow direction encoding: esri, ldd, sequential, whitebox
        #[arg(short, long, default_value = "esri")]
        encoding: D8Encoding,
    },
    /// Parse a region descriptor and print its kind and parameters
    Parse {
        #[command(flatten)]
        region: RegionArgs,
    },
    /// Delineate the basins a region selects
    Delineate {
        #[command(flatten)]
        region: RegionArgs,
        /// Flow direction raster
        #[arg(long, required_unless_present = "source")]
        flwdir: Option<PathBuf>,
        /// Catalog raster source holding flwdir/basins/uparea/strord layers
        #[arg(long, conflicts_with = "flwdir")]
        source: Option<String>,
        /// Basin id raster
        #[arg(long)]
        basins: Option<PathBuf>,
        /// Upstream area raster
        #[arg(long)]
        uparea: Option<PathBuf>,
        /// Stream order raster
        #[arg(long)]
        strord: Option<PathBuf>,
        /// Flow direction encoding: esri, ldd, sequential, whitebox
        #[arg(short, long, default_value = "esri")]
        encoding: D8Encoding,
        /// GeoJSON basin index (one feature per basin)
        #[arg(long)]
        index: Option<PathBuf>,
        /// Basin id property of the index features
        #[arg(long, default_value = "basid")]
        index_field: String,
        /// Output GeoJSON for basin polygons
        #[arg(short, long)]
        output: PathBuf,
        /// Output GeoJSON for outlet points
        #[arg(long)]
        outlets: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RegionArgs {
    /// Region descriptor as JSON, e.g. '{"subbasin": [12.2, 45.8], "strord": 4}'
    #[arg(short, long)]
    region: String,
    /// JSON data catalog; paths resolve against the working directory without one
    #[arg(short, long)]
    catalog: Option<PathBuf>,
    /// Model names accepted as region keys
    #[arg(long, value_delimiter = ',')]
    models: Vec<String>,
    /// Drop auxiliary keys the region kind does not use instead of failing
    #[arg(long)]
    lenient: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn open_catalog(path: Option<&Path>) -> Result<LocalCatalog> {
    match path {
        Some(p) => LocalCatalog::from_file(p)
            .with_context(|| format!("Failed to read catalog {}", p.display())),
        None => Ok(LocalCatalog::new(
            std::env::current_dir().context("Failed to resolve working directory")?,
        )),
    }
}

fn parse_region_args(args: &RegionArgs, catalog: &dyn DataCatalog) -> Result<Region> {
    let descriptor = RegionDescriptor::from_json(&args.region).context("Invalid region JSON")?;
    let registry = StaticModelRegistry::new(args.models.iter().cloned());
    let region = RegionParser::new(catalog)
        .with_registry(&registry)
        .strict(!args.lenient)
        .parse(&descriptor)
        .context("Failed to parse region")?;
    Ok(region)
}

fn read_layer(ds: &mut RasterDataset, name: &str, path: &Path) -> Result<()> {
    let raster = read_geotiff::<f64, _>(path)
        .with_context(|| format!("Failed to read {} raster {}", name, path.display()))?;
    ds.insert(name, raster)
        .with_context(|| format!("Layer {} is not aligned with the flow directions", name))?;
    Ok(())
}

struct NetworkFiles<'a> {
    flwdir: Option<&'a Path>,
    source: Option<&'a str>,
    basins: Option<&'a Path>,
    uparea: Option<&'a Path>,
    strord: Option<&'a Path>,
}

fn load_network(files: &NetworkFiles<'_>, catalog: &dyn DataCatalog, encoding: D8Encoding) -> Result<FlowNetwork> {
    let pb = spinner("Reading flow network...");
    let names = LayerNames::default();
    let mut ds = match files.source {
        Some(source) => catalog
            .get_rasterdataset(source)
            .with_context(|| format!("Failed to load source {}", source))?,
        None => RasterDataset::new(),
    };
    if let Some(path) = files.flwdir {
        read_layer(&mut ds, &names.flwdir, path)?;
    }
    for (name, path) in [
        (&names.basins, files.basins),
        (&names.uparea, files.uparea),
        (&names.strord, files.strord),
    ] {
        if let Some(path) = path {
            read_layer(&mut ds, name, path)?;
        }
    }
    let network = FlowNetwork::from_dataset(&ds, &names, encoding).context("Invalid flow network")?;
    pb.finish_and_clear();
    info!(
        "Flow network: {} x {} ({} encoding)",
        network.cols(),
        network.rows(),
        network.encoding()
    );
    Ok(network)
}

fn done(name: &str, count: usize, path: &Path, elapsed: std::time::Duration) {
    println!("{} ({} features) saved to: {}", name, count, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input, encoding } => {
            let raster = read_geotiff::<u8, _>(&input).context("Failed to read raster")?;
            let network = FlowNetwork::new(raster, encoding);
            let bounds = network.bounds();
            let valid = (0..network.len()).filter(|&i| network.is_valid(i)).count();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", network.cols(), network.rows(), network.len());
            println!("Cell size: {}", network.transform().cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
            );
            if let Some(crs) = network.crs() {
                println!("CRS: {}", crs);
            }
            println!("Encoding: {}", encoding);
            println!(
                "Valid cells: {} ({:.1}%)",
                valid,
                100.0 * valid as f64 / network.len().max(1) as f64
            );
            println!("Outlets: {}", network.outlets().len());
        }

        Commands::Parse { region } => {
            let catalog = open_catalog(region.catalog.as_deref())?;
            let parsed = parse_region_args(&region, &catalog)?;
            println!("kind: {}", parsed.kind());
            println!(
                "params: {}",
                serde_json::to_string_pretty(&parsed.params()).context("Failed to format params")?
            );
        }

        Commands::Delineate {
            region,
            flwdir,
            source,
            basins,
            uparea,
            strord,
            encoding,
            index,
            index_field,
            output,
            outlets,
        } => {
            let catalog = open_catalog(region.catalog.as_deref())?;
            let parsed = parse_region_args(&region, &catalog)?;
            let request = parsed.basin_request().context("Region does not select basins")?;

            let files = NetworkFiles {
                flwdir: flwdir.as_deref(),
                source: source.as_deref(),
                basins: basins.as_deref(),
                uparea: uparea.as_deref(),
                strord: strord.as_deref(),
            };
            let network = load_network(&files, &catalog, encoding)?;

            let index = match &index {
                Some(path) => {
                    let features = read_geojson(path)
                        .with_context(|| format!("Failed to read basin index {}", path.display()))?;
                    let index = FeatureBasinIndex::from_features(&features, &index_field)
                        .context("Invalid basin index")?;
                    info!("Basin index: {} basins", index.len());
                    Some(index)
                }
                None => None,
            };

            let pb = spinner(&format!("Delineating {}...", request.kind));
            let start = Instant::now();
            let result = get_basin_geometry(
                &network,
                &request,
                index.as_ref().map(|i| i as &dyn BasinIndex),
            )
            .context("Failed to delineate basins")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            write_geojson(&result.basins, &output).context("Failed to write basins")?;
            done("Basins", result.basins.len(), &output, elapsed);

            match (&result.outlets, &outlets) {
                (Some(points), Some(path)) => {
                    write_geojson(points, path).context("Failed to write outlets")?;
                    println!("Outlets ({} features) saved to: {}", points.len(), path.display());
                }
                (None, Some(_)) => info!("No outlets for this selection"),
                _ => {}
            }
        }
    }

    Ok(())
}
