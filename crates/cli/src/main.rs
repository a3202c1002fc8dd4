use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pb_index::{CorpusWatcher, PbIndex, PbIndexConfig, RefreshReport, Tile, WatcherConfig};
use pb_query::{
    aggregate_comments, aggregate_statistics, QueryEngine, SearchFilters, SortDir, SortKey,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pb-atlas")]
#[command(about = "Browse and index participatory budgeting (.pb) corpora", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Corpus directory holding the .pb files
    #[arg(long, global = true, default_value = "pb_files")]
    dir: PathBuf,

    /// Per-file parse deadline in seconds
    #[arg(long, global = true, default_value_t = 10)]
    parse_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the index in line with the corpus directory
    Refresh(RefreshArgs),

    /// Search current tiles with filters and ordering
    Search(SearchArgs),

    /// Show one file's tile, superseded versions included
    Show(ShowArgs),

    /// List distinct countries, units and years among current tiles
    Options(OptionsArgs),

    /// Corpus-wide statistics
    Stats(StatsArgs),

    /// Keep refreshing as the directory changes
    Watch(WatchArgs),
}

#[derive(Args)]
struct RefreshArgs {
    /// Re-parse every file regardless of modification time
    #[arg(long)]
    full: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Free-text query over titles, descriptions, comments and file names
    query: Option<String>,

    #[arg(long)]
    country: Option<String>,

    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    year: Option<i32>,

    /// Vote type: approval, ordinal, cumulative, ...
    #[arg(long)]
    vote_type: Option<String>,

    #[arg(long)]
    votes_min: Option<u64>,

    #[arg(long)]
    votes_max: Option<u64>,

    #[arg(long)]
    projects_min: Option<u64>,

    #[arg(long)]
    projects_max: Option<u64>,

    #[arg(long)]
    vote_length_min: Option<f64>,

    #[arg(long)]
    vote_length_max: Option<f64>,

    #[arg(long)]
    exclude_fully_funded: bool,

    #[arg(long)]
    exclude_experimental: bool,

    #[arg(long)]
    require_geo: bool,

    #[arg(long)]
    require_target: bool,

    #[arg(long)]
    require_category: bool,

    /// Sort key
    #[arg(long, value_enum, default_value_t = SortKeyFlag::Quality)]
    order_by: SortKeyFlag,

    /// Sort direction
    #[arg(long, value_enum, default_value_t = SortDirFlag::Desc)]
    order: SortDirFlag,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ShowArgs {
    /// File name inside the corpus directory, e.g. poland_katowice_2024.pb
    file_name: String,

    /// Print the raw file text instead of the tile
    #[arg(long)]
    raw: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OptionsArgs {
    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// Also list distinct comments with the files carrying them
    #[arg(long)]
    comments: bool,

    /// Output machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Quiet period after the last event before a refresh runs, in ms
    #[arg(long, default_value_t = 750)]
    debounce_ms: u64,
}

#[derive(Copy, Clone, ValueEnum)]
enum SortKeyFlag {
    Quality,
    Votes,
    Projects,
    Budget,
    Year,
}

impl SortKeyFlag {
    const fn as_domain(self) -> SortKey {
        match self {
            SortKeyFlag::Quality => SortKey::Quality,
            SortKeyFlag::Votes => SortKey::Votes,
            SortKeyFlag::Projects => SortKey::Projects,
            SortKeyFlag::Budget => SortKey::Budget,
            SortKeyFlag::Year => SortKey::Year,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SortDirFlag {
    Asc,
    Desc,
}

impl SortDirFlag {
    const fn as_domain(self) -> SortDir {
        match self {
            SortDirFlag::Asc => SortDir::Asc,
            SortDirFlag::Desc => SortDir::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = PbIndexConfig {
        parse_timeout: Duration::from_secs(cli.parse_timeout_secs),
    };
    let index = Arc::new(
        PbIndex::open_with(&cli.dir, config)
            .await
            .with_context(|| format!("open corpus at {}", cli.dir.display()))?,
    );
    let engine = QueryEngine::new(index.clone());

    match cli.command {
        Commands::Refresh(args) => {
            let report = index.refresh(args.full).await?;
            print_report(&report, args.json)?;
        }
        Commands::Search(args) => run_search(&index, &engine, args).await?,
        Commands::Show(args) => run_show(&index, &engine, args).await?,
        Commands::Options(args) => {
            index.refresh(false).await?;
            let options = engine.distinct_filter_options();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                println!("countries: {}", options.countries.join(", "));
                println!("units:     {}", options.units.join(", "));
                let years: Vec<String> = options.years.iter().map(i32::to_string).collect();
                println!("years:     {}", years.join(", "));
            }
        }
        Commands::Stats(args) => {
            index.refresh(false).await?;
            let snapshot = index.snapshot();
            let stats = aggregate_statistics(&snapshot);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("files:     {}", stats.num_files);
                println!("countries: {}", stats.num_countries);
                println!("cities:    {}", stats.num_cities);
                println!("projects:  {}", pb_index::fmt::format_int(stats.total_projects as i64));
                println!("votes:     {}", pb_index::fmt::format_int(stats.total_votes as i64));
                for (currency, budget) in &stats.budget_by_currency {
                    println!("budget:    {}", pb_index::fmt::format_budget(currency, Some(*budget)));
                }
                for (label, votes) in &stats.top_cities_by_votes {
                    println!("  {label}: {} votes", pb_index::fmt::format_int(*votes as i64));
                }
            }
            if args.comments {
                let groups = aggregate_comments(&snapshot);
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&groups)?);
                } else {
                    for group in groups {
                        println!("[{}] {}", group.files.len(), group.text);
                    }
                }
            }
        }
        Commands::Watch(args) => run_watch(index, args).await?,
    }

    Ok(())
}

async fn run_search(index: &Arc<PbIndex>, engine: &QueryEngine, args: SearchArgs) -> Result<()> {
    index.refresh(false).await?;

    let filters = SearchFilters {
        text: args.query,
        country: args.country,
        unit: args.unit,
        year: args.year,
        vote_type: args.vote_type,
        votes_min: args.votes_min,
        votes_max: args.votes_max,
        projects_min: args.projects_min,
        projects_max: args.projects_max,
        vote_length_min: args.vote_length_min,
        vote_length_max: args.vote_length_max,
        exclude_fully_funded: args.exclude_fully_funded,
        exclude_experimental: args.exclude_experimental,
        require_geo: args.require_geo,
        require_target: args.require_target,
        require_category: args.require_category,
    };

    let page = engine.search(
        &filters,
        args.order_by.as_domain(),
        args.order.as_domain(),
        args.offset,
        args.limit,
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        for tile in &page.tiles {
            println!("{}", tile_line(tile));
        }
        println!(
            "{} of {} tiles (offset {})",
            page.tiles.len(),
            page.total_count,
            args.offset
        );
    }
    Ok(())
}

async fn run_show(index: &Arc<PbIndex>, engine: &QueryEngine, args: ShowArgs) -> Result<()> {
    index.refresh(false).await?;

    if args.raw {
        let text = index.read_source(&args.file_name).await?;
        print!("{text}");
        return Ok(());
    }

    let tile = engine.get_tile(&args.file_name).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tile)?);
    } else {
        println!("{}", tile.title);
        println!("  file:        {}", tile.file_name);
        println!("  location:    {} / {} / {}", tile.country, tile.unit, tile.subunit);
        println!("  year:        {}", tile.year.map_or("—".to_string(), |y| y.to_string()));
        println!("  vote type:   {}", tile.vote_type);
        println!("  votes:       {}", tile.num_votes_display);
        println!("  projects:    {}", tile.num_projects_display);
        println!("  budget:      {}", tile.budget_display);
        println!("  vote length: {}", tile.vote_length_display);
        println!("  quality:     {}", tile.quality_short);
        if !tile.comments.is_empty() {
            println!("  comments:");
            for comment in &tile.comments {
                println!("    - {comment}");
            }
        }
    }
    Ok(())
}

async fn run_watch(index: Arc<PbIndex>, args: WatchArgs) -> Result<()> {
    let report = index.refresh(false).await?;
    print_report(&report, false)?;

    let config = WatcherConfig {
        debounce: Duration::from_millis(args.debounce_ms),
        ..Default::default()
    };
    let watcher = CorpusWatcher::start(index, config)?;
    let mut updates = watcher.subscribe();

    log::info!("watching for changes, press Ctrl-C to stop");
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(report) => {
                    if !report.is_noop() {
                        print_report(&report, false)?;
                    }
                }
                Err(err) => {
                    log::warn!("update stream closed: {err}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    watcher.shutdown().await;
    Ok(())
}

fn print_report(report: &RefreshReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "{} added, {} updated, {} removed in {}ms",
            report.added, report.updated, report.removed, report.time_ms
        );
        for error in &report.errors {
            eprintln!("error: {error}");
        }
    }
    Ok(())
}

fn tile_line(tile: &Tile) -> String {
    let year = tile.year.map_or("—".to_string(), |y| y.to_string());
    format!(
        "{} [{}] — {} votes, {} projects, quality {} ({})",
        tile.title,
        year,
        tile.num_votes_display,
        tile.num_projects_display,
        tile.quality_short,
        tile.file_name
    )
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}
