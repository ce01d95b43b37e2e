use anyhow::{Context, Result};
use clap::Parser;
use gridfill::{find_fill, render_grid, save_image, FillOptions, GridConfig};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Fill a crossword structure with words from a word list.
#[derive(Parser, Debug)]
#[clap(name = "gridfill")]
struct Args {
    /// Structure file: `_` marks an open cell, anything else a block.
    structure: PathBuf,

    /// Word list, one word per line.
    words: PathBuf,

    /// If set, the filled grid is also written here: as an image for a `.png` path, as text
    /// otherwise.
    output: Option<PathBuf>,

    /// Skip constraint propagation after each tentative assignment.
    #[clap(long)]
    no_inference: bool,

    /// Logging level to use: one of "error", "warn", "info", "debug", "trace"
    #[clap(short, long, default_value = "warn")]
    log_level: tracing::Level,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::Uptime::from(Instant::now()))
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = GridConfig::from_files(&args.structure, &args.words)
        .with_context(|| format!("Could not load puzzle from {}", args.structure.display()))?;

    let options = FillOptions { inference: !args.no_inference };

    match find_fill(&config, &options) {
        Ok(result) => {
            tracing::info!(statistics = ?result.statistics);
            let display_grid = render_grid(&config, &result.assignment);
            println!("{}", display_grid);

            if let Some(output) = &args.output {
                let is_png = output
                    .extension()
                    .map_or(false, |extension| extension.eq_ignore_ascii_case("png"));
                if is_png {
                    save_image(&config, &result.assignment, output)
                        .with_context(|| format!("Unable to write {}", output.display()))?;
                } else {
                    fs::write(output, display_grid + "\n")
                        .with_context(|| format!("Unable to write {}", output.display()))?;
                }
            }
            Ok(())
        }
        Err(failure) => {
            tracing::info!(%failure);
            println!("No solution.");
            std::process::exit(1);
        }
    }
}
