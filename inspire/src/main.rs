//! Content pipeline CLI.
//!
//! Subcommands mirror the pipeline stages:
//!
//! ```bash
//! inspire status              # what would be generated, and the cost
//! inspire generate            # call the API for everything that needs it
//! inspire generate --dry-run  # plan and price without calling the API
//! inspire build               # assemble the static site bundle
//! inspire cleanup --dry-run   # list orphaned files without touching them
//! ```

use clap::{Arg, ArgAction, Command};
use gemini::Gemini;
use inspire_core::{NeedKind, Pipeline, RunPlan};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("inspire")
        .version("0.1.0")
        .about("Content pipeline for an AI-illustrated inspiration site")
        .arg_required_else_help(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .default_value(".")
                .help("Project root directory"),
        )
        .subcommand(Command::new("status").about("Show what would be generated and the cost"))
        .subcommand(
            Command::new("generate")
                .about("Generate images for content that needs them")
                .arg(
                    Arg::new("force-all")
                        .long("force-all")
                        .action(ArgAction::SetTrue)
                        .help("Regenerate every item regardless of what exists"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Plan and price without calling the API"),
                ),
        )
        .subcommand(Command::new("build").about("Assemble the static site bundle"))
        .subcommand(
            Command::new("cleanup")
                .about("Remove orphaned images and metadata")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("List what would be removed without touching disk"),
                )
                .arg(
                    Arg::new("no-archive")
                        .long("no-archive")
                        .action(ArgAction::SetTrue)
                        .help("Delete without archiving copies first"),
                ),
        );

    let matches = cli.get_matches();
    let root = matches
        .get_one::<String>("root")
        .map(String::as_str)
        .unwrap_or(".");

    let result = match matches.subcommand() {
        Some(("status", _)) => status(root).await,
        Some(("generate", args)) => {
            generate(root, args.get_flag("force-all"), args.get_flag("dry-run")).await
        }
        Some(("build", _)) => build(root).await,
        Some(("cleanup", args)) => {
            cleanup(root, args.get_flag("dry-run"), !args.get_flag("no-archive")).await
        }
        _ => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn open_and_plan(
    root: &str,
    force: bool,
) -> Result<(Pipeline, RunPlan), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::open(root).await?;
    let outcome = pipeline.load_content().await?;
    for failure in &outcome.failures {
        eprintln!("Skipped {}: {}", failure.file, failure.error);
    }

    let mut rng = StdRng::from_entropy();
    let plan = pipeline.plan(&outcome.items, &mut rng, force).await?;
    Ok((pipeline, plan))
}

fn print_plan(plan: &RunPlan) {
    if plan.diff.needs_generation.is_empty() {
        println!("Everything is up to date.");
    } else {
        println!("Needs generation:");
        for need in &plan.diff.needs_generation {
            let kind = match need.kind {
                NeedKind::New => "new",
                NeedKind::Update => "update",
            };
            println!(
                "  {} ({}, {}) - {}",
                need.content_id,
                kind,
                need.reason.label(),
                need.title
            );
        }
        println!(
            "Estimated: {} images, ${:.3}",
            plan.preview.image_count, plan.preview.estimated_cost
        );
    }

    if !plan.diff.orphans.is_empty() {
        println!(
            "Orphaned files: {} (run `inspire cleanup --dry-run` for details)",
            plan.diff.orphans.len()
        );
    }
}

async fn status(root: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, plan) = open_and_plan(root, false).await?;
    println!("Content items: {}", plan.reconciled.len());
    print_plan(&plan);
    Ok(())
}

async fn generate(
    root: &str,
    force: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (pipeline, plan) = open_and_plan(root, force).await?;
    print_plan(&plan);
    if dry_run || plan.diff.needs_generation.is_empty() {
        return Ok(());
    }

    // The API key is only required once we actually call the API.
    if std::env::var("GEMINI_API_KEY").is_err() {
        eprintln!("Error: GEMINI_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export GEMINI_API_KEY=your_key_here");
        std::process::exit(1);
    }
    let client = Gemini::from_env()?.with_model(pipeline.config().model.clone());

    let summary = pipeline.generate(&plan, client).await?;
    println!(
        "Generated {}/{} images ({} without image, {} failed), total ${:.3}",
        summary.succeeded, summary.attempted, summary.no_image, summary.failed, summary.total_cost
    );
    Ok(())
}

async fn build(root: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (pipeline, plan) = open_and_plan(root, false).await?;
    let report = pipeline.build_site(&plan).await?;
    println!(
        "Site built: {} entries, {} images -> {}",
        report.content_count,
        report.images_included,
        pipeline.config().output_dir.display()
    );
    Ok(())
}

async fn cleanup(
    root: &str,
    dry_run: bool,
    archive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (pipeline, plan) = open_and_plan(root, false).await?;
    if plan.diff.orphans.is_empty() {
        println!("No orphaned files.");
        return Ok(());
    }

    let report = pipeline.cleanup(&plan, dry_run, archive).await?;
    let verb = if dry_run { "Would remove" } else { "Removed" };
    for file in &report.removed {
        println!("  {file}");
    }
    println!(
        "{} {} files ({} bytes)",
        verb,
        report.removed.len(),
        report.bytes_reclaimed
    );
    if let Some(archive_dir) = &report.archive_dir {
        println!("Archived copies in {}", archive_dir.display());
    }
    for failure in &report.errors {
        eprintln!("Failed on {}: {}", failure.file, failure.error);
    }
    Ok(())
}
