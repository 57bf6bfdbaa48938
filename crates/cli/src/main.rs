use {
    anyhow::bail,
    clap::{Parser, Subcommand},
    skillsync_skills::{
        registry, source,
        sync::{SyncEngine, SyncOptions, SyncOutcome},
    },
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "skillsync", about = "skillsync — install and update agent skills")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom skills directory (overrides default ~/.skillsync/skills).
    #[arg(long, global = true, env = "SKILLSYNC_SKILLS_DIR")]
    skills_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a skill from a local path or GitHub subtree URL.
    Install {
        /// Local path or https://github.com/<owner>/<repo>/tree/<branch>/<path>.
        source: String,
        /// Overwrite an existing skill of the same name.
        #[arg(long)]
        force: bool,
        /// Show what would be done without making changes.
        #[arg(long)]
        dry_run: bool,
    },
    /// List installed skills.
    List,
    /// Remove an installed skill.
    Uninstall {
        /// Skill name.
        name: String,
        /// Show what would be done without making changes.
        #[arg(long)]
        dry_run: bool,
    },
    /// Check for updates and re-sync changed skills.
    Update {
        /// Skill to update.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,
        /// Update all installed skills.
        #[arg(long)]
        all: bool,
        /// Re-sync even when the version is unchanged or unknown.
        #[arg(long)]
        force: bool,
        /// Show what would be done without making changes.
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Usage errors must exit 1 before any side effect; --help/--version keep
    // their success exit.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        },
    };

    init_telemetry(&cli);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "skillsync starting");

    if let Some(ref dir) = cli.skills_dir {
        skillsync_config::set_skills_root(dir.clone());
    }
    let engine = SyncEngine::new(skillsync_config::skills_root());

    match cli.command {
        Commands::Install {
            source,
            force,
            dry_run,
        } => handle_install(&engine, &source, SyncOptions { force, dry_run }).await,
        Commands::List => handle_list(&engine),
        Commands::Uninstall { name, dry_run } => handle_uninstall(&engine, &name, dry_run).await,
        Commands::Update {
            name,
            all,
            force,
            dry_run,
        } => handle_update(&engine, name.as_deref(), all, SyncOptions { force, dry_run }).await,
    }
}

async fn handle_install(engine: &SyncEngine, input: &str, opts: SyncOptions) -> anyhow::Result<()> {
    let skill_source = source::from_input(input)?;
    let name = skill_source.skill_name();

    match engine.install(skill_source.as_ref(), opts).await? {
        SyncOutcome::DryRun => {
            println!("Would install skill '{name}' to {}", engine.root().join(&name).display());
            println!("Dry run complete. No changes made.");
        },
        _ => {
            println!("Installed skill '{name}' to {}", engine.root().join(&name).display());
        },
    }
    Ok(())
}

fn handle_list(engine: &SyncEngine) -> anyhow::Result<()> {
    let skills = registry::list(engine.root())?;
    if skills.is_empty() {
        println!("No skills installed.");
        return Ok(());
    }

    println!("Installed skills ({}):\n", skills.len());
    for skill in &skills {
        println!("  {}", skill.name);
        println!("    source:  {}", skill.provenance.source_display());
        println!("    version: {}", skill.provenance.version().short());
        println!("    updated: {}", skill.provenance.updated_at());
        println!();
    }
    Ok(())
}

async fn handle_uninstall(engine: &SyncEngine, name: &str, dry_run: bool) -> anyhow::Result<()> {
    match engine.uninstall(name, dry_run).await? {
        SyncOutcome::DryRun => {
            println!("Would remove skill '{name}' from {}", engine.root().join(name).display());
            println!("Dry run complete. No changes made.");
        },
        _ => println!("Removed skill '{name}'"),
    }
    Ok(())
}

async fn handle_update(
    engine: &SyncEngine,
    name: Option<&str>,
    all: bool,
    opts: SyncOptions,
) -> anyhow::Result<()> {
    if all {
        let reports = engine.update_all(opts).await?;
        if reports.is_empty() {
            println!("No installed skills with metadata found.");
            return Ok(());
        }

        let mut failed = 0usize;
        for report in &reports {
            match &report.result {
                Ok(outcome) => print_update_outcome(&report.name, outcome),
                Err(e) => {
                    failed += 1;
                    eprintln!("Failed to update '{}': {e:#}", report.name);
                },
            }
        }
        if failed > 0 {
            bail!("{failed} of {} skill(s) failed to update", reports.len());
        }
        return Ok(());
    }

    // clap guarantees a name when --all is absent.
    if let Some(name) = name {
        let outcome = engine.update(name, opts).await?;
        print_update_outcome(name, &outcome);
    }
    Ok(())
}

fn print_update_outcome(name: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Updated => println!("Updated '{name}'"),
        SyncOutcome::UpToDate => println!("'{name}' is up to date"),
        SyncOutcome::SkippedNoVersion => {
            println!("'{name}': cannot determine source version; use --force to re-sync");
        },
        SyncOutcome::DryRun => println!("Would update '{name}'"),
        SyncOutcome::Installed | SyncOutcome::Removed => {},
    }
}
