//! crmdesk Configurator
//!
//! Injects deployment endpoints and keys into the frontend sources before
//! the production bundle is built.
//!
//! Run with: cargo run --bin crmdesk-configure -- --root ../frontend
//!
//! Values come from the environment (`API_URL`, `EVOLUTION_API_URL`,
//! `N8N_URL`, `SUPABASE_URL`, ...). Unset variables are skipped unless
//! `--strict` is given.

use clap::Parser;
use std::path::PathBuf;

use crmdesk::config::LoggingConfig;
use crmdesk::configurator::{BuildEnv, Configurator, Manifest, Options};

#[derive(Parser)]
#[command(name = "crmdesk-configure")]
#[command(author, version, about = "Inject deployment endpoints into the frontend sources", long_about = None)]
struct Args {
    /// Frontend project root
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Manifest (TOML) replacing the built-in targets
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Fail if any variable is unset
    #[arg(long)]
    strict: bool,

    /// Report changes without writing
    #[arg(long)]
    dry_run: bool,

    /// List the variables the manifest reads and exit
    #[arg(long)]
    list_vars: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    crmdesk::logging::init(&LoggingConfig::default());

    let manifest = match &args.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };

    if args.list_vars {
        for var in manifest.variables() {
            println!("{}", var);
        }
        return Ok(());
    }

    let env = BuildEnv::from_process(&manifest);
    let configurator = Configurator::new(
        manifest,
        Options {
            root: args.root,
            strict: args.strict,
            dry_run: args.dry_run,
        },
    );

    let report = configurator.run(&env)?;
    print!("{}", report);

    Ok(())
}
