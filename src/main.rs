//! classkit - run Lua scripts with classes, traits and namespaces

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use classkit::{Config, Sandbox};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run Lua scripts in a sandbox with the classkit object model installed
#[derive(Parser, Debug)]
#[command(name = "classkit", version, about)]
struct Args {
    /// TOML config file (overridden by CLASSKIT_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lua scripts, run in order in one shared sandbox
    #[arg(required = true)]
    scripts: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // mlua errors are not Send, so they cross into anyhow as messages
    let mut sandbox =
        Sandbox::new(config.sandbox.clone()).map_err(|e| anyhow!("creating sandbox: {e}"))?;

    for path in &args.scripts {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path.display().to_string();

        sandbox.metering().reset();
        let result: Result<(), _> = sandbox.execute_named(&name, &code);

        for line in sandbox.take_output() {
            println!("{line}");
        }
        result.map_err(|e| anyhow!("running {name}: {e}"))?;

        let m = sandbox.metering();
        info!(
            script = %name,
            instructions = m.instructions(),
            declarations = m.declarations(),
            instances = m.instances(),
            super_views = m.super_views(),
            memory_bytes = m.memory_bytes(),
            "script finished"
        );
    }

    Ok(())
}
