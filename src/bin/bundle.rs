//! Static dashboard bundle builder
//!
//! Usage:
//!   cargo run --features bundle --bin dashboard-bundle -- single \
//!       --client-id acme --brand-name Acme --api-url https://api.example.com
//!   cargo run --features bundle --bin dashboard-bundle -- batch -i clients.json -o dist
//!
//! Each bundle is a copy of the page assets plus a `config.json` that the
//! dashboard picks up as its file layer.

use anyhow::{bail, Context, Result};
use chat_dashboard::config::{Config, Mode, Theme, CONFIG_FILE};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

/// Files every bundle needs, relative to the assets directory
const ASSETS: &[&str] = &["index.html", "app.js", "style.css"];

/// wasm-pack output, copied when present
const PKG_DIR: &str = "pkg";

#[derive(Debug, Parser)]
#[command(name = "dashboard-bundle", about = "Build static dashboard bundles per client")]
struct Cli {
    /// Directory holding index.html, app.js, style.css (and pkg/)
    #[arg(long, default_value = "www", global = true)]
    assets: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One bundle from command-line flags
    Single(SingleArgs),
    /// One bundle per entry of a JSON list of client configs
    Batch {
        /// JSON file with a list of client configurations
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "dist")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct SingleArgs {
    /// Client id, e.g. bms_ventouse
    #[arg(long)]
    client_id: String,
    #[arg(long)]
    brand_name: String,
    /// API base URL, e.g. https://api.example.com
    #[arg(long)]
    api_url: String,
    #[arg(long, default_value = "")]
    api_key: String,
    #[arg(long, default_value = "main", value_parser = ["main", "alt"])]
    mode: String,
    /// Accent colour (hex)
    #[arg(long, default_value = "#3b82f6")]
    accent: String,
    /// Output directory, defaults to dist/<client-id>-dashboard
    #[arg(long)]
    output: Option<PathBuf>,
}

fn single_config(args: &SingleArgs) -> Result<Config> {
    let mode: Mode = args.mode.parse().map_err(anyhow::Error::msg)?;
    Ok(Config {
        brand_name: Some(args.brand_name.clone()),
        theme: Some(Theme {
            accent: Some(args.accent.clone()),
            ..Default::default()
        }),
        api_url: Some(args.api_url.clone()),
        api_key: Some(args.api_key.clone()),
        client_id: Some(args.client_id.clone()),
        mode: Some(mode),
        ..Default::default()
    })
}

fn field<'a>(entry: &'a serde_json::Value, camel: &str, snake: &str) -> Option<&'a str> {
    entry
        .get(camel)
        .or_else(|| entry.get(snake))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Client id and config of a batch entry, or why the entry cannot be built
fn batch_config(entry: &serde_json::Value) -> std::result::Result<(String, Config), String> {
    let client_id = field(entry, "clientId", "client_id")
        .ok_or("clientId missing")?
        .to_string();
    let brand_name = field(entry, "brandName", "brand_name")
        .ok_or("brandName missing")?
        .to_string();

    let mut config: Config = serde_json::from_value(entry.clone())
        .map_err(|e| format!("config for {} not understood: {}", client_id, e))?;
    config.client_id = Some(client_id.clone());
    config.brand_name = Some(brand_name);
    Ok((client_id, config))
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn build_bundle(assets: &Path, config: &Config, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    for name in ASSETS {
        let src = assets.join(name);
        fs::copy(&src, out_dir.join(name)).with_context(|| format!("copying {}", src.display()))?;
    }
    let pkg = assets.join(PKG_DIR);
    if pkg.is_dir() {
        copy_dir(&pkg, &out_dir.join(PKG_DIR))?;
    } else {
        log::warn!("{} not found, run wasm-pack first", pkg.display());
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(out_dir.join(CONFIG_FILE), json)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Single(args) => {
            let config = single_config(args)?;
            let out_dir = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("dist/{}-dashboard", args.client_id)));
            build_bundle(&cli.assets, &config, &out_dir)?;
            log::info!("Dashboard ready: {}", out_dir.display());
        }
        Command::Batch { input, output } => {
            let raw = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let clients: serde_json::Value = serde_json::from_str(&raw)?;
            let Some(clients) = clients.as_array() else {
                bail!("{} must contain a list of client configurations", input.display());
            };

            for entry in clients {
                let (client_id, config) = match batch_config(entry) {
                    Ok(built) => built,
                    Err(reason) => {
                        log::warn!("skipping {}: {}", entry, reason);
                        continue;
                    }
                };
                let out_dir = output.join(format!("{}-dashboard", client_id));
                build_bundle(&cli.assets, &config, &out_dir)?;
                log::info!("Dashboard generated: {}", out_dir.display());
            }
        }
    }
    Ok(())
}
