//! `shield` command line: one-shot analysis, HTTP server, config scaffolding.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use shield::{render, server, AnalysisRequest, Detector, Language, ShieldConfig};

#[derive(Parser)]
#[command(name = "shield", version, about = "Estimate whether a text was written by a language model")]
struct Cli {
    /// Config file (default: ./shield.toml, then the user config dir)
    #[arg(long, global = true, env = "SHIELD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a text given as argument, file, or on stdin
    Analyze {
        /// Text to analyze
        text: Option<String>,

        /// Read the text from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Source language code (auto, en, es, fr, de, zh-cn, ja)
        #[arg(long, default_value = "auto")]
        lang: Language,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the web UI and JSON API
    Serve {
        /// Listen address (overrides [server].addr)
        #[arg(long)]
        addr: Option<String>,
    },

    /// List supported language codes
    Languages,

    /// Write an example config file
    InitConfig {
        /// Destination (default: the user config dir)
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    shield::logging::init("warn");
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { text, file, lang, json } => {
            let config = ShieldConfig::load(cli.config.as_deref()).context("loading config")?;
            let text = read_input(text, file)?;
            let detector = Detector::from_config(&config).context("starting detector")?;
            let report = detector.analyze(&AnalysisRequest::new(text, lang))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::report(&report));
            }
        }
        Command::Serve { addr } => {
            let config = ShieldConfig::load(cli.config.as_deref()).context("loading config")?;
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let detector = Arc::new(Detector::from_config(&config).context("starting detector")?);
            println!("Server running on http://{addr}");
            server::serve(detector, &addr)?;
        }
        Command::Languages => {
            for lang in Language::ALL {
                println!("{:<6} {}", lang.code(), lang.name());
            }
        }
        Command::InitConfig { path, force } => {
            let path = match path {
                Some(path) => path,
                None => ShieldConfig::user_config_path()
                    .context("could not determine the user config directory")?,
            };
            ShieldConfig::write_example(&path, force)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("nothing to analyze: the input text is empty");
    }
    Ok(text)
}
