use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use htmlizer::{Config, Htmlizer};


#[derive(clap::Parser, Debug)]
/// Render an HTML template with data-bind annotations against JSON
/// data, printing the result to stdout.
struct Args {
    /// Use `data-htmlizer` attributes and `hz` comments only, leaving
    /// `data-bind` and `ko` comments as they are.
    #[clap(long)]
    no_conflict: bool,

    /// Report expressions that fail to evaluate.
    #[clap(long)]
    warn_eval: bool,

    /// Don't print warnings.
    #[clap(long, short)]
    quiet: bool,

    /// Read the settings from this JSON file instead of the
    /// HTMLIZER_* environment variables.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Path to the template.
    template: PathBuf,

    /// Path to a JSON file with the data, `-` for stdin. The data is
    /// `null` if not given.
    data: Option<PathBuf>,
}

fn read_data(path: &PathBuf) -> Result<serde_json::Value> {
    let s = if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("reading stdin")?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| anyhow::anyhow!("reading {path:?}"))?
    };
    serde_json::from_str(&s).with_context(|| anyhow::anyhow!("parsing JSON from {path:?}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.quiet {
        chj_util::warn::set_warnings_enabled(false);
    }

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::from_env()?,
    };
    if args.no_conflict {
        config.no_conflict = true;
    }
    if args.warn_eval {
        config.warn_eval_errors = true;
    }

    let template = std::fs::read_to_string(&args.template)
        .with_context(|| anyhow::anyhow!("reading {:?}", args.template))?;
    let htmlizer = Htmlizer::new(&template, config)
        .with_context(|| anyhow::anyhow!("compiling {:?}", args.template))?;

    let data = match &args.data {
        Some(path) => read_data(path)?,
        None => serde_json::Value::Null,
    };

    let mut out = std::io::stdout().lock();
    out.write_all(htmlizer.render_json(&data).as_bytes())?;
    out.flush()?;
    Ok(())
}
