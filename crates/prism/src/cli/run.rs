//! The `prism run` command: execute one JSON request.

use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, ValueEnum};
use prism_core::output::write_image;
use prism_core::{Config, Operation, Prism, ResponseWriter};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON request file, or `-` to read stdin
    pub input: PathBuf,

    /// Request kind
    #[arg(long, value_enum, default_value = "pipeline")]
    pub op: OpArg,

    /// Write the response envelope here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the decoded output image to this file
    #[arg(long)]
    pub image_out: Option<PathBuf>,

    /// Pretty-print the response envelope
    #[arg(long)]
    pub pretty: bool,
}

/// Request kinds accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OpArg {
    /// `{ baseImage, steps, format?, quality? }`
    Pipeline,
    /// `{ image, width, height, fit?, format?, quality? }`
    Resize,
    /// `{ image, text, format?, quality? }`
    AddText,
    /// `{ baseImage, layers, format?, quality? }`
    Composite,
    /// `{ title?, subtitle?, logo?, gradientColors?, width?, height? }`
    Marketing,
}

impl From<OpArg> for Operation {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Pipeline => Operation::Pipeline,
            OpArg::Resize => Operation::Resize,
            OpArg::AddText => Operation::AddText,
            OpArg::Composite => Operation::Composite,
            OpArg::Marketing => Operation::Marketing,
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        io::stdin()
            .read_to_string(&mut body)
            .context("failed to read request from stdin")?;
        return Ok(body);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request from {}", path.display()))
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let body = read_input(&args.input)?;
    let prism = Prism::new(config).context("failed to start the engine")?;

    let op = Operation::from(args.op);
    let start = Instant::now();
    let response = prism.handle_json(op, &body).await;
    tracing::info!("{} -> {} in {:?}", op, response.status, start.elapsed());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = ResponseWriter::new(BufWriter::new(file), args.pretty);
            writer.write(&response)?;
            writer.flush()?;
        }
        None => {
            let mut writer = ResponseWriter::new(io::stdout().lock(), args.pretty);
            writer.write(&response)?;
            writer.flush()?;
        }
    }

    if let Some(path) = &args.image_out {
        if write_image(&response, path)? {
            tracing::info!("Image written to {}", path.display());
        }
    }

    if !response.is_success() {
        let code = response
            .body
            .error
            .as_ref()
            .map(|e| e.code.as_str())
            .unwrap_or("UNKNOWN");
        anyhow::bail!("request failed: {} ({})", code, response.status);
    }
    Ok(())
}
