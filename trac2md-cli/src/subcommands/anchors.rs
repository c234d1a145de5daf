use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Args as ClapArgs;
use trac2md_core::{ContextConfig, Tables};

use crate::pages::{self, Page};

/// Print the anchor registry built from a set of wiki pages
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Wiki page files; each page is named after its file stem
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// JSON context file; only its known pages are used
    #[arg(short, long)]
    pub context: Option<PathBuf>,
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let mut tables = match &args.context {
        Some(path) => ContextConfig::from_path(path)?.tables()?,
        None => Tables::new(),
    };
    let pages = args
        .files
        .iter()
        .map(|path| Page::read(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let recorded = pages::record_all(&mut tables, &pages);
    tracing::debug!(anchors = recorded, "recorded wiki headings");

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &tables.registry)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
