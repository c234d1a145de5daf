use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Args as ClapArgs;
use rayon::prelude::*;
use trac2md_core::{ContextConfig, Options, Tables};

use crate::{
    error,
    pages::{self, Page},
};

/// Convert Trac documents to Markdown
#[derive(ClapArgs, Debug)]
pub struct Args {
    /// List of files to convert
    #[arg(conflicts_with = "stdin")]
    pub files: Vec<PathBuf>,

    /// Input from stdin, output to stdout
    #[arg(long, conflicts_with = "files")]
    pub stdin: bool,

    /// JSON file with options, users, known pages and the commit map
    #[arg(short, long)]
    pub context: Option<PathBuf>,

    /// Treat the files as wiki pages named after their file stem
    ///
    /// Every page's headings are recorded before any page is converted, so
    /// cross-page anchors resolve, and links are made relative to the wiki.
    #[arg(long)]
    pub wiki: bool,

    /// Directory for the converted files (defaults to next to each input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Page name used for same-page anchors when reading stdin
    #[arg(long, requires = "stdin")]
    pub page: Option<String>,
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let config = match &args.context {
        Some(path) => ContextConfig::from_path(path)
            .with_context(|| format!("failed to load context {}", path.display()))?,
        None => ContextConfig::default(),
    };
    let options = config.options()?;
    let mut tables = config.tables()?;

    if args.stdin {
        return convert_stdin(args, options, &tables);
    }
    if args.files.is_empty() {
        anyhow::bail!("You must pass at least one file, or --stdin");
    }

    // PHASE 1: read every file and, for wiki pages, build the registry.
    let pages = args
        .files
        .iter()
        .map(|path| Page::read(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if args.wiki {
        let recorded = pages::record_all(&mut tables, &pages);
        tracing::info!(pages = pages.len(), anchors = recorded, "recorded wiki headings");
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    // PHASE 2: convert in parallel against the finished tables.
    let tables = &tables;
    let results: Vec<(&Path, anyhow::Result<()>)> = pages
        .par_iter()
        .map(|page| {
            let result = convert_page(page, args, &options, tables);
            (page.path.as_path(), result)
        })
        .collect();

    let errors: Vec<_> = results
        .into_iter()
        .filter_map(|(file, result)| result.err().map(|error| (file, error)))
        .collect();
    if !errors.is_empty() {
        eprintln!("\nFailed to convert {} file(s):", errors.len());
        for (file, error) in &errors {
            error::display(Some(file), error);
        }
        std::process::exit(1);
    }
    Ok(())
}

fn page_options(options: &Options, page: &str, wiki: bool) -> Options {
    if !wiki {
        return options.clone();
    }
    let attachment_path = options
        .attachment_path
        .as_deref()
        .map(|prefix| format!("{}/{page}", prefix.trim_end_matches('/')));
    options.for_wiki_page(page, attachment_path)
}

#[tracing::instrument(skip_all, fields(page = %page.name))]
fn convert_page(page: &Page, args: &Args, options: &Options, tables: &Tables) -> anyhow::Result<()> {
    let output = page.output_path(args.output_dir.as_deref())?;
    let context = tables.context(page_options(options, &page.name, args.wiki));
    let markdown = trac2md_converter::convert(&page.source, &context);
    std::fs::write(&output, markdown)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::debug!(output = %output.display(), "converted");
    Ok(())
}

fn convert_stdin(args: &Args, options: Options, tables: &Tables) -> anyhow::Result<()> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    let options = match &args.page {
        Some(page) => page_options(&options, page, args.wiki),
        None => options,
    };
    let markdown = trac2md_converter::convert(&input, &tables.context(options));
    let mut stdout = io::stdout().lock();
    stdout.write_all(markdown.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
