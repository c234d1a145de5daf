use std::path::{Path, PathBuf};

use anyhow::Context as _;
use trac2md_core::{Error, Tables};

/// A wiki page read from disk; its name is the file stem.
#[derive(Debug)]
pub(crate) struct Page {
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) source: String,
}

impl Page {
    pub(crate) fn read(path: &Path) -> anyhow::Result<Self> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| format!("invalid page file name: {}", path.display()))?
            .to_string();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            name,
            source,
        })
    }

    /// Where the converted page is written: `<stem>.md` next to the input or
    /// inside `output_dir`.
    pub(crate) fn output_path(&self, output_dir: Option<&Path>) -> Result<PathBuf, Error> {
        let output = match output_dir {
            Some(dir) => dir.join(&self.name).with_extension("md"),
            None => self.path.with_extension("md"),
        };
        if output == self.path {
            return Err(Error::OutputPathSameAsInput(output));
        }
        Ok(output)
    }
}

/// Register every page and record its heading anchors.
///
/// Runs sequentially: the registry must be complete before any page is
/// converted.
#[tracing::instrument(skip_all, fields(pages = pages.len()))]
pub(crate) fn record_all(tables: &mut Tables, pages: &[Page]) -> usize {
    for page in pages {
        tables.pages.insert(page.name.as_str());
    }
    pages
        .iter()
        .map(|page| trac2md_converter::record_headings(&mut tables.registry, &page.name, &page.source))
        .sum()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_output_path_next_to_input() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("InstallGuide.trac");
        std::fs::write(&path, "= Install =\n")?;
        let page = Page::read(&path)?;
        assert_eq!(page.name, "InstallGuide");
        assert_eq!(page.output_path(None)?, dir.path().join("InstallGuide.md"));
        assert_eq!(
            page.output_path(Some(Path::new("out")))?,
            Path::new("out").join("InstallGuide.md")
        );
        Ok(())
    }

    #[test]
    fn test_refuses_to_overwrite_input() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Notes.md");
        std::fs::write(&path, "text")?;
        let page = Page::read(&path)?;
        assert!(matches!(
            page.output_path(None),
            Err(Error::OutputPathSameAsInput(_))
        ));
        Ok(())
    }

    #[test]
    fn test_record_all_registers_pages_and_anchors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Guide.trac");
        std::fs::write(&path, "= Guide =\n== Build Steps ==\n")?;
        let pages = vec![Page::read(&path)?];
        let mut tables = Tables::new();
        let recorded = record_all(&mut tables, &pages);
        assert!(recorded > 0);
        assert!(tables.pages.contains("Guide"));
        assert_eq!(
            tables.registry.resolve("Guide", "BuildSteps"),
            Some("Guide#build-steps")
        );
        Ok(())
    }
}
