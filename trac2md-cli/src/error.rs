use std::path::Path;

/// Print a failure with the advice of the first conversion error in its chain.
pub(crate) fn display(file: Option<&Path>, error: &anyhow::Error) {
    match file {
        Some(file) => eprintln!("  × {}: {error}", file.display()),
        None => eprintln!("  × {error}"),
    }
    if let Some(advice) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<trac2md_core::Error>())
        .and_then(trac2md_core::Error::advice)
    {
        eprintln!("  help: {advice}");
    }
}
