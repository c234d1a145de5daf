//! Converter invariants
//!
//! - conversion is total and its output carries no placeholders
//! - finalization is idempotent
//! - code block interiors come out byte for byte
//! - numbered lists are renumbered from one
//! - every table row becomes exactly one output row

use proptest::prelude::*;
use trac2md_core::{Options, Tables};

use crate::{PIPE_PLACEHOLDER, convert, finalize, record_headings};

use super::generators::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 500,
        max_shrink_iters: 10000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn convert_never_panics(input in any_document_string()) {
        let tables = Tables::new();
        let _ = convert(&input, &tables.context(Options::default()));
    }

    #[test]
    fn structured_input_leaves_no_placeholder(input in structured_document()) {
        let mut tables = Tables::new();
        tables.pages.insert("WikiStart");
        record_headings(&mut tables.registry, "WikiStart", &input);
        let output = convert(&input, &tables.context(Options::default()));
        prop_assert!(!output.contains(PIPE_PLACEHOLDER));
    }

    #[test]
    fn finalize_is_idempotent(input in structured_document()) {
        let options = Options::default();
        let once = finalize(&input, &options);
        prop_assert_eq!(finalize(&once, &options), once);
    }

    #[test]
    fn code_interior_is_preserved(lines in prop::collection::vec(code_line(), 1..10)) {
        let body = lines.join("\n");
        let tables = Tables::new();
        let output = convert(&format!("{{{{{{\n{body}\n}}}}}}"), &tables.context(Options::default()));
        prop_assert_eq!(output, format!("```\n{body}\n```"));
    }

    #[test]
    fn numbered_lists_count_from_one(
        items in prop::collection::vec((1u32..100, item_text()), 1..12)
    ) {
        let input: String = items
            .iter()
            .map(|(number, text)| format!(" {number}. {text}\n"))
            .collect();
        let tables = Tables::new();
        let output = convert(&input, &tables.context(Options::default()));
        let expected: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(index, (_, text))| format!("{}. {text}", index + 1))
            .collect();
        let actual: Vec<&str> = output.lines().filter(|line| !line.is_empty()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn table_rows_map_one_to_one(
        rows in prop::collection::vec(prop::collection::vec(cell_text(), 1..5), 1..8)
    ) {
        let input: String = rows
            .iter()
            .map(|cells| format!("||{}||\n", cells.join("||")))
            .collect();
        let tables = Tables::new();
        let output = convert(&input, &tables.context(Options::default()));
        let table_lines = output.lines().filter(|line| line.starts_with("| ")).count();
        prop_assert_eq!(table_lines, rows.len() + 1);
    }
}
