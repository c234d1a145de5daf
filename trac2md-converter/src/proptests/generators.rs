//! Input generators for property-based testing
#![allow(clippy::expect_used)]
use proptest::prelude::*;

/// Any string at all, including control characters and empty input.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex("(?s).*").expect("Failed to create any string strategy")
}

/// Documents assembled from Trac constructs, freely mixed so fences, quotes
/// and tables end up in odd places.
pub fn structured_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("= Title =\n".to_string()),
            Just("== Section == #anchor\n".to_string()),
            Just(" * item\n".to_string()),
            Just(" 1. step\n".to_string()),
            Just("   a. sub step\n".to_string()),
            Just("{{{\n".to_string()),
            Just("{{{#!python\n".to_string()),
            Just("{{{#!td\n".to_string()),
            Just("{{{#!div\n".to_string()),
            Just("}}}\n".to_string()),
            Just("> quoted\n".to_string()),
            Just("> > deeper\n".to_string()),
            Just("||=a=||b||\n".to_string()),
            Just("||c||\\\n".to_string()),
            Just("|----\n".to_string()),
            Just("----\n".to_string()),
            Just("'''bold''' ''italic'' {{{code}}}\n".to_string()),
            Just("[wiki:WikiStart#Intro start] #12 r34 @someone\n".to_string()),
            Just("[[Image(shot.png)]] [[BR]] [[TOC]]\n".to_string()),
            Just("\n".to_string()),
            prop::string::string_regex(r"[a-zA-Z0-9 .,!?'\[\]:#|{}]+\n")
                .expect("Failed to create text chunk"),
        ],
        0..30,
    )
    .prop_map(|chunks| chunks.concat())
}

/// One line of code that must survive a fenced block untouched.
pub fn code_line() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-z0-9 '#*=\[\]:!>|@^,-]{0,40}")
        .expect("Failed to create code line strategy")
}

/// Plain list item text that no inline rule rewrites.
pub fn item_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-z]{1,10}( [a-z]{1,10}){0,3}")
        .expect("Failed to create item text strategy")
}

/// A table cell without markup.
pub fn cell_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[a-z0-9]{1,8}").expect("Failed to create cell strategy")
}
