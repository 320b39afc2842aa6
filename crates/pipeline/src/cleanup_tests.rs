// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    leading_hallucination = { "Thanks for watching. hello world", "hello world" },
    trailing_hallucination = { "hello world Thank you for watching.", "hello world" },
    subtitles = { "Subtitles by the community", "the community" },
    subscribe = { "Please subscribe and more text", "and more text" },
    newlines = { "one\ntwo\r\nthree", "one two three" },
    double_spaces = { "a  b   c", "a b c" },
    trim = { "  padded  ", "padded" },
    clean_text = { "already clean", "already clean" },
)]
fn scrub_cases(input: &str, expected: &str) {
    assert_eq!(scrub(input), expected);
}

#[parameterized(
    plain = { "hello world" },
    hallucinated = { "Thanks for watching. hello" },
    messy = { "  a\n\nb  c   Thanks for watching.  " },
    spliced = { "ThanksThanks for watching. for watching. ok" },
    empty = { "" },
    only_noise = { "Thanks for watching. Thank you for watching." },
)]
fn scrub_is_idempotent(input: &str) {
    let once = scrub(input);
    assert_eq!(scrub(&once), once);
}

#[test]
fn spliced_phrases_are_fully_removed() {
    assert_eq!(scrub("ThanksThanks for watching. for watching. ok"), "ok");
}

#[test]
fn replacements_apply_in_order() {
    let out = apply_replacements("the quick fox", [("quick", "slow"), ("fox", "dog")]);
    assert_eq!(out, "the slow dog");
}

#[test]
fn empty_replacement_keys_are_skipped() {
    assert_eq!(apply_replacements("abc", [("", "x")]), "abc");
}

#[test]
fn scrub_then_replacements_matches_the_pipeline_order() {
    let scrubbed = scrub("Thanks for watching. hello wrold");
    let fixed = apply_replacements(&scrubbed, [("wrold", "world")]);
    assert_eq!(fixed, "hello world");
}
