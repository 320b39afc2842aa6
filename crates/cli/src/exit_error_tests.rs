// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    usage = { ExitError::usage("bad flag"), 64 },
    data = { ExitError::data("no such index"), 65 },
    unavailable = { ExitError::unavailable("daemon down"), 69 },
    io = { ExitError::io("disk gone"), 74 },
)]
fn constructors_set_the_documented_codes(error: ExitError, code: i32) {
    assert_eq!(error.code, code);
}

#[test]
fn displays_the_message_only() {
    let error = ExitError::new(69, "quedod is not running");
    assert_eq!(error.to_string(), "quedod is not running");
}
