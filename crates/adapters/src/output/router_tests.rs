// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::output::fake::{FakeClipboard, FakePaste};
use yare::parameterized;

fn router() -> (OutputRouter, FakeClipboard, FakePaste) {
    let clipboard = FakeClipboard::new();
    let paste = FakePaste::new();
    let router = OutputRouter::new(Box::new(clipboard.clone()), Box::new(paste.clone()));
    (router, clipboard, paste)
}

#[parameterized(
    direct = { DistributionProfile::Direct },
    sandboxed = { DistributionProfile::Sandboxed },
)]
fn mode_none_delivers_nothing(profile: DistributionProfile) {
    let (router, clipboard, paste) = router();
    let targets = router.route("hello", OutputMode::None, profile).unwrap();
    assert!(targets.is_empty());
    assert!(clipboard.writes().is_empty());
    assert_eq!(paste.paste_count(), 0);
}

#[parameterized(
    direct = { DistributionProfile::Direct },
    sandboxed = { DistributionProfile::Sandboxed },
)]
fn clipboard_mode_writes_clipboard_only(profile: DistributionProfile) {
    let (router, clipboard, paste) = router();
    let targets = router.route("hello", OutputMode::Clipboard, profile).unwrap();
    assert_eq!(targets, vec![OutputTarget::Clipboard]);
    assert_eq!(clipboard.last().unwrap(), "hello");
    assert_eq!(paste.paste_count(), 0);
}

#[test]
fn paste_mode_is_rejected_in_sandboxed_profile() {
    let (router, clipboard, _) = router();
    match router.route("hello", OutputMode::Paste, DistributionProfile::Sandboxed) {
        Err(OutputError::PasteUnavailableInProfile) => {}
        other => panic!("expected PasteUnavailableInProfile, got {other:?}"),
    }
    assert!(clipboard.writes().is_empty());
}

#[test]
fn combined_mode_downgrades_to_clipboard_in_sandboxed_profile() {
    let (router, clipboard, paste) = router();
    let targets = router
        .route("hello", OutputMode::ClipboardAndPaste, DistributionProfile::Sandboxed)
        .unwrap();
    assert_eq!(targets, vec![OutputTarget::Clipboard]);
    assert_eq!(clipboard.last().unwrap(), "hello");
    assert_eq!(paste.paste_count(), 0);
}

#[parameterized(
    paste_mode = { OutputMode::Paste },
    combined_mode = { OutputMode::ClipboardAndPaste },
)]
fn direct_profile_pastes_after_clipboard(mode: OutputMode) {
    let (router, clipboard, paste) = router();
    let targets = router.route("hello", mode, DistributionProfile::Direct).unwrap();
    assert_eq!(targets, vec![OutputTarget::Clipboard, OutputTarget::Paste]);
    assert_eq!(clipboard.last().unwrap(), "hello");
    assert_eq!(paste.paste_count(), 1);
}

#[test]
fn missing_accessibility_surfaces_permission_error_with_partial_delivery() {
    let (router, clipboard, paste) = router();
    paste.set_granted(false);
    match router.route("hello", OutputMode::Paste, DistributionProfile::Direct) {
        Err(OutputError::AccessibilityPermissionRequired { delivered }) => {
            assert_eq!(delivered, vec![OutputTarget::Clipboard]);
        }
        other => panic!("expected AccessibilityPermissionRequired, got {other:?}"),
    }
    // The posture check never prompts and never posts events.
    assert_eq!(paste.paste_count(), 0);
    assert_eq!(clipboard.last().unwrap(), "hello");
}

#[test]
fn paste_failure_still_counts_the_clipboard_write() {
    let (router, clipboard, paste) = router();
    paste.fail_next(true);
    match router.route("hello", OutputMode::ClipboardAndPaste, DistributionProfile::Direct) {
        Err(OutputError::SyntheticPasteFailed { delivered, .. }) => {
            assert_eq!(delivered, vec![OutputTarget::Clipboard]);
        }
        other => panic!("expected SyntheticPasteFailed, got {other:?}"),
    }
    assert_eq!(clipboard.last().unwrap(), "hello");
}

#[test]
fn clipboard_failure_propagates() {
    let (router, clipboard, _) = router();
    clipboard.fail_next(true);
    match router.route("hello", OutputMode::Clipboard, DistributionProfile::Direct) {
        Err(OutputError::ClipboardFailed(_)) => {}
        other => panic!("expected ClipboardFailed, got {other:?}"),
    }
}
