// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rooted_layout_places_every_file_under_the_root() {
    let paths = ConfigPaths::rooted_at("/tmp/quedo-test");
    assert_eq!(paths.settings_file(), PathBuf::from("/tmp/quedo-test/config/settings.toml"));
    assert_eq!(paths.env_file(), PathBuf::from("/tmp/quedo-test/config/config.env"));
    assert_eq!(
        paths.secrets_file(),
        PathBuf::from("/tmp/quedo-test/support/secrets/api-keys.json")
    );
    assert_eq!(paths.db_file(), PathBuf::from("/tmp/quedo-test/support/db/history.sqlite"));
    assert_eq!(
        paths.legacy_history_dir(),
        PathBuf::from("/tmp/quedo-test/legacy/history")
    );
}

#[test]
fn support_tree_is_partitioned() {
    let paths = ConfigPaths::rooted_at("/srv/q");
    assert!(paths.media_dir().starts_with(&paths.support_dir));
    assert!(paths.logs_dir().starts_with(&paths.support_dir));
    assert!(paths.exports_dir().starts_with(&paths.support_dir));
    assert_ne!(paths.media_dir(), paths.logs_dir());
}
