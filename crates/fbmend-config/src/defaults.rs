//! Compiled-in defaults for templates, heuristics and service identities.
//!
//! # Design
//! - Every key of the settings document has a default here so a partial or
//!   missing file still yields a complete document.
//! - Templates quote path placeholders; tool placeholders arrive pre-quoted.

/// Connection test: pipes `quit;` into `isql` through the Windows shell.
pub const TEST_TEMPLATE: &str =
    r#"cmd /c "echo quit; | {ISQL} -user {USER} -password {PASS} "{DB_PATH}" -q -nod""#;
/// Full validation of the live file.
pub const CHECK_TEMPLATE: &str = r#"{GFIX} -user {USER} -password {PASS} -v -full "{DB_PATH}""#;
/// In-place mend of the live file.
pub const MEND_TEMPLATE: &str = r#"{GFIX} -user {USER} -password {PASS} -mend "{DB_PATH}""#;
/// Backup of the renamed original into the archive.
pub const BACKUP_TEMPLATE: &str = r#"{GBAK} -backup -ignore -garbage -limbo -v -y "{LOG_BKP}" "{OLD_DB}" "{FBK}" -user {USER} -password {PASS}"#;
/// Restore of the archive into the rebuilt file.
pub const RESTORE_TEMPLATE: &str =
    r#"{GBAK} -create -z -v -y "{LOG_RTR}" "{FBK}" "{NEW_DB}" -user {USER} -password {PASS}"#;

/// Substrings (or `/regex/` patterns) that mark tool output as failed.
pub const ERROR_HEURISTICS: &[&str] = &[
    "error",
    "corrupt",
    "bad",
    "wrong page type",
    "index root page",
    "I/O error",
    "checksum",
    "inconsistency",
];

/// Phrases gbak prints on a clean finish; they override failure heuristics.
pub const SUCCESS_MARKERS: &[&str] = &[
    "closing file, committing, and finishing",
    "finishing, closing, and going home",
];

/// Windows service names used by Firebird 2.5 installers, in query order.
pub const WINDOWS_SERVICE_NAMES: &[&str] = &[
    "FirebirdServerFB25",
    "FirebirdServerDefaultInstance",
    "FirebirdServer",
    "FirebirdGuardianDefaultInstance",
];

/// systemd unit names used by common Firebird packages, in query order.
pub const SYSTEMD_SERVICE_NAMES: &[&str] = &["firebird", "firebird3.0", "firebird-superserver"];

/// Rename attempts before a locked file is reported as busy.
pub const RENAME_ATTEMPTS: u32 = 10;
/// Delay between rename attempts, in milliseconds.
pub const RENAME_DELAY_MS: u64 = 1_000;
/// Upper bound for a single external tool run, in seconds.
pub const TOOL_TIMEOUT_SECS: u64 = 4 * 60 * 60;

/// File name of the persisted settings document.
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Application directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "fbmend";
/// Environment variable that overrides the settings directory.
pub const HOME_ENV: &str = "FBMEND_HOME";

/// Service identities for the current platform.
#[must_use]
pub fn service_names() -> Vec<String> {
    let names = if cfg!(windows) {
        WINDOWS_SERVICE_NAMES
    } else {
        SYSTEMD_SERVICE_NAMES
    };
    to_owned_list(names)
}

pub(crate) fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
