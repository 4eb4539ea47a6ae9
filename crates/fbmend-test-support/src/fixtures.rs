//! Temporary database file plus a fake Firebird tool directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fbmend_tools::Tool;
use tempfile::TempDir;

/// Contents written to the fixture database.
pub const ORIGINAL_CONTENTS: &str = "original database pages";

/// A database file in its own temporary directory, with a `bin` directory
/// holding empty stand-ins for `gfix`, `gbak` and `isql`.
#[derive(Debug)]
pub struct DatabaseFixture {
    root: TempDir,
    data_dir: PathBuf,
    db_path: PathBuf,
    bin_dir: PathBuf,
}

impl DatabaseFixture {
    /// Fixture whose database is named `file_name` (for example `APP.FDB`).
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary layout cannot be created.
    pub fn new(file_name: &str) -> Result<Self> {
        let root = tempfile::tempdir().context("failed to create fixture directory")?;
        let data_dir = root.path().join("data");
        let bin_dir = root.path().join("bin");
        fs::create_dir_all(&data_dir).context("failed to create data directory")?;
        fs::create_dir_all(&bin_dir).context("failed to create bin directory")?;

        let db_path = data_dir.join(file_name);
        fs::write(&db_path, ORIGINAL_CONTENTS).context("failed to write fixture database")?;
        for tool in [Tool::Gfix, Tool::Gbak, Tool::Isql] {
            fs::write(tool.path_in(&bin_dir), b"").context("failed to write fake tool")?;
        }

        Ok(Self {
            root,
            data_dir,
            db_path,
            bin_dir,
        })
    }

    /// Remove a fake tool from the bin directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    pub fn remove_tool(&self, tool: Tool) -> Result<()> {
        fs::remove_file(tool.path_in(&self.bin_dir)).context("failed to remove fake tool")
    }

    /// Root of the fixture; a good place for a settings file.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Directory containing the database.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Canonical database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Fake tool directory.
    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Settings file path inside the fixture root.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.root.path().join("settings.json")
    }

    /// Current contents of the database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    pub fn read_db(&self) -> Result<String> {
        fs::read_to_string(&self.db_path).context("failed to read fixture database")
    }

    /// Sorted file names directly inside the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn listing(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(&self.data_dir)
            .context("failed to list data directory")?
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }
}
