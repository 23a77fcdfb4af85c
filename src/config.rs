//! Configuration for where ledger snapshots are kept.

use std::path::{Component, Path, PathBuf};

use crate::Error;

/// The file name used for snapshots when the caller does not pick one.
pub const DEFAULT_SNAPSHOT_NAME: &str = "accounts.csv";

/// Settings for a [crate::Ledger].
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// The directory that snapshots are written to and read from.
    pub snapshot_dir: PathBuf,
    /// The snapshot file name used when none is given.
    pub default_snapshot_name: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("exports"),
            default_snapshot_name: DEFAULT_SNAPSHOT_NAME.to_owned(),
        }
    }
}

impl LedgerConfig {
    /// Create a config that keeps snapshots in `snapshot_dir`.
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            ..Default::default()
        }
    }

    /// Resolve a snapshot name to a path inside [LedgerConfig::snapshot_dir].
    ///
    /// `None` resolves to [LedgerConfig::default_snapshot_name].
    ///
    /// # Errors
    /// Returns [Error::InvalidSnapshotName] if the name is empty or is not a
    /// plain file name, e.g. it contains a path separator or is `..`.
    pub fn snapshot_path(&self, snapshot_name: Option<&str>) -> Result<PathBuf, Error> {
        let name = snapshot_name.unwrap_or(&self.default_snapshot_name);

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file_name)), None) if file_name == name => {
                Ok(self.snapshot_dir.join(name))
            }
            _ => {
                tracing::warn!("rejected snapshot name {name:?}");
                Err(Error::InvalidSnapshotName(name.to_owned()))
            }
        }
    }
}
