//! Table storage collaborators: list, read and write named 2D tables.
pub mod csv_dir;
pub mod memory;

pub use csv_dir::CsvDirectory;
pub use memory::MemoryStore;

use crate::error::{FtopwspError, Result};
use crate::identity::{ArtifactKind, ArtifactName};
use crate::table::Table;

/// Named-table storage. Names are artifact stems without extension.
pub trait TableStore: Send + Sync {
    /// Every stored stem, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Read one table. Unknown names are `NotFound`.
    fn read(&self, stem: &str) -> Result<Table>;

    /// Write one table, replacing any previous table of the same name.
    fn write(&self, stem: &str, table: &Table) -> Result<()>;

    /// Stored artifacts of one kind. Stems that do not follow the naming
    /// convention are returned separately so callers can report them.
    fn list_artifacts(&self, kind: ArtifactKind) -> Result<Listing> {
        let mut listing = Listing::default();
        for stem in self.list()? {
            match ArtifactName::parse(&stem) {
                Ok(name) if name.kind() == kind => listing.names.push(name),
                Ok(_) => {}
                Err(e) => listing.rejected.push((stem, e)),
            }
        }
        Ok(listing)
    }

    fn read_artifact(&self, name: &ArtifactName) -> Result<Table> {
        self.read(&name.stem())
    }

    fn write_artifact(&self, name: &ArtifactName, table: &Table) -> Result<()> {
        self.write(&name.stem(), table)
    }
}

/// Result of [`TableStore::list_artifacts`].
#[derive(Debug, Default)]
pub struct Listing {
    pub names: Vec<ArtifactName>,
    pub rejected: Vec<(String, FtopwspError)>,
}
