//! Durable storage for schema definitions.

use crate::schema::{SchemaDefinition, SchemaFileRef};
use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// Persists a schema definition and returns a reference downstream tools can
/// read it from.
///
/// Calls with identical input may return distinct references; keep the one
/// you got instead of deriving it again.
pub trait SchemaStore: Send + Sync {
    fn store(&self, schema: &SchemaDefinition) -> Result<SchemaFileRef>;
}

/// Writes each schema definition to its own file in a directory.
///
/// Files are named `schema-<blake3 prefix>-<random>.<ext>`; the digest makes
/// files of the same definition easy to spot, the random part keeps every
/// call distinct.
#[derive(Debug, Clone)]
pub struct FsSchemaStore {
    dir: Utf8PathBuf,
}

impl FsSchemaStore {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl SchemaStore for FsSchemaStore {
    fn store(&self, schema: &SchemaDefinition) -> Result<SchemaFileRef> {
        if schema.text().trim().is_empty() {
            return Err(Error::Storage {
                reason: "schema definition is empty".to_string(),
                source: None,
            });
        }

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::storage(format!("creating {}", self.dir), e))?;

        let digest = blake3::hash(schema.text().as_bytes()).to_hex();
        let prefix = format!("schema-{}-", &digest.as_str()[..12]);
        let suffix = format!(".{}", schema.dialect().extension());
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.dir)
            .map_err(|e| Error::storage(format!("creating schema file in {}", self.dir), e))?;

        file.write_all(schema.text().as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| Error::storage("writing schema file", e))?;

        let (_, path) = file
            .keep()
            .map_err(|e| Error::storage("persisting schema file", e.error))?;
        let path = Utf8PathBuf::from_path_buf(path).map_err(|p| Error::Storage {
            reason: format!("schema file path is not UTF-8: {}", p.display()),
            source: None,
        })?;

        tracing::debug!(%path, bytes = schema.text().len(), "stored schema");
        Ok(SchemaFileRef::new(path))
    }
}
