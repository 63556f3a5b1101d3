use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::structures::db_err::DBError;


/// where a table's bytes live between calls.
///
/// `write` replaces the whole content; a failed write must leave the previous content readable.
pub trait Storage {
    fn exists(&self) -> bool;

    fn read(&self) -> Result<Vec<u8>, DBError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), DBError>;

    /// a human readable location, used in errors and logs
    fn describe(&self) -> String;
}


/// a single CSV file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}


impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { FileStorage { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn io_failure(&self, err: impl ToString) -> DBError {
        DBError::IOFailure(self.describe(), err.to_string())
    }
}


impl Storage for FileStorage {

    fn exists(&self) -> bool { self.path.is_file() }


    fn read(&self) -> Result<Vec<u8>, DBError> {
        if !self.exists() {
            return Err(DBError::FileNotFound(self.describe()));
        }
        fs::read(&self.path).map_err(|e| self.io_failure(e))
    }


    /// writes into a temp file next to the target, then renames it over the target
    fn write(&mut self, bytes: &[u8]) -> Result<(), DBError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| self.io_failure(e))?;

        let mut temp = NamedTempFile::new_in(&parent).map_err(|e| self.io_failure(e))?;
        temp.write_all(bytes).map_err(|e| self.io_failure(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_failure(e))?;
        temp.persist(&self.path).map_err(|e| self.io_failure(e.error))?;

        Ok(())
    }


    fn describe(&self) -> String { self.path.display().to_string() }
}


#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn write_replaces_the_whole_file() {
        let dir = TempDir::new("file_storage").unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested").join("clientes.csv"));
        assert!(!storage.exists());
        assert!(matches!(storage.read(), Err(DBError::FileNotFound(_))));

        storage.write(b"a,b\n1,2\n3,4\n").unwrap();
        storage.write(b"a,b\n").unwrap();

        assert!(storage.exists());
        assert_eq!(storage.read().unwrap(), b"a,b\n");
        // no temp files are left behind
        assert_eq!(fs::read_dir(storage.path().parent().unwrap()).unwrap().count(), 1);
    }
}
