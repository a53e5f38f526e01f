use std::io;
use std::path::PathBuf;

/// Somewhere to get program bytes from. Asked again on every reset.
pub trait RomSource {
    fn fetch(&mut self) -> io::Result<Vec<u8>>;
}

/// A program already held in memory.
impl RomSource for Vec<u8> {
    fn fetch(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.clone())
    }
}

/// A program read from disk, so edits to the file are picked up on reset.
#[derive(Debug, Clone)]
pub struct RomFile {
    path: PathBuf,
}

impl RomFile {
    pub fn new(path: impl Into<PathBuf>) -> RomFile {
        RomFile { path: path.into() }
    }
}

impl RomSource for RomFile {
    fn fetch(&mut self) -> io::Result<Vec<u8>> {
        let program = std::fs::read(&self.path)?;
        log::info!("Fetched {} bytes from {:?}", program.len(), self.path);
        Ok(program)
    }
}
