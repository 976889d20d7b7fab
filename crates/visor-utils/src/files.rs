//! Text and byte file helpers shared by every module.
//!
//! Writes go through a temporary file in the destination directory that is
//! fsync'd and then renamed into place, so readers never observe a partially
//! written payload. Parent directories are created on demand.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use crate::paths;

/// Reads a text file, normalising `\r\n` and `\r` line breaks to `\n`.
///
/// Returns `None` when the path is missing, describes a directory, or cannot
/// be read as UTF-8.
#[must_use]
pub fn read_text(path: &Path) -> Option<String> {
    if paths::describes_dir(path) {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    Some(normalise_line_breaks(&content))
}

/// Writes a text file atomically, converting line breaks to the platform's
/// native form.
pub fn write_text(path: &Path, content: &str) -> io::Result<()> {
    write_bytes(path, native_line_breaks(content).as_bytes())
}

/// Writes raw bytes atomically, creating parent directories when needed.
pub fn write_bytes(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file = staged_tempfile(path, contents)?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Writes a text file atomically only if nothing exists at `path` yet.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] otherwise, leaving the
/// existing file untouched.
pub fn write_text_new(path: &Path, content: &str) -> io::Result<()> {
    let file = staged_tempfile(path, native_line_breaks(content).as_bytes())?;
    file.persist_noclobber(path).map_err(|error| error.error)?;
    Ok(())
}

/// Writes `contents` to the fixed staging path `staged`, fsync'd, without
/// touching any other file.
pub fn write_staged(staged: &Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent(staged)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staged)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Moves a staged file over its destination in a single rename.
pub fn commit_staged(staged: &Path, destination: &Path) -> io::Result<()> {
    fs::rename(staged, destination)
}

/// Creates the directory at `path` and all of its parents.
pub fn create_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Creates an empty file at `path` (and its parent directories) unless one
/// already exists.
pub fn create_file(path: &Path) -> io::Result<()> {
    ensure_parent(path)?;
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(error) => Err(error),
    }
}

/// Removes a file, treating an already missing file as success.
pub fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

fn staged_tempfile(path: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let directory = ensure_parent(path)?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("visor"),
    );

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    Ok(file)
}

fn ensure_parent(path: &Path) -> io::Result<&Path> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "target path did not have a parent directory",
            ));
        }
    };
    fs::create_dir_all(directory)?;
    Ok(directory)
}

fn normalise_line_breaks(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

fn native_line_breaks(content: &str) -> String {
    let unix = normalise_line_breaks(content);
    if cfg!(windows) {
        unix.replace('\n', "\r\n")
    } else {
        unix
    }
}
