//! Path composition with the "trailing separator means directory" convention.
//!
//! Paths that do not exist yet (or that the process cannot stat) are only
//! known to be directories when they end in a separator, so [`join`] keeps
//! that separator and [`describes_dir`] honours it.

use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path, PathBuf};

/// Joins `parts` into a single path.
///
/// Both `/` and `\` are accepted as separators and rewritten to the
/// platform's own; empty components and repeated separators are dropped. The
/// result ends in a separator when the last part does or when it names an
/// existing directory.
pub fn join<I, S>(parts: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut absolute = false;
    let mut trailing = false;
    let mut components: Vec<String> = Vec::new();

    for (index, part) in parts.into_iter().enumerate() {
        let normalised = part.as_ref().replace(['/', '\\'], MAIN_SEPARATOR_STR);
        if normalised.is_empty() {
            continue;
        }
        if index == 0 && normalised.starts_with(MAIN_SEPARATOR) {
            absolute = true;
        }
        trailing = normalised.ends_with(MAIN_SEPARATOR);
        components.extend(
            normalised
                .split(MAIN_SEPARATOR)
                .filter(|component| !component.is_empty())
                .map(str::to_owned),
        );
    }

    let mut joined = components.join(MAIN_SEPARATOR_STR);
    if absolute {
        joined.insert(0, MAIN_SEPARATOR);
    }
    let needs_separator = !joined.ends_with(MAIN_SEPARATOR)
        && (trailing || Path::new(&joined).is_dir())
        && !joined.is_empty();
    if needs_separator {
        joined.push(MAIN_SEPARATOR);
    }
    PathBuf::from(joined)
}

/// Appends the platform separator to `path` unless it already ends in one.
#[must_use]
pub fn ensure_trailing_separator(path: &Path) -> PathBuf {
    let mut text = path.as_os_str().to_os_string();
    if !text.to_string_lossy().ends_with(['/', MAIN_SEPARATOR]) {
        text.push(MAIN_SEPARATOR_STR);
    }
    PathBuf::from(text)
}

/// Reports whether `path` describes a directory.
///
/// Existing paths are checked on disk; otherwise the decision falls back to
/// whether the path ends in a separator.
#[must_use]
pub fn describes_dir(path: &Path) -> bool {
    match path.metadata() {
        Ok(metadata) => metadata.is_dir(),
        Err(_) => path
            .as_os_str()
            .to_string_lossy()
            .ends_with(['/', MAIN_SEPARATOR]),
    }
}
