use std::fs::{File, Permissions};
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `contents` in one step.
///
/// The data goes to a temporary file next to the target, which is then renamed
/// over it, so readers polling the file never see a half-written feed. On
/// failure the previous file is left in place.
///
/// The published file keeps the permissions of the file it replaces, or gets
/// world-readable `0644` when it is new, so a web server can serve it.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;

    let permissions = match std::fs::metadata(path) {
        Ok(existing) => existing.permissions(),
        Err(_) => new_file_permissions(temp.as_file())?,
    };
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path)?;

    Ok(())
}

#[cfg(unix)]
fn new_file_permissions(_file: &File) -> std::io::Result<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(file: &File) -> std::io::Result<Permissions> {
    Ok(file.metadata()?.permissions())
}
