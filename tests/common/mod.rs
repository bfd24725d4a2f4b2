//! Shell-script stand-ins for `sar` and `sadf`.

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Write every script a test binary runs into a fresh directory.
///
/// Writing an executable while another thread forks can make `exec` fail
/// with ETXTBSY, so call this once, from a `LazyLock`, before any test
/// spawns a process.
pub fn write_scripts(scripts: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in scripts {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    dir
}

/// Sample window paths a `sar` stand-in logged to `<script>.path`, in call
/// order. Empty if it never ran.
pub fn captured_paths(sar: &Path) -> Vec<PathBuf> {
    let mut log = sar.as_os_str().to_owned();
    log.push(".path");
    fs::read_to_string(log)
        .map(|log| log.lines().map(PathBuf::from).collect())
        .unwrap_or_default()
}
