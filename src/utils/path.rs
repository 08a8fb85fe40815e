//! Path utilities: expand `~`, resolve the database path relative to the config dir.

use std::path::{Path, PathBuf};

pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path.trim_start_matches("~/"));
    }
    PathBuf::from(path)
}

/// Absolute (or `~/`) paths are kept, bare names land in `base`.
pub fn resolve_in(base: &Path, name: &str) -> PathBuf {
    let p = expand_tilde(name);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_resolved_against_base() {
        let base = Path::new("/var/lib/caresync");
        assert_eq!(
            resolve_in(base, "queue.sqlite"),
            PathBuf::from("/var/lib/caresync/queue.sqlite")
        );
        assert_eq!(
            resolve_in(base, "/tmp/q.sqlite"),
            PathBuf::from("/tmp/q.sqlite")
        );
    }
}
