//! Tenant workspace sandbox.
//!
//! Every tenant owns `<workspace-root>/users/<tenant-id>`. All filesystem
//! access made on behalf of a tenant (tools, file routes, the background
//! completion worker) goes through [`WorkspaceResolver`], which rejects any
//! path that would land outside that directory.
//!
//! Resolution is lexical first (`.`/`..` folding, backslashes treated as
//! separators, absolute paths refused), then the deepest existing ancestor is
//! canonicalized so a symlink inside the workspace cannot point the final
//! path somewhere else.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

/// Largest file `read_to_string` will load.
pub const MAX_READ_BYTES: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("tenant id must be a non-empty single path segment")]
    InvalidTenant,
    #[error("access outside the tenant workspace is not allowed: {0}")]
    AccessDenied(String),
    #[error("file not found in workspace: {0}")]
    NotFound(String),
    #[error("file too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("file is not valid UTF-8 text: {0}")]
    NotText(String),
    #[error("workspace I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    users_root: PathBuf,
}

impl WorkspaceResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            users_root: workspace_root.into().join("users"),
        }
    }

    /// Root directory for one tenant. Validates the id, creates nothing.
    pub fn tenant_root(&self, tenant_id: &str) -> Result<PathBuf, WorkspaceError> {
        validate_tenant(tenant_id)?;
        Ok(self.users_root.join(tenant_id.trim()))
    }

    /// Tenant root, created on first use. Safe to race: `create_dir_all` is idempotent.
    pub fn ensure_tenant_root(&self, tenant_id: &str) -> Result<PathBuf, WorkspaceError> {
        let root = self.tenant_root(tenant_id)?;
        std::fs::create_dir_all(&root)?;
        Ok(root)
    }

    /// Resolve `relative_path` for reading. An empty path is the tenant root.
    /// Never creates directories.
    pub fn resolve(&self, tenant_id: &str, relative_path: &str) -> Result<PathBuf, WorkspaceError> {
        let root = self.tenant_root(tenant_id)?;
        let candidate = join_confined(&root, relative_path)?;
        reject_symlink_escape(&root, &candidate, relative_path)?;
        Ok(candidate)
    }

    /// Resolve `relative_path` for writing, creating the tenant root and the
    /// parent directories of the target.
    pub fn resolve_for_write(
        &self,
        tenant_id: &str,
        relative_path: &str,
    ) -> Result<PathBuf, WorkspaceError> {
        let root = self.ensure_tenant_root(tenant_id)?;
        let candidate = join_confined(&root, relative_path)?;
        reject_symlink_escape(&root, &candidate, relative_path)?;
        if let Some(parent) = candidate.parent() {
            std::fs::create_dir_all(parent)?;
            // the parent may have been swapped for a link between the check and the mkdir
            reject_symlink_escape(&root, &candidate, relative_path)?;
        }
        Ok(candidate)
    }

    /// Whether an absolute path is lexically inside the tenant root.
    pub fn is_within_root(&self, tenant_id: &str, path: &Path) -> bool {
        let Ok(root) = self.tenant_root(tenant_id) else {
            return false;
        };
        match normalize_absolute(path) {
            Some(normalized) => normalized.starts_with(&root),
            None => false,
        }
    }

    /// Path relative to the tenant root, with `/` separators, for display.
    pub fn relative_display(&self, tenant_id: &str, path: &Path) -> Option<String> {
        let root = self.tenant_root(tenant_id).ok()?;
        let rel = path.strip_prefix(&root).ok()?;
        Some(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    pub async fn read_to_string(
        &self,
        tenant_id: &str,
        relative_path: &str,
    ) -> Result<String, WorkspaceError> {
        let path = self.resolve(tenant_id, relative_path)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(WorkspaceError::NotFound(relative_path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkspaceError::NotFound(relative_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if meta.len() > MAX_READ_BYTES {
            return Err(WorkspaceError::TooLarge {
                size: meta.len(),
                limit: MAX_READ_BYTES,
            });
        }
        let bytes = fs::read(&path).await?;
        String::from_utf8(bytes).map_err(|_| WorkspaceError::NotText(relative_path.to_string()))
    }

    pub async fn read_bytes(
        &self,
        tenant_id: &str,
        relative_path: &str,
    ) -> Result<Vec<u8>, WorkspaceError> {
        let path = self.resolve(tenant_id, relative_path)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(WorkspaceError::NotFound(relative_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write(
        &self,
        tenant_id: &str,
        relative_path: &str,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.resolve_for_write(tenant_id, relative_path)?;
        if path.is_dir() {
            return Err(WorkspaceError::AccessDenied(format!(
                "{} is a directory",
                relative_path
            )));
        }
        fs::write(&path, contents).await?;
        log::debug!("[WORKSPACE] wrote {} for tenant {}", relative_path, tenant_id);
        Ok(path)
    }
}

fn validate_tenant(tenant_id: &str) -> Result<(), WorkspaceError> {
    let id = tenant_id.trim();
    if id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || id.contains(':')
    {
        return Err(WorkspaceError::InvalidTenant);
    }
    Ok(())
}

/// Fold `relative` onto `root` without touching the filesystem.
fn join_confined(root: &Path, relative: &str) -> Result<PathBuf, WorkspaceError> {
    let denied = || WorkspaceError::AccessDenied(relative.to_string());

    if relative.contains('\0') {
        return Err(denied());
    }
    let unified = relative.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(denied());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(denied());
                }
            }
            other => segments.push(other),
        }
    }

    let mut path = root.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    Ok(path)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Canonicalize the deepest existing ancestor of `candidate` and require it to
/// stay under the canonical tenant root.
fn reject_symlink_escape(root: &Path, candidate: &Path, requested: &str) -> Result<(), WorkspaceError> {
    let canonical_root = match root.canonicalize() {
        Ok(p) => p,
        // nothing exists yet, so nothing below the root can be a link
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut probe: Option<&Path> = Some(candidate);
    while let Some(current) = probe {
        if !current.starts_with(root) {
            break;
        }
        match current.canonicalize() {
            Ok(canonical) => {
                if canonical.starts_with(&canonical_root) {
                    return Ok(());
                }
                log::warn!(
                    "[WORKSPACE] rejected path '{}' resolving to {}",
                    requested,
                    canonical.display()
                );
                return Err(WorkspaceError::AccessDenied(requested.to_string()));
            }
            Err(_) => {
                // a dangling link would be followed by a later write
                if std::fs::symlink_metadata(current).is_ok() {
                    return Err(WorkspaceError::AccessDenied(requested.to_string()));
                }
                probe = current.parent();
            }
        }
    }
    Ok(())
}

fn normalize_absolute(path: &Path) -> Option<PathBuf> {
    if !path.is_absolute() {
        return None;
    }
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> (TempDir, WorkspaceResolver) {
        let dir = TempDir::new().unwrap();
        let resolver = WorkspaceResolver::new(dir.path());
        (dir, resolver)
    }

    #[test]
    fn test_empty_tenant_is_rejected() {
        let (_dir, resolver) = resolver();
        assert!(matches!(
            resolver.resolve("", "notes.txt"),
            Err(WorkspaceError::InvalidTenant)
        ));
        assert!(matches!(
            resolver.resolve("   ", "notes.txt"),
            Err(WorkspaceError::InvalidTenant)
        ));
        assert!(matches!(
            resolver.resolve("../alice", ""),
            Err(WorkspaceError::InvalidTenant)
        ));
    }

    #[test]
    fn test_empty_path_is_tenant_root() {
        let (dir, resolver) = resolver();
        let path = resolver.resolve("alice", "").unwrap();
        assert_eq!(path, dir.path().join("users").join("alice"));
    }

    #[test]
    fn test_dot_segments_are_folded() {
        let (dir, resolver) = resolver();
        let path = resolver.resolve("alice", "docs/./drafts/../plan.md").unwrap();
        assert_eq!(path, dir.path().join("users/alice/docs/plan.md"));
    }

    #[test]
    fn test_traversal_never_leaves_root() {
        let (dir, resolver) = resolver();
        let root = dir.path().join("users").join("alice");
        let attempts = [
            "../../../evil.txt",
            "..",
            "docs/../../bob/secret.txt",
            "..\\..\\evil.txt",
            "docs\\..\\..\\evil.txt",
            "/etc/passwd",
            "\\windows\\system32",
            "C:\\evil.txt",
            "a/b/../../../c",
        ];
        for attempt in attempts {
            match resolver.resolve("alice", attempt) {
                Ok(path) => assert!(path.starts_with(&root), "{} escaped to {:?}", attempt, path),
                Err(WorkspaceError::AccessDenied(_)) => {}
                Err(other) => panic!("unexpected error for {}: {}", attempt, other),
            }
        }
        assert!(matches!(
            resolver.resolve("alice", "../../../evil.txt"),
            Err(WorkspaceError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_read_resolution_creates_nothing() {
        let (dir, resolver) = resolver();
        resolver.resolve("alice", "deep/nested/file.txt").unwrap();
        assert!(!dir.path().join("users").exists());
    }

    #[test]
    fn test_write_resolution_creates_parents() {
        let (dir, resolver) = resolver();
        let path = resolver
            .resolve_for_write("alice", "deep/nested/file.txt")
            .unwrap();
        assert!(dir.path().join("users/alice/deep/nested").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn test_is_within_root() {
        let (dir, resolver) = resolver();
        let inside = dir.path().join("users/alice/docs/a.txt");
        let outside = dir.path().join("users/alice/../bob/a.txt");
        assert!(resolver.is_within_root("alice", &inside));
        assert!(!resolver.is_within_root("alice", &outside));
        assert!(!resolver.is_within_root("alice", Path::new("relative/a.txt")));
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_dir, resolver) = resolver();
        resolver
            .write("alice", "plans/launch.md", "# Launch\nship it")
            .await
            .unwrap();
        let content = resolver
            .read_to_string("alice", "plans/launch.md")
            .await
            .unwrap();
        assert_eq!(content, "# Launch\nship it");
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let (_dir, resolver) = resolver();
        resolver.write("alice", "secret.txt", "alice only").await.unwrap();

        let err = resolver.read_to_string("bob", "secret.txt").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound(_)));

        let err = resolver
            .read_to_string("bob", "../alice/secret.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_oversized_file_is_refused() {
        let (_dir, resolver) = resolver();
        let big = vec![b'a'; (MAX_READ_BYTES + 1) as usize];
        resolver.write("alice", "big.txt", &big).await.unwrap();
        let err = resolver.read_to_string("alice", "big.txt").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::TooLarge { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_workspace_is_denied() {
        let (dir, resolver) = resolver();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("loot.txt"), "nope").unwrap();

        let root = resolver.ensure_tenant_root("alice").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let err = resolver
            .read_to_string("alice", "link/loot.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::AccessDenied(_)));

        let err = resolver
            .write("alice", "link/new.txt", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::AccessDenied(_)));
        assert!(!outside.join("new.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_is_denied() {
        let (dir, resolver) = resolver();
        let root = resolver.ensure_tenant_root("alice").unwrap();
        let target = dir.path().join("not-yet.txt");
        std::os::unix::fs::symlink(&target, root.join("dangling.txt")).unwrap();

        let err = resolver.write("alice", "dangling.txt", "x").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::AccessDenied(_)));
        assert!(!target.exists());
    }
}
