//! Minimal root-filesystem skeleton.
//!
//! A freshly mounted target root must be able to host the supervisor and a
//! shell before the switch; the tables here describe exactly what that
//! takes. Every entry is idempotent: already-present objects are skipped,
//! except the supervisor copy when the overwrite flag is set.

use crate::error::BootError;
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt, symlink};
use std::path::{Path, PathBuf};

/// mkdir that pins the requested mode regardless of the caller's umask.
pub(crate) fn create_dir_with_mode(path: &Path, mode: u32) -> io::Result<()> {
    DirBuilder::new().mode(mode).create(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[derive(Debug, Clone)]
pub struct SkeletonDir {
    pub path: String,
    pub mode: u32,
}

#[derive(Debug, Clone)]
pub struct SkeletonFile {
    /// Absolute source on the ramdisk root, copied byte-for-byte.
    pub source: PathBuf,
    /// Destination relative to the new root.
    pub dest: String,
    pub mode: u32,
    /// Marks the one entry the overwrite flag applies to.
    pub is_supervisor: bool,
}

#[derive(Debug, Clone)]
pub struct SkeletonLink {
    pub target: String,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct SkeletonSpec {
    pub dirs: Vec<SkeletonDir>,
    pub files: Vec<SkeletonFile>,
    pub links: Vec<SkeletonLink>,
    /// Initrd-side paths removed once the new root is populated: files
    /// first, then the directories they leave empty.
    pub old_files: Vec<String>,
    pub old_dirs: Vec<String>,
}

impl SkeletonSpec {
    /// The production table: what a target root needs to run the
    /// supervisor and a shell after the switch.
    pub fn target_root() -> Self {
        let dir = |path: &str, mode| SkeletonDir {
            path: path.to_string(),
            mode,
        };
        Self {
            dirs: vec![
                dir("bin", 0o775),
                dir("sbin", 0o755),
                dir("usr", 0o755),
                dir("usr/bin", 0o755),
            ],
            files: vec![
                SkeletonFile {
                    source: PathBuf::from("/init"),
                    dest: "usr/bin/goes".to_string(),
                    mode: 0o755,
                    is_supervisor: true,
                },
                SkeletonFile {
                    source: PathBuf::from("/usr/bin/gdbserver"),
                    dest: "usr/bin/gdbserver".to_string(),
                    mode: 0o755,
                    is_supervisor: false,
                },
            ],
            links: vec![SkeletonLink {
                target: "../usr/bin/goes".to_string(),
                link: "sbin/init".to_string(),
            }],
            old_files: vec![
                "usr/bin/gdbserver".to_string(),
                "init".to_string(),
                "bin/goes".to_string(),
            ],
            old_dirs: vec![
                "run".to_string(),
                "sys".to_string(),
                "proc".to_string(),
                "dev".to_string(),
                "usr/bin".to_string(),
                "usr".to_string(),
                "bin".to_string(),
            ],
        }
    }

    /// Lay the skeleton down under `staging`. Copy failures are fatal: a
    /// missing binary in the new root means the device cannot self-host
    /// after the switch.
    pub fn apply(&self, staging: &Path, overwrite_supervisor: bool) -> Result<(), BootError> {
        for d in &self.dirs {
            let path = staging.join(&d.path);
            if path.symlink_metadata().is_err() {
                create_dir_with_mode(&path, d.mode).map_err(|e| BootError::MakeDir {
                    path: path.display().to_string(),
                    source: e,
                })?;
            }
        }

        for f in &self.files {
            let dest = staging.join(&f.dest);
            let missing = dest.symlink_metadata().is_err();
            if missing || (overwrite_supervisor && f.is_supervisor) {
                fs::copy(&f.source, &dest).map_err(|e| BootError::CopyFile {
                    from: f.source.display().to_string(),
                    to: dest.display().to_string(),
                    source: e,
                })?;
                fs::set_permissions(&dest, fs::Permissions::from_mode(f.mode)).map_err(|e| {
                    BootError::SetMode {
                        path: dest.display().to_string(),
                        source: e,
                    }
                })?;
            }
        }

        for l in &self.links {
            let link = staging.join(&l.link);
            if link.symlink_metadata().is_err() {
                symlink(&l.target, &link).map_err(|e| BootError::MakeLink {
                    link: link.display().to_string(),
                    target: l.target.clone(),
                    source: e,
                })?;
            }
        }

        Ok(())
    }

    /// Remove the skeleton's initrd-side counterparts from the old root.
    /// Only called once the new root is fully populated; failures are
    /// ignored because the old root is about to be discarded.
    pub fn cleanup_old_root(&self, old_root: &Path) {
        for f in &self.old_files {
            let _ = fs::remove_file(old_root.join(f));
        }
        for d in &self.old_dirs {
            let _ = fs::remove_dir(old_root.join(d));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_spec(payload: &Path) -> SkeletonSpec {
        SkeletonSpec {
            dirs: vec![
                SkeletonDir {
                    path: "bin".into(),
                    mode: 0o775,
                },
                SkeletonDir {
                    path: "usr".into(),
                    mode: 0o755,
                },
                SkeletonDir {
                    path: "usr/bin".into(),
                    mode: 0o755,
                },
            ],
            files: vec![SkeletonFile {
                source: payload.to_path_buf(),
                dest: "usr/bin/goes".into(),
                mode: 0o755,
                is_supervisor: true,
            }],
            links: vec![SkeletonLink {
                target: "../usr/bin/goes".into(),
                link: "bin/sh".into(),
            }],
            old_files: vec!["bin/goes".into()],
            old_dirs: vec!["bin".into()],
        }
    }

    fn setup() -> (TempDir, SkeletonSpec, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let payload = tmp.path().join("payload");
        std::fs::write(&payload, "supervisor image").unwrap();
        let staging = tmp.path().join("newroot");
        std::fs::create_dir(&staging).unwrap();
        let spec = test_spec(&payload);
        (tmp, spec, staging)
    }

    #[test]
    fn apply_populates_an_empty_root() {
        let (_tmp, spec, staging) = setup();
        spec.apply(&staging, false).unwrap();

        let copied = staging.join("usr/bin/goes");
        assert_eq!(std::fs::read(&copied).unwrap(), b"supervisor image");
        let mode = copied.metadata().unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o755);

        let link = staging.join("bin/sh");
        assert_eq!(
            std::fs::read_link(&link).unwrap(),
            PathBuf::from("../usr/bin/goes")
        );
        let dir_mode = staging.join("bin").metadata().unwrap().permissions().mode() & 0o7777;
        assert_eq!(dir_mode, 0o775);
    }

    #[test]
    fn reapply_performs_zero_writes() {
        let (_tmp, spec, staging) = setup();
        spec.apply(&staging, false).unwrap();

        // Tamper with the copied file; a second apply must not touch it.
        let copied = staging.join("usr/bin/goes");
        std::fs::write(&copied, "tampered").unwrap();
        spec.apply(&staging, false).unwrap();
        assert_eq!(std::fs::read(&copied).unwrap(), b"tampered");
    }

    #[test]
    fn overwrite_flag_rewrites_exactly_the_supervisor() {
        let (tmp, mut spec, staging) = setup();
        let extra = tmp.path().join("extra");
        std::fs::write(&extra, "debug tool").unwrap();
        spec.files.push(SkeletonFile {
            source: extra,
            dest: "usr/bin/dbg".into(),
            mode: 0o755,
            is_supervisor: false,
        });

        spec.apply(&staging, false).unwrap();
        std::fs::write(staging.join("usr/bin/goes"), "tampered").unwrap();
        std::fs::write(staging.join("usr/bin/dbg"), "tampered").unwrap();

        spec.apply(&staging, true).unwrap();
        assert_eq!(
            std::fs::read(staging.join("usr/bin/goes")).unwrap(),
            b"supervisor image"
        );
        assert_eq!(std::fs::read(staging.join("usr/bin/dbg")).unwrap(), b"tampered");
    }

    #[test]
    fn missing_copy_source_is_fatal() {
        let (tmp, mut spec, staging) = setup();
        spec.files = vec![SkeletonFile {
            source: tmp.path().join("does-not-exist"),
            dest: "usr/bin/goes".into(),
            mode: 0o755,
            is_supervisor: true,
        }];
        let err = spec.apply(&staging, false).unwrap_err();
        assert!(matches!(err, BootError::CopyFile { .. }));
    }

    #[test]
    fn cleanup_removes_files_then_empty_dirs() {
        let (tmp, spec, _staging) = setup();
        let old_root = tmp.path().join("oldroot");
        std::fs::create_dir_all(old_root.join("bin")).unwrap();
        std::fs::write(old_root.join("bin/goes"), "x").unwrap();

        spec.cleanup_old_root(&old_root);
        assert!(!old_root.join("bin").exists());
    }

    #[test]
    fn cleanup_ignores_missing_and_nonempty_entries() {
        let (tmp, spec, _staging) = setup();
        let old_root = tmp.path().join("oldroot");
        std::fs::create_dir_all(old_root.join("bin")).unwrap();
        std::fs::write(old_root.join("bin/keepme"), "x").unwrap();

        // bin/goes absent, bin not empty: both outcomes are silent.
        spec.cleanup_old_root(&old_root);
        assert!(old_root.join("bin/keepme").exists());
    }
}
