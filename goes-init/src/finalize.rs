//! Target environment finalization and handoff.
//!
//! Runs after a successful (or skipped) pivot: ensures the top-level target
//! directories exist, mounts the tmpfs scratch area, then replaces this
//! process with the target root's own init. A target without `/sbin/init`
//! is not an error; the supervisor carries on and starts its own daemons.

use crate::error::BootError;
use crate::ops::MountOps;
use crate::skeleton::create_dir_with_mode;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::symlink;
use std::path::Path;

struct TargetDir {
    path: &'static str,
    mode: u32,
}

const TARGET_DIRS: &[TargetDir] = &[
    TargetDir {
        path: "root",
        mode: 0o700,
    },
    TargetDir {
        path: "tmp",
        mode: 0o1777,
    },
    TargetDir {
        path: "var",
        mode: 0o755,
    },
];

struct TargetLink {
    target: &'static str,
    link: &'static str,
}

const TARGET_LINKS: &[TargetLink] = &[TargetLink {
    target: "../run",
    link: "var/run",
}];

/// Canonical path of the target root's own init, relative to `/`.
pub const TARGET_INIT: &str = "sbin/init";

/// Outcome of `exec_target_init` when no handoff happened.
#[derive(Debug, PartialEq, Eq)]
pub enum Handoff {
    NoTargetInit,
}

/// Ensure the post-switch top level is usable: a home for root, scratch
/// space on tmpfs, `/var`, and the `/var/run` compatibility link.
pub fn prepare_target(root: &Path, ops: &dyn MountOps) -> Result<(), BootError> {
    for d in TARGET_DIRS {
        let path = root.join(d.path);
        if path.symlink_metadata().is_err() {
            create_dir_with_mode(&path, d.mode).map_err(|e| BootError::MakeDir {
                path: path.display().to_string(),
                source: e,
            })?;
        }
    }

    for l in TARGET_LINKS {
        let link = root.join(l.link);
        if link.symlink_metadata().is_err() {
            symlink(l.target, &link).map_err(|e| BootError::MakeLink {
                link: link.display().to_string(),
                target: l.target.to_string(),
                source: e,
            })?;
        }
    }

    let tmp = root.join("tmp");
    ops.mount_virtual("tmpfs", "tmpfs", &tmp)
        .map_err(|e| BootError::ScratchMount {
            path: tmp.display().to_string(),
            source: e,
        })?;

    Ok(())
}

/// Replace this process with the target root's own init, passing a minimal
/// environment. Returns `Handoff::NoTargetInit` when the binary is absent;
/// a binary that exists but cannot be executed is fatal.
pub fn exec_target_init(root: &Path) -> Result<Handoff, BootError> {
    let path = root.join(TARGET_INIT);
    match path.symlink_metadata() {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Handoff::NoTargetInit),
        Err(e) => {
            return Err(BootError::StatInit {
                path: path.display().to_string(),
                source: e,
            });
        }
        Ok(_) => {}
    }

    configure_environment(root)?;

    let to_cstring = |s: &[u8]| {
        CString::new(s).map_err(|e| BootError::ExecInit {
            path: path.display().to_string(),
            source: io::Error::other(e),
        })
    };
    let prog = to_cstring(path.as_os_str().as_bytes())?;
    let argv = [prog.clone()];
    let mut env = Vec::new();
    for key in ["PATH", "SHELL", "HOME", "TERM"] {
        if let Ok(value) = std::env::var(key) {
            env.push(to_cstring(format!("{key}={value}").as_bytes())?);
        }
    }

    match nix::unistd::execve(&prog, &argv, &env) {
        Ok(never) => match never {},
        Err(e) => Err(BootError::ExecInit {
            path: path.display().to_string(),
            source: e.into(),
        }),
    }
}

/// Minimal process environment for the handoff: search path, shell, home,
/// and a terminal type default when the kernel did not provide one.
fn configure_environment(root: &Path) -> Result<(), BootError> {
    // SAFETY: PID 1 is single-threaded here; nothing else reads the
    // environment concurrently.
    unsafe {
        std::env::set_var("PATH", "/bin:/usr/bin");
        std::env::set_var("SHELL", "/usr/bin/goes");
        std::env::set_var("HOME", "/root");
        if std::env::var_os("TERM").is_none() {
            std::env::set_var("TERM", "linux");
        }
    }
    let home = root.join("root");
    std::env::set_current_dir(&home).map_err(|e| BootError::ChangeDir {
        path: home.display().to_string(),
        source: e,
    })
}
