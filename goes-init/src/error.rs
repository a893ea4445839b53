//! Fatal boot-sequence errors.
//!
//! Everything here aborts the pivot/finalize attempt and lands in the
//! recovery dispatcher. Best-effort failures (bootstrap mounts, old-root
//! cleanup) are logged where they happen and never become a `BootError`.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("board hook: {0}")]
    Hook(#[source] io::Error),

    #[error("create staging dir {path}: {source}")]
    Staging {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("mount {device} on {path}: {source}")]
    RootMount {
        device: String,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("boot script {path}: {source}")]
    BootScript {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("mkdir {path}: {source}")]
    MakeDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("copy {from} to {to}: {source}")]
    CopyFile {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },

    #[error("chmod {path}: {source}")]
    SetMode {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("symlink {link} -> {target}: {source}")]
    MakeLink {
        link: String,
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("move mount {from} to {to}: {source}")]
    MoveMount {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },

    #[error("chdir {path}: {source}")]
    ChangeDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("bind-move {path} onto /: {source}")]
    SwitchRoot {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("chroot into new root: {0}")]
    ChangeRoot(#[source] io::Error),

    #[error("mount tmpfs on {path}: {source}")]
    ScratchMount {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("stat {path}: {source}")]
    StatInit {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("exec {path}: {source}")]
    ExecInit {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("daemon start: {0}")]
    DaemonStart(#[source] io::Error),
}
