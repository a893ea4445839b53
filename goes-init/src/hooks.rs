//! Collaborator seams for the boot sequence.
//!
//! The orchestrator owns no policy about how filesystems are mounted, how
//! scripts run, or how images are fetched; all of that arrives as a
//! `HookSet` built by `main`. Boards swap individual hooks without touching
//! the sequence itself, and nothing here is process-global.

use crate::mounter::AutoMounter;
use crate::ops::{LinuxMountOps, MountOps};
use crate::reload::KexecReloader;
use crate::shell::{InteractiveShell, ShRunner};
use std::convert::Infallible;
use std::io;
use std::path::Path;

/// The external mount command: attach `source` (a device or mountpoint
/// spec) at `target`, probing filesystem types as needed.
pub trait Mounter {
    fn mount(&self, source: &str, target: &Path) -> io::Result<()>;
}

/// The external script interpreter. Runs `script` with `root` as its
/// working directory.
pub trait ScriptRunner {
    fn run_script(&self, script: &Path, root: &Path) -> io::Result<()>;
}

/// How an interactive shell session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    EndOfInput,
}

/// The external interactive shell, run synchronously to completion.
pub trait Shell {
    fn run_interactive(&self) -> io::Result<ShellExit>;
}

/// The external file-fetch primitive. `Sync` so recovery can issue fetches
/// from worker threads against disjoint destinations.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str, dest: &Path) -> io::Result<()>;
}

/// The kernel-reload mechanism. Returns only on error; on success the
/// running kernel is replaced.
pub trait Reloader {
    fn reload(&self, kernel: &Path, initramfs: Option<&Path>, cmdline: &str)
    -> io::Result<Infallible>;
}

/// Board-specific hook run before the pivot sequence begins. A failure here
/// is treated exactly like a pivot failure.
pub trait PreBootHook {
    fn run(&self) -> io::Result<()>;
}

/// Started when the target root carries no init of its own.
pub trait DaemonStarter {
    fn start(&self) -> io::Result<()>;
}

/// Everything the boot sequence calls out to, bundled and passed down
/// explicitly from `main`.
pub struct HookSet {
    pub ops: Box<dyn MountOps>,
    pub mounter: Box<dyn Mounter>,
    pub script: Box<dyn ScriptRunner>,
    pub shell: Box<dyn Shell>,
    pub fetcher: Box<dyn Fetcher>,
    pub reloader: Box<dyn Reloader>,
    pub pre_boot: Option<Box<dyn PreBootHook>>,
    pub daemon: Option<Box<dyn DaemonStarter>>,
}

impl HookSet {
    /// The production wiring: real syscalls, `/bin/sh`, HTTP fetch, kexec.
    pub fn production() -> Self {
        Self {
            ops: Box::new(LinuxMountOps),
            mounter: Box::new(AutoMounter),
            script: Box::new(ShRunner),
            shell: Box::new(InteractiveShell::default()),
            fetcher: Box::new(HttpFetcher),
            reloader: Box::new(KexecReloader),
            pre_boot: None,
            daemon: None,
        }
    }
}

/// Default fetch collaborator, backed by the shared HTTP agent in
/// `goes-fetch`.
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> io::Result<()> {
        goes_fetch::fetch(url, dest).map_err(io::Error::from)
    }
}
