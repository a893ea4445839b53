//! Mount-namespace syscalls behind a seam.
//!
//! The orchestrator drives these through a trait so the sequencing rules
//! (what must precede the switch, what is forbidden after a failure) are
//! checkable without a live mount namespace. `LinuxMountOps` is the real
//! thing; tests substitute a recording double.

use std::io;
use std::path::Path;

pub trait MountOps {
    /// Mount a kernel pseudo-filesystem at `target`.
    fn mount_virtual(&self, fstype: &str, source: &str, target: &Path) -> io::Result<()>;

    /// Relocate a live mount onto `target`, preserving mount identity
    /// (open descriptors, bind relationships). Never unmount-and-remount.
    fn move_mount(&self, source: &Path, target: &Path) -> io::Result<()>;

    /// Change the working directory.
    fn enter(&self, dir: &Path) -> io::Result<()>;

    /// Bind-move the staged root onto `/`.
    fn move_root(&self, staging: &Path) -> io::Result<()>;

    /// Change the root context to the current working directory.
    fn change_root(&self) -> io::Result<()>;
}

pub struct LinuxMountOps;

impl MountOps for LinuxMountOps {
    fn mount_virtual(&self, fstype: &str, source: &str, target: &Path) -> io::Result<()> {
        nix::mount::mount(
            Some(source),
            target,
            Some(fstype),
            nix::mount::MsFlags::empty(),
            None::<&str>,
        )
        .map_err(io::Error::from)
    }

    fn move_mount(&self, source: &Path, target: &Path) -> io::Result<()> {
        nix::mount::mount(
            Some(source),
            target,
            None::<&str>,
            nix::mount::MsFlags::MS_MOVE,
            None::<&str>,
        )
        .map_err(io::Error::from)
    }

    fn enter(&self, dir: &Path) -> io::Result<()> {
        nix::unistd::chdir(dir).map_err(io::Error::from)
    }

    fn move_root(&self, staging: &Path) -> io::Result<()> {
        nix::mount::mount(
            Some(staging),
            "/",
            None::<&str>,
            nix::mount::MsFlags::MS_MOVE,
            None::<&str>,
        )
        .map_err(io::Error::from)
    }

    fn change_root(&self) -> io::Result<()> {
        nix::unistd::chroot(".").map_err(io::Error::from)
    }
}
