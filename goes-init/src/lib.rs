//! PID 1 boot supervisor for the appliance initrd.
//!
//! Invoked by the kernel as `/init`, this crate primes the kernel's virtual
//! filesystems, pivots from the initrd to the persistent root named by the
//! `goesroot` environment variable, and hands off to the target's
//! `/sbin/init`. Any failure along the way falls back to a network-delivered
//! recovery image (`goesinstaller`) or, failing that, to an emergency shell.
//! The process never exits: PID 1 death would panic the kernel.
//!
//! Boot sequence:
//! 1. Prime virtual filesystems (best-effort, only as PID 1 under `/init`)
//! 2. Pivot: mount target root, run boot script, lay down skeleton,
//!    relocate live mounts, bind-move onto `/`, chroot
//! 3. Finalize: target directories, tmpfs scratch, exec `/sbin/init`
//! 4. On failure: fetch recovery images and kexec into them
//! 5. Always reachable: the perpetual interactive shell

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod finalize;
pub mod hooks;
pub mod mounter;
pub mod ops;
pub mod pid1;
pub mod pivot;
pub mod recovery;
pub mod reload;
pub mod shell;
pub mod skeleton;
