//! Default mount collaborator.
//!
//! The real mount logic (per-fstype options, parallel mounts) lives in the
//! mount command proper; PID 1 only needs enough to get a block device
//! attached at the staging path. This probes `/proc/filesystems` the way
//! mount(8) does for `-t auto`: try every block-backed type until one
//! takes.

use crate::hooks::Mounter;
use nix::mount::{MsFlags, mount};
use std::fs;
use std::io;
use std::path::Path;

/// Used when `/proc/filesystems` is unreadable (proc mount failed earlier).
const FALLBACK_FSTYPES: &[&str] = &["ext4", "ext3", "ext2", "squashfs", "btrfs", "xfs", "vfat"];

pub struct AutoMounter;

impl AutoMounter {
    fn candidate_fstypes() -> Vec<String> {
        let fallback = || FALLBACK_FSTYPES.iter().map(|t| t.to_string()).collect();
        match fs::read_to_string("/proc/filesystems") {
            Ok(list) => {
                let types: Vec<String> = list
                    .lines()
                    .filter(|line| !line.starts_with("nodev"))
                    .map(|line| line.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if types.is_empty() { fallback() } else { types }
            }
            Err(_) => fallback(),
        }
    }
}

impl Mounter for AutoMounter {
    fn mount(&self, source: &str, target: &Path) -> io::Result<()> {
        let mut last = io::Error::other(format!("no filesystem type accepted {source}"));
        for fstype in Self::candidate_fstypes() {
            match mount(
                Some(source),
                target,
                Some(fstype.as_str()),
                MsFlags::empty(),
                None::<&str>,
            ) {
                Ok(()) => return Ok(()),
                Err(e) => last = io::Error::from(e),
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_list_is_never_empty() {
        assert!(!AutoMounter::candidate_fstypes().is_empty());
    }
}
