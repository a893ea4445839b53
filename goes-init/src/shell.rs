//! Emergency shell supervision, plus the default shell and script
//! collaborators.
//!
//! The shell loop is the innermost recovery boundary: whatever happened
//! before, PID 1 ends up here and stays here, re-entering an interactive
//! shell forever so the device is never unreachable.

use crate::hooks::{ScriptRunner, Shell, ShellExit};
use crate::pid1;
use goes_common::log_error;
use std::io;
use std::path::Path;
use std::process::Command;

const LOG_TAG: &str = "boot:shell";

/// Default script collaborator: run a boot script through `/bin/sh` with
/// the new root as working directory.
pub struct ShRunner;

impl ScriptRunner for ShRunner {
    fn run_script(&self, script: &Path, root: &Path) -> io::Result<()> {
        let status = Command::new("/bin/sh")
            .arg(script)
            .current_dir(root)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited with {status}",
                script.display()
            )))
        }
    }
}

/// Default interactive-shell collaborator.
pub struct InteractiveShell {
    program: String,
}

impl Default for InteractiveShell {
    fn default() -> Self {
        Self {
            program: "/bin/sh".to_string(),
        }
    }
}

impl Shell for InteractiveShell {
    fn run_interactive(&self) -> io::Result<ShellExit> {
        let status = Command::new(&self.program).arg("-i").status()?;
        if status.success() {
            Ok(ShellExit::EndOfInput)
        } else {
            Err(io::Error::other(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

/// One shell turn: invoke the shell, log anything that was not a clean end
/// of input, and always come back for another round.
pub fn shell_turn(shell: &dyn Shell) {
    match shell.run_interactive() {
        Ok(ShellExit::EndOfInput) => {}
        Err(e) => log_error!(LOG_TAG, "shell: {e}"),
    }
}

/// Never returns: PID 1 must keep running, so the shell is re-entered
/// forever, reaping any orphans between sessions.
pub fn supervise(shell: &dyn Shell) -> ! {
    loop {
        println!("Dropping into emergency shell...");
        shell_turn(shell);
        pid1::reap_zombies();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FailingShell {
        calls: Cell<u32>,
    }

    impl Shell for FailingShell {
        fn run_interactive(&self) -> io::Result<ShellExit> {
            self.calls.set(self.calls.get() + 1);
            Err(io::Error::other("transient shell failure"))
        }
    }

    struct EofShell {
        calls: Cell<u32>,
    }

    impl Shell for EofShell {
        fn run_interactive(&self) -> io::Result<ShellExit> {
            self.calls.set(self.calls.get() + 1);
            Ok(ShellExit::EndOfInput)
        }
    }

    #[test]
    fn errors_never_escape_a_turn() {
        let shell = FailingShell { calls: Cell::new(0) };
        for _ in 0..100 {
            shell_turn(&shell);
        }
        assert_eq!(shell.calls.get(), 100);
    }

    #[test]
    fn end_of_input_is_not_an_error_and_still_returns() {
        let shell = EofShell { calls: Cell::new(0) };
        for _ in 0..3 {
            shell_turn(&shell);
        }
        assert_eq!(shell.calls.get(), 3);
    }
}
