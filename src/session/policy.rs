//! Terminal allocation and command selection for shell sessions

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("you may not specify -t and -T together")]
    ConflictingTtyFlags,
}

/// Decide whether the remote session gets a TTY.
///
/// `-t` forces one, `-T` disables it, and without either the answer follows
/// whether local stdin is a terminal. Passing both is a usage error.
pub fn resolve_tty(
    force_tty: bool,
    disable_tty: bool,
    stdin_is_terminal: bool,
) -> Result<bool, PolicyError> {
    match (force_tty, disable_tty) {
        (true, true) => Err(PolicyError::ConflictingTtyFlags),
        (true, false) => Ok(true),
        (false, true) => Ok(false),
        (false, false) => Ok(stdin_is_terminal),
    }
}

/// The command to run remotely: the user's command verbatim, or the shell
pub fn select_command(args: &[String], default_shell: &str) -> Vec<String> {
    if args.is_empty() {
        vec![default_shell.to_string()]
    } else {
        args.to_vec()
    }
}

/// Shell-specific session settings, held alongside the generic exec session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellPolicy {
    pub force_tty: bool,
    pub disable_tty: bool,
    pub executable: String,
}

impl ShellPolicy {
    /// Reject flag combinations before anything else happens
    pub fn check_flags(&self) -> Result<(), PolicyError> {
        self.resolve_tty(false).map(|_| ())
    }

    pub fn resolve_tty(&self, stdin_is_terminal: bool) -> Result<bool, PolicyError> {
        resolve_tty(self.force_tty, self.disable_tty, stdin_is_terminal)
    }

    pub fn select_command(&self, args: &[String]) -> Vec<String> {
        select_command(args, &self.executable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tty_precedence_table() {
        for stdin_is_terminal in [false, true] {
            assert_eq!(
                resolve_tty(true, true, stdin_is_terminal),
                Err(PolicyError::ConflictingTtyFlags)
            );
            assert_eq!(resolve_tty(true, false, stdin_is_terminal), Ok(true));
            assert_eq!(resolve_tty(false, true, stdin_is_terminal), Ok(false));
            assert_eq!(resolve_tty(false, false, stdin_is_terminal), Ok(stdin_is_terminal));
        }
    }

    #[test]
    fn test_tty_resolution_is_pure() {
        for force in [false, true] {
            for disable in [false, true] {
                for terminal in [false, true] {
                    assert_eq!(
                        resolve_tty(force, disable, terminal),
                        resolve_tty(force, disable, terminal)
                    );
                }
            }
        }
    }

    #[test]
    fn test_explicit_command_is_kept_verbatim() {
        let args = strings(&["cat", "/etc/resolv.conf"]);
        assert_eq!(select_command(&args, "/bin/sh"), args);

        let args = strings(&["sh", "-c", "echo $HOME && ls -la", "--", "-t"]);
        assert_eq!(select_command(&args, "/bin/bash"), args);
    }

    #[test]
    fn test_default_shell_when_no_command() {
        assert_eq!(select_command(&[], "/bin/sh"), strings(&["/bin/sh"]));
        assert_eq!(select_command(&[], "/usr/bin/fish"), strings(&["/usr/bin/fish"]));
        assert_eq!(select_command(&[], ""), strings(&[""]));
    }

    #[test]
    fn test_shell_policy() {
        let policy = ShellPolicy {
            force_tty: true,
            disable_tty: true,
            executable: "/bin/sh".into(),
        };
        assert_eq!(policy.check_flags(), Err(PolicyError::ConflictingTtyFlags));

        let policy = ShellPolicy {
            force_tty: false,
            disable_tty: true,
            executable: "/bin/bash".into(),
        };
        assert!(policy.check_flags().is_ok());
        assert_eq!(policy.resolve_tty(true), Ok(false));
        assert_eq!(policy.select_command(&[]), strings(&["/bin/bash"]));
    }
}
