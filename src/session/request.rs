use super::policy::ShellPolicy;

/// What the user asked for on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRequest {
    /// Pod or workload reference, e.g. `foo` or `dc/docker-registry`
    pub target: Option<String>,
    /// Command and arguments following the target
    pub args: Vec<String>,
    pub force_tty: bool,
    pub disable_tty: bool,
    /// Shell run when `args` is empty
    pub shell: String,
    /// Target container; `None` selects the pod's first container
    pub container: Option<String>,
}

impl SessionRequest {
    /// Build a request from `TARGET [COMMAND...]` positionals
    pub fn new(positionals: Vec<String>, shell: impl Into<String>) -> Self {
        let mut positionals = positionals.into_iter();
        Self {
            target: positionals.next(),
            args: positionals.collect(),
            shell: shell.into(),
            ..Default::default()
        }
    }

    pub fn with_tty_flags(mut self, force_tty: bool, disable_tty: bool) -> Self {
        self.force_tty = force_tty;
        self.disable_tty = disable_tty;
        self
    }

    pub fn with_container(mut self, container: Option<String>) -> Self {
        self.container = container.filter(|c| !c.is_empty());
        self
    }

    pub fn shell_policy(&self) -> ShellPolicy {
        ShellPolicy {
            force_tty: self.force_tty,
            disable_tty: self.disable_tty,
            executable: self.shell.clone(),
        }
    }
}

/// The pod a session will run in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
}
