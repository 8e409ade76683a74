//! Normalization pass: environment expansion and absolute-path resolution.
//!
//! Applied uniformly after parsing so that every [`Link`] reaching the engine
//! carries absolute, expanded paths regardless of how it was declared.
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use super::declaration::{Declaration, LinkDecl};
use crate::error::ConfigError;
use crate::machine::{Command, Link, Task};

/// Inputs the normalization pass resolves against.
///
/// Passed explicitly instead of reading or mutating the process environment,
/// so the same declaration always normalizes the same way for the same inputs.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Machine name, exposed to expansions as `$MACHINE`.
    pub machine: String,
    /// Directory relative link targets are resolved against.
    pub root: PathBuf,
    /// Home directory relative link destinations are resolved against.
    pub home: PathBuf,
    /// Snapshot of the process environment used as the expansion fallback.
    pub process: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    #[must_use]
    pub fn capture(machine: &str, root: &Path, home: &Path) -> Self {
        Self {
            machine: machine.to_string(),
            root: root.to_path_buf(),
            home: home.to_path_buf(),
            process: std::env::vars().collect(),
        }
    }
}

/// Result of normalizing a declaration.
#[derive(Debug)]
pub struct Normalized {
    /// Expanded environment variables.
    pub environment: BTreeMap<String, String>,
    /// Hashed tasks, by name.
    pub tasks: BTreeMap<String, Task>,
}

/// Expand and resolve every path in `decl`, then hash the resulting entities.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for an empty task name or an environment
/// variable whose name expands to nothing.
pub fn normalize(decl: &Declaration, env: &Environment) -> Result<Normalized, ConfigError> {
    let mut declared: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &decl.environment {
        let key = expand(name, &declared, env).into_owned();
        if key.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "environment variable name '{name}' expands to an empty string"
            )));
        }
        let value = expand(value, &declared, env).into_owned();
        declared.insert(key, value);
    }

    let mut tasks = BTreeMap::new();
    for (name, task) in &decl.tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("task names must not be empty".to_string()));
        }
        let links = task
            .links
            .iter()
            .map(|l| normalize_link(l, &declared, env))
            .collect();
        let commands = task.commands.iter().map(Command::new).collect();
        tasks.insert(
            name.clone(),
            Task::new(name.clone(), task.dependencies.iter().cloned(), links, commands),
        );
    }

    Ok(Normalized {
        environment: declared,
        tasks,
    })
}

fn normalize_link(link: &LinkDecl, declared: &BTreeMap<String, String>, env: &Environment) -> Link {
    let target = resolve(&env.root, &expand(&link.target, declared, env));
    let destination = resolve(&env.home, &expand(&link.destination, declared, env));
    Link::new(target, destination, link.encrypted)
}

/// Expand `$VAR` and `${VAR}` references.
///
/// Lookup order: variables declared earlier in the same declaration,
/// `MACHINE`, then the process environment.  Unknown variables expand to the
/// empty string.
fn expand<'a>(
    input: &'a str,
    declared: &BTreeMap<String, String>,
    env: &Environment,
) -> Cow<'a, str> {
    shellexpand::env_with_context_no_errors(input, |var: &str| {
        let value = declared
            .get(var)
            .map(String::as_str)
            .or_else(|| (var == "MACHINE").then_some(env.machine.as_str()))
            .or_else(|| env.process.get(var).map(String::as_str))
            .unwrap_or_default();
        Some(value.to_string())
    })
}

/// Join `path` onto `base` unless it is already absolute, then clean it.
fn resolve(base: &Path, path: &str) -> PathBuf {
    lexical_clean(&base.join(path))
}

/// Remove `.` components and fold `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component.as_os_str()),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment {
            machine: "laptop".to_string(),
            root: PathBuf::from("/repo"),
            home: PathBuf::from("/home/u"),
            process: BTreeMap::from([
                ("HOME".to_string(), "/home/u".to_string()),
                ("EDITOR".to_string(), "vim".to_string()),
            ]),
        }
    }

    fn decl(content: &str) -> Declaration {
        Declaration::parse(content, Path::new("machine.toml")).unwrap()
    }

    #[test]
    fn relative_target_resolves_against_root() {
        let n = normalize(
            &decl("[tasks.t]\nlinks = [{ target = \"zsh/zshrc\", destination = \".zshrc\" }]\n"),
            &env(),
        )
        .unwrap();
        let link = &n.tasks["t"].links[0];
        assert_eq!(link.target, PathBuf::from("/repo/zsh/zshrc"));
        assert_eq!(link.destination, PathBuf::from("/home/u/.zshrc"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let n = normalize(
            &decl("[tasks.t]\nlinks = [{ target = \"/etc/hosts\", destination = \"/tmp/hosts\" }]\n"),
            &env(),
        )
        .unwrap();
        let link = &n.tasks["t"].links[0];
        assert_eq!(link.target, PathBuf::from("/etc/hosts"));
        assert_eq!(link.destination, PathBuf::from("/tmp/hosts"));
    }

    #[test]
    fn machine_variable_expands_in_paths() {
        let n = normalize(
            &decl(
                "[tasks.t]\nlinks = [{ target = \"machines/$MACHINE/gitconfig\", destination = \".gitconfig\" }]\n",
            ),
            &env(),
        )
        .unwrap();
        assert_eq!(
            n.tasks["t"].links[0].target,
            PathBuf::from("/repo/machines/laptop/gitconfig")
        );
    }

    #[test]
    fn declared_variables_expand_in_later_variables_and_paths() {
        let n = normalize(
            &decl(
                "[environment]\nA_ROOT = \"$HOME/src\"\nB_BIN = \"${A_ROOT}/bin\"\n\n[tasks.t]\nlinks = [{ target = \"x\", destination = \"$B_BIN/x\" }]\n",
            ),
            &env(),
        )
        .unwrap();
        assert_eq!(n.environment["A_ROOT"], "/home/u/src");
        assert_eq!(n.environment["B_BIN"], "/home/u/src/bin");
        assert_eq!(
            n.tasks["t"].links[0].destination,
            PathBuf::from("/home/u/src/bin/x")
        );
    }

    #[test]
    fn variable_names_are_expanded() {
        let n = normalize(&decl("[environment]\n\"${EDITOR}_THEME\" = \"dark\"\n"), &env()).unwrap();
        assert_eq!(n.environment["vim_THEME"], "dark");
    }

    #[test]
    fn unknown_variables_expand_to_empty() {
        let n = normalize(&decl("[environment]\nX = \"a${NOPE}b\"\n"), &env()).unwrap();
        assert_eq!(n.environment["X"], "ab");
    }

    #[test]
    fn empty_variable_name_is_rejected() {
        let err = normalize(&decl("[environment]\n\"$NOPE\" = \"x\"\n"), &env()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn commands_are_kept_verbatim() {
        let n = normalize(&decl("[tasks.t]\ncommands = [\"echo $HOME\"]\n"), &env()).unwrap();
        assert_eq!(n.tasks["t"].commands[0].text, "echo $HOME");
    }

    #[test]
    fn normalization_is_deterministic() {
        let d = decl("[tasks.a]\ncommands = [\"x\"]\n\n[tasks.b]\ndependencies = [\"a\"]\n");
        let first = normalize(&d, &env()).unwrap();
        let second = normalize(&d, &env()).unwrap();
        assert_eq!(first.tasks, second.tasks);
    }

    #[test]
    fn lexical_clean_folds_dots() {
        assert_eq!(
            lexical_clean(Path::new("/repo/./a/../b")),
            PathBuf::from("/repo/b")
        );
        assert_eq!(lexical_clean(Path::new("/../x")), PathBuf::from("/x"));
    }
}
