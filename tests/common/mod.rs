// Shared helpers for integration tests.
//
// Provides a temporary declaration directory, home and snapshot file plus a
// fluent builder so each integration test can run the whole pipeline in an
// isolated environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use alter_cli::config;
use alter_cli::error::AlterError;
use alter_cli::exec::{ExecResult, Executor};
use alter_cli::logging::{Log, Logger};
use alter_cli::machine::Machine;
use alter_cli::snapshot::{MachineSnapshot, SnapshotStore};
use alter_cli::tasks::clean::{self, CleanReport};
use alter_cli::tasks::provision::{self, ProvisionReport};
use alter_cli::tasks::{ApplyOptions, Context};

/// Machine name every test provisions.
pub const MACHINE: &str = "test";

/// Executor that records every script (and its environment) instead of
/// spawning a shell.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingExecutor {
    /// Scripts run so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("lock calls")
            .iter()
            .map(|(script, _)| script.clone())
            .collect()
    }

    /// Environment passed with the `n`th call.
    pub fn env_of(&self, n: usize) -> Vec<(String, String)> {
        self.calls.lock().expect("lock calls")[n].1.clone()
    }

    /// Report exit 1 for `script` from now on.
    pub fn fail_on(&self, script: &str) {
        *self.fail_on.lock().expect("lock fail_on") = Some(script.to_string());
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.calls.lock().expect("lock calls").clear();
    }
}

impl Executor for RecordingExecutor {
    fn run_shell(
        &self,
        _: &Path,
        script: &str,
        env: &[(String, String)],
    ) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .expect("lock calls")
            .push((script.to_string(), env.to_vec()));
        if self.fail_on.lock().expect("lock fail_on").as_deref() == Some(script) {
            Ok(ExecResult::failed(1))
        } else {
            Ok(ExecResult::ok())
        }
    }
}

/// An isolated provisioning environment backed by temporary directories.
pub struct IntegrationTestContext {
    /// Directory holding `machine.toml` and the link targets.
    pub root: tempfile::TempDir,
    /// Stand-in for the user's home directory.
    pub home: tempfile::TempDir,
    /// Directory holding the snapshot file.
    pub cache: tempfile::TempDir,
    /// Executor shared by every run.
    pub executor: Arc<RecordingExecutor>,
    /// Options applied to every run.
    pub options: ApplyOptions,
    /// Whether runs are dry runs.
    pub dry_run: bool,
}

impl IntegrationTestContext {
    /// Path to the declaration directory.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path to the temporary home.
    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Snapshot store used by every run.
    pub fn store(&self) -> SnapshotStore {
        SnapshotStore::new(self.cache.path().join("snapshot.json"))
    }

    /// Replace `machine.toml`.
    pub fn declare(&self, toml: &str) {
        std::fs::write(self.root.path().join(config::DECLARATION_FILE), toml)
            .expect("write machine.toml");
    }

    /// Write a file under the declaration directory.
    pub fn write_source(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source dir");
        }
        std::fs::write(path, content).expect("write source file");
    }

    /// Load the declaration as the `test` machine.
    pub fn load(&self) -> Result<Machine, AlterError> {
        config::load(
            &self.root.path().join(config::DECLARATION_FILE),
            Some(MACHINE),
            self.home.path(),
        )
    }

    fn context(&self, machine: &Machine) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let ctx = Context::new(
            machine,
            self.root.path().to_path_buf(),
            self.home.path().to_path_buf(),
            Arc::clone(&log) as Arc<dyn Log>,
            Arc::clone(&self.executor) as Arc<dyn Executor>,
        )
        .with_options(self.options)
        .with_dry_run(self.dry_run);
        (ctx, log)
    }

    /// Load the declaration and provision it.
    pub fn provision(&self, only: &[&str]) -> Result<ProvisionReport, AlterError> {
        let mut machine = self.load()?;
        let (ctx, _log) = self.context(&machine);
        let only: Vec<String> = only.iter().map(ToString::to_string).collect();
        provision::provision(&mut machine, &ctx, &self.store(), &only)
    }

    /// Load the declaration and clean it.
    pub fn clean(&self, only: &[&str]) -> Result<CleanReport, AlterError> {
        let machine = self.load()?;
        let (ctx, _log) = self.context(&machine);
        let only: Vec<String> = only.iter().map(ToString::to_string).collect();
        clean::clean(&machine, &ctx, &self.store(), &only)
    }

    /// The stored snapshot of the `test` machine.
    pub fn snapshot(&self) -> MachineSnapshot {
        self.store().load(MACHINE, &Logger::with_log_file(None))
    }

    /// Raw snapshot file contents (empty if absent).
    pub fn snapshot_file(&self) -> String {
        std::fs::read_to_string(self.store().path()).unwrap_or_default()
    }

    /// Path under the temporary home.
    pub fn home_file(&self, relative: &str) -> PathBuf {
        self.home.path().join(relative)
    }

    /// Whether `relative` under home is a symlink.
    pub fn is_link(&self, relative: &str) -> bool {
        self.home_file(relative)
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink())
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a context with an empty declaration.
    pub fn new() -> Self {
        let ctx = IntegrationTestContext {
            root: tempfile::tempdir().expect("create root dir"),
            home: tempfile::tempdir().expect("create home dir"),
            cache: tempfile::tempdir().expect("create cache dir"),
            executor: Arc::new(RecordingExecutor::default()),
            options: ApplyOptions::default(),
            dry_run: false,
        };
        ctx.declare("");
        Self { ctx }
    }

    /// Use `toml` as `machine.toml`.
    pub fn with_declaration(self, toml: &str) -> Self {
        self.ctx.declare(toml);
        self
    }

    /// Write a source file under the declaration directory.
    pub fn with_source(self, relative: &str, content: &str) -> Self {
        self.ctx.write_source(relative, content);
        self
    }

    /// Apply with the given options.
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.ctx.options = options;
        self
    }

    /// Finalise the builder.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
