// Shared helpers for integration tests.
//
// Provides a temporary home directory, a scripted command executor that
// stands in for the host's tools, and a scripted prompter, so each
// integration test can drive whole steps without touching the real system.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use devboot::config::Config;
use devboot::error::IdentityError;
use devboot::exec::{ExecResult, Executor, LoggedExecutor};
use devboot::identity::Prompter;
use devboot::logging::Logger;
use devboot::platform::Platform;
use devboot::steps::{Context, RunOptions};

type Handler = Box<dyn Fn(&[&str]) -> (bool, String) + Send + Sync>;

/// Programs an executor reports as resolvable; handlers may add to it.
pub type SearchPath = Arc<Mutex<Vec<String>>>;

/// Executor answering commands from prefix rules and recording every call.
///
/// Rules are matched against `"program arg1 arg2"`; the first rule whose
/// prefix matches wins.  Unmatched commands fail.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, Handler)>,
    on_path: SearchPath,
    calls: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedExecutor")
            .field("on_path", &self.on_path)
            .finish_non_exhaustive()
    }
}

impl ScriptedExecutor {
    /// Answer commands starting with `prefix` with a fixed result.
    pub fn answer(self, prefix: &str, success: bool, stdout: &str) -> Self {
        let stdout = stdout.to_string();
        self.handle(prefix, move |_| (success, stdout.clone()))
    }

    /// Answer commands starting with `prefix` by calling `handler` with the
    /// arguments.
    pub fn handle(
        mut self,
        prefix: &str,
        handler: impl Fn(&[&str]) -> (bool, String) + Send + Sync + 'static,
    ) -> Self {
        self.rules.push((prefix.to_string(), Box::new(handler)));
        self
    }

    /// Report `programs` as resolvable on `PATH`.
    pub fn on_path(self, programs: &[&str]) -> Self {
        self.on_path
            .lock()
            .unwrap()
            .extend(programs.iter().map(|p| (*p).to_string()));
        self
    }

    /// Shared handle to the programs reported on `PATH`.
    pub fn search_path(&self) -> SearchPath {
        Arc::clone(&self.on_path)
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn answer_for(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());
        let (success, stdout) = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or_else(|| (false, String::new()), |(_, h)| h(args));
        ExecResult {
            stdout,
            stderr: String::new(),
            success,
            code: Some(i32::from(!success)),
        }
    }

    fn checked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let result = self.answer_for(program, args);
        if result.success {
            Ok(result)
        } else {
            anyhow::bail!("{program} failed: {}", result.stdout.trim())
        }
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.checked(program, args)
    }

    fn run_in(&self, _: &Path, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.checked(program, args)
    }

    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        _: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        self.checked(program, args)
    }

    fn run_with_stdin(&self, program: &str, args: &[&str], _: &str) -> anyhow::Result<ExecResult> {
        self.checked(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(self.answer_for(program, args))
    }

    fn which(&self, program: &str) -> bool {
        self.on_path.lock().unwrap().iter().any(|p| p == program)
    }
}

/// Prompter replaying fixed answers and recording messages.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    inputs: Mutex<VecDeque<String>>,
    passwords: Mutex<VecDeque<String>>,
    pub messages: Mutex<Vec<String>>,
    pub password_prompts: Mutex<usize>,
}

impl ScriptedPrompter {
    pub fn new(inputs: &[&str], passwords: &[&str]) -> Self {
        Self {
            inputs: Mutex::new(inputs.iter().map(|s| (*s).to_string()).collect()),
            passwords: Mutex::new(passwords.iter().map(|s| (*s).to_string()).collect()),
            ..Self::default()
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, _prompt: &str, _default: &str) -> Result<String, IdentityError> {
        self.inputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| IdentityError::Prompt("no more answers".to_string()))
    }

    fn password(&self, _prompt: &str) -> Result<String, IdentityError> {
        *self.password_prompts.lock().unwrap() += 1;
        self.passwords
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| IdentityError::Prompt("no more answers".to_string()))
    }

    fn message(&self, msg: &str) {
        self.messages.lock().unwrap().push(msg.to_string());
    }
}

/// Extensions every fake host reports as installed.
pub fn installed_extensions(config: &Config) -> String {
    config
        .editor
        .extensions
        .iter()
        .map(|e| format!("{e}\n"))
        .collect()
}

/// A host whose every tool is already in place, rooted in a temp dir.
pub struct FakeHost {
    pub home: tempfile::TempDir,
    pub config: Config,
}

impl FakeHost {
    /// Lay out an installed toolchain and SDK under a fresh home.
    pub fn provisioned() -> Self {
        let home = tempfile::tempdir().expect("create temp dir");
        let mut config = Config::default();
        config.toolchain.install_dir = home.path().join("opt/arm");

        let compiler = config.toolchain.compiler_path();
        fs::create_dir_all(compiler.parent().expect("compiler dir")).expect("create bin");
        fs::write(&compiler, "#!/bin/sh\n").expect("write compiler");
        fs::set_permissions(&compiler, fs::Permissions::from_mode(0o755))
            .expect("chmod compiler");

        git2::Repository::init(home.path().join("pico-sdk")).expect("init sdk");
        Self { home, config }
    }

    /// Executor reporting every configured tool as present.
    pub fn executor(&self) -> ScriptedExecutor {
        let packages: String = self
            .config
            .tools
            .packages
            .iter()
            .map(|p| format!("{p} install ok installed\n"))
            .collect();
        ScriptedExecutor::default()
            .on_path(&["code", "curl"])
            .answer("dpkg-query", true, &packages)
            .answer(
                &self.config.toolchain.compiler_path().display().to_string(),
                true,
                "13.2.1\n",
            )
            .answer("git -C", true, "")
            .handle("git clone", |args| {
                let dest = args.last().copied().unwrap_or_default();
                (git2::Repository::init(dest).is_ok(), String::new())
            })
            .answer("code --list-extensions", true, &installed_extensions(&self.config))
            .answer("code", true, "")
            .answer("apt-get", true, "")
            .answer("env", true, "")
            .answer("curl", true, "")
            .answer("mkdir", true, "")
            .answer("tar", true, "")
            .answer("rm", true, "")
            .answer("install", true, "")
            .answer("gpg", true, "")
            .answer("tee", true, "")
    }

    /// Empty home: nothing installed yet, one extra binding configured.
    pub fn fresh() -> Self {
        let home = tempfile::tempdir().expect("create temp dir");
        let mut config = Config::default();
        config.toolchain.install_dir = home.path().join("opt/arm");
        config.env.extra.insert("PICO_SERIAL".to_string(), "115200".to_string());
        Self { home, config }
    }

    /// Executor whose install commands make their artifacts appear: apt
    /// records packages (putting the editor on `PATH`), `tar` lays out the
    /// compiler, `git clone` creates the repository and the editor CLI
    /// records extensions.
    pub fn fresh_executor(&self) -> ScriptedExecutor {
        let packages = Arc::new(Mutex::new(BTreeSet::<String>::new()));
        let extensions = Arc::new(Mutex::new(Vec::<String>::new()));
        let exec = ScriptedExecutor::default().on_path(&["curl"]);
        let search_path = exec.search_path();

        let listed_packages = Arc::clone(&packages);
        let editor = self.config.editor.clone();
        let compiler = self.config.toolchain.compiler_path();
        let listed_extensions = Arc::clone(&extensions);
        exec.handle("dpkg-query", move |_| {
            let out: String = listed_packages
                .lock()
                .unwrap()
                .iter()
                .map(|p| format!("{p} install ok installed\n"))
                .collect();
            (true, out)
        })
        .handle("env DEBIAN_FRONTEND=noninteractive apt-get install", move |args| {
            let names = args.iter().skip(3).filter(|a| !a.starts_with('-'));
            for name in names {
                packages.lock().unwrap().insert((*name).to_string());
                if *name == editor.package {
                    search_path.lock().unwrap().push(editor.command.clone());
                }
            }
            (true, String::new())
        })
        .answer(&compiler.display().to_string(), true, "13.2.1\n")
        .handle("tar", move |_| {
            fs::create_dir_all(compiler.parent().expect("compiler dir")).expect("create bin");
            fs::write(&compiler, "#!/bin/sh\n").expect("write compiler");
            fs::set_permissions(&compiler, fs::Permissions::from_mode(0o755))
                .expect("chmod compiler");
            (true, String::new())
        })
        .handle("git clone", |args| {
            let dest = args.last().copied().unwrap_or_default();
            (git2::Repository::init(dest).is_ok(), String::new())
        })
        .answer("git -C", true, "")
        .handle("code --list-extensions", move |_| {
            (true, listed_extensions.lock().unwrap().join("\n"))
        })
        .handle("code --install-extension", move |args| {
            extensions.lock().unwrap().push(args[1].to_string());
            (true, String::new())
        })
        .answer("apt-get", true, "")
        .answer("curl", true, "")
        .answer("mkdir", true, "")
        .answer("rm", true, "")
        .answer("install", true, "")
        .answer("gpg", true, "")
        .answer("tee", true, "")
    }

    /// Build a run context over this host.
    pub fn context(
        &self,
        executor: Arc<dyn Executor>,
        platform: Platform,
        options: RunOptions,
    ) -> Context {
        let log = Arc::new(Logger::new(None));
        Context {
            config: Arc::new(self.config.clone()),
            platform: Arc::new(platform),
            executor: Arc::new(LoggedExecutor::new(executor, Arc::clone(&log))),
            log,
            options,
            home: self.home.path().to_path_buf(),
            path_env: "/usr/local/bin:/usr/bin:/bin".to_string(),
            sudo: false,
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.home.path().join(rel)
    }
}
