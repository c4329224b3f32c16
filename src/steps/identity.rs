//! Interactive Git/SSH identity setup.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Context, Step, StepOutcome, ensure};
use crate::error::StepError;
use crate::identity::{
    Prompter, classify_verification, clipboard_command, parse_agent_env, prompt_passphrase,
    prompt_required, wait_for_confirmation,
};
use crate::resources::git_config::GitConfigResource;

/// Configure the Git identity and an SSH key registered with the remote.
pub struct SetupIdentity {
    prompter: Box<dyn Prompter>,
}

impl std::fmt::Debug for SetupIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupIdentity").finish_non_exhaustive()
    }
}

impl SetupIdentity {
    /// Create the step with the given prompt source.
    #[must_use]
    pub fn new(prompter: Box<dyn Prompter>) -> Self {
        Self { prompter }
    }

    fn setup(&self, ctx: &Context) -> Result<StepOutcome> {
        let prompter = &*self.prompter;
        let name = prompt_required(prompter, "Git user name", &git_global(ctx, "user.name"))?;
        let email = prompt_required(prompter, "Git email", &git_global(ctx, "user.email"))?;

        let mut outcome = StepOutcome::Skipped;
        for entry in GitConfigResource::identity(&name, &email, &*ctx.executor) {
            outcome = outcome.merge(ensure(&entry, false, ctx)?);
        }

        let key_path = prompter.input("SSH key path", &ctx.config.identity.key_path)?;
        let key = ctx.expand(key_path.trim());
        let passphrase = if key.exists() {
            ctx.log.info(&format!("reusing existing key {}", key.display()));
            existing_key_passphrase(ctx, prompter, &key)?
        } else {
            let passphrase = generate_key(ctx, prompter, &key, &email)?;
            outcome = outcome.merge(StepOutcome::Installed);
            Some(passphrase)
        };

        let agent_env = register_with_agent(ctx, &key, passphrase.as_deref());

        let public_key = fs::read_to_string(format!("{}.pub", key.display()))
            .with_context(|| format!("reading {}.pub", key.display()))?;
        share_public_key(ctx, prompter, public_key.trim());

        wait_for_confirmation(prompter, &ctx.config.identity.confirm_token)?;
        verify(ctx, &key, &agent_env);
        Ok(outcome)
    }
}

fn git_global(ctx: &Context, key: &str) -> String {
    ctx.executor
        .run_unchecked("git", &["config", "--global", "--get", key])
        .ok()
        .filter(|r| r.success)
        .map(|r| r.stdout.trim().to_string())
        .unwrap_or_default()
}

/// Environment variable carrying the passphrase to the askpass helper.
const PASSPHRASE_VAR: &str = "DEVBOOT_SSH_PASSPHRASE";

/// Answers the first passphrase request and refuses any retry, so a wrong
/// passphrase ends `ssh-add` instead of looping.
const ASKPASS_SCRIPT: &str = r#"#!/bin/sh
[ -e "$0.used" ] && exit 1
: > "$0.used"
printf '%s\n' "$DEVBOOT_SSH_PASSPHRASE"
"#;

fn generate_key(
    ctx: &Context,
    prompter: &dyn Prompter,
    key: &Path,
    email: &str,
) -> Result<String> {
    let passphrase = prompt_passphrase(prompter)?;
    if let Some(dir) = key.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("restricting {}", dir.display()))?;
        }
    }
    let key_str = key.to_string_lossy();
    ctx.log.info(&format!("generating SSH key {key_str}"));
    ctx.executor
        .run(
            "ssh-keygen",
            &["-t", "ed25519", "-C", email, "-f", &key_str, "-N", &passphrase, "-q"],
        )
        .context("generating SSH key")?;
    Ok(passphrase)
}

/// Passphrase of an existing key, asked for only when the key is encrypted.
fn existing_key_passphrase(
    ctx: &Context,
    prompter: &dyn Prompter,
    key: &Path,
) -> Result<Option<String>> {
    let key_str = key.to_string_lossy();
    let unlocked = ctx
        .executor
        .run_unchecked("ssh-keygen", &["-y", "-P", "", "-f", &key_str])
        .is_ok_and(|r| r.success);
    if unlocked {
        return Ok(None);
    }
    Ok(Some(prompter.password(&format!("Passphrase for {key_str}"))?))
}

/// Write the askpass helper into a fresh directory under `parent`.
///
/// The directory, and with it the helper, is removed when the returned
/// guard drops.
fn write_askpass_helper(parent: &Path) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::Builder::new()
        .prefix(".devboot-askpass")
        .tempdir_in(parent)
        .with_context(|| format!("creating askpass directory in {}", parent.display()))?;
    let helper = dir.path().join("askpass");
    fs::write(&helper, ASKPASS_SCRIPT)
        .with_context(|| format!("writing {}", helper.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&helper, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("marking {} executable", helper.display()))?;
    }
    Ok((dir, helper))
}

/// Start an agent and add `key` to it, returning the agent's environment.
///
/// An encrypted key is unlocked by handing `passphrase` to `ssh-add`
/// through a one-shot askpass helper; `ssh-add` never sees a terminal.
fn register_with_agent(
    ctx: &Context,
    key: &Path,
    passphrase: Option<&str>,
) -> Vec<(String, String)> {
    let key_str = key.to_string_lossy();
    let manual = || {
        ctx.log.warn(&format!(
            "could not add the key to ssh-agent; run `ssh-add {key_str}` manually"
        ));
    };

    let agent = match ctx.executor.run("ssh-agent", &["-s"]) {
        Ok(r) => r,
        Err(e) => {
            ctx.log.detail(&format!("ssh-agent: {e:#}"));
            manual();
            return Vec::new();
        }
    };
    let vars = parse_agent_env(&agent.stdout);

    let passphrase = passphrase.filter(|p| !p.is_empty());
    let askpass = match passphrase {
        Some(_) => {
            let parent = key.parent().unwrap_or_else(|| Path::new("."));
            match write_askpass_helper(parent) {
                Ok(helper) => Some(helper),
                Err(e) => {
                    ctx.log.detail(&format!("askpass: {e:#}"));
                    manual();
                    return vars;
                }
            }
        }
        None => None,
    };
    let helper = askpass
        .as_ref()
        .map(|(_, path)| path.to_string_lossy().into_owned());

    let mut env: Vec<(&str, &str)> = vars
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if let (Some(helper), Some(passphrase)) = (&helper, passphrase) {
        env.push(("SSH_ASKPASS", helper.as_str()));
        env.push(("SSH_ASKPASS_REQUIRE", "force"));
        env.push((PASSPHRASE_VAR, passphrase));
    }
    if let Err(e) = ctx.executor.run_with_env("ssh-add", &[&key_str], &env) {
        ctx.log.detail(&format!("ssh-add: {e:#}"));
        manual();
    }
    vars
}

fn share_public_key(ctx: &Context, prompter: &dyn Prompter, public_key: &str) {
    let host = &ctx.config.identity.host;
    if let Some((program, args)) = clipboard_command(&ctx.platform, &*ctx.executor) {
        match ctx.executor.run_with_stdin(program, args, public_key) {
            Ok(_) => {
                prompter.message(&format!(
                    "Public key copied to the clipboard. Add it to your {host} account."
                ));
                return;
            }
            Err(e) => ctx.log.detail(&format!("{program}: {e:#}")),
        }
    }
    prompter.message(&format!("Add this public key to your {host} account:"));
    prompter.message(public_key);
}

/// The service ends the session with a non-zero status even when the key is
/// accepted, so the greeting is searched in the error text as well.
fn verify(ctx: &Context, key: &Path, agent_env: &[(String, String)]) {
    let host = &ctx.config.identity.host;
    let key_str = key.to_string_lossy();
    let target = format!("git@{host}");
    let env: Vec<(&str, &str)> = agent_env
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let output = match ctx.executor.run_with_env(
        "ssh",
        &[
            "-T",
            "-i",
            &key_str,
            "-o",
            "StrictHostKeyChecking=accept-new",
            &target,
        ],
        &env,
    ) {
        Ok(r) => r.combined(),
        Err(e) => format!("{e:#}"),
    };
    match classify_verification(&output) {
        Ok(()) => ctx.log.info(&format!("SSH access to {host} verified")),
        Err(e) => {
            ctx.log.detail(&e.to_string());
            ctx.log
                .warn(&format!("could not verify SSH access to {host}; check the key was added"));
        }
    }
}

impl Step for SetupIdentity {
    fn name(&self) -> &'static str {
        "Set up Git identity"
    }

    fn id(&self) -> &'static str {
        "identity"
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.options.identity && !ctx.platform.is_ci
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        match self.setup(ctx) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                ctx.log.detail(&format!("identity setup: {e:#}"));
                ctx.log.warn(&format!("identity setup incomplete: {e}"));
                Ok(StepOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::identity::MockPrompter;
    use crate::platform::Platform;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::RunOptions;
    use crate::steps::test_helpers::make_context_with;
    use std::sync::{Arc, Mutex};

    const AGENT: &str = "SSH_AUTH_SOCK=/tmp/a/agent.1; export SSH_AUTH_SOCK;\n";

    fn answering_prompter(messages: Arc<Mutex<Vec<String>>>) -> MockPrompter {
        let mut prompter = MockPrompter::new();
        prompter.expect_input().returning(|prompt, default| {
            Ok(if prompt.starts_with("Type") {
                "done".to_string()
            } else {
                default.to_string()
            })
        });
        prompter
            .expect_message()
            .returning(move |m| messages.lock().unwrap().push(m.to_string()));
        prompter
    }

    fn identity_options() -> RunOptions {
        RunOptions {
            identity: true,
            ..RunOptions::default()
        }
    }

    #[test]
    fn never_runs_in_ci() {
        let platform = Platform {
            is_ci: true,
            ..Platform::default()
        };
        let step = SetupIdentity::new(Box::new(MockPrompter::new()));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            platform,
            Arc::new(MockExecutor::default()),
            identity_options(),
        );
        assert!(!step.should_run(&ctx));
    }

    #[test]
    fn disabled_without_flag() {
        let step = SetupIdentity::new(Box::new(MockPrompter::new()));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            Arc::new(MockExecutor::default()),
            RunOptions::default(),
        );
        assert!(!step.should_run(&ctx));
    }

    fn write_key(ctx: &Context) -> PathBuf {
        let ssh = ctx.home.join(".ssh");
        fs::create_dir_all(&ssh).unwrap();
        fs::write(ssh.join("id_ed25519"), "private").unwrap();
        fs::write(ssh.join("id_ed25519.pub"), "ssh-ed25519 AAAA dev\n").unwrap();
        ssh.join("id_ed25519")
    }

    #[test]
    fn existing_identity_and_key_are_reused() {
        let exec = Arc::new(MockExecutor::with_responses(vec![
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            (true, "ssh-ed25519 AAAA dev\n".to_string()),
            (true, AGENT.to_string()),
            (true, String::new()),
            (true, "Hi dev! You've successfully authenticated.".to_string()),
        ]));
        let messages = Arc::new(Mutex::new(vec![]));
        let step = SetupIdentity::new(Box::new(answering_prompter(messages.clone())));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            exec.clone(),
            identity_options(),
        );
        write_key(&ctx);

        assert_eq!(step.run(&ctx).unwrap(), StepOutcome::Skipped);

        let calls = exec.calls();
        assert!(calls[4].starts_with("ssh-keygen -y -P  -f "));
        assert_eq!(calls[5], "ssh-agent -s");
        assert!(calls[6].starts_with("ssh-add "));
        assert!(calls[7].ends_with("git@github.com"));
        // Unencrypted key: ssh-add gets only the agent socket.
        let envs = exec.envs();
        assert_eq!(
            envs[0],
            vec![("SSH_AUTH_SOCK".to_string(), "/tmp/a/agent.1".to_string())]
        );
        assert_eq!(envs[1], envs[0], "verification uses the same agent");
        // No clipboard tool: the key is shown to the operator instead.
        assert!(
            messages
                .lock()
                .unwrap()
                .iter()
                .any(|m| m == "ssh-ed25519 AAAA dev")
        );
    }

    #[test]
    fn encrypted_key_is_unlocked_through_askpass() {
        let exec = Arc::new(MockExecutor::with_responses(vec![
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            // ssh-keygen -y with an empty passphrase: key is encrypted
            (false, String::new()),
            (true, AGENT.to_string()),
            (true, String::new()),
            (true, "Hi dev! You've successfully authenticated.".to_string()),
        ]));
        let mut prompter = answering_prompter(Arc::default());
        prompter
            .expect_password()
            .withf(|p| p.starts_with("Passphrase for "))
            .times(1)
            .returning(|_| Ok("secret".to_string()));
        let step = SetupIdentity::new(Box::new(prompter));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            exec.clone(),
            identity_options(),
        );
        write_key(&ctx);

        assert_eq!(step.run(&ctx).unwrap(), StepOutcome::Skipped);

        let ssh_add = &exec.envs()[0];
        let value = |name: &str| {
            ssh_add
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(value("SSH_AUTH_SOCK").as_deref(), Some("/tmp/a/agent.1"));
        assert_eq!(value("SSH_ASKPASS_REQUIRE").as_deref(), Some("force"));
        assert_eq!(value(PASSPHRASE_VAR).as_deref(), Some("secret"));
        let helper = PathBuf::from(value("SSH_ASKPASS").unwrap());
        assert!(helper.starts_with(ctx.home.join(".ssh")));
        assert!(!helper.exists(), "askpass helper must be removed afterwards");
    }

    #[test]
    fn askpass_helper_answers_once() {
        use crate::exec::{Executor, SystemExecutor};
        let tmp = tempfile::tempdir().unwrap();
        let (_guard, helper) = write_askpass_helper(tmp.path()).unwrap();
        let helper = helper.to_string_lossy();

        let first = SystemExecutor
            .run_with_env(&helper, &[], &[(PASSPHRASE_VAR, "secret")])
            .unwrap();
        assert_eq!(first.stdout, "secret\n");
        assert!(
            SystemExecutor
                .run_with_env(&helper, &[], &[(PASSPHRASE_VAR, "secret")])
                .is_err(),
            "a retry after a wrong passphrase must be refused"
        );
    }

    #[test]
    fn passphrase_protected_key_is_added_to_agent() {
        use crate::exec::{Executor, SystemExecutor};
        if !["ssh-keygen", "ssh-agent", "ssh-add"]
            .iter()
            .all(|p| SystemExecutor.which(p))
        {
            return;
        }
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            Arc::new(SystemExecutor),
            identity_options(),
        );
        let ssh = ctx.home.join(".ssh");
        fs::create_dir_all(&ssh).unwrap();
        let key = ssh.join("id_ed25519");
        let key_str = key.to_string_lossy();
        SystemExecutor
            .run(
                "ssh-keygen",
                &["-t", "ed25519", "-f", &key_str, "-N", "secret", "-q"],
            )
            .unwrap();

        let agent_env = register_with_agent(&ctx, &key, Some("secret"));
        let env: Vec<(&str, &str)> = agent_env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let listed = SystemExecutor.run_with_env("ssh-add", &["-l"], &env);
        let _ = SystemExecutor.run_with_env("ssh-agent", &["-k"], &env);

        assert!(!agent_env.is_empty(), "ssh-agent did not start");
        let listed = listed.expect("key should be loaded in the agent");
        assert!(listed.stdout.contains("ED25519"), "{}", listed.stdout);
    }

    #[test]
    fn failed_verification_is_only_a_warning() {
        let exec = Arc::new(MockExecutor::with_responses(vec![
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            (true, "Dev\n".to_string()),
            (true, "dev@example.com\n".to_string()),
            (true, "ssh-ed25519 AAAA dev\n".to_string()),
            (false, String::new()),
            (false, "Permission denied (publickey).".to_string()),
        ]));
        let step = SetupIdentity::new(Box::new(answering_prompter(Arc::default())));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            exec,
            identity_options(),
        );
        write_key(&ctx);

        assert_eq!(step.run(&ctx).unwrap(), StepOutcome::Skipped);
    }

    #[test]
    fn missing_key_is_generated() {
        let exec = Arc::new(MockExecutor::with_responses(vec![
            (true, String::new()),
            (true, String::new()),
            // user.name: unset, set, re-check
            (false, String::new()),
            (true, String::new()),
            (true, "Dev\n".to_string()),
            // user.email: unset, set, re-check
            (false, String::new()),
            (true, String::new()),
            (true, "dev@example.com\n".to_string()),
            // ssh-keygen
            (true, String::new()),
        ]));
        let mut prompter = MockPrompter::new();
        prompter.expect_input().returning(|prompt, default| {
            Ok(match prompt {
                "Git user name" => "Dev".to_string(),
                "Git email" => "dev@example.com".to_string(),
                p if p.starts_with("Type") => "done".to_string(),
                _ => default.to_string(),
            })
        });
        prompter
            .expect_password()
            .times(2)
            .returning(|_| Ok("secret".to_string()));
        prompter.expect_message().returning(|_| ());
        let step = SetupIdentity::new(Box::new(prompter));
        let (ctx, _tmp) = make_context_with(
            Config::default(),
            Platform::default(),
            exec.clone(),
            identity_options(),
        );

        // ssh-keygen is mocked, so the public key never appears and the
        // flow stops after generation.
        assert_eq!(step.run(&ctx).unwrap(), StepOutcome::Failed);
        let keygen = &exec.calls()[8];
        assert!(keygen.starts_with("ssh-keygen -t ed25519 -C dev@example.com -f "));
        assert!(keygen.ends_with("-N secret -q"));
        assert!(ctx.home.join(".ssh").is_dir());
    }
}
