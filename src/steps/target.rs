//! Optional clone and build of a project repository.
use std::path::PathBuf;

use super::{Context, Step, StepOutcome, run_step_command};
use crate::error::StepError;
use crate::resources::sdk::is_repository;

/// Default clone directory: the repository name under the home directory.
#[must_use]
pub fn default_clone_dir(repo: &str, home: &std::path::Path) -> PathBuf {
    let name = repo
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(repo);
    home.join(name.strip_suffix(".git").unwrap_or(name))
}

/// Clone the target repository when absent and run its build commands.
///
/// An existing clone is never touched, not even with `--force`; build
/// commands run after a fresh clone or when forcing.
#[derive(Debug)]
pub struct BuildTarget;

impl BuildTarget {
    fn clone_dir(ctx: &Context, repo: &str) -> PathBuf {
        ctx.config.target.dir.as_deref().map_or_else(
            || default_clone_dir(repo, &ctx.home),
            |dir| ctx.expand(dir),
        )
    }
}

impl Step for BuildTarget {
    fn name(&self) -> &'static str {
        "Build target repository"
    }

    fn id(&self) -> &'static str {
        "target"
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.target.repo.is_some()
    }

    fn run(&self, ctx: &Context) -> Result<StepOutcome, StepError> {
        let Some(repo) = ctx.config.target.repo.as_deref() else {
            return Ok(StepOutcome::Skipped);
        };
        let dir = Self::clone_dir(ctx, repo);

        let cloned = if is_repository(&dir) {
            ctx.log.debug(&format!("{} is already a repository", dir.display()));
            false
        } else {
            let dir_str = dir.to_string_lossy();
            run_step_command(
                ctx,
                "git",
                &["clone", repo, &dir_str],
                &format!("Clone {repo}"),
                self.is_fatal(),
            )?
        };

        if !cloned && !ctx.options.force_reinstall {
            return Ok(StepOutcome::Skipped);
        }

        for command in &ctx.config.target.build {
            ctx.log.info(&format!("building: {command}"));
            match ctx.executor.run_in(&dir, "sh", &["-c", command]) {
                Ok(result) => {
                    for line in result.stdout.lines() {
                        ctx.log.debug(line);
                    }
                }
                Err(e) => {
                    ctx.log.detail(&format!("{command}: {e:#}"));
                    return Err(StepError::fatal(format!("Build: {command}"), e));
                }
            }
        }

        Ok(if cloned {
            StepOutcome::Installed
        } else {
            StepOutcome::Reinstalled
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::Platform;
    use crate::resources::test_helpers::MockExecutor;
    use crate::steps::RunOptions;
    use crate::steps::test_helpers::make_context_with;
    use std::path::Path;
    use std::sync::Arc;

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.target.repo = Some("https://example.invalid/blink.git".to_string());
        config.target.dir = Some(dir.display().to_string());
        config.target.build = vec!["cmake -B build".to_string(), "cmake --build build".to_string()];
        config
    }

    #[test]
    fn clone_dir_defaults_to_repo_name() {
        let home = Path::new("/home/dev");
        assert_eq!(
            default_clone_dir("https://github.com/org/blink.git", home),
            PathBuf::from("/home/dev/blink")
        );
        assert_eq!(
            default_clone_dir("git@github.com:org/blink", home),
            PathBuf::from("/home/dev/blink")
        );
    }

    #[test]
    fn fresh_clone_runs_build() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("blink");
        let exec = Arc::new(MockExecutor::with_responses(vec![(true, String::new()); 3]));
        let (ctx, _tmp) = make_context_with(
            config(&dir),
            Platform::default(),
            exec.clone(),
            RunOptions::default(),
        );
        assert_eq!(BuildTarget.run(&ctx).unwrap(), StepOutcome::Installed);
        let calls = exec.calls();
        assert!(calls[0].starts_with("git clone https://example.invalid/blink.git "));
        assert_eq!(calls[1], "sh -c cmake -B build");
        assert_eq!(calls[2], "sh -c cmake --build build");
    }

    #[test]
    fn existing_clone_is_left_alone() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("blink");
        git2::Repository::init(&dir).unwrap();
        let exec = Arc::new(MockExecutor::default());
        let (ctx, _tmp) = make_context_with(
            config(&dir),
            Platform::default(),
            exec.clone(),
            RunOptions::default(),
        );
        assert_eq!(BuildTarget.run(&ctx).unwrap(), StepOutcome::Skipped);
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn force_rebuilds_existing_clone() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("blink");
        git2::Repository::init(&dir).unwrap();
        let exec = Arc::new(MockExecutor::with_responses(vec![(true, String::new()); 2]));
        let options = RunOptions {
            force_reinstall: true,
            ..RunOptions::default()
        };
        let (ctx, _tmp) =
            make_context_with(config(&dir), Platform::default(), exec.clone(), options);
        assert_eq!(BuildTarget.run(&ctx).unwrap(), StepOutcome::Reinstalled);
        assert!(dir.is_dir());
        assert_eq!(exec.call_count(), 2);
    }

    #[test]
    fn failing_build_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("blink");
        let exec = Arc::new(MockExecutor::with_responses(vec![
            (true, String::new()),
            (false, String::new()),
        ]));
        let (ctx, _tmp) = make_context_with(
            config(&dir),
            Platform::default(),
            exec,
            RunOptions::default(),
        );
        let err = BuildTarget.run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "Setup failed during: Build: cmake -B build");
    }
}
