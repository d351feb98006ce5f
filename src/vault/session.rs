//! One vault action from credential lookup to presentation.
//!
//! ```text
//! Idle -> ResolvingCredential -> [AwaitingPrompt] -> Invoking -> Classifying -> Presenting -> Idle
//! ```
//!
//! `AwaitingPrompt` is the only point that waits on the user. It is handed
//! back to the caller as a [`PendingPrompt`], which is either resumed with
//! the typed password or cancelled. Cancelling returns to `Idle` without
//! launching anything. While a session is not `Idle`, further `start`
//! calls fail with [`VaultBridgeError::Busy`].

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use zeroize::Zeroizing;

use crate::config::{SettingsProvider, ToolSettings};
use crate::errors::{Result, VaultBridgeError};
use crate::vault::command::VaultCommand;
use crate::vault::credential::{resolve, CredentialMode, Resolution};
use crate::vault::invoker::{execute, ProcessRunner, SystemRunner};

/// Where a session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ResolvingCredential,
    AwaitingPrompt,
    Invoking,
    Classifying,
    Presenting,
}

/// Output ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub output: String,
    pub title: String,
    /// `true`: show in a new read-only view. `false`: replace the buffer.
    pub open_in_new_tab: bool,
    /// How the tool ended when it did not exit cleanly, e.g.
    /// "exited with status 1". Output is then possibly empty or partial.
    pub exit_failure: Option<String>,
}

/// Shows a finished result to the user.
pub trait Presenter {
    fn present(&mut self, presentation: &Presentation) -> Result<()>;
}

/// What `start` led to.
pub enum Started<'a, S: SettingsProvider, R: ProcessRunner> {
    /// The tool ran and its output was presented.
    Finished(Presentation),
    /// No credential configured; waiting for the user.
    AwaitingPrompt(PendingPrompt<'a, S, R>),
}

/// Runs vault commands against injected settings and a process runner.
pub struct Session<S: SettingsProvider, R: ProcessRunner = SystemRunner> {
    settings: S,
    runner: R,
    state: Mutex<SessionState>,
}

impl<S: SettingsProvider> Session<S, SystemRunner> {
    pub fn new(settings: S) -> Self {
        Self::with_runner(settings, SystemRunner)
    }
}

impl<S: SettingsProvider, R: ProcessRunner> Session<S, R> {
    pub fn with_runner(settings: S, runner: R) -> Self {
        Self {
            settings,
            runner,
            state: Mutex::new(SessionState::Idle),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Begin `command`. Runs it right away when a credential is configured,
    /// otherwise suspends and returns a [`PendingPrompt`].
    pub fn start(
        &self,
        command: VaultCommand,
        presenter: &mut dyn Presenter,
    ) -> Result<Started<'_, S, R>> {
        let guard = StateGuard::acquire(&self.state)?;
        let tool = ToolSettings::from_provider(&self.settings)?;

        match resolve(&self.settings)? {
            Resolution::Resolved(mode) => self
                .run(guard, &command, &mode, &tool, presenter)
                .map(Started::Finished),
            Resolution::PromptRequired => {
                guard.advance(SessionState::AwaitingPrompt);
                Ok(Started::AwaitingPrompt(PendingPrompt {
                    session: self,
                    guard,
                    command,
                    tool,
                }))
            }
        }
    }

    fn run(
        &self,
        guard: StateGuard<'_>,
        command: &VaultCommand,
        mode: &CredentialMode,
        tool: &ToolSettings,
        presenter: &mut dyn Presenter,
    ) -> Result<Presentation> {
        guard.advance(SessionState::Invoking);
        let result = execute(&self.runner, command, mode, tool)?;

        guard.advance(SessionState::Classifying);
        let result = result.into_checked()?;

        guard.advance(SessionState::Presenting);
        let exit_failure = result.exit_failure();
        if let Some(failure) = &exit_failure {
            tracing::warn!(%failure, "vault tool did not exit cleanly");
        }
        let presentation = Presentation {
            output: result.stdout,
            title: command.title(),
            open_in_new_tab: command.subcommand().opens_new_tab(),
            exit_failure,
        };
        presenter.present(&presentation)?;

        Ok(presentation)
    }
}

/// A session parked in `AwaitingPrompt`.
pub struct PendingPrompt<'a, S: SettingsProvider, R: ProcessRunner> {
    session: &'a Session<S, R>,
    guard: StateGuard<'a>,
    command: VaultCommand,
    tool: ToolSettings,
}

impl<'a, S: SettingsProvider, R: ProcessRunner> PendingPrompt<'a, S, R> {
    /// The command waiting on the password.
    pub fn command(&self) -> &VaultCommand {
        &self.command
    }

    /// Continue with the password the user typed.
    pub fn resume(
        self,
        password: Zeroizing<String>,
        presenter: &mut dyn Presenter,
    ) -> Result<Presentation> {
        let mode = CredentialMode::InlinePassword(password);
        self.session
            .run(self.guard, &self.command, &mode, &self.tool, presenter)
    }

    /// The user dismissed the prompt. Nothing is launched.
    pub fn cancel(self) {
        tracing::debug!(subcommand = %self.command.subcommand(), "password prompt cancelled");
    }
}

/// Holds the session out of `Idle`; puts it back on drop.
struct StateGuard<'a> {
    cell: &'a Mutex<SessionState>,
}

impl<'a> StateGuard<'a> {
    fn acquire(cell: &'a Mutex<SessionState>) -> Result<Self> {
        let mut state = cell.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != SessionState::Idle {
            tracing::debug!(state = ?*state, "rejecting overlapping vault command");
            return Err(VaultBridgeError::Busy);
        }
        *state = SessionState::ResolvingCredential;
        Ok(Self { cell })
    }

    fn advance(&self, next: SessionState) {
        let mut state = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = ?*state, to = ?next, "session state");
        *state = next;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        *state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerSource, LayeredSettings, SettingsLayer};
    use crate::vault::command::{Invocation, Subcommand};
    use crate::vault::invoker::ProcessOutput;
    use std::cell::{Cell, RefCell};

    /// Counts launches and remembers the stdin it was given.
    struct SpyRunner {
        launches: Cell<usize>,
        last_stdin: RefCell<Option<Vec<u8>>>,
        stdout: &'static str,
        stderr: &'static str,
    }

    impl SpyRunner {
        fn new(stdout: &'static str, stderr: &'static str) -> Self {
            Self {
                launches: Cell::new(0),
                last_stdin: RefCell::new(None),
                stdout,
                stderr,
            }
        }
    }

    impl ProcessRunner for SpyRunner {
        fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
            self.launches.set(self.launches.get() + 1);
            *self.last_stdin.borrow_mut() = invocation.stdin.as_ref().map(|s| s.to_vec());
            Ok(ProcessOutput {
                success: self.stderr.is_empty(),
                code: Some(if self.stderr.is_empty() { 0 } else { 1 }),
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: self.stderr.as_bytes().to_vec(),
            })
        }
    }

    #[derive(Default)]
    struct Collect(Vec<Presentation>);

    impl Presenter for Collect {
        fn present(&mut self, presentation: &Presentation) -> Result<()> {
            self.0.push(presentation.clone());
            Ok(())
        }
    }

    fn settings(toml: &str) -> LayeredSettings {
        LayeredSettings::from_layers(vec![
            SettingsLayer::parse(LayerSource::Project, toml).unwrap()
        ])
    }

    #[test]
    fn configured_password_runs_immediately() {
        let session = Session::with_runner(settings("password = \"pw\""), SpyRunner::new("a: 1\n", ""));
        let mut out = Collect::default();

        let started = session
            .start(VaultCommand::file(Subcommand::View, "/srv/vars.yml"), &mut out)
            .unwrap();

        let Started::Finished(presentation) = started else {
            panic!("expected the command to finish");
        };
        assert_eq!(presentation.output, "a: 1\n");
        assert_eq!(presentation.title, "/srv/vars.yml");
        assert!(presentation.open_in_new_tab);
        assert_eq!(out.0.len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            session.runner().last_stdin.borrow().as_deref(),
            Some(&b"pw\n"[..])
        );
    }

    #[test]
    fn decrypt_replaces_buffer() {
        let session = Session::with_runner(settings("password = \"pw\""), SpyRunner::new("x", ""));
        let mut out = Collect::default();
        session
            .start(VaultCommand::file(Subcommand::Decrypt, "vars.yml"), &mut out)
            .unwrap();
        assert!(!out.0[0].open_in_new_tab);
    }

    #[test]
    fn prompt_then_resume() {
        let session = Session::with_runner(settings(""), SpyRunner::new("plain", ""));
        let mut out = Collect::default();

        let started = session
            .start(VaultCommand::file(Subcommand::Decrypt, "vars.yml"), &mut out)
            .unwrap();
        let Started::AwaitingPrompt(pending) = started else {
            panic!("expected a prompt");
        };
        assert_eq!(session.state(), SessionState::AwaitingPrompt);
        assert_eq!(session.runner().launches.get(), 0);

        let presentation = pending
            .resume(Zeroizing::new("typed".to_string()), &mut out)
            .unwrap();
        assert_eq!(presentation.output, "plain");
        assert_eq!(session.runner().launches.get(), 1);
        assert_eq!(
            session.runner().last_stdin.borrow().as_deref(),
            Some(&b"typed\n"[..])
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn cancel_launches_nothing_and_goes_idle() {
        let session = Session::with_runner(settings(""), SpyRunner::new("", ""));
        let mut out = Collect::default();

        match session
            .start(VaultCommand::file(Subcommand::View, "vars.yml"), &mut out)
            .unwrap()
        {
            Started::AwaitingPrompt(pending) => pending.cancel(),
            Started::Finished(_) => panic!("expected a prompt"),
        }

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.runner().launches.get(), 0);
        assert!(out.0.is_empty());
    }

    #[test]
    fn overlapping_start_is_busy() {
        let session = Session::with_runner(settings(""), SpyRunner::new("", ""));
        let mut out = Collect::default();

        let first = session
            .start(VaultCommand::file(Subcommand::View, "a.yml"), &mut out)
            .unwrap();

        let second = session.start(VaultCommand::file(Subcommand::View, "b.yml"), &mut out);
        assert!(matches!(second, Err(VaultBridgeError::Busy)));

        drop(first);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session
            .start(VaultCommand::file(Subcommand::View, "b.yml"), &mut out)
            .is_ok());
    }

    #[test]
    fn selection_with_password_file_conflicts_without_launch() {
        let session = Session::with_runner(
            settings("password_file = \"/tmp/pw\""),
            SpyRunner::new("", ""),
        );
        let mut out = Collect::default();

        let result = session.start(
            VaultCommand::selection(Subcommand::Decrypt, "$ANSIBLE_VAULT;1.1;AES256\n"),
            &mut out,
        );

        assert!(matches!(result, Err(VaultBridgeError::ConfigConflict(_))));
        assert_eq!(session.runner().launches.get(), 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn process_error_is_not_presented_and_resets_state() {
        let session = Session::with_runner(
            settings("password = \"pw\""),
            SpyRunner::new("", "ERROR! Decryption failed"),
        );
        let mut out = Collect::default();

        let result = session.start(VaultCommand::file(Subcommand::Decrypt, "vars.yml"), &mut out);

        assert!(matches!(result, Err(VaultBridgeError::Process(_))));
        assert!(out.0.is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn unclean_exit_with_benign_stderr_is_flagged() {
        let session = Session::with_runner(
            settings("password = \"pw\""),
            SpyRunner::new("", "Warning: Password input may be echoed.\nVault password: "),
        );
        let mut out = Collect::default();

        session
            .start(VaultCommand::file(Subcommand::Decrypt, "vars.yml"), &mut out)
            .unwrap();

        assert_eq!(out.0[0].exit_failure.as_deref(), Some("exited with status 1"));
        assert_eq!(session.state(), SessionState::Idle);
    }
}
