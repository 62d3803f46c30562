//! Remote command execution over the system `ssh` client.
//!
//! The bootstrap workflow never links an SSH library; it shells out to the
//! host's `ssh` binary with options suitable for unattended use against a
//! freshly created instance. The [`CommandRunner`] seam keeps the process
//! boundary fakeable in tests.

mod config;
mod types;
mod util;

use std::ffi::OsString;

use crate::backend::InstanceNetworking;

pub use config::{SshConfig, SshConfigLoadError, SshError};
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner};
pub use util::expand_tilde;

/// Output captured from a remote command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteCommandOutput {
    /// Exit code reported by the remote command, if available.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Executes remote commands against a provisioned instance.
#[derive(Clone, Debug)]
pub struct SshSession<R: CommandRunner> {
    config: SshConfig,
    runner: R,
}

impl SshSession<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: SshConfig) -> Result<Self, SshError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> SshSession<R> {
    /// Creates a new session using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: SshConfig, runner: R) -> Result<Self, SshError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Executes `remote_command` over SSH and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::Spawn`] when the SSH client cannot be started. A
    /// non-zero remote exit status is reported through the returned output,
    /// not as an error.
    ///
    /// # Security
    ///
    /// `remote_command` is passed verbatim to the SSH client. Ensure any
    /// caller-provided arguments are validated or quoted upstream.
    pub fn run(
        &self,
        networking: &InstanceNetworking,
        remote_command: &str,
    ) -> Result<RemoteCommandOutput, SshError> {
        let args = self.build_ssh_args(networking, remote_command);
        let output = self.runner.run(&self.config.ssh_bin, &args)?;

        Ok(RemoteCommandOutput {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn build_ssh_args(
        &self,
        networking: &InstanceNetworking,
        remote_command: &str,
    ) -> Vec<OsString> {
        let mut args = self.common_ssh_options(networking.ssh_port);
        args.push(OsString::from(format!(
            "{}@{}",
            self.config.ssh_user, networking.host
        )));
        args.push(OsString::from(remote_command));
        args
    }

    fn common_ssh_options(&self, port: u16) -> Vec<OsString> {
        let mut args = vec![OsString::from("-p"), OsString::from(port.to_string())];

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            let expanded = expand_tilde(identity_file);
            args.push(OsString::from("-i"));
            args.push(OsString::from(expanded));
        }

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.ssh_strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        args
    }
}
