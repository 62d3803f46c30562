//! Server provisioning: launch, readiness, and the remote package install.

use shell_escape::unix::escape;
use thiserror::Error;

use crate::backend::{Backend, InstanceHandle, InstanceNetworking, InstanceRequest};
use crate::distro::{self, DistroError, ServerSecrets};
use crate::ssh::{CommandRunner, RemoteCommandOutput, SshError, SshSession};

/// Everything needed to turn a bare instance into a configured server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionRequest {
    /// Launch parameters handed to the backend.
    pub instance: InstanceRequest,
    /// Distribution name selecting the install script.
    pub distro: String,
    /// Server passwords injected into the install script.
    pub secrets: ServerSecrets,
}

/// Provisioned instance together with how to reach it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisionedServer {
    /// Handle of the launched instance.
    pub handle: InstanceHandle,
    /// Networking details reported once the instance was ready.
    pub networking: InstanceNetworking,
}

/// Errors raised while provisioning a server.
#[derive(Debug, Error)]
pub enum ProvisionError<BackendError>
where
    BackendError: std::error::Error + 'static,
{
    /// Raised before launch when no install script exists for the distro.
    #[error("install script error: {0}")]
    Script(#[from] DistroError),
    /// Raised when instance creation fails.
    #[error("failed to launch instance: {0}")]
    Launch(#[source] BackendError),
    /// Raised when the instance never becomes reachable.
    #[error("instance {instance_id} did not become ready: {source}")]
    Wait {
        /// Provider instance identifier.
        instance_id: String,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the SSH client cannot be invoked.
    #[error("ssh error: {0}")]
    Ssh(#[from] SshError),
    /// Raised when the install script fails on the remote host.
    #[error("server install failed: {message}")]
    Install {
        /// Human-readable description of the failure.
        message: String,
    },
}

/// Launches an instance and runs the server install script on it.
#[derive(Debug)]
pub struct Provisioner<'a, B, R: CommandRunner> {
    backend: &'a B,
    shell: &'a SshSession<R>,
}

impl<'a, B, R> Provisioner<'a, B, R>
where
    B: Backend,
    R: CommandRunner,
{
    /// Creates a provisioner borrowing the backend and shell session.
    #[must_use]
    pub const fn new(backend: &'a B, shell: &'a SshSession<R>) -> Self {
        Self { backend, shell }
    }

    /// Executes the provisioning workflow.
    ///
    /// The install script is rendered before any cloud resource is touched so
    /// an unknown distro is rejected without launching anything.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when script rendering, the launch, the
    /// readiness wait, or the remote install fails.
    pub async fn run(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionedServer, ProvisionError<B::Error>> {
        let script = distro::install_script(&request.distro, &request.secrets)?;

        let handle = self
            .backend
            .create(&request.instance)
            .await
            .map_err(ProvisionError::Launch)?;
        let networking =
            self.backend
                .wait_for_ready(&handle)
                .await
                .map_err(|source| ProvisionError::Wait {
                    instance_id: handle.id.clone(),
                    source,
                })?;

        self.install(&networking, &script)?;

        Ok(ProvisionedServer { handle, networking })
    }

    fn install(
        &self,
        networking: &InstanceNetworking,
        script: &str,
    ) -> Result<(), ProvisionError<B::Error>> {
        let command = format!("sudo /bin/sh -c {}", escape(script.into()));
        let output = self.shell.run(networking, &command)?;
        if output.exit_code == Some(0) {
            return Ok(());
        }

        Err(ProvisionError::Install {
            message: install_failure_message(&output),
        })
    }
}

fn install_failure_message(output: &RemoteCommandOutput) -> String {
    let stderr = output.stderr.trim();
    match output.exit_code {
        Some(code) if stderr.is_empty() => format!("install script exited with status {code}"),
        Some(code) => format!("install script exited with status {code}: {stderr}"),
        None if stderr.is_empty() => String::from("install script terminated without an exit status"),
        None => format!("install script terminated without an exit status: {stderr}"),
    }
}
