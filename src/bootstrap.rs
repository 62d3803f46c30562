//! Orchestration of the full server bootstrap workflow.
//!
//! Steps run strictly in order: validate the node name, ensure the firewall
//! group, provision the server, rediscover it by tags, then install the
//! credentials it issued. Any failure halts the sequence; resources created
//! by earlier steps are left in place for inspection.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::backend::{Backend, InstanceNetworking, SecurityGroupOutcome, ServerQuery};
use crate::credentials::{CredentialError, CredentialInstaller, KeyWriter};
use crate::provision::{ProvisionError, ProvisionRequest, ProvisionedServer, Provisioner};
use crate::ssh::{CommandRunner, SshSession};

/// Everything the bootstrap workflow needs, merged ahead of time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapRequest {
    /// Security groups the instance joins; the first is ensured to exist.
    pub security_groups: Vec<String>,
    /// Provisioning parameters for the server itself.
    pub provision: ProvisionRequest,
    /// SSH port used to reach the discovered server.
    pub ssh_port: u16,
    /// Local destination for the server's validation key.
    pub validation_key_path: Utf8PathBuf,
    /// Local destination for the issued client key.
    pub client_key_path: Utf8PathBuf,
    /// Administrative client identity registered on the server.
    pub client_user: String,
}

impl BootstrapRequest {
    /// Node name the server is created under and found by again.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.provision.instance.node_name
    }
}

/// Outcome returned after a successful bootstrap.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapOutcome {
    /// Identifier of the launched instance.
    pub instance_id: String,
    /// Address the server was reached on.
    pub server_address: String,
    /// Where the validation key was written.
    pub validation_key_path: Utf8PathBuf,
    /// Where the client key was written.
    pub client_key_path: Utf8PathBuf,
}

/// Errors raised while bootstrapping a server.
#[derive(Debug, Error)]
pub enum BootstrapError<BackendError>
where
    BackendError: std::error::Error + 'static,
{
    /// Raised when the request carries no node name.
    #[error("a node name is required; provide one with --node-name")]
    MissingNodeName,
    /// Raised when the request carries no security group to ensure.
    #[error("at least one security group is required")]
    MissingSecurityGroup,
    /// Raised when ensuring the security group fails.
    #[error("failed to configure security group: {0}")]
    SecurityGroup(#[source] BackendError),
    /// Raised when provisioning the server fails.
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError<BackendError>),
    /// Raised when the post-provision server lookup fails.
    #[error("server discovery failed: {0}")]
    Discovery(#[source] BackendError),
    /// Raised when no running server matches the node name after provisioning.
    #[error("no running server tagged for '{node_name}' was found")]
    ServerNotFound {
        /// Node name the lookup was keyed on.
        node_name: String,
    },
    /// Raised when the validation key cannot be installed.
    #[error("failed to install validation key: {0}")]
    ValidationKey(#[source] CredentialError),
    /// Raised when registering the administrative client fails.
    #[error("failed to create root client: {0}")]
    RootClient(#[source] CredentialError),
    /// Raised when the client key cannot be installed.
    #[error("failed to install client key: {0}")]
    ClientKey(#[source] CredentialError),
}

/// Coordinates firewall setup, provisioning, and credential installation.
#[derive(Debug)]
pub struct BootstrapOrchestrator<B, R: CommandRunner, K> {
    backend: B,
    shell: SshSession<R>,
    key_writer: K,
}

impl<B, R, K> BootstrapOrchestrator<B, R, K>
where
    B: Backend,
    R: CommandRunner,
    K: KeyWriter,
{
    /// Creates a new bootstrap orchestrator.
    #[must_use]
    pub const fn new(backend: B, shell: SshSession<R>, key_writer: K) -> Self {
        Self {
            backend,
            shell,
            key_writer,
        }
    }

    /// Executes the bootstrap workflow.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] when validation, the firewall group,
    /// provisioning, discovery, or credential installation fails.
    pub async fn run(
        &self,
        request: &BootstrapRequest,
    ) -> Result<BootstrapOutcome, BootstrapError<B::Error>> {
        if request.node_name().trim().is_empty() {
            return Err(BootstrapError::MissingNodeName);
        }

        self.ensure_security_group(request).await?;
        let server = self.provision_server(request).await?;
        let address = self.discover_server(request).await?;

        let networking = InstanceNetworking {
            host: address.clone(),
            ssh_port: request.ssh_port,
        };
        self.install_credentials(request, &networking)?;

        Ok(BootstrapOutcome {
            instance_id: server.handle.id,
            server_address: address,
            validation_key_path: request.validation_key_path.clone(),
            client_key_path: request.client_key_path.clone(),
        })
    }

    async fn ensure_security_group(
        &self,
        request: &BootstrapRequest,
    ) -> Result<SecurityGroupOutcome, BootstrapError<B::Error>> {
        let group = request
            .security_groups
            .first()
            .ok_or(BootstrapError::MissingSecurityGroup)?;
        let description = format!("{group} group");
        self.backend
            .ensure_security_group(group, &description)
            .await
            .map_err(BootstrapError::SecurityGroup)
    }

    async fn provision_server(
        &self,
        request: &BootstrapRequest,
    ) -> Result<ProvisionedServer, BootstrapError<B::Error>> {
        let provisioner = Provisioner::new(&self.backend, &self.shell);
        provisioner
            .run(&request.provision)
            .await
            .map_err(BootstrapError::from)
    }

    async fn discover_server(
        &self,
        request: &BootstrapRequest,
    ) -> Result<String, BootstrapError<B::Error>> {
        let query = ServerQuery::chef_server(request.node_name());
        let address = self
            .backend
            .find_server_address(&query)
            .await
            .map_err(BootstrapError::Discovery)?;
        address.ok_or_else(|| BootstrapError::ServerNotFound {
            node_name: request.node_name().to_owned(),
        })
    }

    fn install_credentials(
        &self,
        request: &BootstrapRequest,
        networking: &InstanceNetworking,
    ) -> Result<(), BootstrapError<B::Error>> {
        let installer = CredentialInstaller::new(&self.shell, &self.key_writer);
        installer
            .fetch_validation_key(networking, &request.validation_key_path)
            .map_err(BootstrapError::ValidationKey)?;
        installer
            .create_root_client(networking, &request.client_user)
            .map_err(BootstrapError::RootClient)?;
        installer
            .install_client_key(networking, &request.client_user, &request.client_key_path)
            .map_err(BootstrapError::ClientKey)
    }
}
