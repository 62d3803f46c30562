//! Core library for the Bosun Chef server bootstrap tool.
//!
//! The crate exposes a backend abstraction for provisioning EC2 instances and
//! an orchestrator that turns a freshly launched instance into a Chef server
//! (ensure security group → launch → wait for SSH readiness → install Chef →
//! install client credentials locally).

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod distro;
pub mod ec2;
pub mod provision;
pub mod ssh;
pub mod tags;
pub mod test_support;

pub use backend::{
    Backend, BackendError, BackendFuture, InstanceHandle, InstanceNetworking, InstanceRequest,
    InstanceRequestBuilder, SecurityGroupOutcome, ServerQuery,
};
pub use bootstrap::{BootstrapError, BootstrapOrchestrator, BootstrapOutcome, BootstrapRequest};
pub use config::{ConfigError, Ec2Config};
pub use credentials::{CapStdKeyWriter, CredentialError, CredentialInstaller, KeyWriter};
pub use distro::{DistroError, ServerSecrets, derived_distro, install_script};
pub use ec2::{Ec2Backend, Ec2BackendError, SERVER_INGRESS_PORTS};
pub use provision::{ProvisionError, ProvisionRequest, ProvisionedServer, Provisioner};
pub use ssh::{
    CommandOutput, CommandRunner, ProcessCommandRunner, RemoteCommandOutput, SshConfig,
    SshConfigLoadError, SshError, SshSession,
};
pub use tags::{ROLE_TAG_KEY, SERVER_ROLE, TagError, TagSet, bootstrap_tags};
