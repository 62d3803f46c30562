//! Backend abstraction for the cloud provider operations the bootstrap
//! workflow depends on.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Parameters required to launch a new server instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRequest {
    /// Node name applied as the instance's `Name` tag and used later to find
    /// the server again.
    pub node_name: String,
    /// Machine image identifier (for example an AMI ID). Left to the provider
    /// to reject when absent or unknown.
    pub image_id: String,
    /// Instance flavor to request (for example `m1.small`).
    pub instance_type: String,
    /// Target availability zone (for example `us-east-1b`).
    pub availability_zone: String,
    /// Security group names attached at launch.
    pub security_groups: Vec<String>,
    /// Name of the provider-registered SSH key pair, when one is used.
    pub key_pair: Option<String>,
    /// Tags applied to the instance, rendered as `Key=Value` strings.
    pub tags: Vec<String>,
    /// Root EBS volume size in gigabytes, when overriding the image default.
    pub ebs_size: Option<i32>,
    /// Whether the root volume is deleted when the instance terminates.
    pub ebs_delete_on_termination: bool,
}

impl InstanceRequest {
    /// Starts a builder for an [`InstanceRequest`].
    #[must_use]
    pub fn builder() -> InstanceRequestBuilder {
        InstanceRequestBuilder::new()
    }

    /// Validates the request.
    ///
    /// Only the node name is checked; every other value is deferred to the
    /// provider so its own diagnostics surface unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when the node name is empty.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.node_name.is_empty() {
            return Err(BackendError::Validation("node_name".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`InstanceRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRequestBuilder {
    node_name: String,
    image_id: String,
    instance_type: String,
    availability_zone: String,
    security_groups: Vec<String>,
    key_pair: Option<String>,
    tags: Vec<String>,
    ebs_size: Option<i32>,
    ebs_delete_on_termination: bool,
}

impl Default for InstanceRequestBuilder {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            image_id: String::new(),
            instance_type: String::new(),
            availability_zone: String::new(),
            security_groups: Vec::new(),
            key_pair: None,
            tags: Vec::new(),
            ebs_size: None,
            ebs_delete_on_termination: true,
        }
    }
}

impl InstanceRequestBuilder {
    /// Creates an empty builder; the node name must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node name.
    #[must_use]
    pub fn node_name(mut self, value: impl Into<String>) -> Self {
        self.node_name = value.into();
        self
    }

    /// Sets the machine image identifier.
    #[must_use]
    pub fn image_id(mut self, value: impl Into<String>) -> Self {
        self.image_id = value.into();
        self
    }

    /// Sets the instance flavor.
    #[must_use]
    pub fn instance_type(mut self, value: impl Into<String>) -> Self {
        self.instance_type = value.into();
        self
    }

    /// Sets the availability zone.
    #[must_use]
    pub fn availability_zone(mut self, value: impl Into<String>) -> Self {
        self.availability_zone = value.into();
        self
    }

    /// Sets the security group names attached at launch.
    #[must_use]
    pub fn security_groups(mut self, value: Vec<String>) -> Self {
        self.security_groups = value;
        self
    }

    /// Sets the optional SSH key pair name.
    #[must_use]
    pub fn key_pair(mut self, value: Option<String>) -> Self {
        self.key_pair = value;
        self
    }

    /// Sets the rendered `Key=Value` tag list.
    #[must_use]
    pub fn tags(mut self, value: Vec<String>) -> Self {
        self.tags = value;
        self
    }

    /// Sets the optional root volume size in gigabytes.
    #[must_use]
    pub const fn ebs_size(mut self, value: Option<i32>) -> Self {
        self.ebs_size = value;
        self
    }

    /// Sets whether the root volume is deleted on termination.
    #[must_use]
    pub const fn ebs_delete_on_termination(mut self, value: bool) -> Self {
        self.ebs_delete_on_termination = value;
        self
    }

    /// Builds and validates the [`InstanceRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when the node name is empty.
    pub fn build(self) -> Result<InstanceRequest, BackendError> {
        let request = InstanceRequest {
            node_name: self.node_name.trim().to_owned(),
            image_id: self.image_id.trim().to_owned(),
            instance_type: self.instance_type.trim().to_owned(),
            availability_zone: self.availability_zone.trim().to_owned(),
            security_groups: self
                .security_groups
                .into_iter()
                .map(|group| group.trim().to_owned())
                .collect(),
            key_pair: self.key_pair.map(|value| value.trim().to_owned()),
            tags: self.tags,
            ebs_size: self.ebs_size,
            ebs_delete_on_termination: self.ebs_delete_on_termination,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Handle returned by a backend once an instance has been created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceHandle {
    /// Provider specific identifier for the instance.
    pub id: String,
}

/// Connection details for reaching an instance once it is ready.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceNetworking {
    /// Public DNS name or address assigned by the provider.
    pub host: String,
    /// TCP port for SSH.
    pub ssh_port: u16,
}

/// Result of ensuring a security group exists.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecurityGroupOutcome {
    /// The group was created by this call.
    Created,
    /// The group already existed; nothing was created.
    AlreadyExists,
}

/// Tag-based query used to locate a bootstrapped server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerQuery {
    /// Value of the `Name` tag to match.
    pub node_name: String,
    /// Value of the `Role` tag to match.
    pub role: String,
}

impl ServerQuery {
    /// Builds a query matching a configuration-management server by name.
    #[must_use]
    pub fn chef_server(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            role: crate::tags::SERVER_ROLE.to_owned(),
        }
    }
}

/// Errors raised by backends.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum BackendError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by cloud backends.
pub trait Backend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Ensures a security group with `name` exists, creating it when absent
    /// and opening the server's service ports. Idempotent.
    fn ensure_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> BackendFuture<'a, SecurityGroupOutcome, Self::Error>;

    /// Launches a new instance and returns a handle used for subsequent calls.
    fn create<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, InstanceHandle, Self::Error>;

    /// Blocks until the instance is running and reachable over SSH, returning
    /// its networking details.
    fn wait_for_ready<'a>(
        &'a self,
        handle: &'a InstanceHandle,
    ) -> BackendFuture<'a, InstanceNetworking, Self::Error>;

    /// Looks up the public address of a running server matching `query`,
    /// returning `None` when no such server exists.
    fn find_server_address<'a>(
        &'a self,
        query: &'a ServerQuery,
    ) -> BackendFuture<'a, Option<String>, Self::Error>;
}
