//! Amazon EC2 backend implementation of the server lifecycle.

mod discovery;
mod error;
mod security_group;
mod wait;

use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::types::{
    BlockDeviceMapping, EbsBlockDevice, Instance, InstanceType, Placement, ResourceType, Tag,
    TagSpecification,
};

use crate::backend::{
    Backend, BackendFuture, InstanceHandle, InstanceNetworking, InstanceRequest,
    SecurityGroupOutcome, ServerQuery,
};
use crate::config::Ec2Config;

const DEFAULT_SSH_PORT: u16 = 22;
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

const RUNNING_STATE: &str = "running";
const NAME_TAG_KEY: &str = "Name";
const ROOT_DEVICE_NAME: &str = "/dev/sda1";
const CREDENTIALS_PROVIDER_NAME: &str = "bosun-config";

pub use error::Ec2BackendError;
pub use security_group::SERVER_INGRESS_PORTS;

/// Backend that provisions servers through the EC2 API.
#[derive(Clone)]
pub struct Ec2Backend {
    client: Client,
    ssh_port: u16,
    poll_interval: Duration,
    wait_timeout: Duration,
}

/// Point-in-time view of an instance taken from `DescribeInstances`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct InstanceSnapshot {
    pub(crate) state: Option<String>,
    pub(crate) host: Option<String>,
    pub(crate) tags: Vec<(String, String)>,
}

impl Ec2Backend {
    /// Connects to EC2 using the supplied configuration.
    ///
    /// Static credentials take precedence over the SDK's default provider
    /// chain when both halves are present in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Ec2BackendError::Config`] when the provided configuration
    /// fails validation.
    pub async fn connect(config: &Ec2Config) -> Result<Self, Ec2BackendError> {
        config.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let (Some(key), Some(secret)) = (
            config.aws_access_key_id.as_deref(),
            config.aws_secret_access_key.as_deref(),
        ) {
            loader = loader.credentials_provider(Credentials::new(
                key,
                secret,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        let sdk_config = loader.load().await;

        Ok(Self {
            client: Client::new(&sdk_config),
            ssh_port: DEFAULT_SSH_PORT,
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        })
    }

    /// Overrides the SSH port probed on, and reported for, ready instances.
    #[must_use]
    pub const fn with_ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    async fn launch(&self, request: &InstanceRequest) -> Result<InstanceHandle, Ec2BackendError> {
        request.validate()?;

        let mut launch = self
            .client
            .run_instances()
            .min_count(1)
            .max_count(1)
            .tag_specifications(build_tag_specification(request));

        if !request.image_id.is_empty() {
            launch = launch.image_id(&request.image_id);
        }
        if !request.instance_type.is_empty() {
            launch = launch.instance_type(InstanceType::from(request.instance_type.as_str()));
        }
        if !request.availability_zone.is_empty() {
            launch = launch.placement(
                Placement::builder()
                    .availability_zone(&request.availability_zone)
                    .build(),
            );
        }
        for group in &request.security_groups {
            launch = launch.security_groups(group);
        }
        if let Some(key_pair) = request.key_pair.as_deref() {
            launch = launch.key_name(key_pair);
        }
        if let Some(size) = request.ebs_size {
            launch = launch.block_device_mappings(
                BlockDeviceMapping::builder()
                    .device_name(ROOT_DEVICE_NAME)
                    .ebs(
                        EbsBlockDevice::builder()
                            .volume_size(size)
                            .delete_on_termination(request.ebs_delete_on_termination)
                            .build(),
                    )
                    .build(),
            );
        }

        let output = launch.send().await?;
        let instance_id = output
            .instances()
            .first()
            .and_then(|instance| instance.instance_id())
            .ok_or_else(|| Ec2BackendError::MissingInstance {
                node_name: request.node_name.clone(),
            })?;

        Ok(InstanceHandle {
            id: instance_id.to_owned(),
        })
    }
}

/// Tags applied at launch: the node name always wins the `Name` slot, user
/// entries follow in request order.
fn build_tag_specification(request: &InstanceRequest) -> TagSpecification {
    let mut spec = TagSpecification::builder()
        .resource_type(ResourceType::Instance)
        .tags(
            Tag::builder()
                .key(NAME_TAG_KEY)
                .value(&request.node_name)
                .build(),
        );
    for entry in &request.tags {
        let (key, value) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
        if key == NAME_TAG_KEY {
            continue;
        }
        spec = spec.tags(Tag::builder().key(key).value(value).build());
    }
    spec.build()
}

fn snapshot_instance(instance: &Instance) -> InstanceSnapshot {
    let state = instance
        .state()
        .and_then(|state| state.name())
        .map(|name| name.as_str().to_owned());
    let host = instance
        .public_dns_name()
        .filter(|name| !name.is_empty())
        .or_else(|| instance.public_ip_address().filter(|ip| !ip.is_empty()))
        .map(str::to_owned);
    let tags = instance
        .tags()
        .iter()
        .filter_map(|tag| Some((tag.key()?.to_owned(), tag.value()?.to_owned())))
        .collect();

    InstanceSnapshot { state, host, tags }
}

impl Backend for Ec2Backend {
    type Error = Ec2BackendError;

    fn ensure_security_group<'a>(
        &'a self,
        name: &'a str,
        description: &'a str,
    ) -> BackendFuture<'a, SecurityGroupOutcome, Self::Error> {
        Box::pin(async move { self.ensure_group(name, description).await })
    }

    fn create<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, InstanceHandle, Self::Error> {
        Box::pin(async move { self.launch(request).await })
    }

    fn wait_for_ready<'a>(
        &'a self,
        handle: &'a InstanceHandle,
    ) -> BackendFuture<'a, InstanceNetworking, Self::Error> {
        Box::pin(async move {
            let networking = self.wait_for_address(handle).await?;
            self.wait_for_ssh_ready(handle, &networking).await?;
            Ok(networking)
        })
    }

    fn find_server_address<'a>(
        &'a self,
        query: &'a ServerQuery,
    ) -> BackendFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move { self.locate_server(query).await })
    }
}
