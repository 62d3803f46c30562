//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::InstanceRequest;
use crate::tags::{TagError, bootstrap_tags};

/// EC2 specific configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "BOSUN_EC2",
    discovery(
        app_name = "bosun",
        env_var = "BOSUN_CONFIG_PATH",
        config_file_name = "bosun.toml",
        dotfile_name = ".bosun.toml",
        project_file_name = "bosun.toml"
    )
)]
pub struct Ec2Config {
    /// AWS access key ID. Optional; when absent the SDK's default provider
    /// chain (environment, shared credentials file, instance profile) is used.
    pub aws_access_key_id: Option<String>,
    /// AWS secret access key. Must be provided together with the access key.
    pub aws_secret_access_key: Option<String>,
    /// Region the server is created in. Defaults to `us-east-1`.
    #[ortho_config(default = "us-east-1".to_owned())]
    pub region: String,
    /// Instance flavor for the new server. Defaults to `m1.small`.
    #[ortho_config(default = "m1.small".to_owned())]
    pub flavor: String,
    /// Machine image (AMI) identifier. Optional; left to the provider to
    /// reject when absent or unknown.
    pub image: Option<String>,
    /// Availability zone the server is placed in. Defaults to `us-east-1b`.
    #[ortho_config(default = "us-east-1b".to_owned())]
    pub availability_zone: String,
    /// Security groups the server joins; the first one is created when
    /// missing. Defaults to `infrastructure`.
    #[ortho_config(default = Vec::from([String::from("infrastructure")]))]
    pub groups: Vec<String>,
    /// Raw `Key=Value` tag entries applied to the server.
    #[ortho_config(default = Vec::new())]
    pub tags: Vec<String>,
    /// Name of the provider-registered SSH key pair used at launch.
    pub ssh_key: Option<String>,
    /// Root EBS volume size in gigabytes, when overriding the image default.
    pub ebs_size: Option<i32>,
    /// Whether the root volume is deleted when the server terminates.
    #[ortho_config(default = true)]
    pub ebs_delete_on_termination: bool,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
    section: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
        section: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
            section,
        }
    }
}

impl Ec2Config {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to [{}] in bosun.toml",
                metadata.description, metadata.env_var, metadata.toml_key, metadata.section
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("bosun")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Builds an [`InstanceRequest`] for `node_name` using the configured
    /// defaults, with the server role tag merged into the tag set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation or tag parsing fails.
    pub fn instance_request(&self, node_name: &str) -> Result<InstanceRequest, ConfigError> {
        self.validate()?;
        InstanceRequest::builder()
            .node_name(node_name)
            .image_id(self.image.clone().unwrap_or_default())
            .instance_type(&self.flavor)
            .availability_zone(&self.availability_zone)
            .security_groups(self.groups.clone())
            .key_pair(self.ssh_key.clone())
            .tags(bootstrap_tags(&self.tags)?)
            .ebs_size(self.ebs_size)
            .ebs_delete_on_termination(self.ebs_delete_on_termination)
            .build()
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the fields needed to reach the EC2
    /// API. Launch parameters are deliberately not checked here; the provider
    /// reports its own diagnostics for those.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the region is empty or only
    /// one half of a static credential pair is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.region,
            &FieldMetadata::new("AWS region", "BOSUN_EC2_REGION", "region", "ec2"),
        )?;

        match (
            self.aws_access_key_id.as_deref(),
            self.aws_secret_access_key.as_deref(),
        ) {
            (Some(_), None) => Err(ConfigError::MissingField(String::from(
                "missing AWS secret access key: set BOSUN_EC2_AWS_SECRET_ACCESS_KEY or add \
                 aws_secret_access_key to [ec2] in bosun.toml",
            ))),
            (None, Some(_)) => Err(ConfigError::MissingField(String::from(
                "missing AWS access key ID: set BOSUN_EC2_AWS_ACCESS_KEY_ID or add \
                 aws_access_key_id to [ec2] in bosun.toml",
            ))),
            _ => Ok(()),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a tag entry could not be parsed.
    #[error("invalid tag: {0}")]
    InvalidTag(#[from] TagError),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
