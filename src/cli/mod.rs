//! Command-line interface definitions for the `bosun` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::Parser;

/// Top-level CLI for the `bosun` binary.
#[derive(Debug, Parser)]
#[command(
    name = "bosun",
    about = "Provision an EC2 instance and bootstrap it into a Chef server",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Launch a server, install Chef, and fetch the client credentials.
    #[command(
        name = "bootstrap",
        about = "Launch a server, install Chef, and fetch the client credentials"
    )]
    Bootstrap(BootstrapCommand),
}

/// Arguments for the `bosun bootstrap` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct BootstrapCommand {
    /// Node name for the new server; recorded as its `Name` tag and used to
    /// find the server again on later runs.
    #[arg(short = 'N', long, value_name = "NAME")]
    pub(crate) node_name: Option<String>,
    /// AWS access key ID for this invocation.
    ///
    /// When neither this nor the configured value is present, the AWS SDK's
    /// default credential chain is consulted instead.
    #[arg(short = 'A', long, env = "AWS_ACCESS_KEY_ID", value_name = "KEY")]
    pub(crate) aws_access_key_id: Option<String>,
    /// AWS secret access key for this invocation.
    #[arg(
        short = 'K',
        long,
        env = "AWS_SECRET_ACCESS_KEY",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub(crate) aws_secret_access_key: Option<String>,
    /// Override the configured AWS region for this run.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
    /// Name of the provider-registered SSH key pair used at launch.
    #[arg(short = 'S', long, value_name = "KEY_PAIR")]
    pub(crate) ssh_key: Option<String>,
    /// Override the instance flavor for this run.
    ///
    /// The EC2 backend passes the value through unchanged, so unknown flavors
    /// are rejected with a provider-specific error.
    #[arg(short = 'f', long, value_name = "FLAVOR")]
    pub(crate) flavor: Option<String>,
    /// Override the machine image (AMI) for this run.
    ///
    /// The EC2 backend passes the value through unchanged, so unknown images
    /// are rejected with a provider-specific error.
    #[arg(short = 'I', long, value_name = "IMAGE")]
    pub(crate) image: Option<String>,
    /// Override the availability zone for this run.
    #[arg(short = 'Z', long, value_name = "ZONE")]
    pub(crate) availability_zone: Option<String>,
    /// Security groups the server joins; the first one is created with the
    /// Chef server ingress rules when missing.
    #[arg(short = 'G', long, value_delimiter = ',', value_name = "GROUP[,GROUP]")]
    pub(crate) groups: Vec<String>,
    /// Extra `Key=Value` tags applied to the server alongside its role tag.
    #[arg(
        short = 'T',
        long,
        value_delimiter = ',',
        value_name = "KEY=VALUE[,KEY=VALUE]"
    )]
    pub(crate) tags: Vec<String>,
    /// Root EBS volume size in gigabytes, overriding the image default.
    #[arg(long, value_name = "GB")]
    pub(crate) ebs_size: Option<i32>,
    /// Keep the root EBS volume when the server terminates.
    #[arg(long)]
    pub(crate) ebs_no_delete_on_term: bool,
    /// User the SSH session connects as.
    #[arg(short = 'x', long, value_name = "USER")]
    pub(crate) ssh_user: Option<String>,
    /// TCP port the SSH session connects to.
    #[arg(short = 'p', long, value_name = "PORT", default_value_t = 22)]
    pub(crate) ssh_port: u16,
    /// SSH identity file used for authentication.
    #[arg(short = 'i', long, value_name = "PATH")]
    pub(crate) identity_file: Option<String>,
    /// Installation script to run on the server, overriding the one derived
    /// from the platform.
    #[arg(long, value_name = "DISTRO")]
    pub(crate) distro: Option<String>,
    /// Server platform used to pick the installation script (debian or rhel).
    #[arg(long, value_name = "PLATFORM")]
    pub(crate) platform: Option<String>,
    /// Password for the Chef server WebUI admin user.
    #[arg(long, value_name = "PASSWORD")]
    pub(crate) webui_password: Option<String>,
    /// Password for the Chef server AMQP user.
    #[arg(long, value_name = "PASSWORD")]
    pub(crate) amqp_password: Option<String>,
    /// Local path the validator key is written to.
    #[arg(long, value_name = "PATH", default_value = ".chef/validation.pem")]
    pub(crate) validation_key_path: Utf8PathBuf,
    /// Local path the root client key is written to.
    #[arg(long, value_name = "PATH", default_value = ".chef/client.pem")]
    pub(crate) client_key_path: Utf8PathBuf,
}
