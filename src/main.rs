//! Binary entry point for the Bosun CLI.

use std::env;
use std::io::{self, Write};
use std::process;
#[cfg(test)]
use std::sync::OnceLock;
#[cfg(test)]
use std::{future::Future, pin::Pin};

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

use bosun::{
    BootstrapError, BootstrapOrchestrator, BootstrapOutcome, BootstrapRequest, CapStdKeyWriter,
    Ec2Backend, Ec2BackendError, Ec2Config, ProvisionRequest, ServerSecrets, SshConfig, SshSession,
    derived_distro,
};

mod cli;

use cli::{BootstrapCommand, Cli};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("ssh error: {0}")]
    Ssh(String),
    #[error("a node name is required; provide one with --node-name")]
    MissingNodeName,
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError<Ec2BackendError>),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Bootstrap(command) => {
            #[cfg(test)]
            if let Some(hook) = BOOTSTRAP_COMMAND_HOOK.get() {
                return hook(command).await;
            }

            bootstrap_command(command).await
        }
    }
}

async fn bootstrap_command(args: BootstrapCommand) -> Result<i32, CliError> {
    let node_name = args
        .node_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    if node_name.is_empty() {
        return Err(CliError::MissingNodeName);
    }

    if let Some(result) = fake_bootstrap_from_env() {
        return result;
    }

    if let Some(err) = prefail_from_env() {
        return Err(err);
    }

    let ec2_config = ec2_config_with_overrides(&args)?;
    let ssh_config = ssh_config_with_overrides(&args)?;
    let request = bootstrap_request(&args, &node_name, &ec2_config)?;

    let backend = Ec2Backend::connect(&ec2_config)
        .await
        .map_err(|err| CliError::Backend(err.to_string()))?
        .with_ssh_port(args.ssh_port);
    let shell =
        SshSession::with_process_runner(ssh_config).map_err(|err| CliError::Ssh(err.to_string()))?;

    let orchestrator = BootstrapOrchestrator::new(backend, shell, CapStdKeyWriter);
    let outcome = orchestrator.run(&request).await?;

    report_outcome(&outcome);
    Ok(0)
}

fn ec2_config_with_overrides(args: &BootstrapCommand) -> Result<Ec2Config, CliError> {
    let mut config =
        Ec2Config::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    apply_ec2_overrides(&mut config, args);
    Ok(config)
}

fn apply_ec2_overrides(config: &mut Ec2Config, args: &BootstrapCommand) {
    if let Some(value) = args.aws_access_key_id.clone() {
        config.aws_access_key_id = Some(value);
    }
    if let Some(value) = args.aws_secret_access_key.clone() {
        config.aws_secret_access_key = Some(value);
    }
    if let Some(value) = args.region.clone() {
        config.region = value;
    }
    if let Some(value) = args.flavor.clone() {
        config.flavor = value;
    }
    if let Some(value) = args.image.clone() {
        config.image = Some(value);
    }
    if let Some(value) = args.availability_zone.clone() {
        config.availability_zone = value;
    }
    if let Some(value) = args.ssh_key.clone() {
        config.ssh_key = Some(value);
    }
    if !args.groups.is_empty() {
        config.groups = args.groups.clone();
    }
    if !args.tags.is_empty() {
        config.tags = args.tags.clone();
    }
    if let Some(size) = args.ebs_size {
        config.ebs_size = Some(size);
    }
    if args.ebs_no_delete_on_term {
        config.ebs_delete_on_termination = false;
    }
}

fn ssh_config_with_overrides(args: &BootstrapCommand) -> Result<SshConfig, CliError> {
    let mut config =
        SshConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    apply_ssh_overrides(&mut config, args);
    Ok(config)
}

fn apply_ssh_overrides(config: &mut SshConfig, args: &BootstrapCommand) {
    if let Some(user) = args.ssh_user.clone() {
        config.ssh_user = user;
    }
    if let Some(path) = args.identity_file.clone() {
        config.ssh_identity_file = Some(path);
    }
}

fn bootstrap_request(
    args: &BootstrapCommand,
    node_name: &str,
    config: &Ec2Config,
) -> Result<BootstrapRequest, CliError> {
    let instance = config
        .instance_request(node_name)
        .map_err(|err| CliError::Config(err.to_string()))?;

    Ok(BootstrapRequest {
        security_groups: config.groups.clone(),
        provision: ProvisionRequest {
            instance,
            distro: derived_distro(args.distro.as_deref(), args.platform.as_deref()),
            secrets: ServerSecrets {
                webui_password: args.webui_password.clone(),
                amqp_password: args.amqp_password.clone(),
            },
        },
        ssh_port: args.ssh_port,
        validation_key_path: args.validation_key_path.clone(),
        client_key_path: args.client_key_path.clone(),
        client_user: String::from("root"),
    })
}

fn report_outcome(outcome: &BootstrapOutcome) {
    write_outcome(io::stdout(), outcome);
}

fn write_outcome(mut target: impl Write, outcome: &BootstrapOutcome) {
    writeln!(
        target,
        "server {} ready at {}",
        outcome.instance_id, outcome.server_address
    )
    .ok();
    writeln!(
        target,
        "validation key written to {}",
        outcome.validation_key_path
    )
    .ok();
    writeln!(target, "client key written to {}", outcome.client_key_path).ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
type BootstrapHook = dyn Fn(BootstrapCommand) -> Pin<Box<dyn Future<Output = Result<i32, CliError>> + Send>>
    + Send
    + Sync;

#[cfg(test)]
static BOOTSTRAP_COMMAND_HOOK: OnceLock<Box<BootstrapHook>> = OnceLock::new();

fn fake_bootstrap_from_env() -> Option<Result<i32, CliError>> {
    let mode = env::var("BOSUN_FAKE_BOOTSTRAP_MODE").ok()?;
    match mode.as_str() {
        "success" => {
            let outcome = BootstrapOutcome {
                instance_id: String::from("i-00000000000000fae"),
                server_address: String::from("ec2-203-0-113-10.compute-1.amazonaws.com"),
                validation_key_path: Utf8PathBuf::from(".chef/validation.pem"),
                client_key_path: Utf8PathBuf::from(".chef/client.pem"),
            };
            report_outcome(&outcome);
            Some(Ok(0))
        }
        _ => None,
    }
}

fn prefail_from_env() -> Option<CliError> {
    let mode = env::var("BOSUN_FAKE_BOOTSTRAP_PREFAIL").ok()?;
    match mode.as_str() {
        "config" => Some(CliError::Config(String::from("fake"))),
        "backend" => Some(CliError::Backend(String::from("fake"))),
        "bootstrap" => Some(CliError::Bootstrap(BootstrapError::SecurityGroup(
            Ec2BackendError::Api {
                message: String::from("fake"),
            },
        ))),
        _ => None,
    }
}
