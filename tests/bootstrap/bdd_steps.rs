//! BDD step definitions for the `bosun bootstrap` workflow.

use bosun::{BootstrapError, BootstrapOrchestrator, ProvisionError, SshSession};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_doubles::ScriptedBackendError;
use super::test_helpers::{
    BootstrapContext, BootstrapFailure, BootstrapFailureKind, BootstrapResult, BootstrapTestError,
    SAMPLE_KEY,
};
use crate::test_constants::NODE_NAME;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Setup(#[from] BootstrapTestError),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a ready bootstrap workflow")]
fn ready_workflow(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context
}

#[given("the server installation succeeds")]
fn installation_succeeds(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.runner.push_success();
    bootstrap_context
}

#[given("the server installation fails with exit code \"{code}\"")]
fn installation_fails(bootstrap_context: BootstrapContext, code: i32) -> BootstrapContext {
    bootstrap_context.runner.push_failure(code);
    bootstrap_context
}

#[given("the credential commands succeed")]
fn credential_commands_succeed(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.runner.push_output(Some(0), SAMPLE_KEY, "");
    bootstrap_context.runner.push_success();
    bootstrap_context.runner.push_output(Some(0), SAMPLE_KEY, "");
    bootstrap_context
}

#[given("the validator key comes back empty")]
fn validator_key_empty(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.runner.push_output(Some(0), "   \n", "");
    bootstrap_context
}

#[given("fetching the client key fails with exit code \"{code}\"")]
fn client_key_fails(bootstrap_context: BootstrapContext, code: i32) -> BootstrapContext {
    bootstrap_context.runner.push_output(Some(0), SAMPLE_KEY, "");
    bootstrap_context.runner.push_success();
    bootstrap_context.runner.push_failure(code);
    bootstrap_context
}

#[given("the security group already exists")]
fn group_already_exists(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.group_already_exists();
    bootstrap_context
}

#[given("ensuring the security group fails")]
fn ensure_group_fails(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.fail_ensure_group();
    bootstrap_context
}

#[given("launching the server fails")]
fn launch_fails(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.fail_launch();
    bootstrap_context
}

#[given("the server never becomes ready")]
fn server_never_ready(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.fail_wait();
    bootstrap_context
}

#[given("server discovery fails")]
fn discovery_fails(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.fail_discovery();
    bootstrap_context
}

#[given("no server matches the node name after provisioning")]
fn no_server_found(bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.backend.no_server_found();
    bootstrap_context
}

#[given("the request has a blank node name")]
fn blank_node_name(mut bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.request.provision.instance.node_name = String::from("   ");
    bootstrap_context
}

#[given("the request names no security groups")]
fn no_security_groups(mut bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.request.security_groups.clear();
    bootstrap_context
}

#[given("the request names an unknown distribution")]
fn unknown_distribution(mut bootstrap_context: BootstrapContext) -> BootstrapContext {
    bootstrap_context.request.provision.distro = String::from("chef-server-plan9");
    bootstrap_context
}

#[when("I bootstrap the server")]
fn bootstrap_server(bootstrap_context: BootstrapContext) -> Result<BootstrapContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let BootstrapContext {
        backend,
        runner,
        key_writer,
        ssh_config,
        request,
        ..
    } = bootstrap_context;

    let shell = SshSession::new(ssh_config.clone(), runner.clone())
        .map_err(|err| StepError::Assertion(format!("ssh session: {err}")))?;
    let orchestrator = BootstrapOrchestrator::new(backend.clone(), shell, key_writer.clone());

    let request_clone = request.clone();
    let result = runtime.block_on(async move { orchestrator.run(&request_clone).await });
    let outcome = match result {
        Ok(outcome) => BootstrapResult::Success(outcome),
        Err(err) => BootstrapResult::Failure(BootstrapFailure {
            kind: map_failure_kind(&err),
            message: err.to_string(),
        }),
    };

    Ok(BootstrapContext {
        backend,
        runner,
        key_writer,
        ssh_config,
        request,
        outcome: Some(outcome),
    })
}

#[then("the bootstrap result is successful")]
fn bootstrap_success(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    match bootstrap_context.outcome {
        Some(BootstrapResult::Success(_)) => Ok(()),
        Some(BootstrapResult::Failure(ref failure)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {}",
            failure.message
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the bootstrap error kind is \"{kind}\"")]
fn bootstrap_error_kind(bootstrap_context: &BootstrapContext, kind: String) -> Result<(), StepError> {
    let expected = parse_failure_kind(&kind)?;
    let Some(BootstrapResult::Failure(failure)) = &bootstrap_context.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    if failure.kind == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {expected:?}, got {:?}: {}",
            failure.kind, failure.message
        )))
    }
}

#[then("the security group is ensured before the server launches")]
fn group_before_launch(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let operations = bootstrap_context.backend.operations();
    let head: Vec<&str> = operations.iter().take(2).map(String::as_str).collect();
    if head == ["ensure_security_group", "create"] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected the group to be ensured before launch, got operations: {operations:?}"
        )))
    }
}

#[then("the ensured group carries a derived description")]
fn group_description(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let groups = bootstrap_context.backend.ensured_groups();
    let Some((name, description)) = groups.first() else {
        return Err(StepError::Assertion(String::from("missing ensured group")));
    };
    if name == "infrastructure" && description == "infrastructure group" {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected group: {name} / {description}"
        )))
    }
}

#[then("the launched instance carries the server role tag")]
fn role_tag_applied(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let requests = bootstrap_context.backend.launch_requests();
    let Some(request) = requests.first() else {
        return Err(StepError::Assertion(String::from("missing launch request")));
    };
    if request.tags.iter().any(|tag| tag == "Role=chef_server") {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected Role=chef_server in tags: {:?}",
            request.tags
        )))
    }
}

#[then("the server installation runs under sudo")]
fn installation_runs_under_sudo(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let invocations = bootstrap_context.runner.invocations();
    let invocation = invocations
        .first()
        .ok_or_else(|| StepError::Assertion(String::from("missing ssh invocation")))?;
    let command = invocation.command_string();
    if command.contains("sudo /bin/sh -c") {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a sudo shell invocation, got: {command}"
        )))
    }
}

#[then("the discovery query names the node and server role")]
fn discovery_query_contents(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let queries = bootstrap_context.backend.queries();
    let Some(query) = queries.first() else {
        return Err(StepError::Assertion(String::from("missing discovery query")));
    };
    if query.node_name == NODE_NAME && query.role == "chef_server" {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected query: {query:?}"
        )))
    }
}

#[then("the validator key is installed locally")]
fn validator_key_installed(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let written = bootstrap_context.key_writer.written();
    let Some((path, contents)) = written.first() else {
        return Err(StepError::Assertion(String::from(
            "missing validator key write",
        )));
    };
    if path == &bootstrap_context.request.validation_key_path
        && contents.contains("BEGIN RSA PRIVATE KEY")
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected validator key write at {path}"
        )))
    }
}

#[then("the client key is installed locally")]
fn client_key_installed(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let written = bootstrap_context.key_writer.written();
    let Some((path, contents)) = written.get(1) else {
        return Err(StepError::Assertion(String::from(
            "missing client key write",
        )));
    };
    if path == &bootstrap_context.request.client_key_path
        && contents.contains("BEGIN RSA PRIVATE KEY")
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected client key write at {path}"
        )))
    }
}

#[then("the server is not launched")]
fn server_not_launched(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let operations = bootstrap_context.backend.operations();
    if operations.iter().any(|op| op == "create") {
        Err(StepError::Assertion(String::from(
            "server should not be launched",
        )))
    } else {
        Ok(())
    }
}

#[then("no cloud calls are made")]
fn no_cloud_calls(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let operations = bootstrap_context.backend.operations();
    if operations.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no backend calls, got: {operations:?}"
        )))
    }
}

#[then("no credential commands run")]
fn no_credential_commands(bootstrap_context: &BootstrapContext) -> Result<(), StepError> {
    let invocations = bootstrap_context.runner.invocations();
    if invocations.len() <= 1 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected only the install invocation, got {} commands",
            invocations.len()
        )))
    }
}

const fn map_failure_kind(
    err: &BootstrapError<ScriptedBackendError>,
) -> BootstrapFailureKind {
    match err {
        BootstrapError::MissingNodeName => BootstrapFailureKind::NodeName,
        BootstrapError::MissingSecurityGroup => BootstrapFailureKind::MissingGroup,
        BootstrapError::SecurityGroup(_) => BootstrapFailureKind::SecurityGroup,
        BootstrapError::Provision(ProvisionError::Script(_)) => BootstrapFailureKind::Script,
        BootstrapError::Provision(ProvisionError::Launch(_)) => BootstrapFailureKind::Launch,
        BootstrapError::Provision(ProvisionError::Wait { .. }) => BootstrapFailureKind::Wait,
        BootstrapError::Provision(
            ProvisionError::Ssh(_) | ProvisionError::Install { .. },
        ) => BootstrapFailureKind::Install,
        BootstrapError::Discovery(_) => BootstrapFailureKind::Discovery,
        BootstrapError::ServerNotFound { .. } => BootstrapFailureKind::NotFound,
        BootstrapError::ValidationKey(_) => BootstrapFailureKind::ValidationKey,
        BootstrapError::RootClient(_) => BootstrapFailureKind::RootClient,
        BootstrapError::ClientKey(_) => BootstrapFailureKind::ClientKey,
    }
}

fn parse_failure_kind(kind: &str) -> Result<BootstrapFailureKind, StepError> {
    match kind {
        "node-name" => Ok(BootstrapFailureKind::NodeName),
        "missing-group" => Ok(BootstrapFailureKind::MissingGroup),
        "security-group" => Ok(BootstrapFailureKind::SecurityGroup),
        "script" => Ok(BootstrapFailureKind::Script),
        "launch" => Ok(BootstrapFailureKind::Launch),
        "wait" => Ok(BootstrapFailureKind::Wait),
        "install" => Ok(BootstrapFailureKind::Install),
        "discovery" => Ok(BootstrapFailureKind::Discovery),
        "not-found" => Ok(BootstrapFailureKind::NotFound),
        "validation-key" => Ok(BootstrapFailureKind::ValidationKey),
        "root-client" => Ok(BootstrapFailureKind::RootClient),
        "client-key" => Ok(BootstrapFailureKind::ClientKey),
        _ => Err(StepError::Assertion(format!(
            "unknown failure kind: {kind}"
        ))),
    }
}
