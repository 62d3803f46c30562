//! BDD scenarios for the bootstrap workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{BootstrapContextResult, bootstrap_context_result};

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Bootstrap a new server end to end"
)]
fn scenario_bootstrap_end_to_end(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Reuse an existing security group"
)]
fn scenario_reuse_existing_group(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Reject a blank node name"
)]
fn scenario_blank_node_name_rejected(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Reject a request without security groups"
)]
fn scenario_missing_groups_rejected(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface security group failures"
)]
fn scenario_security_group_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Reject an unknown distribution"
)]
fn scenario_unknown_distribution(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface launch failures"
)]
fn scenario_launch_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface readiness failures"
)]
fn scenario_wait_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface installation failures"
)]
fn scenario_install_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Fail when the new server cannot be found"
)]
fn scenario_server_not_found(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface discovery failures"
)]
fn scenario_discovery_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Reject an empty validator key"
)]
fn scenario_empty_validator_key(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}

#[scenario(
    path = "tests/features/bootstrap.feature",
    name = "Surface client key failures"
)]
fn scenario_client_key_failure(bootstrap_context_result: BootstrapContextResult) {
    drop(bootstrap_context_result);
}
