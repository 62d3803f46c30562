//! Server discovery over `DescribeInstances` for the EC2 backend.

use aws_sdk_ec2::types::Filter;

use crate::backend::ServerQuery;
use crate::tags::ROLE_TAG_KEY;

use super::{Ec2Backend, Ec2BackendError, InstanceSnapshot, NAME_TAG_KEY, RUNNING_STATE};

impl Ec2Backend {
    pub(in crate::ec2) async fn locate_server(
        &self,
        query: &ServerQuery,
    ) -> Result<Option<String>, Ec2BackendError> {
        let described = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name("tag:Name")
                    .values(&query.node_name)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("tag:Role")
                    .values(&query.role)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values(RUNNING_STATE)
                    .build(),
            )
            .send()
            .await?;

        let snapshots: Vec<InstanceSnapshot> = described
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .map(super::snapshot_instance)
            .collect();

        Ok(select_server_address(&snapshots, query))
    }
}

/// Picks the address of the last snapshot matching the query.
///
/// Provider-side filters are advisory; state and tags are re-checked here so
/// stale entries in the response never win the selection.
fn select_server_address(snapshots: &[InstanceSnapshot], query: &ServerQuery) -> Option<String> {
    snapshots
        .iter()
        .filter(|snapshot| snapshot.state.as_deref() == Some(RUNNING_STATE))
        .filter(|snapshot| tag_value(snapshot, NAME_TAG_KEY) == Some(query.node_name.as_str()))
        .filter(|snapshot| tag_value(snapshot, ROLE_TAG_KEY) == Some(query.role.as_str()))
        .next_back()
        .and_then(|snapshot| snapshot.host.clone())
}

fn tag_value<'a>(snapshot: &'a InstanceSnapshot, key: &str) -> Option<&'a str> {
    snapshot
        .tags
        .iter()
        .find(|(tag_key, _)| tag_key == key)
        .map(|(_, value)| value.as_str())
}
