//! Readiness wait helpers for the EC2 backend.

use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use crate::backend::{InstanceHandle, InstanceNetworking};

use super::error::sdk_error_code;
use super::{Ec2Backend, Ec2BackendError, InstanceSnapshot, RUNNING_STATE};

const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// `DescribeInstances` can trail `RunInstances`; a launched instance may be
/// reported as unknown for a few polls.
const NOT_FOUND_CODE: &str = "InvalidInstanceID.NotFound";

impl Ec2Backend {
    pub(in crate::ec2) async fn fetch_instance(
        &self,
        handle: &InstanceHandle,
    ) -> Result<Option<InstanceSnapshot>, Ec2BackendError> {
        let described = match self
            .client
            .describe_instances()
            .instance_ids(&handle.id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(error) if sdk_error_code(&error) == Some(NOT_FOUND_CODE) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        Ok(described
            .reservations()
            .first()
            .and_then(|reservation| reservation.instances().first())
            .map(super::snapshot_instance))
    }

    pub(in crate::ec2) async fn wait_for_address(
        &self,
        handle: &InstanceHandle,
    ) -> Result<InstanceNetworking, Ec2BackendError> {
        let deadline = Instant::now() + self.wait_timeout;
        let mut saw_running = false;

        while Instant::now() <= deadline {
            let Some(instance) = self.fetch_instance(handle).await? else {
                sleep(self.poll_interval).await;
                continue;
            };

            if instance.state.as_deref() != Some(RUNNING_STATE) {
                sleep(self.poll_interval).await;
                continue;
            }

            saw_running = true;

            if let Some(host) = instance.host {
                return Ok(InstanceNetworking {
                    host,
                    ssh_port: self.ssh_port,
                });
            }

            sleep(self.poll_interval).await;
        }

        if saw_running {
            return Err(Ec2BackendError::MissingAddress {
                instance_id: handle.id.clone(),
            });
        }

        Err(Ec2BackendError::Timeout {
            action: String::from("wait_for_ready"),
            instance_id: handle.id.clone(),
        })
    }

    pub(in crate::ec2) async fn wait_for_ssh_ready(
        &self,
        handle: &InstanceHandle,
        networking: &InstanceNetworking,
    ) -> Result<(), Ec2BackendError> {
        let deadline = Instant::now() + self.wait_timeout;
        while Instant::now() <= deadline {
            let addr = (networking.host.as_str(), networking.ssh_port);
            let connect = timeout(SSH_CONNECT_TIMEOUT, TcpStream::connect(addr)).await;
            if matches!(connect, Ok(Ok(_))) {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }

        Err(Ec2BackendError::Timeout {
            action: String::from("wait_for_ssh_ready"),
            instance_id: handle.id.clone(),
        })
    }
}
