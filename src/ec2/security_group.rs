//! Security group management for the EC2 backend.
//!
//! Ensures the named group exists and that every service port the
//! configuration-management server listens on is open. Both the group and the
//! individual ingress rules are treated as idempotent so repeat runs against
//! the same account never error.

use aws_sdk_ec2::types::{Filter, IpPermission, IpRange};

use crate::backend::SecurityGroupOutcome;

use super::error::sdk_error_code;
use super::{Ec2Backend, Ec2BackendError};

/// Ingress ports opened for the server: SSH, HTTPS WebUI, management console,
/// API, and the CouchDB web view, in that order.
pub const SERVER_INGRESS_PORTS: [i32; 5] = [22, 443, 444, 4000, 4040];

const OPEN_CIDR: &str = "0.0.0.0/0";
const DUPLICATE_RULE_CODE: &str = "InvalidPermission.Duplicate";

impl Ec2Backend {
    pub(in crate::ec2) async fn ensure_group(
        &self,
        name: &str,
        description: &str,
    ) -> Result<SecurityGroupOutcome, Ec2BackendError> {
        let outcome = if self.group_exists(name).await? {
            SecurityGroupOutcome::AlreadyExists
        } else {
            self.create_group(name, description).await?;
            SecurityGroupOutcome::Created
        };

        for port in SERVER_INGRESS_PORTS {
            self.authorize_port(name, port).await?;
        }

        Ok(outcome)
    }

    async fn group_exists(&self, name: &str) -> Result<bool, Ec2BackendError> {
        let described = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .send()
            .await?;
        Ok(!described.security_groups().is_empty())
    }

    async fn create_group(&self, name: &str, description: &str) -> Result<(), Ec2BackendError> {
        self.client
            .create_security_group()
            .group_name(name)
            .description(description)
            .send()
            .await?;
        Ok(())
    }

    async fn authorize_port(&self, name: &str, port: i32) -> Result<(), Ec2BackendError> {
        let permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(port)
            .to_port(port)
            .ip_ranges(IpRange::builder().cidr_ip(OPEN_CIDR).build())
            .build();

        let result = self
            .client
            .authorize_security_group_ingress()
            .group_name(name)
            .ip_permissions(permission)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if sdk_error_code(&error) == Some(DUPLICATE_RULE_CODE) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
