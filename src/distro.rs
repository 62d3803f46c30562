//! Distribution-specific install scripts for the configuration-management
//! server.
//!
//! The bootstrap workflow resolves a distro name (explicit or derived from the
//! target platform) to a shell script that installs and configures the server
//! packages on the new instance. Server passwords are injected into the
//! script shell-escaped; when not supplied, the server falls back to its
//! conventional default password.

use shell_escape::unix::escape;
use thiserror::Error;

/// Platform assumed when none is provided.
pub const DEFAULT_PLATFORM: &str = "debian";

/// Password applied to the web UI and message broker when none is supplied.
pub const DEFAULT_SERVER_PASSWORD: &str = "chefchef";

const DEBIAN_DISTRO: &str = "chef-server-debian";
const RHEL_DISTRO: &str = "chef-server-rhel";

/// Secrets injected into the server install script.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerSecrets {
    /// Password for the server web UI admin account.
    pub webui_password: Option<String>,
    /// Password for the server's message broker account.
    pub amqp_password: Option<String>,
}

/// Resolves the distro name from an explicit value or the target platform.
///
/// Matches the convention `chef-server-<platform>` when no explicit distro is
/// given; the platform itself defaults to [`DEFAULT_PLATFORM`].
#[must_use]
pub fn derived_distro(explicit: Option<&str>, platform: Option<&str>) -> String {
    explicit.map_or_else(
        || format!("chef-server-{}", platform.unwrap_or(DEFAULT_PLATFORM)),
        ToOwned::to_owned,
    )
}

/// Renders the install script for `distro` with the supplied secrets.
///
/// # Errors
///
/// Returns [`DistroError::Unknown`] when no script exists for the distro.
pub fn install_script(distro: &str, secrets: &ServerSecrets) -> Result<String, DistroError> {
    let webui = escape(
        secrets
            .webui_password
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_PASSWORD)
            .into(),
    );
    let amqp = escape(
        secrets
            .amqp_password
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_PASSWORD)
            .into(),
    );

    match distro {
        DEBIAN_DISTRO => Ok(debian_script(webui.as_ref(), amqp.as_ref())),
        RHEL_DISTRO => Ok(rhel_script(webui.as_ref(), amqp.as_ref())),
        other => Err(DistroError::Unknown {
            distro: other.to_owned(),
        }),
    }
}

fn debian_script(webui: &str, amqp: &str) -> String {
    format!(
        "#!/bin/sh\n\
         set -e\n\
         WEBUI_PASSWORD={webui}\n\
         AMQP_PASSWORD={amqp}\n\
         export DEBIAN_FRONTEND=noninteractive\n\
         echo \"chef chef/chef_server_url string http://127.0.0.1:4000\" | debconf-set-selections\n\
         echo \"chef-solr chef-solr/amqp_password password $AMQP_PASSWORD\" | debconf-set-selections\n\
         echo \"chef-server-webui chef-server-webui/admin_password password $WEBUI_PASSWORD\" | debconf-set-selections\n\
         echo \"deb http://apt.opscode.com/ $(lsb_release -cs)-0.10 main\" > /etc/apt/sources.list.d/opscode.list\n\
         wget -qO - http://apt.opscode.com/packages@opscode.com.gpg.key | apt-key add -\n\
         apt-get update\n\
         apt-get install -y chef chef-server\n"
    )
}

fn rhel_script(webui: &str, amqp: &str) -> String {
    format!(
        "#!/bin/sh\n\
         set -e\n\
         WEBUI_PASSWORD={webui}\n\
         AMQP_PASSWORD={amqp}\n\
         rpm -q rbel6-release >/dev/null 2>&1 || rpm -Uvh http://rbel.frameos.org/rbel6\n\
         yum install -y rubygem-chef-server\n\
         mkdir -p /etc/chef\n\
         cat > /etc/chef/server.rb <<EOF\n\
         amqp_pass \"$AMQP_PASSWORD\"\n\
         web_ui_admin_default_password \"$WEBUI_PASSWORD\"\n\
         EOF\n\
         /sbin/service chef-server restart\n\
         /sbin/service chef-server-webui restart\n"
    )
}

/// Errors raised while resolving an install script.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DistroError {
    /// Raised when no install script exists for the requested distro.
    #[error("unknown distro '{distro}': known distros are {DEBIAN_DISTRO} and {RHEL_DISTRO}")]
    Unknown {
        /// Distro name that failed to resolve.
        distro: String,
    },
}
