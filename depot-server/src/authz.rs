//! Read/deploy permission decisions.
//!
//! Each repository has two independent credential gates. Deploy credentials,
//! when configured, are sufficient for both deploying and reading. When no
//! deploy credentials are configured, deployment rides on the read gate: it is
//! allowed only if the read gate is open or satisfied.

use crate::auth::BasicCredentials;
use crate::credentials;
use crate::registry::RepositoryDescriptor;

/// Outcome of authorizing one request against one repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_read: bool,
    pub can_deploy: bool,
}

impl Permissions {
    const fn new(can_read: bool, can_deploy: bool) -> Self {
        Self {
            can_read,
            can_deploy,
        }
    }
}

/// Computes what the supplied credentials (if any) may do in `repository`.
///
/// Pure: no I/O and no dependence on previous requests.
pub fn authorize(
    repository: &RepositoryDescriptor,
    supplied: Option<&BasicCredentials>,
) -> Permissions {
    let read_auth_required = !repository.read_credentials.is_empty();
    let deploy_auth_required = !repository.deploy_credentials.is_empty();
    let supplied_matches = |set: &[String]| {
        supplied.is_some_and(|creds| credentials::matches(set, &creds.username, &creds.password))
    };

    // Deploy credentials, when configured, decide deployment on their own and
    // also grant read access.
    let deploy_authenticated =
        deploy_auth_required && supplied_matches(&repository.deploy_credentials);
    let can_deploy = !deploy_auth_required || deploy_authenticated;

    if !read_auth_required || deploy_authenticated {
        return Permissions::new(true, can_deploy);
    }

    if supplied_matches(&repository.read_credentials) {
        Permissions::new(true, can_deploy)
    } else {
        // The caller holds no valid credential for this repository, which
        // also revokes deployment that was only open by default.
        Permissions::new(false, false)
    }
}
