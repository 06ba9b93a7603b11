//! Mapping from the provider's provisioning signals to connection status.
//!
//! Ownership is evaluated first, then host binding, then the certificate.
//! The mapping is total over every state triple.

use crate::domain::types::{CertState, ConnectionStatus, HostState, OwnershipState, TlsStatus};

/// Raw provisioning signals reported for a custom domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteStates {
    pub ownership: OwnershipState,
    pub host: HostState,
    pub cert: CertState,
}

impl RemoteStates {
    pub fn status(self) -> ConnectionStatus {
        map_status(self.ownership, self.host, self.cert)
    }
}

pub fn map_status(ownership: OwnershipState, host: HostState, cert: CertState) -> ConnectionStatus {
    match ownership {
        OwnershipState::Missing
        | OwnershipState::Unspecified
        | OwnershipState::Mismatch
        | OwnershipState::Conflict => return ConnectionStatus::PendingDns,
        OwnershipState::Pending | OwnershipState::Unreachable => {
            return ConnectionStatus::DnsPropagating;
        }
        OwnershipState::Active => {}
    }

    match host {
        HostState::Conflict => return ConnectionStatus::Error,
        HostState::Unspecified
        | HostState::Unhosted
        | HostState::Unreachable
        | HostState::Mismatch => return ConnectionStatus::DnsPropagating,
        HostState::Active => {}
    }

    match cert {
        CertState::Unspecified => ConnectionStatus::PendingSsl,
        CertState::Preparing | CertState::Validating | CertState::Propagating => {
            ConnectionStatus::SslProvisioning
        }
        CertState::Active | CertState::ExpiringSoon | CertState::Expired => {
            ConnectionStatus::Connected
        }
    }
}

/// Certificate state as mirrored onto the site record.
pub fn tls_status(cert: CertState) -> TlsStatus {
    match cert {
        CertState::Unspecified => TlsStatus::Pending,
        CertState::Preparing | CertState::Validating | CertState::Propagating => {
            TlsStatus::Provisioning
        }
        CertState::Active => TlsStatus::Active,
        CertState::ExpiringSoon => TlsStatus::ExpiringSoon,
        CertState::Expired => TlsStatus::Expired,
    }
}

/// Human-readable explanation for statuses that need operator or customer action.
pub fn status_message(states: RemoteStates) -> Option<String> {
    match states.status() {
        ConnectionStatus::Error => Some(format!(
            "domain is bound to another hosting target ({})",
            states.host.as_str()
        )),
        ConnectionStatus::PendingDns if states.ownership == OwnershipState::Conflict => Some(
            "domain ownership is claimed by another project; remove conflicting TXT records"
                .to_string(),
        ),
        _ => None,
    }
}
