mod support;

use siteline::application::connections::{ConnectCommand, ConnectionError, LaunchCommand};
use siteline::application::hosting::HostingError;
use siteline::domain::types::{
    CertState, ConnectionEventKind, ConnectionMethod, ConnectionStatus, DnsRecordType, HostState,
    OwnershipState, SiteStatus, TlsStatus,
};
use siteline_api_types::{DnsRecord, DnsRecordStatus};
use uuid::Uuid;

use support::{
    FALLBACK_ADDRESS, FALLBACK_ADDRESS_V6, Harness, OWNERSHIP_TOKEN, fully_active, states,
};

const PAGE: &str = "<html><body><h1>Acme Bakery</h1></body></html>";

fn connect(domain: &str, lead_id: &str, method: ConnectionMethod) -> ConnectCommand {
    ConnectCommand {
        project_id: None,
        domain: domain.to_string(),
        lead_id: lead_id.to_string(),
        agency_id: "agency-7".to_string(),
        user_id: "user-3".to_string(),
        business_name: "Acme Bakery".to_string(),
        html_content: Some(PAGE.to_string()),
        method,
    }
}

fn launch(lead_id: &str) -> LaunchCommand {
    LaunchCommand {
        project_id: None,
        lead_id: lead_id.to_string(),
        agency_id: "agency-7".to_string(),
        user_id: "user-3".to_string(),
        business_name: "Acme Bakery".to_string(),
        html_content: Some(PAGE.to_string()),
    }
}

#[tokio::test]
async fn manual_connect_returns_dns_instructions() {
    let harness = Harness::new();

    let outcome = harness
        .orchestrator
        .connect(connect(
            "https://www.Acme-Bakery.com/menu",
            "lead-1",
            ConnectionMethod::Manual,
        ))
        .await
        .expect("connect");

    assert_eq!(outcome.status, ConnectionStatus::PendingDns);
    assert_eq!(outcome.site_url, format!("https://{}.web.app", outcome.site_id));
    assert!(outcome.error.is_none());

    let txt = outcome
        .dns_records
        .iter()
        .find(|record| record.record_type == DnsRecordType::Txt)
        .expect("ownership record");
    assert_eq!(txt.value, OWNERSHIP_TOKEN);
    assert_eq!(txt.status, DnsRecordStatus::Pending);
    assert!(outcome.dns_records.iter().any(|record| {
        record.record_type == DnsRecordType::A && record.value == FALLBACK_ADDRESS
    }));
    let cname = outcome
        .dns_records
        .iter()
        .find(|record| record.record_type == DnsRecordType::Cname)
        .expect("www record");
    assert_eq!(cname.name, "www");
    assert_eq!(cname.value, format!("{}.web.app", outcome.site_id));

    let stored = harness
        .connections
        .get(outcome.connection_id)
        .await
        .expect("stored connection");
    assert_eq!(stored.domain.as_deref(), Some("acme-bakery.com"));
    assert_eq!(stored.verification_token.as_deref(), Some(OWNERSHIP_TOKEN));
    assert_eq!(stored.ownership_state.as_deref(), Some("OWNERSHIP_MISSING"));
    assert!(stored.last_checked_at.is_some());
    assert!(stored.next_check_at.is_some());
    assert!(stored.connected_at.is_none());

    let site = harness.sites.get(&outcome.site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::DomainPending);
    assert_eq!(site.custom_domain.as_deref(), Some("acme-bakery.com"));
    assert_eq!(site.connection_id, Some(outcome.connection_id));
    assert_eq!(site.tls_status, Some(TlsStatus::Pending));
    assert!(site.current_release_id.is_some());
}

#[tokio::test]
async fn example_biz_manual_connect_lists_every_host_record() {
    let harness = Harness::new();

    let outcome = harness
        .orchestrator
        .connect(ConnectCommand {
            project_id: None,
            domain: "example-biz.com".to_string(),
            lead_id: "L1".to_string(),
            agency_id: "A1".to_string(),
            user_id: "user-3".to_string(),
            business_name: "Example Biz".to_string(),
            html_content: Some("<html>..</html>".to_string()),
            method: ConnectionMethod::Manual,
        })
        .await
        .expect("connect");

    assert_eq!(outcome.status, ConnectionStatus::PendingDns);
    let count = |kinds: &[DnsRecordType]| {
        outcome
            .dns_records
            .iter()
            .filter(|record| kinds.contains(&record.record_type))
            .count()
    };
    assert_eq!(count(&[DnsRecordType::Txt]), 1);
    assert!(count(&[DnsRecordType::A, DnsRecordType::Aaaa]) >= 2);
    assert_eq!(count(&[DnsRecordType::Cname]), 1);
    let cname = outcome
        .dns_records
        .iter()
        .find(|record| record.record_type == DnsRecordType::Cname)
        .expect("www record");
    assert_eq!(cname.name, "www");

    let site = harness.sites.get(&outcome.site_id).await.expect("site");
    assert!(site.current_release_id.is_some());
    assert_eq!(site.custom_domain.as_deref(), Some("example-biz.com"));
}

#[tokio::test]
async fn domain_held_by_active_connection_is_rejected() {
    let harness = Harness::new();
    let first = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("first connect");

    let err = harness
        .orchestrator
        .connect(connect("www.acme-bakery.com", "lead-2", ConnectionMethod::Manual))
        .await
        .expect_err("second connect");

    match err {
        ConnectionError::DomainClaimed {
            domain,
            connection_id,
        } => {
            assert_eq!(domain, "acme-bakery.com");
            assert_eq!(connection_id, first.connection_id);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.connections.len().await, 1);
}

#[tokio::test]
async fn immediately_active_domain_completes_once() {
    let harness = Harness::new();
    harness.hosting.set_initial_domain_states(fully_active()).await;

    let outcome = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("connect");

    assert_eq!(outcome.status, ConnectionStatus::Connected);
    let stored = harness
        .connections
        .get(outcome.connection_id)
        .await
        .expect("stored");
    assert!(stored.connected_at.is_some());
    assert_eq!(
        harness
            .events
            .count(outcome.connection_id, ConnectionEventKind::Connected)
            .await,
        1
    );

    let site = harness.sites.get(&outcome.site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Active);
    assert_eq!(site.tls_status, Some(TlsStatus::Active));
}

#[tokio::test]
async fn host_conflict_fails_connection_and_site() {
    let harness = Harness::new();
    harness
        .hosting
        .set_initial_domain_states(states(
            OwnershipState::Active,
            HostState::Conflict,
            CertState::Unspecified,
        ))
        .await;

    let outcome = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("connect");

    assert_eq!(outcome.status, ConnectionStatus::Error);
    assert!(outcome.error.is_some());
    assert_eq!(
        harness
            .events
            .count(outcome.connection_id, ConnectionEventKind::Failed)
            .await,
        1
    );
    let site = harness.sites.get(&outcome.site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Error);
}

#[tokio::test]
async fn registration_failure_is_recorded_on_connection() {
    let harness = Harness::new();
    harness
        .hosting
        .fail_next(
            "create_custom_domain",
            HostingError::Status {
                status: 400,
                message: "domain not allowed".to_string(),
            },
        )
        .await;

    let err = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect_err("registration failure");

    let connection_id = err.connection_id().expect("connection id");
    assert!(matches!(err, ConnectionError::Hosting { .. }));

    let stored = harness
        .connections
        .get(connection_id)
        .await
        .expect("stored");
    assert_eq!(stored.status, ConnectionStatus::Error);
    assert!(stored.error_message.is_some());
    assert_eq!(
        harness.events.kinds_for(connection_id).await,
        vec![ConnectionEventKind::Failed]
    );

    // A failed connection no longer holds the domain.
    harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("retry after failure");
}

#[tokio::test]
async fn deploy_failure_stops_before_domain_registration() {
    let harness = Harness::new();
    harness
        .hosting
        .fail_next(
            "upload_blob",
            HostingError::Status {
                status: 400,
                message: "bad blob".to_string(),
            },
        )
        .await;

    let err = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect_err("deploy failure");

    assert!(matches!(err, ConnectionError::Deploy { .. }));
    let stored = harness
        .connections
        .get(err.connection_id().expect("connection id"))
        .await
        .expect("stored");
    assert_eq!(stored.status, ConnectionStatus::Error);
    assert_eq!(harness.hosting.calls("create_custom_domain").await, 0);
}

#[tokio::test]
async fn automated_connect_writes_missing_records() {
    let harness = Harness::new();
    harness
        .dns
        .seed(
            "acme-bakery.com",
            vec![DnsRecord {
                record_type: DnsRecordType::A,
                name: "@".to_string(),
                value: FALLBACK_ADDRESS.to_string(),
                ttl: 300,
                status: DnsRecordStatus::Active,
            }],
        )
        .await;

    let outcome = harness
        .orchestrator
        .connect(connect(
            "acme-bakery.com",
            "lead-1",
            ConnectionMethod::Automated,
        ))
        .await
        .expect("connect");

    assert!(outcome.error.is_none());
    let written = harness.dns.records("acme-bakery.com").await;
    assert_eq!(written.len(), 4);
    assert_eq!(
        written
            .iter()
            .filter(|record| record.record_type == DnsRecordType::A)
            .count(),
        1
    );
    assert!(written.iter().any(|record| {
        record.record_type == DnsRecordType::Aaaa && record.value == FALLBACK_ADDRESS_V6
    }));
    assert!(
        written
            .iter()
            .any(|record| record.record_type == DnsRecordType::Txt
                && record.value == OWNERSHIP_TOKEN)
    );
}

#[tokio::test]
async fn automated_dns_failure_keeps_connection_pending() {
    let harness = Harness::new();
    harness.dns.forget_zone("acme-bakery.com").await;

    let outcome = harness
        .orchestrator
        .connect(connect(
            "acme-bakery.com",
            "lead-1",
            ConnectionMethod::Automated,
        ))
        .await
        .expect("connect");

    assert_eq!(outcome.status, ConnectionStatus::PendingDns);
    let error = outcome.error.expect("automation error");
    assert!(error.contains("dns automation failed"), "{error}");
}

#[tokio::test]
async fn launch_publishes_default_url_without_domain() {
    let harness = Harness::new();

    let outcome = harness
        .orchestrator
        .launch(launch("lead-1"))
        .await
        .expect("launch");

    assert_eq!(outcome.status, ConnectionStatus::Connected);
    assert!(outcome.dns_records.is_empty());
    assert_eq!(harness.hosting.calls("create_custom_domain").await, 0);

    let stored = harness
        .connections
        .get(outcome.connection_id)
        .await
        .expect("stored");
    assert_eq!(stored.method, ConnectionMethod::Launch);
    assert!(stored.domain.is_none());
    assert!(stored.connected_at.is_some());

    let site = harness.sites.get(&outcome.site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Active);
    assert_eq!(site.connection_id, Some(outcome.connection_id));
    assert!(site.custom_domain.is_none());
    assert_eq!(
        harness
            .events
            .count(outcome.connection_id, ConnectionEventKind::Connected)
            .await,
        1
    );
}

#[tokio::test]
async fn launch_method_is_refused_by_connect() {
    let harness = Harness::new();

    let err = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Launch))
        .await
        .expect_err("launch through connect");

    assert!(matches!(err, ConnectionError::Validation(_)));
    assert_eq!(harness.connections.len().await, 0);
}

#[tokio::test]
async fn invalid_domain_is_rejected_before_anything_is_stored() {
    let harness = Harness::new();

    for domain in ["localhost", "example.com", "   "] {
        let err = harness
            .orchestrator
            .connect(connect(domain, "lead-1", ConnectionMethod::Manual))
            .await
            .expect_err("invalid domain");
        assert!(matches!(err, ConnectionError::Validation(_)), "{domain}");
    }
    assert_eq!(harness.connections.len().await, 0);
    assert_eq!(harness.sites.len().await, 0);
}

#[tokio::test]
async fn disconnect_releases_domain_and_is_idempotent() {
    let harness = Harness::new();
    let first = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("connect");

    let disconnected = harness
        .orchestrator
        .disconnect(first.connection_id)
        .await
        .expect("disconnect");
    assert_eq!(disconnected.status, ConnectionStatus::Disconnected);
    assert!(disconnected.disconnected_at.is_some());
    assert!(!harness.hosting.has_domain("acme-bakery.com").await);

    let site = harness.sites.get(&first.site_id).await.expect("site");
    assert!(site.custom_domain.is_none());
    assert!(site.connection_id.is_none());
    assert_eq!(site.status, SiteStatus::Active);

    harness
        .orchestrator
        .disconnect(first.connection_id)
        .await
        .expect("second disconnect");
    assert_eq!(
        harness
            .events
            .count(first.connection_id, ConnectionEventKind::Disconnected)
            .await,
        1
    );

    let again = harness
        .orchestrator
        .connect(connect("acme-bakery.com", "lead-1", ConnectionMethod::Manual))
        .await
        .expect("reconnect");
    assert_ne!(again.connection_id, first.connection_id);
}

#[tokio::test]
async fn disconnect_unknown_connection_is_not_found() {
    let harness = Harness::new();
    let id = Uuid::new_v4();

    let err = harness
        .orchestrator
        .disconnect(id)
        .await
        .expect_err("unknown connection");

    assert!(matches!(err, ConnectionError::NotFound(missing) if missing == id));
}
