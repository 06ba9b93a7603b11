mod support;

use siteline::application::deploy::{DeployCommand, DeployError};
use siteline::application::hosting::HostingError;
use siteline::application::registry::EnsureSiteCommand;
use siteline::domain::types::{SiteKind, SiteStatus};

use support::Harness;

const PAGE: &str = "<!doctype html><html><body><h1>Acme Bakery</h1></body></html>";

async fn registered_site(harness: &Harness) -> String {
    harness
        .registry
        .ensure_site(EnsureSiteCommand {
            project_id: None,
            business_name: "Acme Bakery".to_string(),
            lead_id: "lead-1".to_string(),
            agency_id: "agency-7".to_string(),
            user_id: "user-3".to_string(),
            site_kind: SiteKind::Landing,
        })
        .await
        .expect("ensure site")
        .site_id
}

fn deploy(site_id: &str, html: &str) -> DeployCommand {
    DeployCommand {
        project_id: None,
        site_id: site_id.to_string(),
        html_content: html.to_string(),
        message: Some("initial content".to_string()),
    }
}

#[tokio::test]
async fn deploy_publishes_release_and_activates_site() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;

    let release = harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect("deploy");

    assert_eq!(release.site_url, format!("https://{site_id}.web.app"));
    assert_eq!(release.uploaded_files, 2);
    assert_eq!(release.skipped_files, 0);
    assert_eq!(
        harness.hosting.releases().await,
        vec![(release.version_id.clone(), release.release_id.clone())]
    );

    let site = harness.sites.get(&site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Active);
    assert_eq!(site.current_version_id.as_deref(), Some(release.version_id.as_str()));
    assert_eq!(site.current_release_id.as_deref(), Some(release.release_id.as_str()));
    assert!(site.last_deployed_at.is_some());
    assert!(site.error_message.is_none());
}

#[tokio::test]
async fn redeploying_identical_content_uploads_nothing() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;

    harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect("first deploy");
    let second = harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect("second deploy");

    assert_eq!(second.uploaded_files, 0);
    assert_eq!(second.skipped_files, 2);
    assert_eq!(harness.hosting.uploads().await.len(), 2);
    assert_eq!(harness.hosting.releases().await.len(), 2);
}

#[tokio::test]
async fn changed_page_uploads_only_the_new_blob() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;

    harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect("first deploy");
    let second = harness
        .deployer
        .deploy(deploy(&site_id, "<html><body>New menu</body></html>"))
        .await
        .expect("second deploy");

    assert_eq!(second.uploaded_files, 1);
    assert_eq!(second.skipped_files, 1);
}

#[tokio::test]
async fn failed_upload_leaves_no_release() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;
    harness
        .hosting
        .fail_next(
            "upload_blob",
            HostingError::Status {
                status: 400,
                message: "hash mismatch".to_string(),
            },
        )
        .await;

    let err = harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect_err("upload failure");

    assert!(matches!(err, DeployError::Hosting(_)));
    assert_eq!(harness.hosting.calls("finalize_version").await, 0);
    assert_eq!(harness.hosting.calls("create_release").await, 0);
    assert!(harness.hosting.releases().await.is_empty());

    let site = harness.sites.get(&site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Error);
    assert!(site.error_message.is_some());
    assert!(site.current_release_id.is_none());
}

#[tokio::test]
async fn transient_failure_restarts_pipeline_on_fresh_version() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;
    harness
        .hosting
        .fail_next(
            "finalize_version",
            HostingError::Transport("connection reset".to_string()),
        )
        .await;

    let release = harness
        .deployer
        .deploy(deploy(&site_id, PAGE))
        .await
        .expect("deploy after retry");

    assert_eq!(harness.hosting.calls("create_version").await, 2);
    assert_eq!(release.version_id, "v2");
    // Blobs from the abandoned version are already stored.
    assert_eq!(release.uploaded_files, 0);
    assert_eq!(harness.hosting.releases().await.len(), 1);
}

#[tokio::test]
async fn empty_page_is_rejected_before_any_remote_call() {
    let harness = Harness::new();
    let site_id = registered_site(&harness).await;

    let err = harness
        .deployer
        .deploy(deploy(&site_id, "   \n"))
        .await
        .expect_err("empty html");

    assert!(matches!(err, DeployError::Validation(_)));
    assert_eq!(harness.hosting.calls("create_version").await, 0);
    let site = harness.sites.get(&site_id).await.expect("site");
    assert_eq!(site.status, SiteStatus::Creating);
}

#[tokio::test]
async fn deploying_unknown_site_fails() {
    let harness = Harness::new();

    let err = harness
        .deployer
        .deploy(deploy("site-missing-000000", PAGE))
        .await
        .expect_err("unknown site");

    assert!(matches!(err, DeployError::SiteNotFound(site) if site == "site-missing-000000"));
    assert_eq!(harness.hosting.calls("create_version").await, 0);
}
