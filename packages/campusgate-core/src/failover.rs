//! Ordered credential failover.

use tokio_util::sync::CancellationToken;

use crate::credentials::Credential;
use crate::session::AuthSession;

/// Try each credential in list order until one authenticates.
///
/// Invalid entries are skipped without burning a network attempt, and the
/// rest of the list is abandoned on the first success. Returns false only
/// after every entry has been tried.
pub async fn login_by_list(
    session: &mut AuthSession,
    users: &[Credential],
    cancel: &CancellationToken,
) -> bool {
    for user in users {
        if cancel.is_cancelled() {
            return false;
        }
        if !user.is_valid() {
            tracing::warn!("Skipping invalid credential {}", user.masked_id());
            continue;
        }

        let outcome = session
            .login(&user.user_id, &user.password, user.is_encrypted, cancel)
            .await;
        if outcome.success {
            tracing::info!("Authenticated as {}", user.masked_id());
            return true;
        }

        tracing::warn!("Login failed for {}: {}", user.masked_id(), outcome.message);
        if cancel.is_cancelled() {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LANDING_BODY: &str =
        "<script>top.self.location.href='http://portal/eportal/index.jsp?wlanuserip=1.2.3.4'</script>";

    async fn offline_portal(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LANDING_BODY))
            .mount(server)
            .await;
    }

    async fn mount_login_reply(server: &MockServer, user_id: &str, result: &str, expect: u64) {
        Mock::given(method("POST"))
            .and(path("/eportal/InterFace.do"))
            .and(body_string_contains(format!("userId={user_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": result,
                "message": "stubbed"
            })))
            .expect(expect)
            .mount(server)
            .await;
    }

    fn session_for(server: &MockServer, dir: &tempfile::TempDir) -> AuthSession {
        AuthSession::new(&PortalConfig {
            eportal_base: format!("{}/eportal/InterFace.do?method=", server.uri()),
            landing_url: format!("{}/landing", server.uri()),
            probe_url: format!("{}/generate_204", server.uri()),
            retry_times: 1,
            retry_wait_secs: 0,
            cache_path: dir.path().join("qs.txt"),
            ..PortalConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn stops_at_the_first_success() {
        let server = MockServer::start().await;
        offline_portal(&server).await;
        mount_login_reply(&server, "202412300001", "fail", 1).await;
        mount_login_reply(&server, "202412300002", "success", 1).await;
        mount_login_reply(&server, "202412300003", "success", 0).await;

        let users = vec![
            Credential::new("202412300001", "one", false),
            Credential::new("202412300002", "two", false),
            Credential::new("202412300003", "three", false),
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(&server, &dir);
        assert!(login_by_list(&mut session, &users, &CancellationToken::new()).await);
    }

    #[tokio::test]
    async fn exhausts_the_whole_list_on_failure() {
        let server = MockServer::start().await;
        offline_portal(&server).await;
        mount_login_reply(&server, "202412300001", "fail", 1).await;
        mount_login_reply(&server, "202412300002", "fail", 1).await;
        mount_login_reply(&server, "202412300003", "fail", 1).await;

        let users = vec![
            Credential::new("202412300001", "one", false),
            Credential::new("202412300002", "two", false),
            Credential::new("202412300003", "three", false),
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(&server, &dir);
        assert!(!login_by_list(&mut session, &users, &CancellationToken::new()).await);
    }

    #[tokio::test]
    async fn cancelled_failover_attempts_no_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/eportal/InterFace.do"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let users = vec![
            Credential::new("202412300001", "one", false),
            Credential::new("202412300002", "two", false),
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(&server, &dir);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!login_by_list(&mut session, &users, &cancel).await);
    }

    #[tokio::test]
    async fn invalid_entries_are_skipped_entirely() {
        let server = MockServer::start().await;
        offline_portal(&server).await;
        mount_login_reply(&server, "12345", "success", 0).await;
        mount_login_reply(&server, "202412300002", "success", 1).await;

        let users = vec![
            Credential::new("12345", "bad-id", false),
            Credential::new("202412300002", "two", false),
        ];

        let dir = tempfile::tempdir().unwrap();
        let mut session = session_for(&server, &dir);
        assert!(login_by_list(&mut session, &users, &CancellationToken::new()).await);
    }
}
