use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cats_tapper::config::{AnswerBook, QuizAnswer};
use cats_tapper::tapper::{
    AuthError, Authenticator, AvatarOutcome, CycleError, Pacing, RequestConfig, Session, Tapper,
    TapperError, WebAppAuth,
};

const INIT_DATA: &str = "query_id=AAH&user=%7B%22id%22%3A1%7D";

#[derive(Clone, Default)]
struct StubAuthenticator {
    calls: Arc<AtomicUsize>,
    malformed: bool,
    rejected: bool,
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self) -> Result<WebAppAuth, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.rejected {
            return Err(AuthError::InvalidSession("AUTH_KEY_UNREGISTERED".to_owned()));
        }
        if self.malformed {
            return Err(AuthError::MalformedWebAppUrl);
        }
        Ok(WebAppAuth {
            referral_code: "ref123".to_owned(),
            init_data: INIT_DATA.to_owned(),
            telegram_user_id: 1,
        })
    }
}

fn answers() -> AnswerBook {
    AnswerBook {
        youtube_answers: vec![QuizAnswer {
            title: "Cats 101".to_owned(),
            answer: "MEOW".to_owned(),
        }],
    }
}

fn tapper(server: &MockServer, auth: StubAuthenticator) -> Tapper<StubAuthenticator> {
    Tapper::new(
        Session::new("test".to_owned(), None),
        auth,
        RequestConfig::with_base_url(&server.uri()),
        answers(),
        Pacing::immediate(),
    )
}

async fn mount_json(server: &MockServer, verb: &str, route: &str, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_user(server: &MockServer, og_pass: bool) {
    mount_json(
        server,
        "GET",
        "/user",
        json!({"id": 42, "telegramAge": 5, "totalRewards": 1500, "hasOgPass": og_pass}),
    )
    .await;
}

async fn mount_quiet_extras(server: &MockServer) {
    mount_json(server, "GET", "/tasks/user", json!({"tasks": []})).await;
    mount_json(
        server,
        "GET",
        "/user/avatar",
        json!({"attemptTime": (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339()}),
    )
    .await;
    mount_json(
        server,
        "GET",
        "/exchange-claim/check-available",
        json!({"isAvailable": false}),
    )
    .await;
}

async fn mount_avatar_upload(server: &MockServer, expected: u64) {
    mount_json(server, "GET", "/user/avatar", json!({"attemptTime": null})).await;
    Mock::given(method("GET"))
        .and(path("/cat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cat-image".to_vec()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/avatar/upgrade"))
        .and(body_string_contains("name=\"photo\""))
        .and(body_string_contains("cat-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rewards": 25})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_tasks_are_filtered_and_claimed() {
    let server = MockServer::start().await;
    mount_user(&server, false).await;
    Mock::given(method("GET"))
        .and(path("/tasks/user"))
        .and(query_param("group", "cats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": [
            {"id": "t_done", "type": "OPEN_LINK", "title": "Done", "completed": true, "rewardPoints": 10},
            {"id": "t_boost", "type": "BOOST_CHANNEL", "title": "Boost", "completed": false, "rewardPoints": 10},
            {"id": "t_invite", "type": "INVITE_FRIENDS", "title": "Invite", "completed": false, "rewardPoints": 10},
            {"id": "t_sub", "type": "SUBSCRIBE_TO_CHANNEL", "title": "Join", "completed": false, "rewardPoints": 100},
            {"id": "t_yt", "type": "YOUTUBE_WATCH", "title": "cats 101", "completed": false, "rewardPoints": 200},
            {"id": "t_yt_unknown", "type": "YOUTUBE_WATCH", "title": "Dogs 101", "completed": false, "rewardPoints": 200}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/tasks/t_sub/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks/t_yt/complete"))
        .and(query_param("answer", "MEOW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completed": true})))
        .expect(1)
        .mount(&server)
        .await;
    for never in [
        "/tasks/t_done/complete",
        "/tasks/t_boost/complete",
        "/tasks/t_invite/complete",
        "/tasks/t_yt_unknown/complete",
        "/tasks/t_sub/complete",
    ] {
        Mock::given(method("POST"))
            .and(path(never))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(0)
            .mount(&server)
            .await;
    }
    mount_json(&server, "GET", "/user/avatar", json!({"attemptTime": (chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339()})).await;
    mount_json(&server, "GET", "/exchange-claim/check-available", json!({"isAvailable": true})).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert_eq!(report.tasks_submitted, 2);
    assert_eq!(report.tasks_done, 2);
    assert_eq!(report.withdrawal_available, Some(true));
}

#[tokio::test]
async fn test_bearer_header_uses_web_app_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", format!("tma {INIT_DATA}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;
    mount_quiet_extras(&server).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert!(report.reauthenticated);
    assert_eq!(tapper.session().telegram_user_id, Some(1));
    assert_eq!(tapper.session().user.as_ref().map(|u| u.id), Some(42));
}

#[tokio::test]
async fn test_premium_account_runs_avatar_quest_three_times() {
    let server = MockServer::start().await;
    mount_user(&server, true).await;
    mount_json(&server, "GET", "/tasks/user", json!({"tasks": []})).await;
    mount_json(&server, "GET", "/exchange-claim/check-available", json!({"isAvailable": false})).await;
    mount_avatar_upload(&server, 3).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert_eq!(report.avatar_attempts, 3);
    assert!(
        report
            .avatar_outcomes
            .iter()
            .all(|o| *o == AvatarOutcome::Uploaded { rewards: 25.0 })
    );
}

#[tokio::test]
async fn test_regular_account_runs_avatar_quest_once() {
    let server = MockServer::start().await;
    mount_user(&server, false).await;
    mount_json(&server, "GET", "/tasks/user", json!({"tasks": []})).await;
    mount_json(&server, "GET", "/exchange-claim/check-available", json!({"isAvailable": false})).await;
    mount_avatar_upload(&server, 1).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert_eq!(report.avatar_attempts, 1);
}

#[tokio::test]
async fn test_recent_avatar_attempt_is_not_uploaded() {
    let server = MockServer::start().await;
    mount_user(&server, false).await;
    mount_quiet_extras(&server).await;
    Mock::given(method("POST"))
        .and(path("/user/avatar/upgrade"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rewards": 25})))
        .expect(0)
        .mount(&server)
        .await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert!(matches!(
        report.avatar_outcomes.as_slice(),
        [AvatarOutcome::Waiting(wait)] if *wait > Duration::ZERO
    ));
}

#[tokio::test]
async fn test_missing_user_registers_with_referral_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_user(&server, false).await;
    Mock::given(method("POST"))
        .and(path("/user/create"))
        .and(query_param("referral_code", "ref123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_quiet_extras(&server).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert!(report.reauthenticated);
}

#[tokio::test]
async fn test_login_fails_when_registration_does_not_stick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let result = tapper.run_cycle().await;

    assert!(matches!(result, Err(CycleError::LoginFailed)));
    assert!(tapper.session().token.needs_refresh(Instant::now()));
}

#[tokio::test]
async fn test_token_is_refreshed_after_an_hour() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(2)
        .mount(&server)
        .await;
    mount_quiet_extras(&server).await;

    let auth = StubAuthenticator::default();
    let calls = Arc::clone(&auth.calls);
    let mut tapper = tapper(&server, auth);
    let start = Instant::now();

    let first = tapper.run_cycle_at(start).await.unwrap();
    assert!(first.reauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = tapper
        .run_cycle_at(start + Duration::from_secs(3599))
        .await
        .unwrap();
    assert!(!second.reauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let third = tapper
        .run_cycle_at(start + Duration::from_secs(3600))
        .await
        .unwrap();
    assert!(third.reauthenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_malformed_handshake_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(0)
        .mount(&server)
        .await;

    let auth = StubAuthenticator {
        malformed: true,
        ..StubAuthenticator::default()
    };
    let mut tapper = tapper(&server, auth);

    match tapper.run_cycle().await {
        Err(CycleError::Auth(e)) => assert!(!e.is_fatal()),
        other => panic!("expected auth failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_steps_do_not_abort_the_cycle() {
    let server = MockServer::start().await;
    mount_user(&server, false).await;
    Mock::given(method("GET"))
        .and(path("/tasks/user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/avatar"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_json(&server, "GET", "/exchange-claim/check-available", json!({"isAvailable": true})).await;

    let mut tapper = tapper(&server, StubAuthenticator::default());
    let report = tapper.run_cycle().await.unwrap();

    assert_eq!(report.tasks_submitted, 0);
    assert!(report.avatar_outcomes.is_empty());
    assert_eq!(report.withdrawal_available, Some(true));
}

#[tokio::test]
async fn test_rejected_session_stops_the_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(0)
        .mount(&server)
        .await;

    let auth = StubAuthenticator {
        rejected: true,
        ..StubAuthenticator::default()
    };
    let calls = Arc::clone(&auth.calls);
    let tapper = tapper(&server, auth);

    let result = tokio::time::timeout(Duration::from_secs(5), tapper.run())
        .await
        .unwrap();

    assert!(matches!(
        result,
        Err(TapperError::InvalidSession { ref session, .. }) if session == "test"
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
