use std::sync::{Arc, Mutex};
use std::time::Duration;

use ocrdrop_engine::{
    EngineEvent, EventSink, HttpBackend, OcrBackend, PollSettings, Poller, ProcessState,
    ServerSettings,
};
use serde_json::json;
use tokio::runtime::Handle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn snapshot(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    fn finished(&self) -> Option<ProcessState> {
        self.snapshot().into_iter().find_map(|event| match event {
            EngineEvent::Finished { state, .. } => Some(state),
            _ => None,
        })
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn fast_settings() -> PollSettings {
    PollSettings {
        status_interval: Duration::from_millis(20),
        log_interval: Duration::from_millis(20),
        completion_interval: Duration::from_millis(20),
        max_completion_failures: 3,
    }
}

async fn mount_idle_status_and_logs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_processing": true,
            "current_file_index": 1,
            "total_files": 2
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn backend(server: &MockServer) -> Arc<dyn OcrBackend> {
    Arc::new(
        HttpBackend::new(ServerSettings {
            base_url: server.uri(),
            ..ServerSettings::default()
        })
        .unwrap(),
    )
}

async fn wait_for_finish(sink: &TestSink) -> ProcessState {
    for _ in 0..200 {
        if let Some(state) = sink.finished() {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("poller never reported completion");
}

async fn count_requests(server: &MockServer, wanted: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completion_poller_reports_success_once() {
    let server = MockServer::start().await;
    mount_idle_status_and_logs(&server).await;
    Mock::given(method("GET"))
        .and(path("/process-status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "process_id": "abc",
            "success": true,
            "download_url": "/download/abc"
        })))
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut poller = Poller::new();
    poller.start(
        &Handle::current(),
        backend(&server),
        sink.clone(),
        &fast_settings(),
        7,
        "abc".to_string(),
    );

    let state = wait_for_finish(&sink).await;
    assert!(matches!(state, ProcessState::Succeeded(_)));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_requests(&server, "/process-status/abc").await, 1);

    let events = sink.snapshot();
    assert!(events.iter().all(|event| match event {
        EngineEvent::Status { epoch, .. }
        | EngineEvent::Logs { epoch, .. }
        | EngineEvent::Finished { epoch, .. } => *epoch == 7,
        _ => false,
    }));
    poller.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completion_poller_gives_up_after_repeated_failures() {
    let server = MockServer::start().await;
    mount_idle_status_and_logs(&server).await;
    Mock::given(method("GET"))
        .and(path("/process-status/abc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut poller = Poller::new();
    poller.start(
        &Handle::current(),
        backend(&server),
        sink.clone(),
        &fast_settings(),
        1,
        "abc".to_string(),
    );

    let state = wait_for_finish(&sink).await;
    assert_eq!(
        state,
        ProcessState::Failed {
            message: "Lost contact with the server while waiting for the job to finish"
                .to_string()
        }
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count_requests(&server, "/process-status/abc").await, 3);
    poller.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_halts_all_polling() {
    let server = MockServer::start().await;
    mount_idle_status_and_logs(&server).await;
    Mock::given(method("GET"))
        .and(path("/process-status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"process_id": "abc"})))
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut poller = Poller::new();
    poller.start(
        &Handle::current(),
        backend(&server),
        sink.clone(),
        &fast_settings(),
        1,
        "abc".to_string(),
    );
    assert!(poller.is_running());
    tokio::time::sleep(Duration::from_millis(120)).await;

    poller.stop();
    poller.stop();
    assert!(!poller.is_running());
    tokio::time::sleep(Duration::from_millis(60)).await;

    let settled = server.received_requests().await.unwrap().len();
    let emitted = sink.snapshot().len();
    assert!(settled > 0);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), settled);
    assert_eq!(sink.snapshot().len(), emitted);
    assert!(sink.finished().is_none());
}
