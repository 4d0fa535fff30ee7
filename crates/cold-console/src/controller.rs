use cold_core::{
    decode_snapshot, ClusterSnapshot, ConsoleEvent, ConsoleRequest, Exchange, ProtocolError,
    CONSOLE_UPDATE_PATH,
};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info};

pub const COMMAND_QUEUE_CAPACITY: usize = 16;
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// A request queued for the controller, tagged with what triggered it.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub exchange: Exchange,
    pub request: ConsoleRequest,
}

impl OutboundRequest {
    pub fn poll() -> Self {
        Self {
            exchange: Exchange::Poll,
            request: ConsoleRequest::refresh(),
        }
    }
}

/// HTTP side of the console: one POST to `/console_update` per exchange.
#[derive(Clone, Debug)]
pub struct ControllerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ControllerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint_url(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn exchange(&self, request: &ConsoleRequest) -> Result<ClusterSnapshot, ProtocolError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| ProtocolError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::Status {
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| ProtocolError::Transport(err.to_string()))?;
        decode_snapshot(&body)
    }
}

pub fn endpoint_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim().trim_end_matches('/'), CONSOLE_UPDATE_PATH)
}

/// Runs one exchange in the background and reports the outcome as an event.
/// Exchanges are not ordered against each other; whichever lands last wins.
fn spawn_exchange(
    client: ControllerClient,
    outbound: OutboundRequest,
    events: mpsc::Sender<ConsoleEvent>,
) {
    tokio::spawn(async move {
        let result = client.exchange(&outbound.request).await;
        debug!(
            event = "controller_exchange",
            exchange = %outbound.exchange,
            ok = result.is_ok()
        );
        let _ = events
            .send(ConsoleEvent::ExchangeCompleted {
                exchange: outbound.exchange,
                result,
            })
            .await;
    });
}

/// Fires a refresh every `interval` and forwards queued commands, until the
/// event receiver goes away.
pub async fn controller_loop(
    client: ControllerClient,
    interval: Duration,
    events: mpsc::Sender<ConsoleEvent>,
    mut command_rx: mpsc::Receiver<OutboundRequest>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut command_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if events.is_closed() {
                    break;
                }
                spawn_exchange(client.clone(), OutboundRequest::poll(), events.clone());
            }
            maybe_command = command_rx.recv(), if command_open => {
                match maybe_command {
                    Some(outbound) => {
                        spawn_exchange(client.clone(), outbound, events.clone());
                    }
                    None => {
                        command_open = false;
                    }
                }
            }
        }
    }
}

/// Owns the background controller loop. Started once when the console comes
/// up; `stop` is only for teardown.
pub struct ControllerHandle {
    task: JoinHandle<()>,
}

impl ControllerHandle {
    pub fn start(
        client: ControllerClient,
        interval: Duration,
        events: mpsc::Sender<ConsoleEvent>,
        command_rx: mpsc::Receiver<OutboundRequest>,
    ) -> Self {
        info!(
            event = "controller_loop_start",
            endpoint = %client.endpoint(),
            interval_ms = interval.as_millis() as u64
        );
        let task = tokio::spawn(controller_loop(client, interval, events, command_rx));
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
        info!(event = "controller_loop_stop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Router};
    use cold_core::{ClusterStatus, Command, ConsoleState, SolverCatalog, VocabularyPreference};
    use serde_json::{json, Value};
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };
    use tokio::time::timeout;

    #[derive(Clone, Default)]
    struct Stub {
        replies: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    impl Stub {
        fn queue(&self, status: StatusCode, body: impl Into<String>) {
            self.replies.lock().unwrap().push_back((status, body.into()));
        }

        fn requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn snapshot_body(status: &str, programs_run: u64) -> String {
        json!({
            "status": status,
            "workers": [{
                "worker_id": 1,
                "cores": 6,
                "run_rate": 1500,
                "programs_run": programs_run,
                "combinations_completed": 0,
                "status": "solving"
            }],
            "programs_run": programs_run,
            "unsolved": [1],
            "solved": [{"unit": 0, "programs_run": programs_run}],
            "solutions": []
        })
        .to_string()
    }

    async fn console_update(State(stub): State<Stub>, body: String) -> (StatusCode, String) {
        let parsed = serde_json::from_str(&body).unwrap_or(Value::Null);
        stub.requests.lock().unwrap().push(parsed);
        let queued = stub.replies.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| (StatusCode::OK, snapshot_body("running", 3000)))
    }

    async fn serve(stub: Stub) -> String {
        let app = Router::new()
            .route(CONSOLE_UPDATE_PATH, post(console_update))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> ControllerClient {
        ControllerClient::new(base_url, Duration::from_secs(2)).unwrap()
    }

    async fn next_event(rx: &mut mpsc::Receiver<ConsoleEvent>) -> ConsoleEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event before timeout")
            .expect("channel open")
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        assert_eq!(
            endpoint_url("http://localhost:5000/"),
            "http://localhost:5000/console_update"
        );
        assert_eq!(
            endpoint_url(" http://cluster "),
            "http://cluster/console_update"
        );
    }

    #[tokio::test]
    async fn refresh_posts_empty_body_and_decodes_snapshot() {
        let stub = Stub::default();
        let base = serve(stub.clone()).await;

        let snapshot = client(&base)
            .exchange(&ConsoleRequest::refresh())
            .await
            .unwrap();

        assert_eq!(snapshot.status, ClusterStatus::Running);
        assert_eq!(snapshot.programs_run, 3000);
        assert_eq!(stub.requests(), vec![json!({})]);
    }

    #[tokio::test]
    async fn reset_posts_staged_solver_verbatim() {
        let stub = Stub::default();
        let base = serve(stub.clone()).await;
        let staged = "depth 1\npattern add\ninput z\ncase i2 i4\n  ";

        client(&base)
            .exchange(&ConsoleRequest::command(Command::Reset, staged))
            .await
            .unwrap();

        assert_eq!(
            stub.requests(),
            vec![json!({"command": "reset", "solver": staged})]
        );
    }

    #[tokio::test]
    async fn http_error_and_bad_body_are_protocol_errors() {
        let stub = Stub::default();
        stub.queue(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        stub.queue(StatusCode::OK, "{\"status\":\"running\"}");
        let base = serve(stub.clone()).await;
        let client = client(&base);

        let err = client.exchange(&ConsoleRequest::refresh()).await.unwrap_err();
        assert_eq!(err, ProtocolError::Status { status: 500 });

        let err = client.exchange(&ConsoleRequest::refresh()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_controller_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"))
            .exchange(&ConsoleRequest::refresh())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Transport(_)));
    }

    #[tokio::test]
    async fn failed_poll_recovers_on_next_tick() {
        let stub = Stub::default();
        stub.queue(StatusCode::SERVICE_UNAVAILABLE, "");
        let base = serve(stub.clone()).await;
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (_command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = ControllerHandle::start(
            client(&base),
            Duration::from_millis(100),
            event_tx,
            command_rx,
        );

        let mut state = ConsoleState::new(SolverCatalog::builtin(), VocabularyPreference::Auto);
        let first = next_event(&mut event_rx).await;
        assert!(matches!(
            &first,
            ConsoleEvent::ExchangeCompleted { exchange: Exchange::Poll, result: Err(_) }
        ));
        state.apply(first);
        assert!(!state.is_connected());

        let second = next_event(&mut event_rx).await;
        state.apply(second);
        handle.stop();

        assert!(state.is_connected());
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.snapshot().map(|s| s.programs_run), Some(3000));
    }

    #[tokio::test]
    async fn queued_command_is_sent_and_tagged() {
        let stub = Stub::default();
        let base = serve(stub.clone()).await;
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = ControllerHandle::start(
            client(&base),
            Duration::from_secs(3600),
            event_tx,
            command_rx,
        );

        // The first tick fires immediately.
        let initial = next_event(&mut event_rx).await;
        assert!(matches!(
            initial,
            ConsoleEvent::ExchangeCompleted { exchange: Exchange::Poll, .. }
        ));

        command_tx
            .send(OutboundRequest {
                exchange: Exchange::Command(Command::Stop),
                request: ConsoleRequest::command(Command::Stop, "ignored"),
            })
            .await
            .unwrap();
        let event = next_event(&mut event_rx).await;
        handle.stop();

        assert!(matches!(
            event,
            ConsoleEvent::ExchangeCompleted {
                exchange: Exchange::Command(Command::Stop),
                result: Ok(_)
            }
        ));
        assert!(stub.requests().contains(&json!({"command": "stop"})));
    }

    #[tokio::test]
    async fn stop_ends_polling() {
        let stub = Stub::default();
        let base = serve(stub.clone()).await;
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (_command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = ControllerHandle::start(
            client(&base),
            Duration::from_millis(20),
            event_tx,
            command_rx,
        );

        next_event(&mut event_rx).await;
        handle.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = stub.requests().len();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(stub.requests().len(), settled);
    }
}
