//! The bridge event loop.
//!
//! All bridge state lives on one task. Producers marshal events onto it
//! through a `BridgeHandle`; Slack requests and connect attempts run as
//! spawned tasks whose outcomes come back through the same queue.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::bridge::connection::Connection;
use crate::bridge::router::EventRouter;
use crate::common::error::{ApiError, ApiResult};
use crate::common::messages::{BridgeEvent, ConnectRequest, InputDisposition, SlackRequest};
use crate::common::types::redact_token;
use crate::irc::IrcNetwork;
use crate::slack::api::{self, SlackApi};
use crate::slack::events::SlackEvent;
use crate::slack::workspace::WorkspaceSnapshot;

/// Exponential backoff for connect attempts.
/// 5s initial, 5min max, factor 1.1, with jitter.
pub fn connect_backoff(max_attempts: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .with_max_times(max_attempts.saturating_sub(1))
}

/// Authenticate against Slack, retrying transient failures.
///
/// Invalid credentials are not retried.
pub async fn connect_with_backoff(
    api: &dyn SlackApi,
    backoff: ExponentialBuilder,
    token: &str,
) -> ApiResult<WorkspaceSnapshot> {
    let mut delays = backoff.build();
    loop {
        info!(token = %redact_token(token), "Connecting to Slack...");
        match api.connect().await {
            Ok(snapshot) => return Ok(snapshot),
            Err(ApiError::InvalidAuth) => return Err(ApiError::InvalidAuth),
            Err(e) => {
                let Some(delay) = delays.next() else {
                    return Err(e);
                };
                warn!(token = %redact_token(token), "Slack connect failed: {}", e);
                info!("Reconnecting in {:.1} seconds...", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Builds the IRC side for a connection first seen through a connect event.
pub type NetworkFactory<N> = Box<dyn Fn(&str) -> N + Send>;

/// Cloneable sender for bridge events.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl BridgeHandle {
    /// Returns `false` once the event loop has stopped.
    pub fn send(&self, event: BridgeEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn slack_event(&self, token: &str, event: SlackEvent) -> bool {
        self.send(BridgeEvent::Slack {
            token: token.to_string(),
            event,
        })
    }

    /// Submit IRC input. The receiver yields what the host should do with it.
    pub fn user_input(
        &self,
        token: &str,
        channel: &str,
        text: &str,
    ) -> oneshot::Receiver<InputDisposition> {
        let (reply, rx) = oneshot::channel();
        self.send(BridgeEvent::UserInput {
            token: token.to_string(),
            channel: channel.to_string(),
            text: text.to_string(),
            reply: Some(reply),
        });
        rx
    }

    pub fn select_channel(&self, token: &str, channel: &str) -> bool {
        self.send(BridgeEvent::ChannelSelected {
            token: token.to_string(),
            channel: channel.to_string(),
        })
    }

    pub fn app_activated(&self) -> bool {
        self.send(BridgeEvent::AppActivated)
    }

    pub fn connect(&self, token: &str, name: &str, api: Arc<dyn SlackApi>) -> bool {
        self.send(BridgeEvent::Connect(ConnectRequest {
            token: token.to_string(),
            name: name.to_string(),
            api,
        }))
    }

    pub fn disconnect(&self, token: &str) -> bool {
        self.send(BridgeEvent::Disconnect {
            token: token.to_string(),
        })
    }

    pub fn shutdown(&self) -> bool {
        self.send(BridgeEvent::Shutdown)
    }
}

/// Owns every connection and processes bridge events in arrival order.
pub struct BridgeRuntime<N: IrcNetwork> {
    connections: HashMap<String, Connection<N>>,
    router: EventRouter,
    backoff: ExponentialBuilder,
    networks: Option<NetworkFactory<N>>,
    /// Tokens with a connect attempt in progress.
    connecting: HashSet<String>,
    tx: mpsc::UnboundedSender<BridgeEvent>,
    rx: mpsc::UnboundedReceiver<BridgeEvent>,
    in_flight: usize,
}

impl<N: IrcNetwork + 'static> BridgeRuntime<N> {
    pub fn new(router: EventRouter, backoff: ExponentialBuilder) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connections: HashMap::new(),
            router,
            backoff,
            networks: None,
            connecting: HashSet::new(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Allow connect events for tokens that have no connection yet.
    ///
    /// The factory receives the connection name.
    pub fn with_network_factory(mut self, factory: impl Fn(&str) -> N + Send + 'static) -> Self {
        self.networks = Some(Box::new(factory));
        self
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn connection(&self, token: &str) -> Option<&Connection<N>> {
        self.connections.get(token)
    }

    pub fn connection_mut(&mut self, token: &str) -> Option<&mut Connection<N>> {
        self.connections.get_mut(token)
    }

    /// Register a connection for a token.
    ///
    /// Returns `false` and keeps the existing connection, with its channel
    /// mappings, when the token is already registered.
    pub fn add_connection(
        &mut self,
        token: &str,
        name: &str,
        api: Arc<dyn SlackApi>,
        network: N,
    ) -> bool {
        if self.connections.contains_key(token) {
            debug!(token = %redact_token(token), "Reusing existing connection");
            return false;
        }
        self.connections.insert(
            token.to_string(),
            Connection::new(token, name, api, network),
        );
        true
    }

    /// Authenticate a registered connection before the event loop starts.
    ///
    /// Once `run` owns the runtime, use `BridgeHandle::connect` instead.
    pub async fn connect(&mut self, token: &str) -> ApiResult<()> {
        let api = match self.connections.get(token) {
            Some(conn) => conn.api(),
            None => return Err(ApiError::NotConnected),
        };
        let result = connect_with_backoff(api.as_ref(), self.backoff, token).await;
        self.finish_connect(token, result)
    }

    /// Start a connect attempt on its own task. The outcome comes back as
    /// `BridgeEvent::Connected`.
    fn begin_connect(&mut self, request: ConnectRequest) {
        let ConnectRequest { token, name, api } = request;

        if !self.connections.contains_key(&token) {
            let Some(networks) = self.networks.as_ref() else {
                warn!(token = %redact_token(&token), "No IRC network for new connection");
                return;
            };
            let network = networks(&name);
            self.add_connection(&token, &name, api, network);
        }

        let Some(conn) = self.connections.get(&token) else {
            return;
        };
        if conn.is_connected() {
            debug!(token = %redact_token(&token), "Already connected");
            return;
        }
        if !self.connecting.insert(token.clone()) {
            debug!(token = %redact_token(&token), "Connect already in progress");
            return;
        }

        let api = conn.api();
        let backoff = self.backoff;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = connect_with_backoff(api.as_ref(), backoff, &token).await;
            if tx.send(BridgeEvent::Connected { token, result }).is_err() {
                debug!("Event loop gone, dropping connect result");
            }
        });
    }

    fn finish_connect(&mut self, token: &str, result: ApiResult<WorkspaceSnapshot>) -> ApiResult<()> {
        self.connecting.remove(token);
        match result {
            Ok(snapshot) => {
                if let Some(conn) = self.connections.get_mut(token) {
                    conn.attach(snapshot);
                }
                Ok(())
            }
            Err(ApiError::InvalidAuth) => {
                error!(token = %redact_token(token), "Slack rejected the token");
                self.console_notice(token, "Slack rejected the token");
                Err(ApiError::InvalidAuth)
            }
            Err(e) => {
                error!(token = %redact_token(token), "Giving up on Slack connection: {}", e);
                self.console_notice(token, &format!("Could not connect to Slack: {}", e));
                Err(e)
            }
        }
    }

    fn console_notice(&mut self, token: &str, text: &str) {
        if let Some(conn) = self.connections.get_mut(token) {
            conn.network.notice(None, text);
        }
    }

    /// Process events until shutdown, then wait for in-flight requests.
    ///
    /// Returns the runtime so the final state can be inspected.
    pub async fn run(mut self) -> Self {
        info!(connections = self.connections.len(), "Bridge event loop started");
        let mut shutting_down = false;

        while let Some(event) = self.rx.recv().await {
            match event {
                BridgeEvent::Shutdown => {
                    if !shutting_down {
                        info!(in_flight = self.in_flight, "Bridge shutting down");
                    }
                    shutting_down = true;
                }
                BridgeEvent::Completed { token, completion } => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    let requests = match self.connections.get_mut(&token) {
                        Some(conn) => self.router.handle_completion(conn, completion),
                        None => Vec::new(),
                    };
                    if !shutting_down {
                        self.dispatch(&token, requests);
                    }
                }
                event if shutting_down => {
                    if let BridgeEvent::UserInput {
                        text,
                        reply: Some(reply),
                        ..
                    } = event
                    {
                        let _ = reply.send(InputDisposition::PassThrough(text));
                    } else {
                        debug!("Ignoring event during shutdown");
                    }
                }
                event => self.handle_event(event),
            }

            if shutting_down && self.in_flight == 0 {
                break;
            }
        }

        for conn in self.connections.values_mut() {
            conn.detach();
        }
        info!("Bridge event loop stopped");
        self
    }

    fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Slack { token, event } => {
                let Some(conn) = self.connections.get_mut(&token) else {
                    debug!(token = %redact_token(&token), "Event for unknown connection");
                    return;
                };
                if !conn.is_connected() {
                    debug!(token = %redact_token(&token), "Event for offline connection");
                    return;
                }
                let requests = self.router.handle_slack_event(conn, event);
                self.dispatch(&token, requests);
            }
            BridgeEvent::UserInput {
                token,
                channel,
                text,
                reply,
            } => {
                let (disposition, requests) = match self.connections.get_mut(&token) {
                    Some(conn) => self.router.handle_user_input(conn, &channel, text),
                    None => (InputDisposition::PassThrough(text), Vec::new()),
                };
                if let Some(reply) = reply {
                    let _ = reply.send(disposition);
                }
                self.dispatch(&token, requests);
            }
            BridgeEvent::ChannelSelected { token, channel } => {
                if let Some(conn) = self.connections.get_mut(&token) {
                    let requests = self.router.handle_channel_selected(conn, &channel);
                    self.dispatch(&token, requests);
                }
            }
            BridgeEvent::AppActivated => {
                let tokens: Vec<String> = self.connections.keys().cloned().collect();
                for token in tokens {
                    if let Some(conn) = self.connections.get_mut(&token) {
                        let requests = self.router.handle_app_activated(conn);
                        self.dispatch(&token, requests);
                    }
                }
            }
            BridgeEvent::Connect(request) => self.begin_connect(request),
            BridgeEvent::Connected { token, result } => {
                // Failures are already reported on the connection console
                let _ = self.finish_connect(&token, result);
            }
            BridgeEvent::Disconnect { token } => {
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.detach();
                }
            }
            BridgeEvent::Completed { .. } | BridgeEvent::Shutdown => {}
        }
    }

    /// Spawn Slack requests. Completions are queued back onto the loop.
    fn dispatch(&mut self, token: &str, requests: Vec<SlackRequest>) {
        if requests.is_empty() {
            return;
        }
        let Some(api) = self.connections.get(token).map(|conn| conn.api()) else {
            return;
        };

        for request in requests {
            let api = Arc::clone(&api);
            let tx = self.tx.clone();
            let token = token.to_string();
            self.in_flight += 1;
            tokio::spawn(async move {
                let completion = api::execute(api.as_ref(), request).await;
                if tx
                    .send(BridgeEvent::Completed { token, completion })
                    .is_err()
                {
                    debug!("Event loop gone, dropping completion");
                }
            });
        }
    }
}
