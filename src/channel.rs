//! Request/response protocol between the viewer and its filter worker.
//!
//! The worker runs on its own thread and owns the [`FilterEngine`]; nothing is
//! shared with the viewer except the messages, which are moved across tokio
//! channels. The viewer side is a small state machine that allows at most one
//! filter in flight. A filter requested while another is running is dropped,
//! not queued.
//!
//! ```text
//! Idle --init--> Initializing --init_complete--> Ready --filter--> Filtering
//!                                                  ^                  |
//!                                                  +--filter_complete-+
//!                                                  +--filter_error----+
//! ```

use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::dataset::RawDataset;
use crate::engine::{DEFAULT_CACHE_CAPACITY, FilterEngine, FilterResult};
use crate::error::{ApidexError, Result};

// headroom for recursive parsing and evaluation of large queries
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Init { data: RawDataset },
    Filter { query: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    InitComplete,
    FilterComplete { results: FilterResult },
    FilterError { error: String },
}

/// Worker-side dispatch of a single request.
pub fn handle(engine: &mut FilterEngine, request: Request) -> Response {
    match request {
        Request::Init { data } => {
            engine.initialize(&data);
            Response::InitComplete
        }
        Request::Filter { query } => match engine.filter(&query) {
            Ok(results) => Response::FilterComplete { results },
            Err(e) => {
                debug!(%query, error = %e, "filter failed");
                Response::FilterError { error: e.to_string() }
            }
        },
    }
}

fn run_worker(mut engine: FilterEngine, mut requests: UnboundedReceiver<Request>, responses: UnboundedSender<Response>) {
    while let Some(request) = requests.blocking_recv() {
        if responses.send(handle(&mut engine, request)).is_err() {
            break;
        }
    }
    debug!("worker stopped");
}

/// Starts a worker thread and returns the two ends the viewer talks through.
pub fn spawn_worker(
    cache_capacity: usize,
) -> Result<(UnboundedSender<Request>, UnboundedReceiver<Response>, JoinHandle<()>)> {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let engine = FilterEngine::new(cache_capacity);
    let join = thread::Builder::new()
        .name("apidex-worker".into())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || run_worker(engine, request_rx, response_tx))
        .map_err(|e| ApidexError::Channel(format!("Failed to start worker: {e}")))?;
    Ok((request_tx, response_rx, join))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Initializing,
    Ready,
    Filtering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Sent,
    /// Not accepted in the current state, e.g. a filter is already in flight.
    Dropped,
    /// The transport is gone; the listener has been told.
    Failed,
}

/// Receives the worker's responses on the viewer side.
pub trait Listener {
    fn init_complete(&mut self) {}
    fn filter_complete(&mut self, results: FilterResult);
    fn filter_error(&mut self, error: ApidexError);
}

pub struct QueryChannel {
    state: ChannelState,
    requests: UnboundedSender<Request>,
    responses: UnboundedReceiver<Response>,
    worker: Option<JoinHandle<()>>,
    cache_capacity: usize,
    dataset: Option<RawDataset>,
    disconnected: bool,
}

impl QueryChannel {
    pub fn spawn(cache_capacity: usize) -> Result<Self> {
        let (requests, responses, join) = spawn_worker(cache_capacity)?;
        let mut channel = Self::from_parts(requests, responses);
        channel.worker = Some(join);
        channel.cache_capacity = cache_capacity;
        Ok(channel)
    }

    /// Wraps an existing transport, e.g. one whose worker lives elsewhere.
    pub fn from_parts(requests: UnboundedSender<Request>, responses: UnboundedReceiver<Response>) -> Self {
        Self {
            state: ChannelState::Idle,
            requests,
            responses,
            worker: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            dataset: None,
            disconnected: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    fn transport_failed(&mut self, message: String, listener: &mut dyn Listener) {
        warn!(%message, "worker transport failed");
        self.disconnected = true;
        self.state = match self.state {
            ChannelState::Initializing | ChannelState::Idle => ChannelState::Idle,
            ChannelState::Ready | ChannelState::Filtering => ChannelState::Ready,
        };
        listener.filter_error(ApidexError::Channel(message));
    }

    fn send(&mut self, request: Request, listener: &mut dyn Listener) -> Submission {
        match self.requests.send(request) {
            Ok(()) => Submission::Sent,
            Err(_) => {
                self.transport_failed("Worker is not running".into(), listener);
                Submission::Failed
            }
        }
    }

    /// Hands the dataset to the worker. Only accepted while idle.
    pub fn initialize(&mut self, dataset: RawDataset, listener: &mut dyn Listener) -> Submission {
        if self.state != ChannelState::Idle {
            return Submission::Dropped;
        }
        self.dataset = Some(dataset.clone());
        self.state = ChannelState::Initializing;
        let submission = self.send(Request::Init { data: dataset }, listener);
        if submission == Submission::Sent {
            info!("worker initializing");
        }
        submission
    }

    /// Sends a filter request if the worker is ready and free.
    pub fn filter(&mut self, query: &str, listener: &mut dyn Listener) -> Submission {
        if self.state != ChannelState::Ready {
            debug!(%query, state = ?self.state, "filter request dropped");
            return Submission::Dropped;
        }
        self.state = ChannelState::Filtering;
        self.send(Request::Filter { query: query.to_string() }, listener)
    }

    /// Applies one response to the state machine and forwards it to `listener`.
    pub fn dispatch(&mut self, response: Response, listener: &mut dyn Listener) {
        match response {
            Response::InitComplete => {
                self.state = ChannelState::Ready;
                info!("worker initialized");
                listener.init_complete();
            }
            Response::FilterComplete { results } => {
                self.state = ChannelState::Ready;
                listener.filter_complete(results);
            }
            Response::FilterError { error } => {
                self.state = ChannelState::Ready;
                listener.filter_error(ApidexError::query(error));
            }
        }
    }

    /// Dispatches every response that has already arrived, without blocking.
    pub fn pump(&mut self, listener: &mut dyn Listener) -> usize {
        let mut dispatched = 0;
        loop {
            match self.responses.try_recv() {
                Ok(response) => {
                    self.dispatch(response, listener);
                    dispatched += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        self.transport_failed("Worker terminated unexpectedly".into(), listener);
                    }
                    break;
                }
            }
        }
        dispatched
    }

    /// Blocks until one response arrives and dispatches it. Returns `false`
    /// when the worker is gone. Must not be called from inside an async runtime.
    pub fn wait(&mut self, listener: &mut dyn Listener) -> bool {
        match self.responses.blocking_recv() {
            Some(response) => {
                self.dispatch(response, listener);
                true
            }
            None => {
                if !self.disconnected {
                    self.transport_failed("Worker terminated unexpectedly".into(), listener);
                }
                false
            }
        }
    }

    /// Next response for async callers; `None` once the worker is gone.
    pub async fn next_response(&mut self) -> Option<Response> {
        self.responses.recv().await
    }

    /// Reports a closed transport seen by an async caller.
    pub fn disconnected(&mut self, listener: &mut dyn Listener) {
        if !self.disconnected {
            self.transport_failed("Worker terminated unexpectedly".into(), listener);
        }
    }

    /// Replaces a dead worker with a fresh one and re-sends the dataset.
    pub fn restart(&mut self, listener: &mut dyn Listener) -> Result<Submission> {
        let (requests, responses, join) = spawn_worker(self.cache_capacity)?;
        self.requests = requests;
        self.responses = responses;
        self.worker = Some(join);
        self.disconnected = false;
        self.state = ChannelState::Idle;
        Ok(match self.dataset.take() {
            Some(dataset) => self.initialize(dataset, listener),
            None => Submission::Dropped,
        })
    }
}

impl Drop for QueryChannel {
    fn drop(&mut self) {
        // closing the request side ends the worker loop
        let (closed, _) = mpsc::unbounded_channel();
        self.requests = closed;
        if let Some(join) = self.worker.take() {
            let _ = join.join();
        }
    }
}
