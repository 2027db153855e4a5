//! In-memory connectors and helpers shared by the integration tests.
#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{json, Value};

use shift_sdk::codec::{decode_all, encode, MessageWriter};
use shift_sdk::command::{Invocation, Registered, Runtime};
use shift_sdk::config::RuntimeConfig;
use shift_sdk::prelude::*;
use shift_sdk::types::message::{Message, MessageKind};

pub const VALID_CONFIG: &str = r#"{"host":"localhost","port":5432}"#;

#[derive(Debug, Deserialize)]
pub struct FakeConfig {
    pub host: String,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub spec: AtomicUsize,
    pub check: AtomicUsize,
    pub discover: AtomicUsize,
    pub read: AtomicUsize,
    pub open: AtomicUsize,
    pub flush: AtomicUsize,
    pub close: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::SeqCst)
    }
}

pub fn users_stream() -> Stream {
    let mut stream = Stream::new(
        "users",
        json!({"type": "object", "properties": {"id": {"type": "integer"}}}),
    );
    stream.supported_sync_modes.push(SyncMode::Incremental);
    stream.default_cursor_field = Some("id".into());
    stream
}

pub fn orders_stream() -> Stream {
    Stream::new("orders", json!({"type": "object"}))
}

pub fn users() -> StreamDescriptor {
    StreamDescriptor::new("users")
}

pub fn catalog_json(streams: Vec<ConfiguredStream>) -> String {
    serde_json::to_string(&ConfiguredCatalog { streams }).unwrap()
}

/// `users` incremental on `id`, `orders` full refresh.
pub fn default_catalog() -> String {
    catalog_json(vec![
        ConfiguredStream::incremental(users_stream(), "id"),
        ConfiguredStream::full_refresh(orders_stream()),
    ])
}

pub fn state_json(cursor: Value) -> String {
    let mut state = State::default();
    state.advance(&users(), Some("id"), cursor).unwrap();
    serde_json::to_string(&state).unwrap()
}

pub fn record(stream: &str, id: i64) -> Record {
    let data = json!({"id": id, "name": format!("row-{id}")})
        .as_object()
        .cloned()
        .unwrap();
    Record::new(&StreamDescriptor::new(stream), data)
}

pub fn record_line(stream: &str, id: i64) -> String {
    encode(&Message::from(record(stream, id))).unwrap()
}

pub fn state_line(cursor: Value) -> String {
    let mut state = State::default();
    state.advance(&users(), Some("id"), cursor).unwrap();
    encode(&Message::from(state)).unwrap()
}

pub fn id_of(record: &Record) -> i64 {
    record.field("id").and_then(Value::as_i64).unwrap()
}

pub fn runtime_config(batch: usize) -> RuntimeConfig {
    RuntimeConfig::default().with_batch_size(NonZeroUsize::new(batch).unwrap())
}

pub async fn run<C: Registered>(
    connector: C,
    invocation: &Invocation,
    input: &[u8],
    config: RuntimeConfig,
) -> (u8, Vec<Message>) {
    let mut runtime = Runtime::new(connector, config);
    let mut out = MessageWriter::new(Vec::new());
    let code = runtime.run(invocation, input, &mut out).await;
    (code, decode_all(&out.into_inner()))
}

pub fn count(messages: &[Message], kind: MessageKind) -> usize {
    messages.iter().filter(|m| m.kind() == kind).count()
}

pub fn trace_message(messages: &[Message]) -> Option<String> {
    messages.iter().find_map(|m| match m {
        Message::Trace { trace } => Some(trace.error.message.clone()),
        _ => None,
    })
}

pub fn emitted_states(messages: &[Message]) -> Vec<State> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::State { state } => Some(state.clone()),
            _ => None,
        })
        .collect()
}

fn fake_spec() -> ConnectorSpecification {
    ConnectorSpecification {
        documentation_url: Some("https://example.com/fake".into()),
        connection_specification: json!({
            "type": "object",
            "required": ["host"],
            "properties": {"host": {"type": "string"}, "port": {"type": "integer"}}
        }),
        supports_incremental: true,
        supported_destination_sync_modes: vec![DestinationSyncMode::Append],
    }
}

/// Driver replaying a fixed event script.
#[derive(Default)]
pub struct FakeDriver {
    pub script: Vec<ReadEvent>,
    /// Returned once the script is exhausted.
    pub failure: Option<ConnectorError>,
    pub panic_with: Option<&'static str>,
    pub check_error: Option<ConnectorError>,
    pub streams: Vec<Stream>,
    pub calls: Arc<Calls>,
}

impl FakeDriver {
    pub fn new(calls: &Arc<Calls>) -> Self {
        Self {
            streams: vec![users_stream(), orders_stream()],
            calls: Arc::clone(calls),
            ..Self::default()
        }
    }

    pub fn with_script(mut self, script: Vec<ReadEvent>) -> Self {
        self.script = script;
        self
    }
}

impl Connector for FakeDriver {
    type Config = FakeConfig;
}

impl Specifier for FakeDriver {
    async fn spec(&self) -> Result<ConnectorSpecification, ConnectorError> {
        Calls::bump(&self.calls.spec);
        Ok(fake_spec())
    }
}

impl Checker for FakeDriver {
    async fn check(&self, config: &FakeConfig) -> Result<ConnectionStatus, ConnectorError> {
        Calls::bump(&self.calls.check);
        if let Some(msg) = self.panic_with {
            panic!("{msg}");
        }
        match &self.check_error {
            Some(err) => Err(err.clone()),
            None if config.host.is_empty() => Ok(ConnectionStatus::failed("host is empty")),
            None => Ok(ConnectionStatus::succeeded()),
        }
    }
}

impl Discoverer for FakeDriver {
    async fn discover(&self, _config: &FakeConfig) -> Result<Catalog, ConnectorError> {
        // Rotate so repeated calls list streams in different orders.
        let n = Calls::bump(&self.calls.discover);
        let mut streams = self.streams.clone();
        if !streams.is_empty() {
            let len = streams.len();
            streams.rotate_left(n % len);
        }
        Ok(Catalog { streams })
    }
}

impl Reader for FakeDriver {
    async fn read(
        &self,
        _config: &FakeConfig,
        _catalog: &ConfiguredCatalog,
        _state: &State,
        emitter: ReadEmitter,
    ) -> Result<(), ConnectorError> {
        Calls::bump(&self.calls.read);
        for event in self.script.clone() {
            emitter.emit(event).await?;
        }
        if let Some(msg) = self.panic_with {
            panic!("{msg}");
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Adapter recording every flushed batch.
#[derive(Default)]
pub struct FakeAdapter {
    pub failing_streams: Vec<String>,
    pub calls: Arc<Calls>,
    pub batches: Arc<Mutex<Vec<(String, Vec<Record>)>>>,
}

impl FakeAdapter {
    pub fn new(calls: &Arc<Calls>) -> Self {
        Self {
            calls: Arc::clone(calls),
            ..Self::default()
        }
    }

    pub fn failing(mut self, stream: &str) -> Self {
        self.failing_streams.push(stream.to_string());
        self
    }

    /// Handle onto the flushed batches that outlives the adapter.
    pub fn batches(&self) -> Arc<Mutex<Vec<(String, Vec<Record>)>>> {
        Arc::clone(&self.batches)
    }
}

impl Connector for FakeAdapter {
    type Config = FakeConfig;
}

impl Specifier for FakeAdapter {
    async fn spec(&self) -> Result<ConnectorSpecification, ConnectorError> {
        Calls::bump(&self.calls.spec);
        Ok(fake_spec())
    }
}

impl Checker for FakeAdapter {
    async fn check(&self, _config: &FakeConfig) -> Result<ConnectionStatus, ConnectorError> {
        Calls::bump(&self.calls.check);
        Ok(ConnectionStatus::succeeded())
    }
}

impl Discoverer for FakeAdapter {
    async fn discover(&self, _config: &FakeConfig) -> Result<Catalog, ConnectorError> {
        Calls::bump(&self.calls.discover);
        Ok(Catalog::default())
    }
}

pub struct FakeSink {
    failing_streams: Vec<String>,
    calls: Arc<Calls>,
    batches: Arc<Mutex<Vec<(String, Vec<Record>)>>>,
}

impl Writer for FakeAdapter {
    type Sink = FakeSink;

    async fn open(
        &self,
        _config: &FakeConfig,
        _catalog: &ConfiguredCatalog,
    ) -> Result<FakeSink, ConnectorError> {
        Calls::bump(&self.calls.open);
        Ok(FakeSink {
            failing_streams: self.failing_streams.clone(),
            calls: Arc::clone(&self.calls),
            batches: Arc::clone(&self.batches),
        })
    }
}

impl WriteSink for FakeSink {
    async fn flush(
        &mut self,
        stream: &ConfiguredStream,
        records: Vec<Record>,
    ) -> Result<BatchAck, ConnectorError> {
        Calls::bump(&self.calls.flush);
        let name = stream.stream.name.clone();
        if self.failing_streams.contains(&name) {
            return Err(ConnectorError::write(
                "REJECTED",
                format!("destination refused {} record(s)", records.len()),
            ));
        }
        let records_written = records.len() as u64;
        self.batches.lock().unwrap().push((name, records));
        Ok(BatchAck { records_written })
    }

    async fn close(&mut self) -> Result<(), ConnectorError> {
        Calls::bump(&self.calls.close);
        Ok(())
    }
}
