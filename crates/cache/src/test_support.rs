//! Scripted agent for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use scry_protocol::{Command, ParameterType, RawParameter, RawValue, RemoteEndpoint, Response, StringEntry};
use tokio::sync::Notify;

type Handler = Box<dyn Fn(&Command) -> scry_protocol::Result<Response> + Send + Sync>;

/// Answers commands through a closure and records every command it sees.
///
/// When gated, each `send` parks until [`MockEndpoint::release`] is called.
pub(crate) struct MockEndpoint {
	handler: Handler,
	sent: Mutex<Vec<Command>>,
	gate: Option<Arc<Notify>>,
	entered: Notify,
}

impl MockEndpoint {
	pub(crate) fn new(handler: impl Fn(&Command) -> scry_protocol::Result<Response> + Send + Sync + 'static) -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		Self {
			handler: Box::new(handler),
			sent: Mutex::new(Vec::new()),
			gate: None,
			entered: Notify::new(),
		}
	}

	pub(crate) fn gated(mut self) -> Self {
		self.gate = Some(Arc::new(Notify::new()));
		self
	}

	/// Lets one parked `send` (or the next one) through.
	pub(crate) fn release(&self) {
		if let Some(gate) = &self.gate {
			gate.notify_one();
		}
	}

	/// Resolves once a `send` has been entered.
	pub(crate) async fn entered(&self) {
		self.entered.notified().await;
	}

	pub(crate) fn sent(&self) -> Vec<Command> {
		self.sent.lock().clone()
	}

	pub(crate) fn count(&self, name: &str) -> usize {
		self.sent.lock().iter().filter(|c| c.name() == name).count()
	}
}

#[async_trait]
impl RemoteEndpoint for MockEndpoint {
	async fn send(&self, command: Command) -> scry_protocol::Result<Response> {
		self.sent.lock().push(command.clone());
		self.entered.notify_one();
		if let Some(gate) = &self.gate {
			gate.notified().await;
		}
		(self.handler)(&command)
	}
}

pub(crate) fn strings(entries: &[(i32, &str)]) -> Vec<StringEntry> {
	entries.iter().map(|&(id, text)| StringEntry::new(id, text)).collect()
}

pub(crate) fn raw_param(kind: ParameterType, name: i32, value: RawValue, index: i32) -> RawParameter {
	RawParameter {
		kind,
		name,
		value,
		index,
		reference: None,
		elements: Vec::new(),
	}
}
