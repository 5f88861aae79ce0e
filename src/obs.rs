//! Spans and counters around store calls and token refreshes.
//!
//! - Spans named `hl7v2_dispatch.op` carry the `op` (send/get/list/token) and `stage` (call
//!   site) fields and are always emitted through `tracing`.
//! - Enable `metrics` to increment the `hl7v2_dispatch_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.
//! - Enable `cli` to get [`init_tracing`], which installs a `tracing-subscriber` formatter.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Remote operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Message ingest (`messages:ingest`).
	Send,
	/// Single message fetch.
	Get,
	/// Message listing.
	List,
	/// Access token mint or refresh.
	Token,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Send => "send",
			OpKind::Get => "get",
			OpKind::List => "list",
			OpKind::Token => "token",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How far an operation got.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Started.
	Attempt,
	/// Returned `Ok`.
	Success,
	/// Returned `Err`.
	Failure,
}
impl OpOutcome {
	/// Metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an [`OpSpan`] and records attempt plus success/failure outcomes.
pub async fn observe<T, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_op_outcome(kind, OpOutcome::Success),
		Err(_) => record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
