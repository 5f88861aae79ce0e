// crates.io
use tracing::instrument::Instrumented;
// self
use crate::{_prelude::*, obs::OpKind};

/// A span builder used by store and token operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("hl7v2_dispatch.op", op = kind.as_str(), stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		// crates.io
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

/// Installs the process-wide fmt subscriber, filtered by `RUST_LOG`.
///
/// Falls back to `info,hl7v2_dispatch=debug` when `RUST_LOG` is unset or invalid. Calling it
/// twice is harmless; the second install is ignored.
#[cfg(feature = "cli")]
pub fn init_tracing() {
	// crates.io
	use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("info,hl7v2_dispatch=debug"));
	let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
	let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(OpKind::List, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
