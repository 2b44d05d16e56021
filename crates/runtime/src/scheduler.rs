//! Recurring trigger loop with single-flight runs.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Result;
use crate::trigger::TriggerSpec;

type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Clears the in-flight flag when a run ends, including by panic.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Fires jobs on a [`TriggerSpec`], never more than one at a time.
///
/// A trigger that fires while a run is in flight is dropped, not queued.
/// Each run is its own task, so a panicking job leaves the loop alive.
#[derive(Debug, Default)]
pub struct Scheduler {
	in_flight: Arc<AtomicBool>,
	trigger_loop: Option<JoinHandle<()>>,
}

impl Scheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Arms `job` on `spec`, replacing any previous trigger.
	pub fn schedule_recurring<F, Fut>(&mut self, spec: TriggerSpec, job: F) -> Result<()>
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		spec.validate()?;
		self.cancel();

		let job: Job = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(job()) });
		info!(target = "dw.runtime", trigger = %spec, "trigger armed");
		self.trigger_loop = Some(tokio::spawn(trigger_loop(spec, self.in_flight.clone(), job)));
		Ok(())
	}

	/// Runs `job` once, now. Returns `None` when a run is already in flight.
	pub fn schedule_once<F, Fut>(&self, job: F) -> Option<JoinHandle<()>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let guard = acquire(&self.in_flight)?;
		let run = job();
		Some(tokio::spawn(async move {
			let _guard = guard;
			run.await;
		}))
	}

	/// Stops the trigger. A run already in flight finishes on its own.
	pub fn cancel(&mut self) {
		if let Some(handle) = self.trigger_loop.take() {
			handle.abort();
			info!(target = "dw.runtime", "trigger cancelled");
		}
	}

	pub fn is_armed(&self) -> bool {
		self.trigger_loop.as_ref().is_some_and(|h| !h.is_finished())
	}

	pub fn is_running(&self) -> bool {
		self.in_flight.load(Ordering::Acquire)
	}
}

impl Drop for Scheduler {
	fn drop(&mut self) {
		self.cancel();
	}
}

async fn trigger_loop(spec: TriggerSpec, in_flight: Arc<AtomicBool>, job: Job) {
	if spec.fires_immediately() {
		fire(&in_flight, &job);
	}
	loop {
		let delay = spec.next_delay(Local::now().naive_local());
		debug!(target = "dw.runtime", secs = delay.as_secs(), "next run scheduled");
		tokio::time::sleep(delay).await;
		fire(&in_flight, &job);
	}
}

fn acquire(in_flight: &Arc<AtomicBool>) -> Option<RunGuard> {
	match in_flight.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
		Ok(_) => Some(RunGuard(in_flight.clone())),
		Err(_) => {
			warn!(target = "dw.runtime", "previous run still in flight; trigger suppressed");
			None
		}
	}
}

fn fire(in_flight: &Arc<AtomicBool>, job: &Job) {
	let Some(guard) = acquire(in_flight) else {
		return;
	};
	let run = job();
	tokio::spawn(async move {
		let _guard = guard;
		run.await;
	});
}
