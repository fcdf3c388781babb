use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rvweb_relay::{DispatchOutcome, HostSession, LaunchMode, NullTerminal, SimGuest};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Counts events at WARN or above.
#[derive(Clone, Default)]
struct WarningCounter(Arc<AtomicUsize>);

impl WarningCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn with_counted_warnings<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let counter = WarningCounter::default();
    let subscriber = Registry::default().with(counter.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, counter.count())
}

#[test]
fn missing_target_emits_one_diagnostic_and_never_runs_guest() {
    let (session, warnings) = with_counted_warnings(|| {
        let mut session = HostSession::new(SimGuest::new(), NullTerminal, LaunchMode::Target(None));
        assert_eq!(session.on_runtime_initialized(), DispatchOutcome::MissingTarget);
        session
    });

    assert_eq!(warnings, 1);
    assert!(session.guest().launches().is_empty());
    assert!(!session.dispatcher().has_launched());
}

#[test]
fn missing_target_keeps_the_session_usable() {
    let (session, warnings) = with_counted_warnings(|| {
        let mut session = HostSession::new(SimGuest::new(), NullTerminal, LaunchMode::Target(None));
        session.on_runtime_initialized();

        // Input still flows even though nothing was launched.
        session.on_key("x").unwrap();

        session.dispatcher_mut().set_target("hello.elf").unwrap();
        assert!(matches!(
            session.on_runtime_initialized(),
            DispatchOutcome::Launched(_)
        ));
        session
    });

    assert_eq!(warnings, 1);
    assert_eq!(session.guest().launches().len(), 1);
}

#[test]
fn successful_launch_emits_no_warnings() {
    let ((), warnings) = with_counted_warnings(|| {
        let mut session = HostSession::new(
            SimGuest::new(),
            NullTerminal,
            LaunchMode::Target(Some("hello.elf".into())),
        );
        session.on_runtime_initialized();
        session.on_runtime_initialized();
    });

    assert_eq!(warnings, 0);
}
