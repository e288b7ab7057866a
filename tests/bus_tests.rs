use paddock::bus::{BusEvent, EventBus, HandlerResult};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Signal {
    Start(u32),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SignalKind {
    Start,
    Stop,
}

impl BusEvent for Signal {
    type Kind = SignalKind;

    fn kind(&self) -> SignalKind {
        match self {
            Signal::Start(_) => SignalKind::Start,
            Signal::Stop => SignalKind::Stop,
        }
    }
}

type Log = Rc<RefCell<Vec<String>>>;

fn tagger(log: &Log, tag: &'static str) -> impl FnMut(&Signal) -> HandlerResult + 'static {
    let log = log.clone();
    move |event| {
        log.borrow_mut().push(format!("{tag}:{event:?}"));
        Ok(())
    }
}

#[test]
fn test_handlers_run_in_registration_order() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    bus.on(SignalKind::Start, tagger(&log, "a"));
    bus.on(SignalKind::Start, tagger(&log, "b"));
    bus.on(SignalKind::Start, tagger(&log, "c"));

    bus.emit(&Signal::Start(1));
    assert_eq!(*log.borrow(), vec!["a:Start(1)", "b:Start(1)", "c:Start(1)"]);
}

#[test]
fn test_emit_only_reaches_matching_kind() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    bus.on(SignalKind::Stop, tagger(&log, "stop"));

    bus.emit(&Signal::Start(7));
    assert!(log.borrow().is_empty());
    bus.emit(&Signal::Stop);
    assert_eq!(*log.borrow(), vec!["stop:Stop"]);
}

#[test]
fn test_emit_without_handlers_is_a_no_op() {
    let bus = EventBus::<Signal>::new();
    bus.emit(&Signal::Stop);
    assert_eq!(bus.handler_count(SignalKind::Stop), 0);
}

#[test]
fn test_off_removes_only_that_subscription() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    let first = bus.on(SignalKind::Start, tagger(&log, "a"));
    bus.on(SignalKind::Start, tagger(&log, "b"));

    assert!(bus.off(SignalKind::Start, first));
    bus.emit(&Signal::Start(2));
    assert_eq!(*log.borrow(), vec!["b:Start(2)"]);
}

#[test]
fn test_once_fires_once_and_keeps_its_position() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    bus.on(SignalKind::Start, tagger(&log, "a"));
    let mut once = tagger(&log, "once");
    bus.once(SignalKind::Start, move |event| once(event));
    bus.on(SignalKind::Start, tagger(&log, "c"));

    bus.emit(&Signal::Start(1));
    bus.emit(&Signal::Start(2));

    assert_eq!(
        *log.borrow(),
        vec![
            "a:Start(1)",
            "once:Start(1)",
            "c:Start(1)",
            "a:Start(2)",
            "c:Start(2)",
        ]
    );
    assert_eq!(bus.handler_count(SignalKind::Start), 2);
}

#[test]
fn test_once_can_be_cancelled_before_firing() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    let mut once = tagger(&log, "once");
    let id = bus.once(SignalKind::Stop, move |event| once(event));

    assert!(bus.off(SignalKind::Stop, id));
    bus.emit(&Signal::Stop);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_error_and_panic_are_isolated() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    bus.on(SignalKind::Start, |_| Err("handler failed".into()));
    bus.on(SignalKind::Start, |_| panic!("handler panicked"));
    bus.on(SignalKind::Start, tagger(&log, "survivor"));

    bus.emit(&Signal::Start(3));
    bus.emit(&Signal::Start(4));
    assert_eq!(*log.borrow(), vec!["survivor:Start(3)", "survivor:Start(4)"]);
}

#[test]
fn test_handler_can_unsubscribe_another_mid_dispatch() {
    let bus = EventBus::<Signal>::new();
    let log: Log = Rc::default();
    let victim = Rc::new(RefCell::new(None));

    let handle = bus.clone();
    let target = victim.clone();
    bus.on(SignalKind::Start, move |_| {
        if let Some(id) = target.borrow_mut().take() {
            handle.off(SignalKind::Start, id);
        }
        Ok(())
    });
    *victim.borrow_mut() = Some(bus.on(SignalKind::Start, tagger(&log, "victim")));

    // the current dispatch already snapshotted its handlers
    bus.emit(&Signal::Start(1));
    bus.emit(&Signal::Start(2));
    assert_eq!(*log.borrow(), vec!["victim:Start(1)"]);
}

#[test]
fn test_reentrant_emit_skips_running_handler() {
    let bus = EventBus::<Signal>::new();
    let count = Rc::new(RefCell::new(0));

    let handle = bus.clone();
    let sink = count.clone();
    bus.on(SignalKind::Start, move |event| {
        *sink.borrow_mut() += 1;
        if let Signal::Start(0) = event {
            handle.emit(&Signal::Start(1));
        }
        Ok(())
    });

    bus.emit(&Signal::Start(0));
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_clones_share_registry() {
    let bus = EventBus::<Signal>::new();
    let other = bus.clone();
    let log: Log = Rc::default();
    other.on(SignalKind::Stop, tagger(&log, "x"));

    bus.emit(&Signal::Stop);
    assert_eq!(log.borrow().len(), 1);

    bus.clear();
    assert_eq!(other.handler_count(SignalKind::Stop), 0);
}
