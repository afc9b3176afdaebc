use rs2_bridge::reactive::{empty, error, Observable, PublishSubject, TestObserver};
use rs2_bridge::StreamError;

#[test]
fn test_subject_broadcasts_to_current_observers() {
    let subject = PublishSubject::new();
    let early = TestObserver::new();
    subject.subscribe(early.observer());

    subject.on_next(1);

    let late = TestObserver::new();
    subject.subscribe(late.observer());
    subject.on_next(2);
    subject.on_complete();

    assert_eq!(early.values(), vec![1, 2]);
    assert_eq!(late.values(), vec![2]);
    assert_eq!(early.completions(), 1);
    assert_eq!(late.completions(), 1);
}

#[test]
fn test_subject_replays_terminal_to_late_subscribers() {
    let subject = PublishSubject::<i32>::new();
    subject.on_error(StreamError::Custom("closed".to_string()));

    let observer = TestObserver::new();
    subject.subscribe(observer.observer());

    assert_eq!(observer.errors(), vec![StreamError::Custom("closed".to_string())]);
    assert!(!subject.has_observers());
}

#[test]
fn test_disposed_observer_is_dropped() {
    let subject = PublishSubject::new();
    let kept = TestObserver::new();
    let leaving = TestObserver::new();
    subject.subscribe(kept.observer());
    subject.subscribe(leaving.observer());
    assert_eq!(subject.observer_count(), 2);

    subject.on_next("a");
    leaving.dispose();
    assert!(leaving.is_disposed());
    subject.on_next("b");

    assert_eq!(subject.observer_count(), 1);
    assert_eq!(kept.values(), vec!["a", "b"]);
    assert_eq!(leaving.values(), vec!["a"]);
    assert_eq!(leaving.terminal_count(), 0);
}

#[test]
fn test_cold_constructors() {
    let observer = TestObserver::<u8>::new();
    empty().subscribe(observer.observer());
    assert_eq!(observer.completions(), 1);
    assert_eq!(observer.subscriptions(), 1);

    let observer = TestObserver::<u8>::new();
    error(StreamError::Timeout).subscribe(observer.observer());
    assert_eq!(observer.errors(), vec![StreamError::Timeout]);
    assert!(observer.values().is_empty());
}

#[test]
fn test_late_error_never_overrides_completion() {
    for _ in 0..200 {
        let subject = PublishSubject::<i32>::new();
        subject.on_complete();

        let erroring = subject.clone();
        let failing = std::thread::spawn(move || erroring.on_error(StreamError::Custom("late".to_string())));
        let observer = TestObserver::new();
        subject.subscribe(observer.observer());
        failing.join().unwrap();

        assert_eq!(observer.completions(), 1);
        assert!(observer.errors().is_empty());
    }

    let observer = TestObserver::<i32>::new();
    let subject = PublishSubject::new();
    subject.on_complete();
    subject.on_error(StreamError::Timeout);
    subject.subscribe(observer.observer());
    assert_eq!(observer.completions(), 1);
}
