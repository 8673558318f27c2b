use regionkit::prelude::*;
use regionkit::{ManualClock, ANONYMOUS_IDENTIFIER};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower::{service_fn, Layer, ServiceExt};

fn limiter() -> (RateLimiter, ManualClock) {
    let clock = ManualClock::new(0);
    (RateLimiter::with_clock(Arc::new(clock.clone())), clock)
}

#[test]
fn every_table_action_allows_exactly_its_budget() {
    for action in Action::ALL {
        let (limiter, _) = limiter();
        let max = action.config().max_requests();
        for i in 1..=max {
            let d = limiter.check_action(Some("u1"), action);
            assert!(d.allowed, "{action} request {i}");
            assert_eq!(d.remaining, max - i);
        }
        let denied = limiter.check_action(Some("u1"), action);
        assert!(!denied.allowed, "{action} should be denied");
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_in, action.config().window());
    }
}

#[test]
fn login_cooldown_message() {
    let (limiter, clock) = limiter();
    for _ in 0..5 {
        assert!(limiter.check("u1", "login", Action::Login.config()).allowed);
    }
    clock.advance(Duration::from_secs(60));

    let d = limiter.check("u1", "login", Action::Login.config());
    assert!(!d.allowed);
    assert_eq!(d.remaining, 0);
    assert_eq!(d.reset_in, Duration::from_millis(240_000));
    assert_eq!(d.retry_after_secs(), 240);

    clock.advance(Duration::from_secs(240));
    let d = limiter.check("u1", "login", Action::Login.config());
    assert!(d.allowed);
    assert_eq!(d.remaining, 4);
}

#[test]
fn concurrent_checks_never_exceed_budget() {
    let (limiter, _) = limiter();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            std::thread::spawn(move || {
                (0..10).filter(|_| limiter.check_action(Some("u1"), Action::AddToCart).allowed).count()
            })
        })
        .collect();

    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(allowed, 30);
    assert_eq!(limiter.window("u1", "addToCart").unwrap().count, 30);
}

#[tokio::test(start_paused = true)]
async fn sweeper_reclaims_memory_without_changing_decisions() {
    let (limiter, clock) = limiter();
    let sweeper = limiter.spawn_sweeper(regionkit::DEFAULT_SWEEP_INTERVAL);

    for user in ["a", "b", "c"] {
        limiter.check_action(Some(user), Action::Search);
    }
    limiter.check_action(None, Action::Register);
    assert_eq!(limiter.len(), 4);

    clock.advance(Duration::from_secs(90));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(limiter.len(), 1);
    assert!(limiter.window(ANONYMOUS_IDENTIFIER, "register").is_some());

    let d = limiter.check_action(Some("a"), Action::Search);
    assert_eq!(d.remaining, 19);

    sweeper.stop().await;
}

#[tokio::test]
async fn layer_gates_checkout() {
    let (limiter, _) = limiter();
    let checkout = service_fn(|order_id: u32| async move { Ok::<_, Infallible>(order_id * 2) });
    let svc = RateLimitLayer::new(limiter, Action::Checkout, |_: &u32| Some("buyer-7".to_string()))
        .layer(checkout);

    for id in 0..10 {
        assert_eq!(svc.clone().oneshot(id).await.unwrap(), id * 2);
    }
    let err = svc.oneshot(99).await.unwrap_err();
    assert!(matches!(err, GuardError::RateLimited { ref action, .. } if action == "checkout"));
}
