use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use d3d12vk::{D3D12Fence, FenceWorker, HostEvent};

mod framework;

/// §8 round-trip: `CreateFence(v) -> SetEventOnCompletion(v) -> Signal(v)` fires the event
/// exactly once.
#[test]
pub fn signal_then_wait_fires_event_exactly_once() -> Result<()> {
    let context = framework::make_context()?;
    let fence = D3D12Fence::new(context.device.clone(), 0)?;
    let worker = FenceWorker::new(context.device.clone());
    let event = Arc::new(HostEvent::new());

    fence.set_event_on_completion(1, event.clone(), &worker);
    assert!(!event.is_set(), "event must not fire before the fence reaches the requested value");

    fence.signal(1)?;
    assert!(event.wait_timeout(Duration::from_secs(5)), "event should fire once the fence is signaled");
    assert_eq!(fence.get_completed_value(), 1);

    Ok(())
}

/// §8 boundary: `SetEventOnCompletion(value, event)` with `value` less than the current fence
/// value fires immediately rather than queuing a wait.
#[test]
pub fn set_event_for_already_reached_value_fires_immediately() -> Result<()> {
    let context = framework::make_context()?;
    let fence = D3D12Fence::new(context.device.clone(), 0)?;
    let worker = FenceWorker::new(context.device.clone());

    fence.signal(5)?;
    let event = Arc::new(HostEvent::new());
    fence.set_event_on_completion(3, event.clone(), &worker);
    assert!(event.is_set(), "a value already reached must fire the event inline");

    Ok(())
}

/// §8 scenario 4: two waiters registered for different values on the same fence both resolve,
/// each exactly once, after a single signal past both thresholds.
#[test]
pub fn multiple_waiters_on_same_fence_all_resolve() -> Result<()> {
    let context = framework::make_context()?;
    let fence = D3D12Fence::new(context.device.clone(), 0)?;
    let worker = FenceWorker::new(context.device.clone());

    let low = Arc::new(HostEvent::new());
    let high = Arc::new(HostEvent::new());
    fence.set_event_on_completion(2, low.clone(), &worker);
    fence.set_event_on_completion(7, high.clone(), &worker);

    fence.signal(2)?;
    assert!(low.wait_timeout(Duration::from_secs(5)));
    assert!(!high.is_set(), "a waiter on a higher value must not fire early");

    fence.signal(7)?;
    assert!(high.wait_timeout(Duration::from_secs(5)));

    Ok(())
}
