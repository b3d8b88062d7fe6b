// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use mesa_core::{ChannelKey, MesaError};
use mesa_realtime::{Multiplexer, SubscribeOptions};
use mesa_test_utils::helpers::{advance_and_settle, ms, settle};
use mesa_test_utils::{CallRecorder, MockTransport};
use tokio::runtime::Builder;
use tokio::time::pause;

fn setup() -> anyhow::Result<(MockTransport<&'static str>, Multiplexer<MockTransport<&'static str>>, ChannelKey)> {
    let transport = MockTransport::new();
    let mux = Multiplexer::new(transport.clone());
    Ok((transport, mux, ChannelKey::new("orders")?))
}

#[tokio::test]
async fn test_burst_is_coalesced_into_last_event() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(100)))?;

    for event in ["E1", "E2", "E3", "E4", "E5"] {
        transport.emit(&orders, event);
        advance_and_settle(ms(20)).await;
    }
    // E5 arrived at 80ms, now at 100ms
    advance_and_settle(ms(70)).await;
    assert_eq!(recorder.count(), 0);

    advance_and_settle(ms(20)).await;
    assert_eq!(recorder.values(), vec!["E5"]);

    advance_and_settle(ms(1_000)).await;
    assert_eq!(recorder.count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delivery_happens_delay_after_last_event() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::default())?;

    transport.emit(&orders, "E1");
    advance_and_settle(ms(490)).await;
    assert_eq!(recorder.count(), 0);

    advance_and_settle(ms(20)).await;

    assert_eq!(recorder.count(), 1);
    let at = recorder.times()[0];
    assert!(at >= ms(500) && at <= ms(510), "delivered at {at:?}");
    Ok(())
}

#[tokio::test]
async fn test_separate_bursts_deliver_separately() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(50)))?;

    transport.emit(&orders, "A1");
    transport.emit(&orders, "A2");
    advance_and_settle(ms(100)).await;
    transport.emit(&orders, "B1");
    advance_and_settle(ms(100)).await;

    assert_eq!(recorder.values(), vec!["A2", "B1"]);
    Ok(())
}

#[tokio::test]
async fn test_debounced_and_immediate_share_a_channel() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let slow = CallRecorder::new();
    let fast = CallRecorder::new();
    let _slow = mux.subscribe(&orders, slow.callback(), SubscribeOptions::debounced(ms(100)))?;
    let _fast = mux.subscribe(&orders, fast.callback(), SubscribeOptions::immediate())?;

    transport.emit(&orders, "E1");
    transport.emit(&orders, "E2");
    transport.emit(&orders, "E3");
    assert_eq!(fast.values(), vec!["E1", "E2", "E3"]);
    assert_eq!(slow.count(), 0);

    advance_and_settle(ms(110)).await;

    assert_eq!(slow.values(), vec!["E3"]);
    assert_eq!(transport.subscribe_calls(&orders), 1);
    Ok(())
}

#[tokio::test]
async fn test_debounce_timers_are_per_registration() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let short = CallRecorder::new();
    let long = CallRecorder::new();
    let _short = mux.subscribe(&orders, short.callback(), SubscribeOptions::debounced(ms(50)))?;
    let _long = mux.subscribe(&orders, long.callback(), SubscribeOptions::debounced(ms(200)))?;

    transport.emit(&orders, "E1");
    advance_and_settle(ms(60)).await;
    assert_eq!(short.values(), vec!["E1"]);
    assert_eq!(long.count(), 0);

    advance_and_settle(ms(150)).await;
    assert_eq!(long.values(), vec!["E1"]);
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_discards_pending_delivery() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(100)))?;
    let _other = mux.subscribe(&orders, |_| {}, SubscribeOptions::immediate())?;

    transport.emit(&orders, "E1");
    advance_and_settle(ms(50)).await;
    sub.unsubscribe();
    advance_and_settle(ms(500)).await;

    assert_eq!(recorder.count(), 0);
    assert!(mux.is_open(&orders));
    Ok(())
}

#[tokio::test]
async fn test_dropping_handle_discards_pending_delivery() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(100)))?;

    transport.emit(&orders, "E1");
    settle().await;
    drop(sub);
    advance_and_settle(ms(500)).await;

    assert_eq!(recorder.count(), 0);
    assert_eq!(transport.unsubscribe_calls(&orders), 1);
    Ok(())
}

#[tokio::test]
async fn test_shutdown_discards_pending_deliveries() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(100)))?;

    transport.emit(&orders, "E1");
    mux.shutdown();
    advance_and_settle(ms(500)).await;

    assert_eq!(recorder.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_panicking_debounced_callback_keeps_channel_alive() -> anyhow::Result<()> {
    pause();
    let (transport, mux, orders) = setup()?;
    let recorder = CallRecorder::new();
    let _bad = mux.subscribe(
        &orders,
        |_: &'static str| panic!("render failed"),
        SubscribeOptions::debounced(ms(10)),
    )?;
    let _good = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(10)))?;

    transport.emit(&orders, "E1");
    advance_and_settle(ms(20)).await;
    transport.emit(&orders, "E2");
    advance_and_settle(ms(20)).await;

    assert_eq!(recorder.values(), vec!["E1", "E2"]);
    assert_eq!(mux.subscriber_count(&orders), 2);
    Ok(())
}

#[test]
fn test_debounced_subscribe_without_runtime_is_rejected() -> anyhow::Result<()> {
    let transport = MockTransport::<&'static str>::new();
    let mux = Multiplexer::new(transport.clone());
    let orders = ChannelKey::new("orders")?;
    let recorder = CallRecorder::new();

    let debounced = mux.subscribe(&orders, |_| {}, SubscribeOptions::default());
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::immediate())?;
    transport.emit(&orders, "E1");

    assert!(matches!(debounced, Err(MesaError::NoRuntime { .. })));
    assert_eq!(recorder.values(), vec!["E1"]);
    assert_eq!(mux.subscriber_count(&orders), 1);
    Ok(())
}

#[test]
fn test_runtime_without_timers_delivers_immediately_and_finishes_fan_out() -> anyhow::Result<()> {
    let runtime = Builder::new_current_thread().build()?;
    let transport = MockTransport::<&'static str>::new();
    let orders = ChannelKey::new("orders")?;
    let debounced = CallRecorder::new();
    let immediate = CallRecorder::new();

    runtime.block_on(async {
        let mux = Multiplexer::new(transport.clone());
        let _debounced = mux.subscribe(&orders, debounced.callback(), SubscribeOptions::debounced(ms(10)))?;
        let _immediate = mux.subscribe(&orders, immediate.callback(), SubscribeOptions::immediate())?;
        transport.emit(&orders, "E1");
        anyhow::Ok(())
    })?;

    assert_eq!(immediate.values(), vec!["E1"]);
    assert_eq!(debounced.values(), vec!["E1"]);
    Ok(())
}

#[test]
fn test_debounce_follows_current_runtime_after_construction_runtime_is_gone() -> anyhow::Result<()> {
    let first = Builder::new_current_thread().enable_time().build()?;
    let transport = MockTransport::<&'static str>::new();
    let mux = first.block_on(async { Multiplexer::new(transport.clone()) });
    drop(first);

    let second = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()?;
    let orders = ChannelKey::new("orders")?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(10)))?;

    second.block_on(async {
        transport.emit(&orders, "E1");
        tokio::time::sleep(ms(100)).await;
    });

    assert_eq!(recorder.values(), vec!["E1"]);
    Ok(())
}

#[test]
fn test_events_from_foreign_thread_use_configured_runtime() -> anyhow::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()?;
    let transport = MockTransport::<&'static str>::new();
    let mux = Multiplexer::new(transport.clone());
    mux.set_runtime(runtime.handle().clone());
    let orders = ChannelKey::new("orders")?;
    let recorder = CallRecorder::new();
    let _sub = mux.subscribe(&orders, recorder.callback(), SubscribeOptions::debounced(ms(10)))?;

    let emitter = transport.clone();
    let key = orders.clone();
    std::thread::spawn(move || {
        emitter.emit(&key, "E1");
        emitter.emit(&key, "E2");
    })
    .join()
    .map_err(|_| anyhow::anyhow!("emitter thread panicked"))?;
    assert_eq!(recorder.count(), 0);

    runtime.block_on(async { tokio::time::sleep(ms(50)).await });

    assert_eq!(recorder.values(), vec!["E2"]);
    Ok(())
}
