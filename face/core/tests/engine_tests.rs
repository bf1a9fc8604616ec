//! End-to-end engine tests
//!
//! Every test runs on a paused clock so timer fires and fetch latencies are
//! exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

use face_core::{
    AssetRef, Clock, Collaborators, DataEvent, Engine, EngineError, FaceConfig, HardwareProperties,
    IconDecoder, IconImage, InterruptionFilter, RedrawSignal, SyncError, SyncOutcome,
    Temperatures, TimerPhase,
};

/// Wall clock that follows tokio's paused clock, starting on a second boundary
struct FollowClock {
    start: Instant,
}

impl Clock for FollowClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.start.elapsed().as_millis()).unwrap();
        Utc.timestamp_millis_opt(1_470_000_000_000 + elapsed).unwrap()
    }
}

/// Serves each asset after a fixed latency; unknown assets fail
#[derive(Default)]
struct SlowTransport {
    assets: HashMap<String, (Duration, Vec<u8>)>,
}

impl SlowTransport {
    fn with(mut self, name: &str, latency_ms: u64, marker: u8) -> Self {
        self.assets.insert(
            name.to_string(),
            (Duration::from_millis(latency_ms), vec![marker]),
        );
        self
    }
}

#[async_trait]
impl face_core::AssetResolver for SlowTransport {
    async fn resolve(&self, asset: &AssetRef) -> Result<Vec<u8>, SyncError> {
        match self.assets.get(asset.as_str()) {
            Some((latency, bytes)) => {
                sleep(*latency).await;
                Ok(bytes.clone())
            }
            None => Err(SyncError::transport(asset, "no such asset")),
        }
    }
}

/// Produces a 1x1 icon whose red channel is the first byte
struct MarkerDecoder;

impl IconDecoder for MarkerDecoder {
    fn decode_and_scale(&self, bytes: &[u8], _size: u32) -> Result<IconImage, SyncError> {
        IconImage::from_rgba(1, 1, vec![bytes[0], 0, 0, 255])
    }
}

struct Harness {
    engine: Engine,
    redraw: Arc<RedrawSignal>,
}

fn start(config: FaceConfig, transport: SlowTransport) -> Harness {
    let redraw = Arc::new(RedrawSignal::new());
    let engine = Engine::start(
        &config,
        Collaborators {
            redraw: redraw.clone(),
            resolver: Arc::new(transport),
            decoder: Arc::new(MarkerDecoder),
            clock: Arc::new(FollowClock {
                start: Instant::now(),
            }),
        },
    );
    Harness { engine, redraw }
}

fn weather(high: &str, low: &str) -> DataEvent {
    DataEvent::changed("weather-data")
        .with_text("high", high)
        .with_text("low", low)
}

fn icon_marker(engine: &Engine) -> Option<u8> {
    engine.snapshot().icon.as_ref().map(|icon| icon.rgba()[0])
}

#[tokio::test(start_paused = true)]
async fn test_interactive_visible_ticks_every_second() {
    let h = start(FaceConfig::default(), SlowTransport::default());

    assert_ok!(h.engine.on_visibility_changed(true));
    sleep(Duration::from_millis(2_500)).await;

    // Immediate fire plus the 1s and 2s boundaries
    assert_eq!(h.redraw.requested(), 3);
    assert_eq!(h.engine.timer_status().phase, TimerPhase::Ticking);
    assert_eq!(h.engine.timer_status().fires, 3);
}

#[tokio::test(start_paused = true)]
async fn test_ambient_forces_idle() {
    let h = start(FaceConfig::default(), SlowTransport::default());

    h.engine.on_visibility_changed(true).unwrap();
    sleep(Duration::from_millis(1_500)).await;
    h.engine.on_ambient_mode_changed(true).unwrap();
    sleep(Duration::from_millis(100)).await;
    let after_ambient = h.redraw.requested();

    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.engine.timer_status().phase, TimerPhase::Idle);
    assert_eq!(h.redraw.requested(), after_ambient, "no fires while ambient");
    assert!(h.engine.snapshot().flags.mode.is_ambient());
}

#[tokio::test(start_paused = true)]
async fn test_muted_slows_ticks_and_unmute_restores() {
    let h = start(FaceConfig::default(), SlowTransport::default());

    h.engine
        .on_interruption_filter_changed(InterruptionFilter::None)
        .unwrap();
    h.engine.on_visibility_changed(true).unwrap();
    sleep(Duration::from_secs(30)).await;

    let status = h.engine.timer_status();
    assert_eq!(status.phase, TimerPhase::Ticking);
    assert_eq!(status.period, Duration::from_secs(60));
    assert_eq!(status.fires, 1);
    assert_eq!(h.engine.snapshot().style.text_alpha, 100);

    h.engine
        .on_interruption_filter_changed(InterruptionFilter::All)
        .unwrap();
    sleep(Duration::from_millis(2_500)).await;

    let status = h.engine.timer_status();
    assert_eq!(status.period, Duration::from_secs(1));
    assert!(status.fires >= 3, "fired {} times", status.fires);
}

#[tokio::test(start_paused = true)]
async fn test_hardware_properties_reach_style() {
    let h = start(FaceConfig::default(), SlowTransport::default());
    h.engine
        .on_hardware_properties(HardwareProperties {
            low_bit_ambient: true,
            burn_in_protection: false,
        })
        .unwrap();
    h.engine.on_ambient_mode_changed(true).unwrap();
    sleep(Duration::from_millis(10)).await;

    let snap = h.engine.snapshot();
    assert!(!snap.style.anti_alias.hour);
    assert_eq!(snap.style.icon_alpha, 0);
}

#[tokio::test(start_paused = true)]
async fn test_weather_event_updates_both_strings() {
    let h = start(FaceConfig::default(), SlowTransport::default());

    let outcome = h.engine.on_data_changed(weather("72°", "54°")).unwrap();
    assert!(matches!(outcome, SyncOutcome::Applied { fetch: None }));
    assert_eq!(
        h.engine.snapshot().temperatures,
        Temperatures::new("72°", "54°")
    );

    let dropped = assert_err!(h
        .engine
        .on_data_changed(DataEvent::changed("weather-data").with_text("high", "80°")));
    assert!(matches!(
        dropped,
        EngineError::Sync(SyncError::MalformedEvent { .. })
    ));
    assert_eq!(h.engine.snapshot().temperatures.high, "72°");
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_keeps_icon_and_later_events_work() {
    let transport = SlowTransport::default().with("sun", 100, 1).with("rain", 100, 2);
    let h = start(FaceConfig::default(), transport);

    h.engine
        .on_data_changed(weather("20°", "10°").with_asset(AssetRef::new("sun")))
        .unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(icon_marker(&h.engine), Some(1));

    h.engine
        .on_data_changed(weather("21°", "11°").with_asset(AssetRef::new("missing")))
        .unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(icon_marker(&h.engine), Some(1));
    assert_eq!(h.engine.snapshot().temperatures.high, "21°");

    h.engine
        .on_data_changed(weather("22°", "12°").with_asset(AssetRef::new("rain")))
        .unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(icon_marker(&h.engine), Some(2));
    assert_eq!(h.engine.fetches_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_transport_times_out() {
    let transport = SlowTransport::default().with("slow", 5_000, 9);
    let h = start(FaceConfig::default(), transport);

    let outcome = h
        .engine
        .on_data_changed(weather("1", "2").with_asset(AssetRef::new("slow")))
        .unwrap();
    let SyncOutcome::Applied { fetch: Some(fetch) } = outcome else {
        panic!("expected a fetch");
    };

    let result = fetch.join().await;
    assert!(matches!(result, Err(SyncError::TransportUnavailable { .. })));
    assert_eq!(icon_marker(&h.engine), None);
}

fn slow_fetch_config(discard_stale_icons: bool) -> FaceConfig {
    let mut config = FaceConfig::default();
    config.sync.asset_timeout = Duration::from_secs(5);
    config.sync.discard_stale_icons = discard_stale_icons;
    config
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_fetches_last_completion_wins() {
    let transport = SlowTransport::default().with("a", 2_000, 0xA).with("b", 500, 0xB);
    let h = start(slow_fetch_config(false), transport);

    h.engine
        .on_data_changed(weather("10°", "5°").with_asset(AssetRef::new("a")))
        .unwrap();
    sleep(Duration::from_millis(500)).await;
    h.engine
        .on_data_changed(weather("11°", "6°").with_asset(AssetRef::new("b")))
        .unwrap();
    assert_eq!(h.engine.fetches_in_flight(), 2);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(icon_marker(&h.engine), Some(0xB), "B completed at 1s");
    assert_eq!(h.engine.snapshot().temperatures.high, "11°");

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(icon_marker(&h.engine), Some(0xA), "A completed later and wins");
    assert_eq!(h.engine.fetches_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_fetches_discard_stale() {
    let transport = SlowTransport::default().with("a", 2_000, 0xA).with("b", 500, 0xB);
    let h = start(slow_fetch_config(true), transport);

    h.engine
        .on_data_changed(weather("10°", "5°").with_asset(AssetRef::new("a")))
        .unwrap();
    sleep(Duration::from_millis(500)).await;
    h.engine
        .on_data_changed(weather("11°", "6°").with_asset(AssetRef::new("b")))
        .unwrap();

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(icon_marker(&h.engine), Some(0xB));
    assert_eq!(h.engine.fetches_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_ticking() {
    let mut h = start(FaceConfig::default(), SlowTransport::default());
    h.engine.on_visibility_changed(true).unwrap();
    sleep(Duration::from_millis(1_500)).await;

    h.engine.shutdown().await;
    let frozen = h.redraw.requested();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(h.redraw.requested(), frozen);
    assert_err!(h.engine.on_visibility_changed(false));
}
