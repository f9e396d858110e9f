use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::callback::FailureKind;
use crate::config::OverlayConfig;
use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::overlay::Overlay;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;
use crate::tests::Recorder;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_failures_confined_to_partitions() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(100, seeded_config(50)).await?;
    let mut rng = StdRng::seed_from_u64(50);

    let harness = overlay.resilience();
    assert_eq!(harness.mark_random_unavailable(0.5, &mut rng)?, 50);
    let partitions = harness.detect_partitions()?;
    assert_eq!(partitions.labels.len(), 50);

    let live: Vec<usize> = (0..overlay.len())
        .filter(|i| overlay.node(*i).map(|n| n.is_available()).unwrap_or(false))
        .collect();
    for i in 0..1000 {
        let from = live[rng.gen_range(0..live.len())];
        let to = live[rng.gen_range(0..live.len())];
        overlay.send(from, to, format!("{i}"))?;
    }
    overlay.settle().await?;

    let deliveries = recorder.deliveries();
    let failures = recorder.failures();
    assert_eq!(deliveries.len() + failures.len(), 1000);
    for d in deliveries.iter() {
        assert!(partitions.same_component(&d.origin, &d.destination));
    }
    for f in failures.iter() {
        assert_eq!(f.kind, FailureKind::NoRoute);
        assert!(!partitions.same_component(&f.origin, &f.destination));
    }

    let no_route = overlay.measure().get_count(MeasureCounter::NoRoute);
    assert_eq!(no_route, failures.len() as u64);
    if partitions.component_count() == 1 {
        assert_eq!(no_route, 0);
    }
    Ok(())
}

/// Two nodes per locality, joined clockwise, each through its predecessor.
/// Every link is then either between ring neighbours or to the bootstrap.
async fn clockwise_overlay() -> Result<(Overlay, std::sync::Arc<Recorder>)> {
    let config = OverlayConfig {
        localities: 4,
        ..seeded_config(51)
    };
    let mut overlay = Overlay::new(config)?;
    let recorder = std::sync::Arc::new(Recorder::default());
    overlay.set_callback(recorder.clone())?;

    let mut ids = vec![];
    for locality in 0..4 {
        ids.push(Identity::new(locality, 1 << 62));
        ids.push(Identity::new(locality, 3 << 62));
    }
    overlay.bootstrap_with_identity(ids[0])?;
    for (i, id) in ids.iter().enumerate().skip(1) {
        overlay.join_with_identity(i - 1, *id)?;
        overlay.settle().await?;
    }
    Ok((overlay, recorder))
}

#[tokio::test]
async fn test_locality_outage_splits_ring() -> Result<()> {
    let (overlay, recorder) = clockwise_overlay().await?;
    let harness = overlay.resilience();
    assert_eq!(harness.detect_partitions()?.component_count(), 1);

    // one locality out leaves a single arc
    assert_eq!(harness.mark_locality_unavailable(2), 2);
    assert_eq!(harness.detect_partitions()?.component_count(), 1);

    // two opposite localities out leave two arcs
    assert_eq!(harness.mark_locality_unavailable(0), 2);
    let partitions = harness.detect_partitions()?;
    assert_eq!(partitions.component_count(), 2);
    let components = partitions.components();
    assert!(components.iter().all(|c| c.len() == 2));
    let (one, three) = (Identity::new(1, 1 << 62), Identity::new(3, 1 << 62));
    assert!(!partitions.same_component(&one, &three));

    let from = overlay.index_of(&one).unwrap();
    let to = overlay.index_of(&three).unwrap();
    overlay.send(from, to, "across")?;
    overlay.settle().await?;
    assert!(recorder.deliveries().is_empty());
    assert_eq!(recorder.failures()[0].kind, FailureKind::NoRoute);

    harness.reset();
    assert_eq!(harness.detect_partitions()?.component_count(), 1);
    overlay.send(from, to, "across")?;
    overlay.settle().await?;
    assert_eq!(recorder.deliveries().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_fraction_is_refused() -> Result<()> {
    let (overlay, _) = prepare_overlay(3, seeded_config(52)).await?;
    let mut rng = StdRng::seed_from_u64(52);
    let harness = overlay.resilience();
    assert!(matches!(
        harness.mark_random_unavailable(1.5, &mut rng),
        Err(Error::InvalidFraction(_))
    ));
    assert_eq!(harness.mark_random_unavailable(0.0, &mut rng)?, 0);
    assert_eq!(harness.mark_random_unavailable(1.0, &mut rng)?, 3);
    assert!(harness.detect_partitions()?.labels.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_overlapping_outages_count_once() -> Result<()> {
    let (overlay, _) = clockwise_overlay().await?;
    let harness = overlay.resilience();
    assert_eq!(harness.mark_locality_unavailable(1), 2);
    assert_eq!(harness.mark_locality_unavailable(1), 0);

    let mut rng = StdRng::seed_from_u64(53);
    // every node is chosen, only the six still up go down
    assert_eq!(harness.mark_random_unavailable(1.0, &mut rng)?, 6);
    assert_eq!(harness.mark_unavailable(|_| true), 0);

    harness.reset();
    assert_eq!(harness.mark_unavailable(|n| n.id().locality == 1), 2);
    Ok(())
}
