use std::collections::HashSet;

use crate::callback::FailureKind;
use crate::error::Result;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::tests::default::send_all_pairs;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;

#[tokio::test]
async fn test_ten_nodes_reach_each_other() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(10, seeded_config(20)).await?;
    let sent = send_all_pairs(&overlay).await?;
    assert_eq!(sent, 90);

    let deliveries = recorder.deliveries();
    assert_eq!(deliveries.len(), sent);
    assert!(recorder.failures().is_empty());

    let pairs: HashSet<_> = deliveries
        .iter()
        .map(|d| (d.origin, d.destination))
        .collect();
    assert_eq!(pairs.len(), sent);
    for d in deliveries.iter() {
        let from = overlay.index_of(&d.origin).unwrap();
        let to = overlay.index_of(&d.destination).unwrap();
        assert_eq!(d.data, format!("{from}->{to}").into_bytes());
    }

    let measure = overlay.measure();
    assert_eq!(measure.get_count(MeasureCounter::Sent), 90);
    assert_eq!(measure.get_count(MeasureCounter::Delivered), 90);
    let average = measure.average_hops().unwrap();
    assert!(average.is_finite());
    assert!(average <= 10.0, "average hops {average}");
    Ok(())
}

#[tokio::test]
async fn test_greedy_routing_makes_progress() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(40, seeded_config(21)).await?;
    send_all_pairs(&overlay).await?;
    let space = overlay.space();

    assert_eq!(overlay.measure().get_count(MeasureCounter::DeadEnd), 0);
    for d in recorder.deliveries() {
        assert_eq!(d.path.first(), Some(&d.origin));
        assert_eq!(d.path.last(), Some(&d.destination));
        assert_eq!(d.hops as usize, d.path.len());
        let distances: Vec<u128> = d
            .path
            .iter()
            .map(|id| space.distance(id, &d.destination).unsigned_abs())
            .collect();
        for pair in distances.windows(2) {
            assert!(pair[1] < pair[0], "{:?}", d.path);
        }
        assert!(d.path.len() <= overlay.len());
    }
    Ok(())
}

#[tokio::test]
async fn test_send_to_self_is_delivered_in_place() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(3, seeded_config(22)).await?;
    overlay.send(1, 1, "loop")?;
    overlay.settle().await?;

    let deliveries = recorder.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].hops, 1);
    assert_eq!(deliveries[0].path, vec![overlay.node(1)?.id()]);
    Ok(())
}

#[tokio::test]
async fn test_unavailable_nodes_are_routed_around() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(10, seeded_config(23)).await?;
    let down = overlay.node(4)?.id();
    overlay.resilience().mark_unavailable(|n| n.id() == down);

    // a message held by an unavailable node is dropped
    overlay.send(4, 0, "from the dead")?;
    // a message for an unavailable node is never delivered
    overlay.send(0, 4, "to the dead")?;
    overlay.settle().await?;

    assert!(recorder.deliveries().is_empty());
    let failures = recorder.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .any(|f| f.kind == FailureKind::Dropped && f.origin == down));
    assert!(failures
        .iter()
        .any(|f| f.kind == FailureKind::NoRoute && f.destination == down));
    Ok(())
}
