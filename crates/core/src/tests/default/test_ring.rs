use crate::config::OverlayConfig;
use crate::error::Result;
use crate::message::Message;
use crate::message::SetNextEdge;
use crate::message::SetPreviousEdge;
use crate::table::Side;
use crate::tests::default::clockwise_from;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;

#[tokio::test]
async fn test_ring_of_ten_is_well_formed() -> Result<()> {
    let (overlay, _) = prepare_overlay(10, seeded_config(10)).await?;
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    assert!(overlay.is_ring_well_formed(Side::Previous)?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ring_of_hundred_is_well_formed() -> Result<()> {
    let (overlay, _) = prepare_overlay(100, seeded_config(11)).await?;
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    assert!(overlay.is_ring_well_formed(Side::Previous)?);
    Ok(())
}

#[tokio::test]
async fn test_ring_follows_clockwise_order() -> Result<()> {
    let (overlay, _) = prepare_overlay(25, seeded_config(12)).await?;

    let expected = clockwise_from(&overlay, 0)?;
    assert_eq!(overlay.ring_walk(0, Side::Next)?, expected);

    let mut backwards = expected[1..].to_vec();
    backwards.reverse();
    backwards.insert(0, expected[0]);
    assert_eq!(overlay.ring_walk(0, Side::Previous)?, backwards);
    Ok(())
}

#[tokio::test]
async fn test_ring_recovers_from_concurrent_joins() -> Result<()> {
    for seed in 0..10 {
        let (mut overlay, recorder) = prepare_overlay(10, seeded_config(seed)).await?;
        for sponsor in 0..10 {
            overlay.join(sponsor)?;
        }
        overlay.settle().await?;

        assert_eq!(overlay.len(), 20);
        assert_eq!(recorder.inserted().len(), 19, "seed {seed}");
        assert!(overlay.is_ring_well_formed(Side::Next)?, "seed {seed}");
        assert!(overlay.is_ring_well_formed(Side::Previous)?, "seed {seed}");
        assert_eq!(
            overlay.ring_walk(0, Side::Next)?,
            clockwise_from(&overlay, 0)?,
            "seed {seed}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_stale_neighbor_offer_is_redirected() -> Result<()> {
    let (overlay, _) = prepare_overlay(6, seeded_config(15)).await?;
    let node = overlay.node(0)?;
    let ring = clockwise_from(&overlay, 0)?;
    let (next, after_next) = (ring[1], ring[2]);
    let far = overlay.node_by_id(&after_next)?.edge();

    // offering the node after next as next changes nothing
    node.send_message_as(far, Message::SetNextEdge(SetNextEdge), node.edge())?;
    overlay.settle().await?;

    assert_eq!(node.snapshot()?.next[0], next);
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    assert!(overlay.is_ring_well_formed(Side::Previous)?);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_set_edge_replaces() -> Result<()> {
    let (overlay, _) = prepare_overlay(5, seeded_config(13)).await?;
    let node = overlay.node(2)?;
    let (prev, next) = {
        let table = node.lock_table()?;
        (
            table.first(Side::Previous).cloned().unwrap(),
            table.first(Side::Next).cloned().unwrap(),
        )
    };
    let before = node.snapshot()?;

    for _ in 0..3 {
        node.send_message_as(
            next.clone(),
            Message::SetNextEdge(SetNextEdge),
            node.edge(),
        )?;
        node.send_message_as(
            prev.clone(),
            Message::SetPreviousEdge(SetPreviousEdge),
            node.edge(),
        )?;
    }
    overlay.settle().await?;

    let after = node.snapshot()?;
    assert_eq!(after.next.iter().filter(|id| **id == next.target).count(), 1);
    assert_eq!(
        after
            .previous
            .iter()
            .filter(|id| **id == prev.target)
            .count(),
        1
    );
    assert_eq!(after.next.len(), before.next.len());
    assert_eq!(after.previous.len(), before.previous.len());
    assert_eq!(after.next[0], next.target);
    assert_eq!(after.previous[0], prev.target);
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    Ok(())
}

#[tokio::test]
async fn test_pool_never_exceeds_bound() -> Result<()> {
    let config = OverlayConfig {
        max_edges: 3,
        ..seeded_config(14)
    };
    let (overlay, _) = prepare_overlay(30, config).await?;
    overlay.build_chords(4).await?;

    for node in overlay.nodes() {
        assert!(node.lock_table()?.pool().len() <= 3, "{}", node.id());
    }
    // ring neighbours are not subject to the bound
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    Ok(())
}
