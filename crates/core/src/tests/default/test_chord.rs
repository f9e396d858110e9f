use crate::error::Result;
use crate::identity::Identity;
use crate::overlay::Overlay;
use crate::table::Side;
use crate::tests::default::send_all_pairs;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;

fn closest(overlay: &Overlay, target: &Identity) -> Identity {
    let space = overlay.space();
    overlay
        .identities()
        .into_iter()
        .min_by_key(|id| space.distance(id, target).unsigned_abs())
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chords_reach_rendezvous_nodes() -> Result<()> {
    let (overlay, _) = prepare_overlay(30, seeded_config(30)).await?;
    let before = overlay.stats()?;

    let count = overlay.config().chord_count;
    overlay.build_chords(count).await?;
    let after = overlay.stats()?;
    assert!(after.total_pool_edges > before.total_pool_edges);
    assert!(after.max_pool <= overlay.config().max_edges);

    let space = overlay.space();
    for node in overlay.nodes() {
        let id = node.id();
        let mut targets = space.global_chords(&id, count);
        targets.extend(space.local_chords(&id, count));
        let table = node.lock_table()?;
        for target in targets {
            let rendezvous = closest(&overlay, &target);
            if rendezvous != id {
                assert!(table.contains(&rendezvous), "{id} misses {rendezvous}");
            }
        }
    }
    // chords never touch ring pointers
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    assert!(overlay.is_ring_well_formed(Side::Previous)?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chords_keep_every_message_delivered() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(30, seeded_config(31)).await?;
    overlay.build_chords(overlay.config().chord_count).await?;

    let sent = send_all_pairs(&overlay).await?;
    assert_eq!(recorder.deliveries().len(), sent);
    assert!(recorder.failures().is_empty());
    Ok(())
}
