use crate::config::OverlayConfig;
use crate::error::Error;
use crate::error::Result;
use crate::identity::Identity;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::node::JoinState;
use crate::overlay::Overlay;
use crate::table::Side;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;

#[tokio::test]
async fn test_bootstrap_alone() -> Result<()> {
    let mut overlay = Overlay::new(seeded_config(1))?;
    assert!(matches!(overlay.join(0), Err(Error::EmptyOverlay)));
    overlay.bootstrap()?;
    assert!(matches!(
        overlay.bootstrap(),
        Err(Error::AlreadyBootstrapped)
    ));
    overlay.settle().await?;

    let node = overlay.node(0)?;
    assert_eq!(node.join_state()?, JoinState::Inserted);
    assert!(node.snapshot()?.neighbours().is_empty());
    assert!(overlay.is_ring_well_formed(Side::Next)?);
    Ok(())
}

#[tokio::test]
async fn test_two_nodes_pair_up() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(2, seeded_config(2)).await?;
    let a = overlay.node(0)?;
    let b = overlay.node(1)?;

    for (me, other) in [(a, b), (b, a)] {
        let snapshot = me.snapshot()?;
        assert_eq!(snapshot.previous, vec![other.id()]);
        assert_eq!(snapshot.next, vec![other.id()]);
        assert!(snapshot.pool.contains(&other.id()));
    }
    assert_eq!(b.join_state()?, JoinState::Inserted);
    assert_eq!(b.sponsor(), Some(a.id()));
    assert_eq!(recorder.inserted(), vec![b.id()]);
    Ok(())
}

#[tokio::test]
async fn test_every_joiner_gets_inserted() -> Result<()> {
    let (overlay, recorder) = prepare_overlay(20, seeded_config(3)).await?;
    for node in overlay.nodes() {
        assert_eq!(node.join_state()?, JoinState::Inserted, "{}", node.id());
    }
    let mut inserted = recorder.inserted();
    inserted.sort();
    let mut joiners: Vec<Identity> = overlay.identities().into_iter().skip(1).collect();
    joiners.sort();
    assert_eq!(inserted, joiners);
    Ok(())
}

/// Edges whose far end holds a secret for the near end, and how many of
/// those disagree with the near end.
fn compare_secrets(overlay: &Overlay) -> Result<(usize, usize)> {
    let (mut checked, mut mismatched) = (0, 0);
    for node in overlay.nodes() {
        let table = node.lock_table()?;
        for edge in table.edges() {
            let other = overlay.node_by_id(&edge.target)?;
            if let Some(back) = other.lock_table()?.secret_of(&node.id()) {
                checked += 1;
                if edge.shared_secret != Some(back) {
                    tracing::error!("{} and {} disagree", node.id(), edge.target);
                    mismatched += 1;
                }
            }
        }
    }
    Ok((checked, mismatched))
}

#[tokio::test]
async fn test_handshakes_agree_on_secrets() -> Result<()> {
    let (overlay, _) = prepare_overlay(30, seeded_config(4)).await?;
    overlay.build_chords(overlay.config().chord_count).await?;

    let (checked, mismatched) = compare_secrets(&overlay)?;
    assert!(checked > 0);
    assert_eq!(mismatched, 0);
    Ok(())
}

#[tokio::test]
async fn test_secrets_agree_after_eviction() -> Result<()> {
    for seed in 0..5 {
        let config = OverlayConfig {
            max_edges: 3,
            ..seeded_config(seed)
        };
        let (overlay, _) = prepare_overlay(30, config).await?;
        overlay.build_chords(4).await?;

        let (checked, mismatched) = compare_secrets(&overlay)?;
        assert!(checked > 0);
        assert_eq!(mismatched, 0, "seed {seed}");
    }
    Ok(())
}

#[tokio::test]
async fn test_identity_collision_is_rejected() -> Result<()> {
    let (mut overlay, _) = prepare_overlay(2, seeded_config(5)).await?;
    let taken = overlay.node(1)?.id();

    overlay.join_with_identity(0, taken)?;
    overlay.settle().await?;

    assert_eq!(overlay.measure().get_count(MeasureCounter::Collision), 1);
    // the impostor never got a place on the ring
    let impostor = overlay.node(2)?;
    assert_eq!(impostor.join_state()?, JoinState::Requesting);
    assert!(impostor.snapshot()?.previous.is_empty());
    // the index keeps pointing at the first holder
    assert_eq!(overlay.index_of(&taken), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_join_outside_space_is_refused() -> Result<()> {
    let (mut overlay, _) = prepare_overlay(1, seeded_config(6)).await?;
    let localities = overlay.space().localities();
    assert!(matches!(
        overlay.join_with_identity(0, Identity::new(localities, 0)),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        overlay.join(9),
        Err(Error::NodeIndexNotFound(9))
    ));
    Ok(())
}
