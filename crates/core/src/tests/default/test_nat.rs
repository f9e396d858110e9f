use crate::error::Error;
use crate::error::Result;
use crate::overlay::Overlay;
use crate::tests::default::seeded_config;
use crate::tests::prepare_overlay;

/// An introducer with two peers in its table, preferring peers that do not
/// know each other yet.
fn find_introduction(overlay: &Overlay) -> Result<Option<(usize, usize, usize)>> {
    let mut fallback = None;
    for (i, node) in overlay.nodes().enumerate() {
        let peers: Vec<usize> = node
            .snapshot()?
            .neighbours()
            .iter()
            .filter_map(|id| overlay.index_of(id))
            .collect();
        for a in peers.iter() {
            for b in peers.iter().filter(|b| *b != a) {
                let strangers = !overlay
                    .node(*a)?
                    .lock_table()?
                    .contains(&overlay.node(*b)?.id());
                if strangers {
                    return Ok(Some((i, *a, *b)));
                }
                fallback.get_or_insert((i, *a, *b));
            }
        }
    }
    Ok(fallback)
}

#[tokio::test]
async fn test_introduced_peers_learn_endpoints() -> Result<()> {
    let (overlay, _) = prepare_overlay(12, seeded_config(40)).await?;
    let (introducer, ia, ib) = find_introduction(&overlay)?.unwrap();
    let (a, b) = (overlay.node(ia)?, overlay.node(ib)?);

    overlay.introduce(introducer, ia, ib)?;
    overlay.settle().await?;

    assert_eq!(a.endpoint_of(&b.id())?, Some(b.endpoint()));
    assert_eq!(b.endpoint_of(&a.id())?, Some(a.endpoint()));
    assert!(a.lock_table()?.contains(&b.id()));
    assert!(b.lock_table()?.contains(&a.id()));
    assert_ne!(a.endpoint(), b.endpoint());
    Ok(())
}

#[tokio::test]
async fn test_introduction_needs_both_peers_known() -> Result<()> {
    let (overlay, _) = prepare_overlay(20, seeded_config(41)).await?;

    let mut found = None;
    for (i, node) in overlay.nodes().enumerate() {
        let table = node.lock_table()?;
        let strangers: Vec<usize> = overlay
            .identities()
            .iter()
            .filter(|id| **id != node.id() && !table.contains(id))
            .filter_map(|id| overlay.index_of(id))
            .collect();
        if strangers.len() >= 2 {
            found = Some((i, strangers[0], strangers[1]));
            break;
        }
    }
    let (introducer, ia, ib) = found.unwrap();

    let result = overlay.introduce(introducer, ia, ib);
    assert!(matches!(result, Err(Error::IntroduceStranger(..))));
    overlay.settle().await?;
    let b = overlay.node(ib)?.id();
    assert_eq!(overlay.node(ia)?.endpoint_of(&b)?, None);
    Ok(())
}
