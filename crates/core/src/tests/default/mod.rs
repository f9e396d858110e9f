use crate::config::OverlayConfig;
use crate::error::Result;
use crate::identity::Identity;
use crate::overlay::Overlay;

mod test_chord;
mod test_join;
mod test_nat;
mod test_resilience;
mod test_ring;
mod test_routing;

pub fn seeded_config(seed: u64) -> OverlayConfig {
    OverlayConfig::default().with_seed(seed)
}

/// Send one payload between every ordered pair of available nodes, then
/// settle. Returns the number of payloads sent.
pub async fn send_all_pairs(overlay: &Overlay) -> Result<usize> {
    let live: Vec<usize> = (0..overlay.len())
        .filter(|i| overlay.node(*i).map(|n| n.is_available()).unwrap_or(false))
        .collect();
    let mut sent = 0;
    for from in live.iter() {
        for to in live.iter() {
            if from != to {
                overlay.send(*from, *to, format!("{from}->{to}"))?;
                sent += 1;
            }
        }
    }
    overlay.settle().await?;
    Ok(sent)
}

/// Identities of the overlay in clockwise order, starting at `start`.
pub fn clockwise_from(overlay: &Overlay, start: usize) -> Result<Vec<Identity>> {
    let base = overlay.node(start)?.id();
    let mut ids = overlay.identities();
    overlay.space().sort_clockwise(&mut ids, &base);
    Ok(ids)
}
