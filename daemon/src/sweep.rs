//! Periodic expiry sweep.

use agora_governance::GovernanceFacade;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Close expired proposals every `every` until shutdown is broadcast.
///
/// Reads close proposals lazily as well, so a missed or failed sweep only
/// delays the outcome of proposals nobody is looking at.
pub async fn run_sweeper(
    facade: Arc<GovernanceFacade>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = every.as_secs(), "expiry sweep started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let facade = Arc::clone(&facade);
                match tokio::task::spawn_blocking(move || facade.close_expired()).await {
                    Ok(Ok(0)) => {}
                    Ok(Ok(closed)) => tracing::debug!(closed, "sweep closed proposals"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "expiry sweep failed"),
                    Err(e) => tracing::warn!(error = %e, "expiry sweep task panicked"),
                }
            }
        }
    }
    tracing::info!("expiry sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_governance::{GovernanceParams, ProposalDraft};
    use agora_nullables::{NullBalanceOracle, NullClock, NullDepositEscrow, NullGovernanceStore};
    use agora_types::{Category, DepositProof, WalletAddress};

    #[tokio::test]
    async fn sweeps_until_shutdown() {
        let clock = Arc::new(NullClock::new(1_000));
        let facade = Arc::new(GovernanceFacade::new(
            Arc::new(NullGovernanceStore::new()),
            clock.clone(),
            Arc::new(NullBalanceOracle::new()),
            Arc::new(NullDepositEscrow::accepting()),
            GovernanceParams::default(),
        ));
        let draft = ProposalDraft {
            title: "Short vote".into(),
            category: Category::Governance,
            description: String::new(),
            voting_period_secs: Some(10),
        };
        let proof = DepositProof {
            depositor: WalletAddress::parse("0x00000000000000000000000000000000000000a1").unwrap(),
            amount: 1_000,
            reference: "r".into(),
        };
        facade.create_proposal(draft, &proof).unwrap();
        clock.advance(10);

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(run_sweeper(
            Arc::clone(&facade),
            Duration::from_millis(10),
            rx,
        ));
        // The first tick fires immediately.
        for _ in 0..100 {
            if facade.stats().get("proposals_closed") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(facade.stats().get("proposals_closed"), 1);

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
