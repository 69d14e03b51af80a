use std::sync::Arc;

use proptest::prelude::*;

use agora_governance::{GovernanceFacade, GovernanceParams, ProposalDraft, TallyCalculator};
use agora_nullables::{NullBalanceOracle, NullClock, NullDepositEscrow, NullGovernanceStore};
use agora_store::{ProposalRecord, VoteStore};
use agora_types::{
    Category, DepositProof, Outcome, ProposalId, Timestamp, VoteChoice, WalletAddress,
};

fn wallet(n: u8) -> WalletAddress {
    WalletAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).unwrap()
}

fn record(yes: u64, no: u64, abstain: u64) -> ProposalRecord {
    let mut p = ProposalRecord::new(
        ProposalId::new([1; 32]),
        "t".into(),
        String::new(),
        Category::Governance,
        wallet(1),
        Timestamp::new(0),
        Timestamp::new(1),
        0,
    );
    p.weight_yes = yes;
    p.weight_no = no;
    p.weight_abstain = abstain;
    p
}

fn choice_strategy() -> impl Strategy<Value = VoteChoice> {
    prop_oneof![
        Just(VoteChoice::Yes),
        Just(VoteChoice::No),
        Just(VoteChoice::Abstain),
    ]
}

proptest! {
    /// Each percentage is within half a tenth of the exact share, and the
    /// three never drift more than a few tenths from 100 in total.
    #[test]
    fn percentages_are_rounded_shares(
        yes in 0u64..u64::MAX / 2,
        no in 0u64..u64::MAX / 2,
        abstain in 0u64..1_000_000_000,
    ) {
        let p = record(yes, no, abstain);
        let pct = TallyCalculator::percentages(&p);
        let total = p.total_weight();
        if total == 0 {
            prop_assert_eq!(pct.yes + pct.no + pct.abstain, 0.0);
        } else {
            let sum = pct.yes + pct.no + pct.abstain;
            prop_assert!((sum - 100.0).abs() <= 0.2 + 1e-9, "sum drifted: {}", sum);
            for (w, got) in [(yes, pct.yes), (no, pct.no), (abstain, pct.abstain)] {
                let exact = w as f64 / total as f64 * 100.0;
                prop_assert!((got - exact).abs() <= 0.05 + 1e-6, "{} vs {}", got, exact);
            }
        }
    }

    /// Passed exactly when quorum is met and yes strictly beats no.
    #[test]
    fn outcome_matches_rules(
        yes in 0u64..2_000,
        no in 0u64..2_000,
        abstain in 0u64..2_000,
        threshold in 0u64..5_000,
    ) {
        let p = record(yes, no, abstain);
        let outcome = TallyCalculator::outcome(&p, threshold);
        let quorum = (yes + no + abstain) >= threshold;
        let expected = match (quorum, yes > no) {
            (false, _) => Outcome::QuorumFailed,
            (true, true) => Outcome::Passed,
            (true, false) => Outcome::Rejected,
        };
        prop_assert_eq!(outcome, expected);
    }

    /// After any sequence of vote attempts, including repeats, the buckets
    /// equal the sum of recorded vote weights per choice.
    #[test]
    fn tally_equals_recorded_votes(
        attempts in prop::collection::vec((0u8..12, choice_strategy()), 0..60),
        balances in prop::collection::vec(0u64..1_000_000, 12),
    ) {
        let store = Arc::new(NullGovernanceStore::new());
        let oracle = NullBalanceOracle::new();
        for (n, balance) in balances.iter().enumerate() {
            oracle.set_balance(&wallet(n as u8), *balance);
        }
        let facade = GovernanceFacade::new(
            store.clone(),
            Arc::new(NullClock::new(10_000)),
            Arc::new(oracle),
            Arc::new(NullDepositEscrow::accepting()),
            GovernanceParams::default(),
        );
        let draft = ProposalDraft {
            title: "Treasury grant".into(),
            category: Category::TreasuryManagement,
            description: String::new(),
            voting_period_secs: None,
        };
        let proof = DepositProof {
            depositor: wallet(200),
            amount: 5_000,
            reference: "r".into(),
        };
        let id = facade.create_proposal(draft, &proof).unwrap().id;

        for (voter, choice) in attempts {
            let _ = facade.cast_vote(&id, &wallet(voter), choice);
        }

        let votes = store.get_votes(&id).unwrap();
        let tally = facade.get_proposal(&id).unwrap().tally;
        let sum_for = |c: VoteChoice| -> u64 {
            votes.iter().filter(|v| v.choice == c).map(|v| v.weight).sum()
        };
        prop_assert_eq!(tally.weight_yes, sum_for(VoteChoice::Yes));
        prop_assert_eq!(tally.weight_no, sum_for(VoteChoice::No));
        prop_assert_eq!(tally.weight_abstain, sum_for(VoteChoice::Abstain));
        prop_assert!(votes.iter().all(|v| v.weight > 0));
    }
}
