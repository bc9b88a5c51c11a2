use proptest::prelude::*;

use conclave_consensus::{evaluate_quorum, order_votes, VoteRecord};
use conclave_types::{ElectionId, Hash256, NodeId, Signature, Timestamp, Vote, Weight};

fn weights(raw: &[u64]) -> Vec<Weight> {
    raw.iter().map(|w| Weight::new(*w as u128)).collect()
}

fn record(weight: u64, seed: u8) -> VoteRecord {
    VoteRecord {
        vote: Vote {
            election: ElectionId::new("e1"),
            voter: NodeId::new(format!("voter-{seed}")),
            candidate: NodeId::new("candidate"),
            signature: Signature([0u8; 64]),
        },
        from_node: NodeId::new("relay"),
        weight: Weight::new(weight as u128),
        timestamp: Timestamp::new(0),
        hash: Hash256::new([seed; 32]),
    }
}

proptest! {
    /// Same inputs, same outcome.
    #[test]
    fn quorum_is_pure(
        online in prop::collection::vec(0u64..1_000_000, 0..20),
        voted in prop::collection::vec(0u64..1_000_000, 0..20),
    ) {
        let a = evaluate_quorum(&weights(&online), &weights(&voted));
        let b = evaluate_quorum(&weights(&online), &weights(&voted));
        prop_assert_eq!(a, b);
    }

    /// Adding a signer never loses quorum.
    #[test]
    fn quorum_monotonic_in_voted_weight(
        online in prop::collection::vec(0u64..1_000_000, 1..20),
        voted in prop::collection::vec(0u64..1_000_000, 0..20),
        extra in 0u64..1_000_000,
    ) {
        let before = evaluate_quorum(&weights(&online), &weights(&voted));
        let mut more = voted.clone();
        more.push(extra);
        let after = evaluate_quorum(&weights(&online), &weights(&more));
        prop_assert!(!before.reached || after.reached);
    }

    /// The decision matches exact integer arithmetic.
    #[test]
    fn quorum_matches_integer_rule(online in 0u64..10_000_000, voted in 0u64..10_000_000) {
        let outcome = evaluate_quorum(&weights(&[online]), &weights(&[voted]));
        prop_assert_eq!(outcome.reached, voted as u128 * 100 >= online as u128 * 67);
    }

    /// Any permutation of the same pending set orders identically.
    #[test]
    fn vote_order_is_deterministic(
        entries in prop::collection::btree_map(any::<u8>(), 0u64..1_000, 1..40),
        rotate in 0usize..40,
    ) {
        let records: Vec<VoteRecord> = entries.iter().map(|(seed, w)| record(*w, *seed)).collect();
        let mut a = records.clone();
        let mut b = records;
        let len = b.len();
        b.rotate_left(rotate % len);
        b.reverse();

        order_votes(&mut a);
        order_votes(&mut b);
        let hashes_a: Vec<Hash256> = a.iter().map(|r| r.hash).collect();
        let hashes_b: Vec<Hash256> = b.iter().map(|r| r.hash).collect();
        prop_assert_eq!(hashes_a, hashes_b);

        for pair in a.windows(2) {
            prop_assert!(pair[0].weight >= pair[1].weight);
        }
    }
}
