use proptest::prelude::*;

use conclave_types::{Container, Hash256, NodeId, Timestamp, Weight};

proptest! {
    /// Hex rendering parses back to the same digest.
    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = Hash256::new(bytes);
        prop_assert_eq!(Hash256::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    /// Digest ordering agrees with the ordering of the hex strings.
    #[test]
    fn hash_order_matches_hex_order(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        let (ha, hb) = (Hash256::new(a), Hash256::new(b));
        prop_assert_eq!(ha.cmp(&hb), ha.to_hex().cmp(&hb.to_hex()));
    }

    /// Canonical weight strings parse back exactly, at any magnitude.
    #[test]
    fn weight_string_is_lossless(raw in any::<u128>()) {
        let w = Weight::new(raw);
        prop_assert_eq!(w.to_string().parse::<Weight>().unwrap(), w);
    }

    /// Stripping blocks never changes a container's identity.
    #[test]
    fn container_header_hash_stable(ts in any::<u64>(), creator in "[a-z]{1,12}") {
        let c = Container::new(Some(Hash256::new([3u8; 32])), Timestamp::new(ts), NodeId::new(creator), Vec::new());
        prop_assert_eq!(c.header().compute_hash(), c.hash);
    }
}
