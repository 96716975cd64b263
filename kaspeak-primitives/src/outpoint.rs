use kaspeak_crypto::hash::Hash;
use serde::{Deserialize, Serialize};

/// Reference to the output a transaction input spends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outpoint {
    pub transaction_id: Hash<32>,
    pub index: u32,
}

impl Outpoint {
    pub fn new(transaction_id: Hash<32>, index: u32) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

/// The consensus hash tying a payload to its carrying transaction.
///
/// Lowercase-hex concatenation of the spent transaction ids, ordered by
/// ascending outpoint index; inputs sharing an index keep their relative
/// position. The result feeds the signature preimage, so the ordering has
/// to match the signer's exactly.
pub fn outpoint_ids<'a, I>(outpoints: I) -> String
where
    I: IntoIterator<Item = &'a Outpoint>,
{
    let mut ordered: Vec<&Outpoint> = outpoints.into_iter().collect();
    ordered.sort_by_key(|o| o.index);

    let mut out = String::with_capacity(ordered.len() * 64);
    for outpoint in ordered {
        out.push_str(&outpoint.transaction_id.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Hash<32> {
        Hash::new([byte; 32])
    }

    #[test]
    fn concatenates_in_index_order() {
        let outs = [
            Outpoint::new(id(0xbb), 1),
            Outpoint::new(id(0xaa), 0),
        ];
        let expected = format!("{}{}", id(0xaa), id(0xbb));
        assert_eq!(outpoint_ids(outs.iter()), expected);
    }

    #[test]
    fn input_order_breaks_index_ties() {
        let outs = [
            Outpoint::new(id(0x11), 0),
            Outpoint::new(id(0x22), 0),
        ];
        let expected = format!("{}{}", id(0x11), id(0x22));
        assert_eq!(outpoint_ids(outs.iter()), expected);
    }

    #[test]
    fn permutations_with_same_indices_agree() {
        let a = Outpoint::new(id(0x01), 2);
        let b = Outpoint::new(id(0x02), 0);
        let c = Outpoint::new(id(0x03), 1);

        let forward = outpoint_ids([&b, &c, &a]);
        let shuffled = outpoint_ids([&a, &b, &c]);
        assert_eq!(forward, shuffled);
        assert_eq!(forward, format!("{}{}{}", id(0x02), id(0x03), id(0x01)));
    }

    #[test]
    fn empty_inputs_make_an_empty_hash() {
        let none: [&Outpoint; 0] = [];
        assert_eq!(outpoint_ids(none), "");
    }
}
