// Burn scanning (§4.6).
//
// A burn is a factoid-layer transaction with exactly one input, zero pegged
// outputs, and exactly one entry-credit output addressed to the network's
// burn sink. The input address is credited pFCT equal to the burned amount.

use std::collections::BTreeMap;

use crate::assets::Network;
use crate::chain_adapter::{FactoidBlock, FactoidTransaction};

/// Per-address pFCT credit accumulated from one block's burns.
pub fn scan_burns(block: &FactoidBlock, network: Network) -> BTreeMap<[u8; 32], u64> {
    let sink = network.burn_sink_address();
    let mut credits: BTreeMap<[u8; 32], u64> = BTreeMap::new();

    for tx in &block.transactions {
        if let Some(amount) = burn_amount(tx, sink) {
            *credits.entry(tx.inputs[0].address).or_insert(0) += amount;
        }
    }
    credits
}

/// Returns the burned amount if `tx` is a well-formed burn, else `None`.
fn burn_amount(tx: &FactoidTransaction, sink: &str) -> Option<u64> {
    if tx.inputs.len() != 1 {
        return None;
    }
    if !tx.outputs.is_empty() {
        return None;
    }
    if tx.ec_outputs.len() != 1 {
        return None;
    }
    let ec_output = &tx.ec_outputs[0];
    if ec_output.address != sink {
        return None;
    }
    if ec_output.amount == 0 {
        return None;
    }
    Some(tx.inputs[0].amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_adapter::{EcOutput, FactoidIo};

    fn burn_tx(input_addr: [u8; 32], amount: u64, sink: &str) -> FactoidTransaction {
        FactoidTransaction {
            inputs: vec![FactoidIo {
                address: input_addr,
                amount,
            }],
            outputs: vec![],
            ec_outputs: vec![EcOutput {
                address: sink.to_string(),
                amount,
            }],
        }
    }

    #[test]
    fn single_valid_burn_is_credited() {
        let sink = Network::Mainnet.burn_sink_address().to_string();
        let block = FactoidBlock {
            height: 1,
            transactions: vec![burn_tx([7u8; 32], 500, &sink)],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert_eq!(credits[&[7u8; 32]], 500);
    }

    #[test]
    fn multiple_burns_from_same_address_accumulate() {
        let sink = Network::Mainnet.burn_sink_address().to_string();
        let block = FactoidBlock {
            height: 1,
            transactions: vec![burn_tx([1u8; 32], 100, &sink), burn_tx([1u8; 32], 250, &sink)],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert_eq!(credits[&[1u8; 32]], 350);
    }

    #[test]
    fn tx_with_pegged_output_is_not_a_burn() {
        let sink = Network::Mainnet.burn_sink_address().to_string();
        let mut tx = burn_tx([2u8; 32], 100, &sink);
        tx.outputs.push(FactoidIo {
            address: [9u8; 32],
            amount: 50,
        });
        let block = FactoidBlock {
            height: 1,
            transactions: vec![tx],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert!(credits.is_empty());
    }

    #[test]
    fn ec_output_to_wrong_address_is_not_a_burn() {
        let block = FactoidBlock {
            height: 1,
            transactions: vec![burn_tx([3u8; 32], 100, "not-the-sink")],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert!(credits.is_empty());
    }

    #[test]
    fn credit_uses_input_amount_not_ec_output_amount() {
        let sink = Network::Mainnet.burn_sink_address().to_string();
        let tx = FactoidTransaction {
            inputs: vec![FactoidIo {
                address: [6u8; 32],
                amount: 500,
            }],
            outputs: vec![],
            ec_outputs: vec![EcOutput {
                address: sink.clone(),
                amount: 3,
            }],
        };
        let block = FactoidBlock {
            height: 1,
            transactions: vec![tx],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert_eq!(credits[&[6u8; 32]], 500);
    }

    #[test]
    fn multi_input_tx_is_not_a_burn() {
        let sink = Network::Mainnet.burn_sink_address().to_string();
        let mut tx = burn_tx([4u8; 32], 100, &sink);
        tx.inputs.push(FactoidIo {
            address: [5u8; 32],
            amount: 10,
        });
        let block = FactoidBlock {
            height: 1,
            transactions: vec![tx],
        };
        let credits = scan_burns(&block, Network::Mainnet);
        assert!(credits.is_empty());
    }
}
