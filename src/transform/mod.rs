//! Pure reshaping of raw backend payloads into display-ready snapshots.
//!
//! Nothing here performs I/O or reads the clock: the same bundle always
//! produces the same snapshot.

mod node;
mod wallet;

use crate::models::raw::RawUtxo;
use crate::models::{RawBundle, Snapshot, UtxoEntry};
use crate::utils::format_amount;

pub use node::transform_node;
pub use wallet::transform_wallet;

/// Turn a fetched bundle into the snapshot for its entity kind
pub fn transform(bundle: &RawBundle) -> Snapshot {
    match bundle {
        RawBundle::Wallet(stats) => Snapshot::Wallet(transform_wallet(stats)),
        RawBundle::Node(stats) => Snapshot::Node(transform_node(stats)),
    }
}

/// Group UTXOs by exact address, summing raw amounts.
///
/// Amounts are summed before formatting; output keeps first-seen order.
pub fn aggregate_utxos(utxos: &[RawUtxo]) -> Vec<UtxoEntry> {
    let mut grouped: Vec<(&str, f64)> = Vec::new();

    for utxo in utxos {
        match grouped.iter_mut().find(|(seen, _)| *seen == utxo.address()) {
            Some((_, total)) => *total += utxo.amount(),
            None => grouped.push((utxo.address(), utxo.amount())),
        }
    }

    grouped
        .into_iter()
        .map(|(address, total)| UtxoEntry {
            address: address.to_string(),
            balance: format_amount(total),
        })
        .collect()
}
