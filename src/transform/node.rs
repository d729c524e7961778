use crate::models::{MempoolEntry, NodeSnapshot, RawNodeStats};
use crate::utils::helper::TXID_DISPLAY_LEN;
use crate::utils::truncate_display;

use super::aggregate_utxos;

pub fn transform_node(stats: &RawNodeStats) -> NodeSnapshot {
    NodeSnapshot {
        current_height: stats.working_on,
        mempool: stats
            .mempool
            .iter()
            .map(|entry| MempoolEntry {
                txid: truncate_display(entry.txid(), TXID_DISPLAY_LEN),
            })
            .collect(),
        utxos: aggregate_utxos(&stats.utxos),
    }
}
