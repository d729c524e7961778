use crate::models::raw::{RawAddress, RawHistoryRow};
use crate::models::{AddressEntry, HistoryEntry, RawWalletStats, WalletSnapshot};
use crate::utils::helper::TXID_DISPLAY_LEN;
use crate::utils::{format_amount, round_amount, truncate_display};

use super::aggregate_utxos;

pub fn transform_wallet(stats: &RawWalletStats) -> WalletSnapshot {
    WalletSnapshot {
        total_balance: round_amount(stats.balance),
        available_balance: round_amount(stats.available_balance),
        addresses: address_entries(&stats.addresses),
        available_utxos: aggregate_utxos(&stats.available_utxos),
        history: stats.history.iter().map(history_entry).collect(),
        next_pending: stats.pending.clone(),
    }
}

/// Flatten address objects, keeping the first entry per address
fn address_entries(raw: &[RawAddress]) -> Vec<AddressEntry> {
    let mut entries: Vec<AddressEntry> = Vec::new();

    for (address, metadata) in raw.iter().flat_map(RawAddress::entries) {
        if entries.iter().any(|entry| entry.address == address) {
            continue;
        }
        entries.push(AddressEntry {
            address: address.to_string(),
            metadata: metadata.clone(),
        });
    }

    entries
}

fn history_entry(row: &RawHistoryRow) -> HistoryEntry {
    HistoryEntry {
        block: row.block(),
        kind: row.kind().to_string(),
        txid: truncate_display(row.txid(), TXID_DISPLAY_LEN),
        amount: format_amount(row.amount()),
    }
}
