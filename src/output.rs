//! CSV writers for the offline simulator outputs: `trades.csv`, `top.csv`
//! and `accounts.csv`. Absent optional fields are written empty.

use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;

use crate::ledger::Account;
use crate::simulator::BookTop;
use crate::types::{OwnerId, Price, Trade, Ts};

fn opt(px: Option<Price>) -> String {
    px.map(|p| p.to_string()).unwrap_or_default()
}

/// Writes `trade_id,ts,price,qty,maker_id,taker_id` rows.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    writeln!(f, "trade_id,ts,price,qty,maker_id,taker_id")?;
    for t in trades {
        writeln!(
            f,
            "{},{},{},{},{},{}",
            t.id, t.ts, t.price, t.qty, t.maker_order_id, t.taker_order_id
        )?;
    }
    f.flush()
}

/// Writes `ts,best_bid,best_ask,mid` rows with empty fields for null quotes.
pub fn write_top_csv(path: &Path, tops: &[BookTop]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    writeln!(f, "ts,best_bid,best_ask,mid")?;
    for top in tops {
        writeln!(
            f,
            "{},{},{},{}",
            top.ts,
            opt(top.best_bid),
            opt(top.best_ask),
            opt(top.mid)
        )?;
    }
    f.flush()
}

/// Writes `ts,owner,cash_ticks,position,mtm_ticks` rows.
pub fn write_accounts_csv(path: &Path, ts: Ts, accounts: &[(OwnerId, Account)]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    writeln!(f, "ts,owner,cash_ticks,position,mtm_ticks")?;
    for (owner, acct) in accounts {
        writeln!(
            f,
            "{},{},{},{},{}",
            ts, owner, acct.cash_ticks, acct.position, acct.mtm_ticks
        )?;
    }
    f.flush()
}
