//! Receipt rendering for settled transactions.
//!
//! A receipt is derived purely from a persisted TransactionRecord, so
//! re-rendering is deterministic and side-effect free. Two formats are
//! supported: a plain shareable text block and a printable HTML document.

use crate::domain::{Side, TransactionRecord};
use serde::Serialize;

/// Human-readable views of one transaction record.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    #[serde(flatten)]
    record: TransactionRecord,
}

impl Receipt {
    pub fn new(record: TransactionRecord) -> Self {
        Receipt { record }
    }

    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    fn side_label(&self) -> &'static str {
        match self.record.side {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    fn asset_label(&self) -> String {
        match &self.record.display_name {
            Some(name) => format!("{} ({})", name, self.record.symbol),
            None => self.record.symbol.to_string(),
        }
    }

    fn date_label(&self) -> String {
        self.record
            .settled_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
    }

    /// Plain-text shareable receipt.
    pub fn to_text(&self) -> String {
        let r = &self.record;
        format!(
            "Transaction Receipt\n\
             Type: {}\n\
             Coin: {}\n\
             Amount: {}\n\
             Price: ${}\n\
             Subtotal: ${}\n\
             Platform Fee: ${}\n\
             Network Fee: ${}\n\
             Total: ${}\n\
             Status: Confirmed\n\
             Date: {}",
            self.side_label(),
            self.asset_label(),
            r.quantity.to_canonical_string(),
            r.unit_price.to_canonical_string(),
            r.subtotal.to_currency_string(),
            r.platform_fee.to_currency_string(),
            r.network_fee.to_currency_string(),
            r.total.to_currency_string(),
            self.date_label(),
        )
    }

    /// Printable HTML document for export.
    pub fn to_html(&self) -> String {
        let r = &self.record;
        format!(
            r#"<div style="font-family: Arial, sans-serif; padding: 24px;">
  <h2 style="text-align:center;">Transaction Receipt</h2>
  <hr />
  <p><strong>Date:</strong> {date}</p>
  <p><strong>Status:</strong> Confirmed</p>
  <p><strong>Type:</strong> {side}</p>
  <p><strong>Coin:</strong> {asset}</p>
  <p><strong>Amount:</strong> {quantity}</p>
  <p><strong>Price per Coin:</strong> ${price}</p>
  <div style="margin: 16px 0;">
    <table style="width:100%; border-collapse:collapse;">
      <tr><td style="padding:4px 0;">Subtotal</td><td style="text-align:right;">${subtotal}</td></tr>
      <tr><td style="padding:4px 0;">Platform Fee</td><td style="text-align:right;">${platform_fee}</td></tr>
      <tr><td style="padding:4px 0;">Network Fee</td><td style="text-align:right;">${network_fee}</td></tr>
      <tr><td style="padding:8px 0; font-weight:bold; border-top:1px solid #eee;">Total</td><td style="text-align:right; font-weight:bold; border-top:1px solid #eee;">${total}</td></tr>
    </table>
  </div>
  <p style="margin-top:24px; font-size:12px; color:#888;">Reference: {id}</p>
</div>"#,
            date = self.date_label(),
            side = self.side_label(),
            asset = self.asset_label(),
            quantity = r.quantity.to_canonical_string(),
            price = r.unit_price.to_canonical_string(),
            subtotal = r.subtotal.to_currency_string(),
            platform_fee = r.platform_fee.to_currency_string(),
            network_fee = r.network_fee.to_currency_string(),
            total = r.total.to_currency_string(),
            id = r.id,
        )
    }
}
