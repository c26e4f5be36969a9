//! Payment gateway notification payload and its mapping onto domain values.

use crate::domain::{Bank, GrossAmount, PaymentType, TransactionStatus};
use crate::TicketgateError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Gateway timestamps are local Western Indonesia Time (UTC+7) without offset.
const GATEWAY_UTC_OFFSET_SECONDS: i32 = 7 * 3600;

const GATEWAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Raw HTTP notification body posted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    /// Our order ID.
    pub order_id: String,
    /// Gateway status code, e.g. `"200"`. Part of the signature.
    pub status_code: String,
    /// Gross amount as rendered by the gateway, e.g. `"150000.00"`. Part of the signature.
    pub gross_amount: String,
    /// Gateway transaction status vocabulary (`settlement`, `capture`, `deny`, ...).
    pub transaction_status: String,
    /// `hex(sha512(order_id + status_code + gross_amount + server_key))`.
    pub signature_key: String,
    /// Fraud screening verdict for card captures.
    #[serde(default)]
    pub fraud_status: Option<String>,
    /// Payment method.
    #[serde(default)]
    pub payment_type: Option<String>,
    /// Settlement time, `YYYY-MM-DD HH:MM:SS` in gateway local time.
    #[serde(default)]
    pub settlement_time: Option<String>,
    /// Virtual account numbers; the first entry names the acquiring bank.
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    /// Gateway-side transaction ID.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Virtual account entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaNumber {
    /// Bank code.
    pub bank: String,
    /// Account number.
    #[serde(default)]
    pub va_number: Option<String>,
}

impl PaymentNotification {
    /// Map the gateway status onto the closed status set.
    ///
    /// `capture` is a card payment: settled once fraud screening accepts it,
    /// still pending while challenged.
    pub fn requested_status(&self) -> Result<TransactionStatus, TicketgateError> {
        let raw = self.transaction_status.trim().to_ascii_lowercase();
        if raw != "capture" {
            return raw.parse();
        }
        match self.fraud_status.as_deref().map(str::trim) {
            None | Some("accept") => Ok(TransactionStatus::Settlement),
            Some("challenge") => Ok(TransactionStatus::Pending),
            Some("deny") => Ok(TransactionStatus::Denied),
            Some(other) => Err(TicketgateError::validation(
                "fraud_status",
                format!("'{}' is not one of the accepted values", other),
            )),
        }
    }

    /// Parsed gross amount.
    pub fn amount(&self) -> Result<GrossAmount, TicketgateError> {
        GrossAmount::parse(&self.gross_amount)
    }

    /// Parsed payment type, if reported.
    pub fn payment_type(&self) -> Result<Option<PaymentType>, TicketgateError> {
        self.payment_type.as_deref().map(str::parse).transpose()
    }

    /// Acquiring bank, if reported.
    pub fn bank(&self) -> Result<Option<Bank>, TicketgateError> {
        self.va_numbers
            .first()
            .map(|va| va.bank.parse())
            .transpose()
    }

    /// Parsed settlement time, if reported.
    pub fn settlement_time(&self) -> Result<Option<DateTime<Utc>>, TicketgateError> {
        self.settlement_time
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_gateway_time)
            .transpose()
    }
}

/// Parse a gateway-local timestamp into UTC.
pub fn parse_gateway_time(raw: &str) -> Result<DateTime<Utc>, TicketgateError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), GATEWAY_TIME_FORMAT).map_err(|e| {
        TicketgateError::validation("settlement_time", format!("'{}' ({})", raw, e))
    })?;
    let offset = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECONDS)
        .ok_or_else(|| TicketgateError::validation("settlement_time", "invalid offset"))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TicketgateError::validation("settlement_time", format!("'{}' is ambiguous", raw)))
}
