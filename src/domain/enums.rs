//! Closed value sets for roles and transaction fields.
//!
//! Every enum-like field crosses the wire as a string. Parsing happens once,
//! at the boundary, through [`FromStr`]; a value outside the set is a
//! validation error naming the field.

use crate::TicketgateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every member of the set.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TicketgateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(TicketgateError::validation(
                        $field,
                        format!("'{}' is not one of the accepted values", other),
                    )),
                }
            }
        }
    };
}

closed_enum! {
    /// Role carried in identity claims.
    Role, field = "role" {
        /// Staff: check-in, artifact maintenance.
        Admin => "admin",
        /// Ticket buyer.
        Guest => "guest",
    }
}

closed_enum! {
    /// What a transaction pays for.
    ItemType, field = "item_type" {
        /// Event admission.
        Ticket => "ticket",
        /// Merchandise.
        Merch => "merch",
        /// Ticket and merchandise together.
        Bundle => "bundle",
    }
}

closed_enum! {
    /// Pricing audience of a purchase.
    AudienceType, field = "audience_type" {
        /// General public.
        General => "general",
        /// Student pricing.
        Student => "student",
    }
}

closed_enum! {
    /// Payment method reported by the gateway.
    PaymentType, field = "payment_type" {
        /// Card payment.
        CreditCard => "credit_card",
        /// Virtual account bank transfer.
        BankTransfer => "bank_transfer",
        /// Mandiri bill payment.
        Echannel => "echannel",
        /// GoPay e-wallet.
        Gopay => "gopay",
        /// ShopeePay e-wallet.
        Shopeepay => "shopeepay",
        /// QRIS.
        Qris => "qris",
        /// Convenience store.
        Cstore => "cstore",
    }
}

closed_enum! {
    /// Acquiring bank for virtual account payments.
    Bank, field = "bank" {
        /// Bank Central Asia.
        Bca => "bca",
        /// Bank Negara Indonesia.
        Bni => "bni",
        /// Bank Rakyat Indonesia.
        Bri => "bri",
        /// Bank Mandiri.
        Mandiri => "mandiri",
        /// Permata Bank.
        Permata => "permata",
        /// CIMB Niaga.
        Cimb => "cimb",
    }
}

closed_enum! {
    /// Transaction status.
    TransactionStatus, field = "transaction_status" {
        /// Purchase intent registered, waiting for payment.
        Pending => "pending",
        /// Funds cleared.
        Settlement => "settlement",
        /// Payment failed.
        Failure => "failure",
        /// Payment window elapsed.
        Expired => "expire",
        /// Cancelled before settlement.
        Cancelled => "cancel",
        /// Rejected by the gateway or fraud screening.
        Denied => "deny",
        /// Settled funds returned.
        Refund => "refund",
    }
}
