//! Back-office list screens as configuration over the generic list and export components

use serde::{Deserialize, Serialize};

use crate::models::{QueryFilters, SEARCH_KEY};
use crate::validation::{check_date_range, check_required, FilterSchema, ValidationError};

const FROM_KEY: &str = "from";
const TO_KEY: &str = "to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    Investors,
    Transactions,
    PendingTransactions,
    Payouts,
    Withdrawals,
    Tally,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Investors,
        Resource::Transactions,
        Resource::PendingTransactions,
        Resource::Payouts,
        Resource::Withdrawals,
        Resource::Tally,
    ];

    pub fn parse(name: &str) -> Result<Self, anyhow::Error> {
        match name.to_lowercase().as_str() {
            "investors" | "investor" => Ok(Resource::Investors),
            "transactions" | "transaction" => Ok(Resource::Transactions),
            "pending" | "pending-transactions" | "pending_transactions" => {
                Ok(Resource::PendingTransactions)
            }
            "payouts" | "payout" => Ok(Resource::Payouts),
            "withdrawals" | "withdrawal" => Ok(Resource::Withdrawals),
            "tally" => Ok(Resource::Tally),
            other => Err(anyhow::anyhow!(
                "Unsupported resource: {}. Supported resources: investors, transactions, pending, payouts, withdrawals, tally",
                other
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Resource::Investors => "investors",
            Resource::Transactions => "transactions",
            Resource::PendingTransactions => "pending",
            Resource::Payouts => "payouts",
            Resource::Withdrawals => "withdrawals",
            Resource::Tally => "tally",
        }
    }

    /// Collection endpoint, relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            Resource::Investors => "/investors",
            Resource::Transactions => "/transactions",
            Resource::PendingTransactions => "/transactions/pending",
            Resource::Payouts => "/payouts",
            Resource::Withdrawals => "/withdrawals",
            Resource::Tally => "/tally",
        }
    }

    pub fn export_endpoint(&self) -> String {
        format!("{}/export", self.endpoint())
    }

    /// Filter names this screen sends besides `page` and `limit`
    pub fn filter_keys(&self) -> &'static [&'static str] {
        match self {
            Resource::Investors => &[SEARCH_KEY, "status"],
            Resource::Transactions => &[SEARCH_KEY, "type", "investorId", FROM_KEY, TO_KEY],
            Resource::PendingTransactions => {
                &[SEARCH_KEY, "status", "type", "investorId", FROM_KEY, TO_KEY]
            }
            Resource::Payouts => &[SEARCH_KEY, "status", "investorId", FROM_KEY, TO_KEY],
            Resource::Withdrawals => &[SEARCH_KEY, "status", "investorId", FROM_KEY, TO_KEY],
            Resource::Tally => &[FROM_KEY, TO_KEY],
        }
    }

    pub fn required_filters(&self) -> &'static [&'static str] {
        match self {
            Resource::Tally => &[FROM_KEY, TO_KEY],
            _ => &[],
        }
    }

    fn has_date_range(&self) -> bool {
        self.filter_keys().contains(&FROM_KEY)
    }

    /// Fields shown for each row, in order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Resource::Investors => &["id", "name", "email", "phone", "balance", "status"],
            Resource::Transactions => &["id", "investorName", "type", "amount", "status", "createdAt"],
            Resource::PendingTransactions => {
                &["id", "investorName", "type", "amount", "status", "createdAt"]
            }
            Resource::Payouts => &["id", "investorName", "amount", "tds", "netAmount", "status", "payoutDate"],
            Resource::Withdrawals => &["id", "investorName", "amount", "status", "requestedAt"],
            Resource::Tally => &["date", "credit", "debit", "balance"],
        }
    }
}

impl FilterSchema for Resource {
    fn validate(&self, filters: &QueryFilters) -> Result<(), ValidationError> {
        let allowed = self.filter_keys();
        if let Some((key, _)) = filters.values().find(|(key, _)| !allowed.contains(key)) {
            return Err(ValidationError::UnknownFilter(key.to_string()));
        }

        for field in self.required_filters() {
            check_required(filters, field)?;
        }

        if self.has_date_range() {
            check_date_range(filters, FROM_KEY, TO_KEY)?;
        }

        Ok(())
    }
}
