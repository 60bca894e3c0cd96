use std::fmt;

use crate::amount::{Amount, Sign};
use crate::datetime::OfxDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AccountKind {
    #[default]
    Unknown,
    Checking,
    Savings,
}

impl AccountKind {
    pub fn from_account_type(value: &str) -> Self {
        match value {
            "CHECKING" => Self::Checking,
            "SAVINGS" => Self::Savings,
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Checking => "Checking",
            Self::Savings => "Savings",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    #[default]
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn from_amount(amount: &Amount) -> Self {
        match amount.sign() {
            Sign::Positive => Self::Credit,
            Sign::Zero | Sign::Negative => Self::Debit,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub description: String,
    pub memo: String,
    pub posted_date: Option<OfxDateTime>,
    pub user_date: Option<OfxDateTime>,
    pub id: String,
    pub amount: Amount,
}

impl Transaction {
    /// Set the amount and derive the transaction kind from its sign
    pub fn set_amount(&mut self, amount: Amount) {
        self.kind = TransactionKind::from_amount(&amount);
        self.amount = amount;
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T: {} Desc: {} Post Date: ", self.kind.name(), self.description)?;
        match &self.posted_date {
            Some(date) => write!(f, "{}", date)?,
            None => f.write_str("-")?,
        }
        write!(f, " ID: {} Amount: {}", self.id, self.amount)
    }
}

/// A parsed statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ofx {
    pub kind: AccountKind,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub transactions: Vec<Transaction>,
}

impl Ofx {
    pub fn balance(&self) -> Amount {
        self.transactions.iter().map(|t| &t.amount).sum()
    }
}

impl fmt::Display for Ofx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Account Type: {}", self.kind.name())?;
        writeln!(f, "Bank Code: {}", self.bank_code)?;
        writeln!(f, "Branch Code: {}", self.branch_code)?;
        writeln!(f, "Account Number: {}", self.account_number)?;
        for transaction in &self.transactions {
            writeln!(f, "{}", transaction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_amount_sign() {
        let mut transaction = Transaction::default();

        transaction.set_amount("12.00".parse().unwrap());
        assert_eq!(transaction.kind, TransactionKind::Credit);

        transaction.set_amount("0".parse().unwrap());
        assert_eq!(transaction.kind, TransactionKind::Debit);

        transaction.set_amount("-3.10".parse().unwrap());
        assert_eq!(transaction.kind, TransactionKind::Debit);
    }

    #[test]
    fn balance_of_large_amounts() {
        let ofx = Ofx {
            transactions: ["79228162514264337593543950335", "1"]
                .iter()
                .map(|a| {
                    let mut transaction = Transaction::default();
                    transaction.set_amount(a.parse().unwrap());
                    transaction
                })
                .collect(),
            ..Default::default()
        };

        assert_eq!(ofx.balance().to_string(), "79228162514264337593543950336");
    }

    #[test]
    fn account_kind_from_tag_value() {
        assert_eq!(AccountKind::from_account_type("CHECKING"), AccountKind::Checking);
        assert_eq!(AccountKind::from_account_type("SAVINGS"), AccountKind::Savings);
        assert_eq!(AccountKind::from_account_type("CREDITLINE"), AccountKind::Unknown);
    }

    #[test]
    fn display_lists_transactions_in_order() {
        let mut ofx = Ofx {
            account_number: "098-121".to_owned(),
            ..Default::default()
        };
        for id in ["a", "b"] {
            ofx.transactions.push(Transaction {
                id: id.to_owned(),
                ..Default::default()
            });
        }

        let text = ofx.to_string();
        assert!(text.contains("Account Number: 098-121"));
        let a = text.find("ID: a").unwrap();
        let b = text.find("ID: b").unwrap();
        assert!(a < b);
    }
}
