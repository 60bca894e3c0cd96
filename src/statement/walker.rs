use std::mem;

use tracing::{debug, trace};

use crate::amount::Amount;
use crate::config::ParserConfig;
use crate::datetime::parse_datetime;
use crate::error::{LexError, OfxError, Result};
use crate::model::{AccountKind, Ofx, Transaction};
use crate::statement::lexer::Token;

const STATEMENT_TRANSACTION: &[u8] = b"STMTTRN";

/// Field which receives the next character data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    AccountId,
    BranchId,
    BankId,
    AccountType,
    TransAmount,
    TransDatePosted,
    TransUserDate,
    TransId,
    TransDesc,
    TransMemo,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"ACCTID" => Some(Self::AccountId),
            b"BRANCHID" => Some(Self::BranchId),
            b"BANKID" => Some(Self::BankId),
            b"ACCTTYPE" => Some(Self::AccountType),
            b"TRNAMT" => Some(Self::TransAmount),
            b"DTPOSTED" => Some(Self::TransDatePosted),
            b"DTUSER" => Some(Self::TransUserDate),
            b"FITID" => Some(Self::TransId),
            b"NAME" => Some(Self::TransDesc),
            b"MEMO" => Some(Self::TransMemo),
            _ => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::AccountId => "ACCTID",
            Self::BranchId => "BRANCHID",
            Self::BankId => "BANKID",
            Self::AccountType => "ACCTTYPE",
            Self::TransAmount => "TRNAMT",
            Self::TransDatePosted => "DTPOSTED",
            Self::TransUserDate => "DTUSER",
            Self::TransId => "FITID",
            Self::TransDesc => "NAME",
            Self::TransMemo => "MEMO",
        }
    }
}

struct Walker<'a> {
    stack: Vec<&'a [u8]>,
    armed: Field,
    transaction: Option<Transaction>,
    ofx: Ofx,
}

impl<'a> Walker<'a> {
    fn new(config: &ParserConfig) -> Self {
        Self {
            stack: Vec::with_capacity(config.stack_capacity),
            armed: Field::None,
            transaction: None,
            ofx: Ofx::default(),
        }
    }

    fn open(&mut self, name: &'a [u8]) {
        self.stack.push(name);

        if name == STATEMENT_TRANSACTION {
            if let Some(discarded) = self.transaction.replace(Transaction::default()) {
                debug!(id = %discarded.id, "Discarding unsealed transaction");
            }
        }
        // An unrecognized tag also disarms, so empty SGML leaves stay empty
        self.armed = Field::from_tag(name).unwrap_or(Field::None);
    }

    /// The in progress transaction for a transaction scoped field
    fn transaction(&mut self, field: Field) -> Option<&mut Transaction> {
        if self.transaction.is_none() {
            debug!(tag = field.tag(), "Dropping value outside of a transaction");
        }
        self.transaction.as_mut()
    }

    fn text(&mut self, value: &str) -> Result<()> {
        let value = value.trim();

        // Each open tag governs at most one value
        let field = mem::replace(&mut self.armed, Field::None);
        match field {
            Field::None => trace!(value, "Dropping unarmed value"),
            Field::AccountId => self.ofx.account_number = value.to_owned(),
            Field::BranchId => self.ofx.branch_code = value.to_owned(),
            Field::BankId => self.ofx.bank_code = value.to_owned(),
            Field::AccountType => self.ofx.kind = AccountKind::from_account_type(value),
            Field::TransDesc => {
                if let Some(t) = self.transaction(field) {
                    t.description = value.to_owned();
                }
            }
            Field::TransMemo => {
                if let Some(t) = self.transaction(field) {
                    t.memo = value.to_owned();
                }
            }
            Field::TransId => {
                if let Some(t) = self.transaction(field) {
                    t.id = value.to_owned();
                }
            }
            Field::TransDatePosted => {
                if let Some(t) = self.transaction(field) {
                    t.posted_date = Some(parse_datetime(value).map_err(|e| e.in_field(field.tag()))?);
                }
            }
            Field::TransUserDate => {
                if let Some(t) = self.transaction(field) {
                    t.user_date = Some(parse_datetime(value).map_err(|e| e.in_field(field.tag()))?);
                }
            }
            Field::TransAmount => {
                if let Some(t) = self.transaction(field) {
                    let amount = value
                        .parse::<Amount>()
                        .map_err(|e| e.in_field(field.tag()))?;
                    t.set_amount(amount);
                }
            }
        }

        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        // An empty element such as <MEMO/> must not capture the next value
        self.armed = Field::None;

        // Closing tags may be missing, so pop until the matching open tag
        while let Some(top) = self.stack.pop() {
            if top == STATEMENT_TRANSACTION {
                self.seal();
            }

            if top == name {
                break;
            }
        }
    }

    fn seal(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            self.ofx.transactions.push(transaction);
        }
    }

    fn fail(self, source: LexError) -> OfxError {
        OfxError::TokenStream {
            source,
            partial: Box::new(self.ofx),
        }
    }
}

/// Build an [`Ofx`] from a stream of markup tokens.
///
/// Malformed amounts and dates abort the walk. A tokenizer error is returned
/// as [`OfxError::TokenStream`] carrying everything read up to that point.
pub fn walk<'a, I>(tokens: I, config: &ParserConfig) -> Result<Ofx>
where
    I: IntoIterator<Item = std::result::Result<Token<'a>, LexError>>,
{
    let mut walker = Walker::new(config);

    for token in tokens {
        match token {
            Ok(Token::Open(name)) => walker.open(name),
            Ok(Token::Text(value)) => walker.text(&value)?,
            Ok(Token::Close(name)) => walker.close(name),
            Ok(Token::Other(raw)) => trace!(token = %String::from_utf8_lossy(raw), "Ignoring token"),
            Err(e) => return Err(walker.fail(e)),
        }
    }

    Ok(walker.ofx)
}
