pub mod amount;
pub mod config;
pub mod datetime;
pub mod error;
pub mod model;
pub mod statement;

pub use amount::{Amount, Sign};
pub use config::ParserConfig;
pub use datetime::{OfxDateTime, parse_datetime};
pub use error::{FieldRole, LexError, OfxError};
pub use model::{AccountKind, Ofx, Transaction, TransactionKind};
pub use statement::{read_document, read_file};
