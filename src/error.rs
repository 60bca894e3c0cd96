use std::fmt;

use thiserror::Error;

use crate::model::Ofx;

/// Tag whose character data failed to parse, when known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRole(Option<&'static str>);

impl FieldRole {
    pub fn tag(&self) -> Option<&'static str> {
        self.0
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(tag) => write!(f, " in <{}>", tag),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Start of tag inside tag at byte {0}")]
    NestedTagStart(usize),
    #[error("End of tag without start of tag at byte {0}")]
    UnmatchedTagEnd(usize),
    #[error("Slash in tag name at byte {0}")]
    SlashInTagName(usize),
    #[error("Empty tag name at byte {0}")]
    EmptyTagName(usize),
    #[error("End of file inside tag starting at byte {0}")]
    UnterminatedTag(usize),
    #[error("Failed to decode text at byte {0}")]
    Undecodable(usize),
    #[error("Unknown entity reference '&{entity};' at byte {offset}")]
    BadEntity { entity: String, offset: usize },
}

#[derive(Debug, Error)]
pub enum OfxError {
    #[error("Unable to parse '{text}' as an amount{field}")]
    InvalidAmount { text: String, field: FieldRole },

    #[error("Invalid date/time string '{text}'{field}")]
    InvalidDateTime { text: String, field: FieldRole },

    #[error("Token stream failed after {} transactions: {source}", .partial.transactions.len())]
    TokenStream {
        #[source]
        source: LexError,
        partial: Box<Ofx>,
    },

    #[error("Malformed header: {reason}")]
    Header { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OfxError {
    pub(crate) fn invalid_amount(text: &str) -> Self {
        OfxError::InvalidAmount {
            text: text.to_owned(),
            field: FieldRole(None),
        }
    }

    pub(crate) fn invalid_datetime(text: &str) -> Self {
        OfxError::InvalidDateTime {
            text: text.to_owned(),
            field: FieldRole(None),
        }
    }

    pub(crate) fn header(reason: impl Into<String>) -> Self {
        OfxError::Header {
            reason: reason.into(),
        }
    }

    /// Attach the tag the failing value was read from
    pub(crate) fn in_field(mut self, tag: &'static str) -> Self {
        match &mut self {
            OfxError::InvalidAmount { field, .. } | OfxError::InvalidDateTime { field, .. } => {
                *field = FieldRole(Some(tag));
            }
            _ => {}
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, OfxError>;
