// Reads OFX 1.x (SGML) and 2.x (XML) bank and credit card statements

pub mod header;
pub mod lexer;
mod walker;

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

pub use walker::walk;

use crate::config::ParserConfig;
use crate::error::Result;
use crate::model::Ofx;
use crate::statement::lexer::Lexer;

/// Read a whole document: header, then body
pub fn read_document<R: BufRead>(mut reader: R, config: &ParserConfig) -> Result<Ofx> {
    let header = header::read_header(&mut reader, config.strict_header)?;
    debug!(
        dialect = ?header.dialect,
        version = ?header.version,
        encoding = ?header.encoding,
        "Read header"
    );

    // Load whole body
    let mut contents = Vec::new();
    reader.read_to_end(&mut contents)?;

    let lexer = Lexer::new(contents, header.encoding);
    walk(lexer.tokens(), config)
}

pub fn read_file(path: &Path, config: &ParserConfig) -> Result<Ofx> {
    let reader = BufReader::new(File::open(path)?);
    read_document(reader, config)
}
