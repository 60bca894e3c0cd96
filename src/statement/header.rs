use std::io::BufRead;

use tracing::debug;

use crate::error::{OfxError, Result};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StringEncoding {
    Utf8,
    Windows1252,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Dialect {
    /// OFX 1.x, colon separated key value header
    Sgml,
    /// OFX 2.x, XML declaration followed by an OFX processing instruction
    Xml,
    /// Body starts immediately
    Bare,
}

#[derive(Debug)]
pub struct Header {
    pub dialect: Dialect,
    pub ofxheader: Option<u32>,
    pub version: Option<u32>,
    pub encoding: StringEncoding,
}

/// Consume whitespace and return the next byte without consuming it
fn peek_non_whitespace<R: BufRead>(src: &mut R) -> Result<Option<u8>> {
    loop {
        let buf = src.fill_buf()?;
        let Some(&first) = buf.first() else {
            return Ok(None);
        };
        if !first.is_ascii_whitespace() {
            return Ok(Some(first));
        }

        let skipped = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        src.consume(skipped);
    }
}

fn skip_bom<R: BufRead>(src: &mut R) -> Result<()> {
    if src.fill_buf()?.starts_with(UTF8_BOM) {
        src.consume(UTF8_BOM.len());
    }
    Ok(())
}

struct Checks {
    strict: bool,
}

impl Checks {
    /// Fail in strict mode, otherwise log and carry on
    fn unrecognized(&self, what: &str, key: &str, value: &str) -> Result<()> {
        if self.strict {
            return Err(OfxError::header(format!("Unrecognized {} {}: {:?}", what, key, value)));
        }
        debug!(key, value, "Ignoring unrecognized {}", what);
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| OfxError::header(format!("Failed to parse {}: {:?}", key, value)))
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<()> {
    if slot.replace(value).is_some() {
        return Err(OfxError::header(format!("Repeated header '{}'", key)));
    }
    Ok(())
}

/// Detect the header dialect and read the header, leaving `src` at the start of the body
pub fn read_header<R: BufRead>(src: &mut R, strict: bool) -> Result<Header> {
    skip_bom(src)?;
    let checks = Checks { strict };

    match peek_non_whitespace(src)? {
        None => Err(OfxError::header("File is empty")),
        Some(b'<') => {
            if src.fill_buf()?.starts_with(b"<?") {
                read_xml_header(src, &checks)
            } else {
                Ok(Header {
                    dialect: Dialect::Bare,
                    ofxheader: None,
                    version: None,
                    encoding: StringEncoding::Utf8,
                })
            }
        }
        Some(b) if b.is_ascii_alphabetic() => read_sgml_header(src, &checks),
        Some(b) => Err(OfxError::header(format!("Invalid character: {}", b))),
    }
}

fn read_sgml_header<R: BufRead>(src: &mut R, checks: &Checks) -> Result<Header> {
    let mut line_buf = Vec::with_capacity(32);

    let mut ofxheader = None;
    let mut version = None;
    let mut charset = None;
    let mut utf8 = false;

    loop {
        // Some exporters omit the blank line before the body
        match src.fill_buf()?.first() {
            None | Some(&b'<') => break,
            _ => {}
        }

        line_buf.clear();
        let _ = src.read_until(b'\n', &mut line_buf)?;

        // Remove newlines
        let line = line_buf.trim_ascii();
        if line.is_empty() {
            // Double newline means end of header
            break;
        }

        let line = String::from_utf8_lossy(line);
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| OfxError::header(format!("Header line missing colon: {:?}", line)))?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "OFXHEADER" => set_once(&mut ofxheader, key, parse_number(key, value)?)?,
            "VERSION" => set_once(&mut version, key, parse_number(key, value)?)?,
            "DATA" => {
                if value != "OFXSGML" {
                    checks.unrecognized("DATA value", key, value)?;
                }
            }
            "ENCODING" => match value {
                "USASCII" => {}
                "UTF-8" | "UNICODE" => utf8 = true,
                v => checks.unrecognized("ENCODING value", key, v)?,
            },
            "CHARSET" => {
                let parsed = match value {
                    "1252" | "NONE" | "8859-1" | "ISO-8859-1" => StringEncoding::Windows1252,
                    "UTF-8" | "65001" => StringEncoding::Utf8,
                    v => {
                        checks.unrecognized("CHARSET value", key, v)?;
                        StringEncoding::Windows1252
                    }
                };
                set_once(&mut charset, key, parsed)?;
            }
            "SECURITY" | "COMPRESSION" | "OLDFILEUID" | "NEWFILEUID" => {
                debug!(key, value, "Header");
            }
            h => checks.unrecognized("header", h, value)?,
        }
    }

    let ofxheader = ofxheader.ok_or_else(|| OfxError::header("Header 'OFXHEADER' missing"))?;
    if ofxheader != 100 {
        return Err(OfxError::header(format!("Unsupported header: {}", ofxheader)));
    }
    if checks.strict && version.is_none() {
        return Err(OfxError::header("Header 'VERSION' missing"));
    }

    let encoding = if utf8 {
        StringEncoding::Utf8
    } else {
        charset.unwrap_or(StringEncoding::Windows1252)
    };

    Ok(Header {
        dialect: Dialect::Sgml,
        ofxheader: Some(ofxheader),
        version,
        encoding,
    })
}

/// Split `key="value" key2="value2"` pairs out of a processing instruction body
fn attributes(body: &str) -> Result<Vec<(&str, &str)>> {
    body.split_ascii_whitespace()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| OfxError::header(format!("Missing value for {:?}", pair)))?;
            let value = value
                .strip_prefix(['"', '\''])
                .and_then(|v| v.strip_suffix(['"', '\'']))
                .ok_or_else(|| OfxError::header(format!("Value not quoted: {:?}", pair)))?;
            Ok((key, value))
        })
        .collect()
}

fn read_processing_instruction<R: BufRead>(src: &mut R, buf: &mut Vec<u8>) -> Result<String> {
    buf.clear();
    let _ = src.read_until(b'>', buf)?;

    let text = String::from_utf8_lossy(buf);
    text.trim()
        .strip_prefix("<?")
        .and_then(|t| t.strip_suffix("?>"))
        .map(str::to_owned)
        .ok_or_else(|| OfxError::header(format!("Malformed processing instruction: {:?}", text)))
}

fn skip_comment<R: BufRead>(src: &mut R, buf: &mut Vec<u8>) -> Result<()> {
    buf.clear();
    while !buf.ends_with(b"-->") {
        if src.read_until(b'>', buf)? == 0 {
            return Err(OfxError::header("Unterminated comment in header"));
        }
    }
    Ok(())
}

fn read_xml_header<R: BufRead>(src: &mut R, checks: &Checks) -> Result<Header> {
    let mut line_buf = Vec::with_capacity(128);

    let mut encoding = None;
    let mut ofxheader = None;
    let mut version = None;
    let mut found_ofx = false;

    while peek_non_whitespace(src)? == Some(b'<') {
        let next = src.fill_buf()?;
        if next.starts_with(b"<!--") {
            skip_comment(src, &mut line_buf)?;
            continue;
        }
        if !next.starts_with(b"<?") {
            break;
        }

        let instruction = read_processing_instruction(src, &mut line_buf)?;
        let (target, body) = instruction
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((instruction.as_str(), ""));

        match target {
            "xml" => {
                for (key, value) in attributes(body)? {
                    match key {
                        "version" => {
                            if value != "1.0" {
                                checks.unrecognized("XML version", key, value)?;
                            }
                        }
                        "encoding" => {
                            let parsed = match value.to_ascii_lowercase().as_str() {
                                "utf-8" => StringEncoding::Utf8,
                                "windows-1252" | "iso-8859-1" | "us-ascii" => {
                                    StringEncoding::Windows1252
                                }
                                _ => {
                                    checks.unrecognized("XML encoding", key, value)?;
                                    StringEncoding::Utf8
                                }
                            };
                            set_once(&mut encoding, key, parsed)?;
                        }
                        "standalone" => {}
                        k => checks.unrecognized("XML header key", k, value)?,
                    }
                }
            }
            "OFX" => {
                found_ofx = true;
                for (key, value) in attributes(body)? {
                    match key {
                        "OFXHEADER" => set_once(&mut ofxheader, key, parse_number(key, value)?)?,
                        "VERSION" => set_once(&mut version, key, parse_number(key, value)?)?,
                        "SECURITY" | "OLDFILEUID" | "NEWFILEUID" => {
                            debug!(key, value, "Header");
                        }
                        k => checks.unrecognized("OFX header key", k, value)?,
                    }
                }
            }
            t => checks.unrecognized("processing instruction", t, body)?,
        }
    }

    if !found_ofx {
        return Err(OfxError::header("Missing OFX processing instruction"));
    }
    let ofxheader = ofxheader.ok_or_else(|| OfxError::header("Header 'OFXHEADER' missing"))?;
    if ofxheader != 200 {
        return Err(OfxError::header(format!("Unsupported header: {}", ofxheader)));
    }

    Ok(Header {
        dialect: Dialect::Xml,
        ofxheader: Some(ofxheader),
        version,
        encoding: encoding.unwrap_or(StringEncoding::Utf8),
    })
}
