#![forbid(unsafe_code)]

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use log::debug;
use log::error;

use sharc_utilities::SharcError;

use crate::ATerm;
use crate::SAF_IDENTIFICATION;
use crate::read_baf;
use crate::read_saf;
use crate::storage::TermStore;

/// The first byte of a binary stream that omits the leading zero, i.e. the
/// first byte of the encoded magic value.
const BAF_MAGIC_FIRST_BYTE: u8 = 0x8B;

/// The formats that [read_term] recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermFormat {
    Binary,
    Streamable,
    Text,
}

impl TermFormat {
    /// Determines the format from the first byte of the input.
    pub fn detect(first: u8) -> TermFormat {
        match first {
            0x00 | BAF_MAGIC_FIRST_BYTE => TermFormat::Binary,
            SAF_IDENTIFICATION => TermFormat::Streamable,
            _ => TermFormat::Text,
        }
    }
}

/// Reads a term in any of the binary, streamable or textual formats, the
/// format is determined from the first byte.
pub fn read_term<'s>(store: &'s TermStore, input: &mut impl Read) -> Result<ATerm<'s>, SharcError> {
    let mut reader = BufReader::new(input);
    let first = *reader.fill_buf()?.first().ok_or("Cannot read a term from empty input")?;

    let format = TermFormat::detect(first);
    debug!("Reading term in {format:?} format");

    match format {
        TermFormat::Binary => read_baf(store, &mut reader),
        TermFormat::Streamable => read_saf(store, &mut reader),
        TermFormat::Text => {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            store.from_string(&text)
        }
    }
}

/// Reads a term from the file at the given path, see [read_term].
pub fn read_term_file<'s>(store: &'s TermStore, path: impl AsRef<Path>) -> Result<ATerm<'s>, SharcError> {
    let path = path.as_ref();
    let result = File::open(path)
        .map_err(SharcError::from)
        .and_then(|mut file| read_term(store, &mut file));

    if let Err(err) = &result {
        error!("Failed to read term from {}: {err}", path.display());
    }
    result
}
