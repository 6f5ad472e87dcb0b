//! The binary ATerm format (BAF), a compact encoding of a single maximally
//! shared term.
//!
//! # Details
//!
//! The stream starts with a header of variable-length integers, followed by a
//! table of all symbols that occur in the term. For every argument position
//! of a symbol the table lists the symbols that occur at that position, so an
//! argument can be identified by a code of only a few bits. Every node of the
//! term is then written exactly once, subsequent occurrences are written as
//! the instance index of the node among the nodes with the same symbol.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use log::debug;
use log::error;
use log::warn;
use rustc_hash::FxHashMap;
use thiserror::Error;

use sharc_io::BitStreamRead;
use sharc_io::BitStreamReader;
use sharc_io::BitStreamWrite;
use sharc_io::BitStreamWriter;
use sharc_number::bits_for_count;
use sharc_utilities::SharcError;
use sharc_utilities::debug_trace;

use crate::ATerm;
use crate::Symb;
use crate::Symbol;
use crate::Term;
use crate::storage::EMPTY_LIST_SYMBOL;
use crate::storage::INT_SYMBOL;
use crate::storage::LIST_SYMBOL;
use crate::storage::SharedSymbol;
use crate::storage::SharedTerm;
use crate::storage::TermStore;

/// The magic value that identifies a binary ATerm stream.
pub const BAF_MAGIC: u32 = 0xBAF;

/// The version of the binary format that is written and accepted.
pub const BAF_VERSION: u32 = 0x0300;

/// The number of bits used for the value of an integer term.
const INT_SIZE_IN_BAF: u32 = 32;

/// The ways in which a binary ATerm stream can be malformed.
#[derive(Debug, Error)]
pub enum BafError {
    #[error("not a binary ATerm stream, found magic {0:#x} instead of {BAF_MAGIC:#x}")]
    BadMagic(u32),

    #[error("unsupported binary ATerm version {0:#06x}, expected {BAF_VERSION:#06x}")]
    BadVersion(u32),

    #[error("symbol {0} is declared without any terms")]
    EmptySymbol(String),

    #[error("argument table of symbol {symbol} refers to symbol {index}, but there are only {count} symbols")]
    TableIndexOutOfRange { symbol: String, index: usize, count: usize },

    #[error("root refers to symbol {index}, but there are only {count} symbols")]
    RootOutOfRange { index: usize, count: usize },

    #[error("code {code} at argument {position} of symbol {symbol} exceeds the table of length {length}")]
    CodeOutOfRange {
        symbol: String,
        position: usize,
        code: usize,
        length: usize,
    },

    #[error("instance {index} of symbol {symbol} is out of range, it has {count} terms")]
    TermIndexOutOfRange { symbol: String, index: usize, count: usize },

    #[error("symbol {symbol} brings the declared terms to {declared}, but the header declares {count} terms")]
    TooManyTerms { symbol: String, declared: usize, count: usize },

    #[error("instance {index} of symbol {symbol} occurs in its own arguments")]
    CyclicTerm { symbol: String, index: usize },

    #[error("the tail of a list node is not a list")]
    NonListTail,
}

/// Writes the term in the binary ATerm format to the given output.
pub fn write_baf<'a, 'b>(term: &impl Term<'a, 'b>, output: &mut impl Write) -> Result<(), SharcError> {
    let store = term.store();
    let root = term.shared();

    // The pool is borrowed for the whole write, no handles are created or dropped in the meantime.
    let pool = store.symbol_pool();

    // Discover every distinct node in postorder, counting the nodes per symbol.
    let nodes = postorder(root);
    for node in &nodes {
        pool.increment_usage(node.symbol().id());
    }

    let mut entries: Vec<WriteEntry<'_>> = Vec::new();
    let mut entry_of: FxHashMap<usize, usize> = FxHashMap::default();
    for id in pool.take_used() {
        let symbol = pool.get(id).ok_or("A used symbol is alive")?;
        entry_of.insert(id, entries.len());
        entries.push(WriteEntry {
            symbol,
            terms: Vec::new(),
            term_width: 0,
            tables: Vec::new(),
            claimed: 0,
        });
    }

    let mut instance_of: FxHashMap<SharedTerm, usize> = FxHashMap::default();
    for node in &nodes {
        let entry = &mut entries[entry_of[&node.symbol().id()]];
        instance_of.insert(*node, entry.terms.len());
        entry.terms.push(*node);
    }

    build_argument_tables(&mut entries, &entry_of);

    debug!(
        "Writing binary term with {} symbols and {} unique terms",
        entries.len(),
        nodes.len()
    );

    let mut stream = BitStreamWriter::new(output);
    stream.write_integer(0)?;
    stream.write_integer(BAF_MAGIC.into())?;
    stream.write_integer(BAF_VERSION.into())?;
    stream.write_integer(entries.len() as u64)?;
    stream.write_integer(nodes.len() as u64)?;

    for entry in &entries {
        stream.write_string(entry.symbol.name())?;
        stream.write_integer(entry.symbol.arity() as u64)?;
        stream.write_integer(entry.symbol.is_quoted().into())?;
        stream.write_integer(entry.terms.len() as u64)?;

        for table in &entry.tables {
            stream.write_integer(table.entries.len() as u64)?;
            for index in &table.entries {
                stream.write_integer(*index as u64)?;
            }
        }
    }

    let root_entry = entry_of[&root.symbol().id()];
    debug_assert_eq!(
        entries[root_entry].terms.last(),
        Some(&root),
        "The root is the last discovered node of its symbol"
    );
    stream.write_integer(root_entry as u64)?;

    // The contents of a node are written at its first occurrence, after which its instance is claimed.
    let mut stack: Vec<WriteFrame> = Vec::new();
    begin_node(&mut stream, &mut stack, root, root_entry)?;

    while let Some(frame) = stack.last_mut() {
        let entry = &entries[frame.entry];
        if frame.position < entry.tables.len() {
            let table = &entry.tables[frame.position];
            let argument = frame.term.argument(frame.position);
            frame.position += 1;

            let argument_entry = entry_of[&argument.symbol().id()];
            let instance = instance_of[&argument];
            let term_width = entries[argument_entry].term_width;

            stream.write_bits(table.codes[&argument_entry], table.code_width)?;
            stream.write_bits(instance as u64, term_width)?;

            // Unclaimed instances, including those of the same symbol below this node, have not been written yet.
            if instance >= entries[argument_entry].claimed {
                begin_node(&mut stream, &mut stack, argument, argument_entry)?;
            }
        } else {
            let WriteFrame { term, entry, .. } = *frame;
            stack.pop();

            let entry = &mut entries[entry];
            debug_assert_eq!(entry.terms[entry.claimed], term, "Terms out of sync");
            debug_trace!("Claimed instance {} of {}", entry.claimed, entry.symbol.name());
            entry.claimed += 1;
        }
    }

    stream.flush()?;
    Ok(())
}

/// Writes the term in the binary ATerm format to a byte vector.
pub fn write_baf_to_bytes<'a, 'b>(term: &impl Term<'a, 'b>) -> Result<Vec<u8>, SharcError> {
    let mut bytes = Vec::new();
    write_baf(term, &mut bytes)?;
    Ok(bytes)
}

/// Writes the term in the binary ATerm format to the file at the given path.
pub fn write_baf_file<'a, 'b>(term: &impl Term<'a, 'b>, path: impl AsRef<Path>) -> Result<(), SharcError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_baf(term, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a term in the binary ATerm format from the given input.
pub fn read_baf<'s>(store: &'s TermStore, input: &mut impl Read) -> Result<ATerm<'s>, SharcError> {
    let mut stream = BitStreamReader::new(input);

    let mut magic = stream.read_integer()?;
    if magic == 0 {
        magic = stream.read_integer()?;
    }
    if magic != BAF_MAGIC {
        return Err(BafError::BadMagic(magic).into());
    }

    let version = stream.read_integer()?;
    if version != BAF_VERSION {
        return Err(BafError::BadVersion(version).into());
    }

    let number_of_symbols = stream.read_integer()? as usize;
    let number_of_terms = stream.read_integer()? as usize;
    debug!("Reading binary term with {number_of_symbols} symbols and {number_of_terms} unique terms");

    // The term counts of the symbols add up to the number of terms in the header.
    let mut entries: Vec<ReadEntry<'s>> = Vec::new();
    let mut declared = 0usize;
    for _ in 0..number_of_symbols {
        let entry = read_symbol_entry(store, &mut stream, number_of_symbols)?;
        declared = declared.saturating_add(entry.term_count);
        if declared > number_of_terms {
            return Err(BafError::TooManyTerms {
                symbol: entry.symbol.name().to_string(),
                declared,
                count: number_of_terms,
            }
            .into());
        }
        entries.push(entry);
    }

    let root_entry = stream.read_integer()? as usize;
    if root_entry >= entries.len() {
        return Err(BafError::RootOutOfRange {
            index: root_entry,
            count: entries.len(),
        }
        .into());
    }

    let mut root: Option<ATerm<'s>> = None;
    let mut stack: Vec<ReadFrame<'s>> = Vec::new();
    let root_instance = entries[root_entry].term_count - 1;
    begin_slot(&mut stream, &mut entries, &mut stack, root_entry, root_instance)?;

    while let Some(frame) = stack.last() {
        let entry = &entries[frame.entry];
        if frame.arguments.len() < entry.tables.len() {
            let position = frame.arguments.len();
            let table = &entry.tables[position];

            let code = stream.read_bits(table.code_width)? as usize;
            let argument_entry = *table.entries.get(code).ok_or_else(|| BafError::CodeOutOfRange {
                symbol: entry.symbol.name().to_string(),
                position,
                code,
                length: table.entries.len(),
            })?;

            let argument = &entries[argument_entry];
            let instance = stream.read_bits(argument.term_width)? as usize;
            if instance >= argument.term_count {
                return Err(BafError::TermIndexOutOfRange {
                    symbol: argument.symbol.name().to_string(),
                    index: instance,
                    count: argument.term_count,
                }
                .into());
            }

            let decoded = match argument.slots.get(&instance) {
                Some(Slot::Done(term)) => Some(term.clone()),
                Some(Slot::Pending) => {
                    return Err(BafError::CyclicTerm {
                        symbol: argument.symbol.name().to_string(),
                        index: instance,
                    }
                    .into());
                }
                None => None,
            };

            match decoded {
                Some(term) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.arguments.push(term);
                    }
                }
                None => begin_slot(&mut stream, &mut entries, &mut stack, argument_entry, instance)?,
            }
        } else {
            let frame = stack.pop().ok_or("The frame stack is not empty")?;
            let entry = &mut entries[frame.entry];
            let term = construct(store, entry, frame.value, &frame.arguments)?;

            debug_trace!("Decoded instance {} of {}: {:?}", frame.instance, entry.symbol.name(), term);
            entry.slots.insert(frame.instance, Slot::Done(term.clone()));

            match stack.last_mut() {
                Some(parent) => parent.arguments.push(term),
                None => root = Some(term),
            }
        }
    }

    Ok(root.ok_or("The binary stream did not contain a root term")?)
}

/// Reads a term in the binary ATerm format from a byte slice.
pub fn read_baf_from_bytes<'s>(store: &'s TermStore, mut bytes: &[u8]) -> Result<ATerm<'s>, SharcError> {
    read_baf(store, &mut bytes)
}

/// Reads a term in the binary ATerm format from the file at the given path.
pub fn read_baf_file<'s>(store: &'s TermStore, path: impl AsRef<Path>) -> Result<ATerm<'s>, SharcError> {
    let path = path.as_ref();
    let result = File::open(path)
        .map_err(SharcError::from)
        .and_then(|file| read_baf(store, &mut BufReader::new(file)));

    if let Err(err) = &result {
        error!("Failed to read binary term from {}: {err}", path.display());
    }
    result
}

/// A symbol that occurs in the term being written.
struct WriteEntry<'p> {
    symbol: &'p SharedSymbol,

    /// The nodes with this symbol, in order of discovery.
    terms: Vec<SharedTerm>,
    term_width: u32,

    /// For every argument position the symbols that occur there.
    tables: Vec<ArgumentTable>,

    /// The number of nodes whose contents have been written, in order of discovery.
    claimed: usize,
}

/// The symbols that occur at one argument position, ordered by descending frequency.
struct ArgumentTable {
    entries: Vec<usize>,
    codes: FxHashMap<usize, u64>,
    code_width: u32,
}

/// A node whose arguments are being written.
#[derive(Clone, Copy)]
struct WriteFrame {
    term: SharedTerm,
    entry: usize,
    position: usize,
}

/// Returns the distinct nodes of the term in postorder, visiting the arguments from left to right.
fn postorder(root: SharedTerm) -> Vec<SharedTerm> {
    let mut visited: FxHashMap<SharedTerm, ()> = FxHashMap::default();
    let mut result = Vec::new();
    let mut stack = vec![(root, false)];

    while let Some((term, expanded)) = stack.pop() {
        if visited.contains_key(&term) {
            continue;
        }

        if expanded {
            visited.insert(term, ());
            result.push(term);
        } else {
            stack.push((term, true));
            for position in (0..term.symbol().arity()).rev() {
                let argument = term.argument(position);
                if !visited.contains_key(&argument) {
                    stack.push((argument, false));
                }
            }
        }
    }

    result
}

/// Determines the top symbol tables of all argument positions, and the widths of codes and instance indices.
fn build_argument_tables(entries: &mut [WriteEntry<'_>], entry_of: &FxHashMap<usize, usize>) {
    for entry in entries.iter_mut() {
        entry.term_width = bits_for_count(entry.terms.len());

        for position in 0..entry.symbol.arity() {
            // Counts per symbol entry, in order of first appearance.
            let mut counts: Vec<(usize, usize)> = Vec::new();
            let mut position_of: FxHashMap<usize, usize> = FxHashMap::default();

            for term in &entry.terms {
                let argument_entry = entry_of[&term.argument(position).symbol().id()];
                match position_of.get(&argument_entry) {
                    Some(index) => counts[*index].1 += 1,
                    None => {
                        position_of.insert(argument_entry, counts.len());
                        counts.push((argument_entry, 1));
                    }
                }
            }

            // The sort is stable, so ties stay in order of first appearance.
            counts.sort_by(|left, right| right.1.cmp(&left.1));

            let table_entries: Vec<usize> = counts.iter().map(|(index, _)| *index).collect();
            let codes = table_entries
                .iter()
                .enumerate()
                .map(|(code, index)| (*index, code as u64))
                .collect();

            entry.tables.push(ArgumentTable {
                code_width: bits_for_count(table_entries.len()),
                entries: table_entries,
                codes,
            });
        }
    }
}

/// Writes the payload of a node at its first occurrence and schedules its arguments.
fn begin_node<W: Write>(
    stream: &mut BitStreamWriter<W>,
    stack: &mut Vec<WriteFrame>,
    term: SharedTerm,
    entry: usize,
) -> Result<(), SharcError> {
    if term.symbol().id() == INT_SYMBOL {
        let value = term.value();
        if i32::try_from(value).is_err() {
            warn!("losing precision of integer {value} in binary format, only {INT_SIZE_IN_BAF} bits are written");
        }

        stream.write_bits(value as u32 as u64, INT_SIZE_IN_BAF)?;
    }

    stack.push(WriteFrame {
        term,
        entry,
        position: 0,
    });
    Ok(())
}

/// A symbol declared in the stream being read.
struct ReadEntry<'s> {
    symbol: Symbol<'s>,
    term_count: usize,
    term_width: u32,
    tables: Vec<ReadTable>,

    /// The instances that have been decoded or are being decoded, a declared
    /// term count does not determine the size of this map.
    slots: FxHashMap<usize, Slot<'s>>,
}

struct ReadTable {
    entries: Vec<usize>,
    code_width: u32,
}

/// The decoding state of a single instance.
enum Slot<'s> {
    Pending,
    Done(ATerm<'s>),
}

/// An instance whose arguments are being decoded.
struct ReadFrame<'s> {
    entry: usize,
    instance: usize,
    value: i64,
    arguments: Vec<ATerm<'s>>,
}

/// Reads the declaration of a single symbol including its argument tables.
fn read_symbol_entry<'s, R: Read>(
    store: &'s TermStore,
    stream: &mut BitStreamReader<R>,
    number_of_symbols: usize,
) -> Result<ReadEntry<'s>, SharcError> {
    let name = stream.read_string()?;
    let arity = stream.read_integer()? as usize;
    let quoted = stream.read_integer()? != 0;
    let term_count = stream.read_integer()? as usize;

    if term_count == 0 {
        return Err(BafError::EmptySymbol(name).into());
    }

    let symbol = store.symbol(&name, arity, quoted);

    // Integers and the empty list have no arguments, whatever the declared arity.
    let positions = match symbol.index() {
        INT_SYMBOL | EMPTY_LIST_SYMBOL => 0,
        _ => arity,
    };

    let mut tables = Vec::new();
    for _ in 0..positions {
        let length = stream.read_integer()? as usize;

        let mut entries = Vec::new();
        for _ in 0..length {
            let index = stream.read_integer()? as usize;
            if index >= number_of_symbols {
                return Err(BafError::TableIndexOutOfRange {
                    symbol: name,
                    index,
                    count: number_of_symbols,
                }
                .into());
            }
            entries.push(index);
        }

        tables.push(ReadTable {
            code_width: bits_for_count(entries.len()),
            entries,
        });
    }

    debug_trace!("Declared symbol {name}/{arity} with {term_count} terms");
    Ok(ReadEntry {
        symbol,
        term_count,
        term_width: bits_for_count(term_count),
        tables,
        slots: FxHashMap::default(),
    })
}

/// Starts decoding the given instance, reading its integer value when it has one.
fn begin_slot<'s, R: Read>(
    stream: &mut BitStreamReader<R>,
    entries: &mut [ReadEntry<'s>],
    stack: &mut Vec<ReadFrame<'s>>,
    entry: usize,
    instance: usize,
) -> Result<(), SharcError> {
    let read_entry = &mut entries[entry];
    read_entry.slots.insert(instance, Slot::Pending);

    let value = if read_entry.symbol.index() == INT_SYMBOL {
        // Sign extend the two's complement field.
        stream.read_bits(INT_SIZE_IN_BAF)? as u32 as i32 as i64
    } else {
        0
    };

    stack.push(ReadFrame {
        entry,
        instance,
        value,
        arguments: Vec::with_capacity(read_entry.tables.len()),
    });
    Ok(())
}

/// Creates the term for a decoded instance.
fn construct<'s>(
    store: &'s TermStore,
    entry: &ReadEntry<'s>,
    value: i64,
    arguments: &[ATerm<'s>],
) -> Result<ATerm<'s>, SharcError> {
    match entry.symbol.index() {
        INT_SYMBOL => Ok(store.make_int(value)),
        EMPTY_LIST_SYMBOL => Ok(store.empty_list()),
        LIST_SYMBOL => {
            if !arguments[1].is_list() {
                return Err(BafError::NonListTail.into());
            }
            Ok(store.make_list_cons(&arguments[0], &arguments[1]))
        }
        _ => Ok(store.make_application(&entry.symbol, arguments)),
    }
}

#[cfg(test)]
mod tests {
    use sharc_utilities::random_test;
    use sharc_utilities::test_logger;
    use test_case::test_case;

    use crate::random_term;

    use super::*;

    fn round_trip(text: &str) {
        let store = TermStore::new();
        let term = store.from_string(text).unwrap();

        let bytes = write_baf_to_bytes(&term).unwrap();
        let result = read_baf_from_bytes(&store, &bytes).unwrap();
        assert_eq!(term, result, "The term {text} does not survive a round trip");
    }

    #[test_case("0" ; "zero")]
    #[test_case("-2147483648" ; "minimal integer")]
    #[test_case("[]" ; "empty list")]
    #[test_case("[a]" ; "singleton list")]
    #[test_case("f(1,[2,3])" ; "mixed")]
    #[test_case("\"quoted name\"(a,\"b c\")" ; "quoted")]
    #[test_case("f(g(x),x,g(x),[g(x),[]])" ; "shared subterms")]
    #[test_case("g(f(f(a)),f(a))" ; "nested instances of one symbol")]
    fn test_round_trip(text: &str) {
        round_trip(text);
    }

    #[test]
    fn test_random_round_trip() {
        random_test(50, |rng| {
            let store = TermStore::new();
            let symbols = vec![("f".to_string(), 2), ("g".to_string(), 1), ("h".to_string(), 3)];
            let constants = vec!["a".to_string(), "b".to_string()];
            let term = random_term(&store, rng, &symbols, &constants, 100);

            let bytes = write_baf_to_bytes(&term).unwrap();
            assert_eq!(term, read_baf_from_bytes(&store, &bytes).unwrap());
        });
    }

    #[test]
    fn test_header() {
        let store = TermStore::new();
        let bytes = write_baf_to_bytes(&store.make_int(7)).unwrap();

        // 0, then 0xBAF and 0x0300 in their two byte forms, one symbol and one term.
        assert_eq!(bytes[..7], [0x00, 0x8B, 0xAF, 0x83, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_truncated_integer() {
        test_logger();
        let store = TermStore::new();

        let bytes = write_baf_to_bytes(&store.make_int(1 << 40)).unwrap();
        assert_eq!(read_baf_from_bytes(&store, &bytes).unwrap().value(), 0);
    }

    #[test]
    fn test_bad_magic() {
        let store = TermStore::new();
        let mut bytes = write_baf_to_bytes(&store.make_int(7)).unwrap();
        bytes[2] = 0xAE;

        let error = read_baf_from_bytes(&store, &bytes).unwrap_err();
        assert!(error.to_string().contains("magic"), "Unexpected error {error}");
    }

    #[test]
    fn test_cyclic_instance() {
        // A single symbol f/1 with one term, whose argument table refers to f itself.
        let mut bytes = Vec::new();
        {
            let mut stream = BitStreamWriter::new(&mut bytes);
            for value in [0, u64::from(BAF_MAGIC), u64::from(BAF_VERSION), 1, 1] {
                stream.write_integer(value).unwrap();
            }
            stream.write_string("f").unwrap();
            for value in [1, 0, 1, 1, 0, 0] {
                stream.write_integer(value).unwrap();
            }
            stream.flush().unwrap();
        }

        let store = TermStore::new();
        let error = read_baf_from_bytes(&store, &bytes).unwrap_err();
        assert!(error.to_string().contains("own arguments"), "Unexpected error {error}");
    }
}
