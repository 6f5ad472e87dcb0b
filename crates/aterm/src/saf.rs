//! The streamable ATerm format (SAF), which serializes a term into a sequence
//! of fixed size buffers and can be paused between any two of them.
//!
//! # Details
//!
//! Every node is written as a record in preorder. The first byte of a record
//! is a header whose low nibble holds the kind of node, and whose high bits
//! indicate whether the node or its function symbol was written before. A
//! node that was written before is replaced by its identifier, which is
//! assigned by both the writer and the reader when the node is first seen.
//! Lists are written as their length followed by their elements.
//!
//! The name of a function symbol is the only part of a record that can be
//! split over two buffers, every other part fits in the
//! [MINIMUM_FREE_BUFFER_SPACE] bytes that a record is started with.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use log::debug;
use log::error;
use log::warn;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use sharc_io::ByteBuffer;
use sharc_number::read_u64_variablelength;
use sharc_number::write_u64_variablelength;
use sharc_utilities::SharcError;
use sharc_utilities::debug_trace;

use crate::ATerm;
use crate::ATermListIter;
use crate::ATermRef;
use crate::Symb;
use crate::Symbol;
use crate::SymbolRef;
use crate::Term;
use crate::TermKind;
use crate::storage::TermStore;

/// The number of bytes that must be free in a buffer to start a record: a
/// header byte followed by at most two variable-length integers.
pub const MINIMUM_FREE_BUFFER_SPACE: usize = 21;

/// The first byte of a streamed term.
pub const SAF_IDENTIFICATION: u8 = b'?';

/// The size of the buffers of a streamed term, which is also the largest block.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 16;

/// The record refers to a term that was written before.
const SHARED: u8 = 0x80;

/// The function symbol was declared before.
const FUN_SHARED: u8 = 0x40;

/// The declared function symbol is quoted.
const QUOTED: u8 = 0x20;

const TYPE_MASK: u8 = 0x0F;
const APPL: u8 = 1;
const INT: u8 = 2;
const LIST: u8 = 4;

/// Names up to this length are collected without a heap allocation.
const NAME_PAGE_SIZE: usize = 4096;

/// The ways in which streaming a term can fail.
#[derive(Debug, Error)]
pub enum SafError {
    #[error("a buffer of {0} bytes is too small, at least {MINIMUM_FREE_BUFFER_SPACE} bytes are required")]
    BufferTooSmall(usize),

    #[error("a buffer of {0} bytes does not fit in a block of at most {DEFAULT_BUFFER_SIZE} bytes")]
    BufferTooLarge(usize),

    #[error("not a streamed term, the stream starts with {0:#04x}")]
    BadIdentification(u8),

    #[error("reference to unknown term {0}")]
    UnknownTerm(u64),

    #[error("reference to term {0} that is still being read")]
    UnfinishedTerm(u64),

    #[error("reference to unknown function symbol {0}")]
    UnknownSymbol(u64),

    #[error("unknown record type {0:#04x}")]
    UnknownType(u8),

    #[error("the name of a function symbol is not valid UTF-8")]
    InvalidName(#[from] std::str::Utf8Error),

    #[error("reserved symbol {0} cannot be used as a function symbol")]
    ReservedSymbol(String),

    #[error("the stream continues after the root term")]
    DataAfterRoot,

    #[error("the stream ended before the root term was complete")]
    Unfinished,
}

/// Serializes a term into buffers.
///
/// # Example
///
/// ```
/// use sharc_aterm::SafReader;
/// use sharc_aterm::SafWriter;
/// use sharc_aterm::TermStore;
/// use sharc_io::ByteBuffer;
///
/// let store = TermStore::new();
/// let term = store.from_string("f(a, [1, 2])").unwrap();
///
/// let mut writer = SafWriter::new(&term);
/// let mut reader = SafReader::new(&store);
/// let mut buffer = ByteBuffer::with_capacity(32);
/// while !writer.is_finished() {
///     writer.serialize(&mut buffer).unwrap();
///     reader.deserialize(&mut buffer).unwrap();
/// }
///
/// assert_eq!(reader.get_root().unwrap(), term);
/// ```
pub struct SafWriter<'a> {
    /// Keeps every node of the term alive while it is being written.
    _root: ATerm<'a>,

    stack: Vec<WriteFrame<'a>>,
    term_ids: FxHashMap<ATermRef<'a>, u64>,
    symbol_ids: FxHashMap<SymbolRef<'a>, u64>,

    /// The remainder of a name that did not fit in the previous buffer.
    partial_name: Option<PartialName<'a>>,
}

/// The children of a node that still have to be written.
enum WriteFrame<'a> {
    Root(Option<ATermRef<'a>>),
    Arguments { term: ATermRef<'a>, position: usize },
    Elements(ATermRef<'a>),
}

struct PartialName<'a> {
    name: &'a str,
    offset: usize,
}

impl<'a> SafWriter<'a> {
    /// Prepares writing the given term.
    pub fn new<'b>(root: &impl Term<'a, 'b>) -> SafWriter<'a> {
        let root = root.protect();
        let start = ATermRef::from_shared(root.store(), root.shared());

        SafWriter {
            _root: root,
            stack: vec![WriteFrame::Root(Some(start))],
            term_ids: FxHashMap::default(),
            symbol_ids: FxHashMap::default(),
            partial_name: None,
        }
    }

    /// Returns true iff the whole term has been written.
    pub fn is_finished(&self) -> bool {
        self.stack.is_empty() && self.partial_name.is_none()
    }

    /// Writes the next part of the term into the buffer, which is reset
    /// first and flipped afterwards so that the written part can be read.
    pub fn serialize(&mut self, buffer: &mut ByteBuffer) -> Result<(), SharcError> {
        if buffer.capacity() < MINIMUM_FREE_BUFFER_SPACE {
            return Err(SafError::BufferTooSmall(buffer.capacity()).into());
        }

        buffer.reset();
        if let Some(partial) = self.partial_name.take() {
            self.write_name(buffer, partial.name, partial.offset);
        }

        while self.partial_name.is_none() && buffer.remaining() >= MINIMUM_FREE_BUFFER_SPACE {
            match self.next_term() {
                Some(term) => self.write_record(buffer, term)?,
                None => break,
            }
        }

        buffer.flip();
        Ok(())
    }

    fn next_term(&mut self) -> Option<ATermRef<'a>> {
        let frame = self.stack.last_mut()?;
        let term = frame.next_child();
        self.pop_exhausted();
        term
    }

    /// Removes the frames that have no children left, so that
    /// [SafWriter::is_finished] holds right after the last record.
    fn pop_exhausted(&mut self) {
        while self.stack.last().is_some_and(|frame| frame.is_exhausted()) {
            self.stack.pop();
        }
    }

    fn write_record(&mut self, buffer: &mut ByteBuffer, term: ATermRef<'a>) -> Result<(), SharcError> {
        if let Some(id) = self.term_ids.get(&term) {
            debug_trace!("Shared term {id}");
            buffer.put_u8(SHARED);
            write_u64_variablelength(buffer, *id)?;
            return Ok(());
        }

        let id = self.term_ids.len() as u64;
        self.term_ids.insert(term, id);
        debug_trace!("Term {id}: {term:?}");

        match term.kind() {
            TermKind::Int => {
                buffer.put_u8(INT);
                write_u64_variablelength(buffer, term.value() as u64)?;
            }
            TermKind::EmptyList => {
                buffer.put_u8(LIST);
                write_u64_variablelength(buffer, 0)?;
            }
            TermKind::List => {
                buffer.put_u8(LIST);
                write_u64_variablelength(buffer, ATermListIter::new(term).count() as u64)?;
                self.stack.push(WriteFrame::Elements(term));
            }
            TermKind::Application => {
                let symbol = term.get_head_symbol();
                match self.symbol_ids.get(&symbol) {
                    Some(symbol_id) => {
                        buffer.put_u8(APPL | FUN_SHARED);
                        write_u64_variablelength(buffer, *symbol_id)?;
                    }
                    None => {
                        self.symbol_ids.insert(symbol, self.symbol_ids.len() as u64);

                        let name = symbol.name();
                        buffer.put_u8(if symbol.is_quoted() { APPL | QUOTED } else { APPL });
                        write_u64_variablelength(buffer, symbol.arity() as u64)?;
                        write_u64_variablelength(buffer, name.len() as u64)?;
                        self.write_name(buffer, name, 0);
                    }
                }

                if symbol.arity() > 0 {
                    self.stack.push(WriteFrame::Arguments { term, position: 0 });
                }
            }
        }

        Ok(())
    }

    /// Writes as much of the name as fits, and remembers the remainder.
    fn write_name(&mut self, buffer: &mut ByteBuffer, name: &'a str, offset: usize) {
        let bytes = name.as_bytes();
        let count = (bytes.len() - offset).min(buffer.remaining());
        buffer.put_slice(&bytes[offset..offset + count]);

        if offset + count < bytes.len() {
            debug_trace!("Name continues at offset {} in the next buffer", offset + count);
            self.partial_name = Some(PartialName {
                name,
                offset: offset + count,
            });
        }
    }
}

impl<'a> WriteFrame<'a> {
    fn next_child(&mut self) -> Option<ATermRef<'a>> {
        match self {
            WriteFrame::Root(root) => root.take(),
            WriteFrame::Arguments { term, position } => {
                if *position < term.arity() {
                    *position += 1;
                    Some(term.arg(*position - 1))
                } else {
                    None
                }
            }
            WriteFrame::Elements(current) => {
                if current.kind() == TermKind::List {
                    let head = current.arg(0);
                    *current = current.arg(1);
                    Some(head)
                } else {
                    None
                }
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        match self {
            WriteFrame::Root(root) => root.is_none(),
            WriteFrame::Arguments { term, position } => *position >= term.arity(),
            WriteFrame::Elements(current) => current.kind() != TermKind::List,
        }
    }
}

/// Deserializes a term from the buffers produced by a [SafWriter].
pub struct SafReader<'s> {
    store: &'s TermStore,

    /// The terms by identifier, absent while their arguments are being read.
    terms: Vec<Option<ATerm<'s>>>,
    symbols: Vec<Symbol<'s>>,
    stack: Vec<ReadFrame<'s>>,

    /// A function symbol declaration whose name continues in the next buffer.
    partial_name: Option<PartialDeclaration>,
    root: Option<ATerm<'s>>,
}

/// A node whose children are being read.
enum ReadFrame<'s> {
    Application {
        id: usize,
        symbol: Symbol<'s>,
        arguments: Vec<ATerm<'s>>,
    },
    List {
        id: usize,
        length: usize,
        elements: Vec<ATerm<'s>>,
    },
}

struct PartialDeclaration {
    arity: usize,
    quoted: bool,
    length: usize,
    bytes: SmallVec<[u8; NAME_PAGE_SIZE]>,
}

impl<'s> SafReader<'s> {
    /// Prepares reading a term into the given store.
    pub fn new(store: &'s TermStore) -> SafReader<'s> {
        SafReader {
            store,
            terms: Vec::new(),
            symbols: Vec::new(),
            stack: Vec::new(),
            partial_name: None,
            root: None,
        }
    }

    /// Returns true iff the root term has been read completely.
    pub fn is_finished(&self) -> bool {
        self.root.is_some()
    }

    /// Returns the term that was read.
    pub fn get_root(&self) -> Result<ATerm<'s>, SharcError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => {
                warn!(
                    "Streamed term requested before it was complete, {} nodes are pending",
                    self.stack.len()
                );
                Err(SafError::Unfinished.into())
            }
        }
    }

    /// Reads all remaining bytes of the buffer.
    pub fn deserialize(&mut self, buffer: &mut ByteBuffer) -> Result<(), SharcError> {
        if let Some(partial) = self.partial_name.take() {
            self.read_name(buffer, partial)?;
        }

        while let Some(header) = buffer.get_u8() {
            if self.root.is_some() {
                return Err(SafError::DataAfterRoot.into());
            }

            self.read_record(buffer, header)?;
        }

        Ok(())
    }

    fn read_record(&mut self, buffer: &mut ByteBuffer, header: u8) -> Result<(), SharcError> {
        if header & SHARED != 0 {
            let id = read_u64_variablelength(buffer)?;
            let term = match self.terms.get(id as usize) {
                Some(Some(term)) => term.clone(),
                Some(None) => return Err(SafError::UnfinishedTerm(id).into()),
                None => return Err(SafError::UnknownTerm(id).into()),
            };

            debug_trace!("Shared term {id}: {term:?}");
            return self.link(term);
        }

        match header & TYPE_MASK {
            APPL => {
                if header & FUN_SHARED != 0 {
                    let id = read_u64_variablelength(buffer)?;
                    let symbol = self
                        .symbols
                        .get(id as usize)
                        .cloned()
                        .ok_or(SafError::UnknownSymbol(id))?;
                    self.begin_application(symbol)
                } else {
                    let arity = read_u64_variablelength(buffer)? as usize;
                    let length = read_u64_variablelength(buffer)? as usize;
                    self.read_name(
                        buffer,
                        PartialDeclaration {
                            arity,
                            quoted: header & QUOTED != 0,
                            length,
                            bytes: SmallVec::new(),
                        },
                    )
                }
            }
            INT => {
                let value = read_u64_variablelength(buffer)? as i64;
                let term = self.store.make_int(value);
                self.terms.push(Some(term.clone()));
                self.link(term)
            }
            LIST => {
                let length = read_u64_variablelength(buffer)? as usize;
                if length == 0 {
                    let term = self.store.empty_list();
                    self.terms.push(Some(term.clone()));
                    self.link(term)
                } else {
                    self.stack.push(ReadFrame::List {
                        id: self.terms.len(),
                        length,
                        elements: Vec::new(),
                    });
                    self.terms.push(None);
                    Ok(())
                }
            }
            other => Err(SafError::UnknownType(other).into()),
        }
    }

    /// Reads the remainder of a name, and declares the symbol once it is complete.
    fn read_name(&mut self, buffer: &mut ByteBuffer, mut partial: PartialDeclaration) -> Result<(), SharcError> {
        let count = (partial.length - partial.bytes.len()).min(buffer.remaining());
        partial.bytes.extend_from_slice(&buffer.as_slice()[..count]);
        buffer.advance(count);

        if partial.bytes.len() < partial.length {
            self.partial_name = Some(partial);
            return Ok(());
        }

        let name = std::str::from_utf8(&partial.bytes).map_err(SafError::from)?;
        let symbol = self.store.symbol(name, partial.arity, partial.quoted);
        if symbol.is_reserved() {
            return Err(SafError::ReservedSymbol(name.to_string()).into());
        }

        debug_trace!("Symbol {}: {:?}", self.symbols.len(), symbol);
        self.symbols.push(symbol.clone());
        self.begin_application(symbol)
    }

    fn begin_application(&mut self, symbol: Symbol<'s>) -> Result<(), SharcError> {
        if symbol.arity() == 0 {
            let term = self.store.make_constant(&symbol);
            self.terms.push(Some(term.clone()));
            self.link(term)
        } else {
            self.stack.push(ReadFrame::Application {
                id: self.terms.len(),
                arguments: Vec::new(),
                symbol,
            });
            self.terms.push(None);
            Ok(())
        }
    }

    /// Adds a completed term to the node on top of the stack, and completes
    /// every node whose last child was added.
    fn link(&mut self, mut term: ATerm<'s>) -> Result<(), SharcError> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                debug!("Read streamed term with {} nodes", self.terms.len());
                self.root = Some(term);
                return Ok(());
            };

            if !frame.push(term) {
                return Ok(());
            }

            let frame = self.stack.pop().ok_or("The completed node is on the stack")?;
            let (id, completed) = frame.construct(self.store);
            self.terms[id] = Some(completed.clone());
            term = completed;
        }
    }
}

impl<'s> ReadFrame<'s> {
    /// Adds a child, returns true iff the node is complete afterwards.
    fn push(&mut self, term: ATerm<'s>) -> bool {
        match self {
            ReadFrame::Application { symbol, arguments, .. } => {
                arguments.push(term);
                arguments.len() == symbol.arity()
            }
            ReadFrame::List { length, elements, .. } => {
                elements.push(term);
                elements.len() == *length
            }
        }
    }

    fn construct(self, store: &'s TermStore) -> (usize, ATerm<'s>) {
        match self {
            ReadFrame::Application { id, symbol, arguments } => (id, store.make_application(&symbol, &arguments)),
            ReadFrame::List { id, elements, .. } => (id, store.make_list(elements.iter())),
        }
    }
}

/// Writes the term as a stream of blocks with buffers of the default size.
pub fn write_saf<'a, 'b>(term: &impl Term<'a, 'b>, output: &mut impl Write) -> Result<(), SharcError> {
    write_saf_with_buffer_size(term, output, DEFAULT_BUFFER_SIZE)
}

/// Writes the identification byte followed by blocks, each consisting of its
/// length as a little endian `u16`, where zero means 65536, and the contents
/// of one buffer.
pub fn write_saf_with_buffer_size<'a, 'b>(
    term: &impl Term<'a, 'b>,
    output: &mut impl Write,
    buffer_size: usize,
) -> Result<(), SharcError> {
    if buffer_size < MINIMUM_FREE_BUFFER_SPACE {
        return Err(SafError::BufferTooSmall(buffer_size).into());
    }
    if buffer_size > DEFAULT_BUFFER_SIZE {
        return Err(SafError::BufferTooLarge(buffer_size).into());
    }

    output.write_all(&[SAF_IDENTIFICATION])?;

    let mut writer = SafWriter::new(term);
    let mut buffer = ByteBuffer::with_capacity(buffer_size);
    let mut blocks = 0usize;
    while !writer.is_finished() {
        writer.serialize(&mut buffer)?;

        let length = buffer.remaining();
        if length > 0 {
            output.write_all(&(length as u16).to_le_bytes())?;
            output.write_all(buffer.as_slice())?;
            blocks += 1;
        }
    }

    debug!("Wrote streamed term in {blocks} blocks");
    Ok(())
}

/// Writes the term as a stream into a byte vector.
pub fn write_saf_to_bytes<'a, 'b>(term: &impl Term<'a, 'b>) -> Result<Vec<u8>, SharcError> {
    let mut bytes = Vec::new();
    write_saf(term, &mut bytes)?;
    Ok(bytes)
}

/// Writes the term as a stream to the file at the given path.
pub fn write_saf_file<'a, 'b>(term: &impl Term<'a, 'b>, path: impl AsRef<Path>) -> Result<(), SharcError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_saf(term, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a term written by [write_saf]. A stream that ends at a block boundary
/// before the term is complete fails in [SafReader::get_root].
pub fn read_saf<'s>(store: &'s TermStore, input: &mut impl Read) -> Result<ATerm<'s>, SharcError> {
    let mut identification = [0u8; 1];
    input.read_exact(&mut identification)?;
    if identification[0] != SAF_IDENTIFICATION {
        return Err(SafError::BadIdentification(identification[0]).into());
    }

    let mut reader = SafReader::new(store);
    let mut buffer = ByteBuffer::with_capacity(DEFAULT_BUFFER_SIZE);
    while !reader.is_finished() {
        let mut header = [0u8; 2];
        match input.read_exact(&mut header) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }

        let length = match u16::from_le_bytes(header) {
            0 => DEFAULT_BUFFER_SIZE,
            length => length as usize,
        };

        buffer.fill_from(input, length)?;
        reader.deserialize(&mut buffer)?;
    }

    reader.get_root()
}

/// Reads a streamed term from a byte slice.
pub fn read_saf_from_bytes<'s>(store: &'s TermStore, mut bytes: &[u8]) -> Result<ATerm<'s>, SharcError> {
    read_saf(store, &mut bytes)
}

/// Reads a streamed term from the file at the given path.
pub fn read_saf_file<'s>(store: &'s TermStore, path: impl AsRef<Path>) -> Result<ATerm<'s>, SharcError> {
    let path = path.as_ref();
    let result = File::open(path)
        .map_err(SharcError::from)
        .and_then(|file| read_saf(store, &mut BufReader::new(file)));

    if let Err(err) = &result {
        error!("Failed to read streamed term from {}: {err}", path.display());
    }
    result
}

#[cfg(test)]
mod tests {
    use sharc_utilities::random_test;
    use test_case::test_case;

    use crate::random_term;

    use super::*;

    /// Serializes the term into buffers of the given capacity.
    fn to_buffers<'a, 'b>(term: &impl Term<'a, 'b>, capacity: usize) -> Vec<ByteBuffer> {
        let mut writer = SafWriter::new(term);
        let mut buffers = Vec::new();
        while !writer.is_finished() {
            let mut buffer = ByteBuffer::with_capacity(capacity);
            writer.serialize(&mut buffer).unwrap();
            buffers.push(buffer);
        }
        buffers
    }

    #[test_case("0" ; "zero")]
    #[test_case("-9223372036854775808" ; "minimal integer")]
    #[test_case("[]" ; "empty list")]
    #[test_case("[a]" ; "singleton list")]
    #[test_case("f(1,[2,3])" ; "mixed")]
    #[test_case("f(g(x),x,g(x),[g(x),[]],[x,g(x)])" ; "shared subterms")]
    #[test_case("\"quoted name\"(a,\"b c\")" ; "quoted")]
    fn test_round_trip(text: &str) {
        let store = TermStore::new();
        let term = store.from_string(text).unwrap();

        let bytes = write_saf_to_bytes(&term).unwrap();
        assert_eq!(read_saf_from_bytes(&store, &bytes).unwrap(), term);
    }

    #[test]
    fn test_random_small_buffers() {
        random_test(50, |rng| {
            let store = TermStore::new();
            let symbols = vec![("f".to_string(), 2), ("g".to_string(), 1), ("h".to_string(), 3)];
            let constants = vec!["a".to_string(), "b".to_string()];
            let term = random_term(&store, rng, &symbols, &constants, 100);

            let mut bytes = Vec::new();
            write_saf_with_buffer_size(&term, &mut bytes, MINIMUM_FREE_BUFFER_SPACE).unwrap();
            assert_eq!(read_saf_from_bytes(&store, &bytes).unwrap(), term);
        });
    }

    #[test]
    fn test_record_layout() {
        let store = TermStore::new();
        let term = store.from_string("f(a,a)").unwrap();

        let buffers = to_buffers(&term, 64);
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers[0].as_slice(), [APPL, 2, 1, b'f', APPL, 0, 1, b'a', SHARED, 1]);
    }

    #[test]
    fn test_long_name() {
        let store = TermStore::new();
        let name = "x".repeat(10_000);
        let constant = store.make_constant(&store.symbol(&name, 0, false));
        let term = store.make_application(&store.symbol("f", 2, false), &[constant.clone(), constant]);

        let buffers = to_buffers(&term, 64);
        assert!(buffers.len() > 10_000 / 64, "The name is split over many buffers");

        let mut reader = SafReader::new(&store);
        for mut buffer in buffers {
            assert!(!reader.is_finished());
            reader.deserialize(&mut buffer).unwrap();
        }
        assert_eq!(reader.get_root().unwrap(), term);
    }

    #[test]
    fn test_truncated_buffers() {
        let store = TermStore::new();
        let term = store.from_string("f(g(a,b),[1,2,3],h(g(a,b)))").unwrap();
        let buffers = to_buffers(&term, MINIMUM_FREE_BUFFER_SPACE);

        for count in 0..buffers.len() {
            let mut reader = SafReader::new(&store);
            for buffer in &buffers[..count] {
                reader.deserialize(&mut buffer.clone()).unwrap();
            }

            assert!(reader.get_root().is_err(), "Reading {count} buffers must not produce a term");
        }
    }

    #[test]
    fn test_buffer_too_small() {
        let store = TermStore::new();
        let term = store.make_int(1);

        let mut writer = SafWriter::new(&term);
        let mut buffer = ByteBuffer::with_capacity(MINIMUM_FREE_BUFFER_SPACE - 1);
        assert!(writer.serialize(&mut buffer).is_err());
    }

    #[test_case(&[SHARED, 0] ; "unknown term")]
    #[test_case(&[APPL, 1, 1, b'f', SHARED, 0] ; "unfinished term")]
    #[test_case(&[APPL | FUN_SHARED, 0] ; "unknown symbol")]
    #[test_case(&[0x07] ; "unknown type")]
    #[test_case(&[APPL, 0, 1, 0xFF] ; "invalid name")]
    #[test_case(&[APPL, 0, 12, b'<', b'e', b'm', b'p', b't', b'y', b'_', b'l', b'i', b's', b't', b'>'] ; "reserved symbol")]
    #[test_case(&[INT, 1, INT, 2] ; "data after root")]
    fn test_malformed(bytes: &[u8]) {
        let store = TermStore::new();
        let mut reader = SafReader::new(&store);
        assert!(reader.deserialize(&mut ByteBuffer::from_bytes(bytes)).is_err());
    }

    #[test]
    fn test_bad_identification() {
        let store = TermStore::new();
        let mut bytes = write_saf_to_bytes(&store.make_int(3)).unwrap();
        bytes[0] = b'!';

        let error = read_saf_from_bytes(&store, &bytes).unwrap_err();
        assert!(error.is::<SafError>());
    }
}
