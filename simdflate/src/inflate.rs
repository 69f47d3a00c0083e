//! Decompression: the streaming [`Inflate`] engine, the one-shot [`uncompress_slice`] and the
//! growable [`decompress_with`].

use core::ops::ControlFlow;

use tracing::{debug, warn};

use crate::{
    adler32::adler32_with, cpu_features::Dispatch, trace, Code, Error, Flush, Progress,
    ReturnCode, ADLER32_INITIAL_VALUE, DEF_WBITS, MAX_WBITS, MIN_WBITS,
};

use self::{
    bitreader::BitReader,
    inftrees::{inflate_table, CodeType, InflateTable},
    window::Window,
    writer::Writer,
};

mod bitreader;
mod inftrees;
mod window;
mod writer;

const MAX_BITS: u8 = 15; // maximum number of bits in a code
const MAX_DIST_EXTRA_BITS: u8 = 13; // maximum number of extra distance bits

/// The fast decoding loop runs while this many input bytes are available...
const INFLATE_FAST_MIN_HAVE: usize = 15;
/// ...and there is room for this many output bytes (the longest match plus slack).
const INFLATE_FAST_MIN_LEFT: usize = 260;

/// The compression method of a zlib header.
const Z_DEFLATED: u64 = 8;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InflateConfig {
    /// log2 of the window size, in `8..=15`. Negative for a raw DEFLATE stream.
    pub window_bits: i32,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            window_bits: DEF_WBITS,
        }
    }
}

impl InflateConfig {
    /// The wrapper flags and window bits this configuration asks for.
    fn resolve(&self) -> (u8, u8) {
        let wrap = if self.window_bits < 0 { 0 } else { 1 | 4 };

        let mut window_bits = self.window_bits.unsigned_abs() as i32;
        if !(MIN_WBITS..=MAX_WBITS).contains(&window_bits) {
            warn!(window_bits = self.window_bits, "window bits out of range, using 15");
            window_bits = MAX_WBITS;
        }

        (wrap, window_bits as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Head,
    DictId,
    Dict,
    Type,
    TypeDo,
    Stored,
    CopyBlock,
    Table,
    LenLens,
    CodeLens,
    Len,
    Lit,
    LenExt,
    Dist,
    DistExt,
    Match,
    Check,
    Done,
    Bad,
    Mem,
}

#[derive(Debug, Default, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
enum Codes {
    #[default]
    Fixed,
    Codes,
    Len,
    Dist,
}

#[derive(Debug, Default, Clone, Copy)]
struct Table {
    codes: Codes,
    bits: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags(u8);

impl Flags {
    /// set if currently processing the last block
    const IS_LAST_BLOCK: Self = Self(0b0000_0001);

    /// set if a custom dictionary was provided
    const HAVE_DICT: Self = Self(0b0000_0010);

    const fn contains(self, other: Self) -> bool {
        debug_assert!(other.0.count_ones() == 1);

        self.0 & other.0 != 0
    }

    #[inline(always)]
    fn update(&mut self, other: Self, value: bool) {
        if value {
            *self = Self(self.0 | other.0);
        } else {
            *self = Self(self.0 & !other.0);
        }
    }
}

pub(crate) struct State {
    /// Current inflate mode
    mode: Mode,

    flags: Flags,

    /// log base 2 of requested window size
    wbits: u8,

    /// bitflag
    ///
    /// - bit 0 true if zlib
    /// - bit 2 true to validate check value
    wrap: u8,

    flush: Flush,

    dispatch: Dispatch,

    // allocated once output has to be kept between calls
    window: Window,

    /// number of code length code lengths
    ncode: usize,
    /// number of length code lengths
    nlen: usize,
    /// number of distance code lengths
    ndist: usize,
    /// number of code lengths in lens[]
    have: usize,

    /// bits pulled from the input but not consumed yet, carried between calls
    hold: u64,
    bits: u8,

    total_in: u64,
    total_out: u64,

    /// length of a block to copy
    length: usize,
    /// distance back to copy the string from
    offset: usize,
    /// extra bits needed
    extra: usize,

    checksum: u32,

    error_message: Option<&'static str>,

    /// table for length/literal codes
    len_table: Table,
    /// table for dist codes
    dist_table: Table,

    len_fix: [Code; 512],
    dist_fix: [Code; 32],

    codes_codes: [Code; crate::ENOUGH_LENS],
    len_codes: [Code; crate::ENOUGH_LENS],
    dist_codes: [Code; crate::ENOUGH_DISTS],

    /// temporary storage space for code lengths
    lens: [u16; 320],
    /// work area for code table building
    work: [u16; 288],
}

impl State {
    fn new(config: InflateConfig, dispatch: Dispatch) -> Box<Self> {
        let (wrap, wbits) = config.resolve();
        let (len_fix, dist_fix) = inftrees::fixed_tables();

        debug!(wrap, wbits, ?dispatch, "inflate state");

        Box::new(Self {
            mode: Mode::Head,
            flags: Flags::default(),
            wbits,
            wrap,
            flush: Flush::NoFlush,
            dispatch,
            window: Window::empty(),

            ncode: 0,
            nlen: 0,
            ndist: 0,
            have: 0,

            hold: 0,
            bits: 0,

            total_in: 0,
            total_out: 0,

            length: 0,
            offset: 0,
            extra: 0,

            checksum: ADLER32_INITIAL_VALUE,
            error_message: None,

            len_table: Table::default(),
            dist_table: Table::default(),

            len_fix,
            dist_fix,

            codes_codes: [Code::default(); crate::ENOUGH_LENS],
            len_codes: [Code::default(); crate::ENOUGH_LENS],
            dist_codes: [Code::default(); crate::ENOUGH_DISTS],

            lens: [0u16; 320],
            work: [0u16; 288],
        })
    }

    fn reset(&mut self) {
        self.window.clear();
        self.error_message = None;

        self.total_in = 0;
        self.total_out = 0;

        self.mode = Mode::Head;
        self.checksum = ADLER32_INITIAL_VALUE;
        self.flags = Flags::default();
        self.hold = 0;
        self.bits = 0;

        self.len_table = Table::default();
        self.dist_table = Table::default();
    }

    fn len_table_ref(&self) -> &[Code] {
        match self.len_table.codes {
            Codes::Fixed => &self.len_fix,
            Codes::Codes => &self.codes_codes,
            Codes::Len => &self.len_codes,
            Codes::Dist => &self.dist_codes,
        }
    }

    fn dist_table_ref(&self) -> &[Code] {
        match self.dist_table.codes {
            Codes::Fixed => &self.dist_fix,
            Codes::Codes => &self.codes_codes,
            Codes::Len => &self.len_codes,
            Codes::Dist => &self.dist_codes,
        }
    }

    fn len_table_get(&self, index: usize) -> Code {
        self.len_table_ref()[index]
    }

    fn dist_table_get(&self, index: usize) -> Code {
        self.dist_table_ref()[index]
    }
}

/// The input, output and engine state of a single call.
pub(crate) struct InflateStream<'a> {
    bit_reader: BitReader<'a>,
    writer: Writer<'a>,
    state: &'a mut State,
    /// output bytes already folded into the checksum
    checked: usize,
}

/// `Break` leaves the current call with a return code; `Continue` runs the next mode.
type Step = ControlFlow<ReturnCode>;

macro_rules! pull_byte {
    ($self:expr) => {
        match $self.bit_reader.pull_byte() {
            Err(return_code) => return $self.inflate_leave(return_code),
            Ok(_) => (),
        }
    };
}

macro_rules! need_bits {
    ($self:expr, $n:expr) => {
        match $self.bit_reader.need_bits($n) {
            Err(return_code) => return $self.inflate_leave(return_code),
            Ok(v) => v,
        }
    };
}

impl<'a> InflateStream<'a> {
    fn new(input: &'a [u8], output: &'a mut [u8], state: &'a mut State) -> Self {
        Self {
            bit_reader: BitReader::resume(input, state.hold, state.bits),
            writer: Writer::new(output, state.dispatch),
            state,
            checked: 0,
        }
    }

    fn dispatch(&mut self) -> ReturnCode {
        loop {
            let step = match self.state.mode {
                Mode::Head => self.head(),
                Mode::DictId => self.dict_id(),
                Mode::Dict => self.dict(),
                Mode::Type => self.type_(),
                Mode::TypeDo => self.type_do(),
                Mode::Stored => self.stored(),
                Mode::CopyBlock => self.copy_block(),
                Mode::Table => self.table(),
                Mode::LenLens => self.len_lens(),
                Mode::CodeLens => self.code_lens(),
                Mode::Len => self.len(),
                Mode::Lit => self.lit(),
                Mode::LenExt => self.len_ext(),
                Mode::Dist => self.dist(),
                Mode::DistExt => self.dist_ext(),
                Mode::Match => self.match_(),
                Mode::Check => self.check(),
                Mode::Done => self.inflate_leave(ReturnCode::StreamEnd),
                Mode::Bad => self.inflate_leave(ReturnCode::DataError),
                Mode::Mem => self.inflate_leave(ReturnCode::MemError),
            };

            if let ControlFlow::Break(return_code) = step {
                return return_code;
            }
        }
    }

    fn head(&mut self) -> Step {
        if self.state.wrap == 0 {
            self.state.mode = Mode::TypeDo;
            return ControlFlow::Continue(());
        }

        need_bits!(self, 16);

        let cmf = self.bit_reader.bits(8);
        let flg = (self.bit_reader.hold() >> 8) & 0xff;

        if ((cmf << 8) + flg) % 31 != 0 {
            return self.bad("incorrect header check");
        }

        if self.bit_reader.bits(4) != Z_DEFLATED {
            return self.bad("unknown compression method");
        }

        self.bit_reader.drop_bits(4);
        let len = self.bit_reader.bits(4) as u8 + 8;

        if len as i32 > MAX_WBITS || len > self.state.wbits {
            return self.bad("invalid window size");
        }

        self.state.checksum = ADLER32_INITIAL_VALUE;

        self.state.mode = if flg & 0x20 != 0 {
            Mode::DictId
        } else {
            Mode::Type
        };

        self.bit_reader.init_bits();

        ControlFlow::Continue(())
    }

    fn dict_id(&mut self) -> Step {
        need_bits!(self, 32);

        // the id is stored big-endian
        self.state.checksum = (self.bit_reader.bits(32) as u32).swap_bytes();
        self.bit_reader.init_bits();

        self.state.mode = Mode::Dict;
        ControlFlow::Continue(())
    }

    fn dict(&mut self) -> Step {
        if !self.state.flags.contains(Flags::HAVE_DICT) {
            return self.inflate_leave(ReturnCode::NeedDict);
        }

        self.state.checksum = ADLER32_INITIAL_VALUE;

        self.state.mode = Mode::Type;
        ControlFlow::Continue(())
    }

    fn type_(&mut self) -> Step {
        match self.state.flush {
            Flush::Block => self.inflate_leave(ReturnCode::Ok),
            _ => {
                self.state.mode = Mode::TypeDo;
                ControlFlow::Continue(())
            }
        }
    }

    fn type_do(&mut self) -> Step {
        if self.state.flags.contains(Flags::IS_LAST_BLOCK) {
            self.bit_reader.next_byte_boundary();
            self.state.mode = Mode::Check;
            return ControlFlow::Continue(());
        }

        need_bits!(self, 3);
        let last = self.bit_reader.bits(1) != 0;
        self.state.flags.update(Flags::IS_LAST_BLOCK, last);
        self.bit_reader.drop_bits(1);

        let block_type = self.bit_reader.bits(2);
        self.bit_reader.drop_bits(2);

        match block_type {
            0 => {
                trace!(last, "stored block");
                self.state.mode = Mode::Stored;
            }
            1 => {
                trace!(last, "fixed codes block");

                self.state.len_table = Table {
                    codes: Codes::Fixed,
                    bits: 9,
                };

                self.state.dist_table = Table {
                    codes: Codes::Fixed,
                    bits: 5,
                };

                self.state.mode = Mode::Len;
            }
            2 => {
                trace!(last, "dynamic codes block");
                self.state.mode = Mode::Table;
            }
            _ => return self.bad("invalid block type"),
        }

        ControlFlow::Continue(())
    }

    fn stored(&mut self) -> Step {
        self.bit_reader.next_byte_boundary();

        need_bits!(self, 32);

        let hold = self.bit_reader.bits(32) as u32;

        if hold as u16 != !((hold >> 16) as u16) {
            return self.bad("invalid stored block lengths");
        }

        self.state.length = hold as usize & 0xFFFF;
        trace!(length = self.state.length, "stored length");

        self.bit_reader.init_bits();

        self.state.mode = Mode::CopyBlock;
        ControlFlow::Continue(())
    }

    fn copy_block(&mut self) -> Step {
        while self.state.length != 0 {
            let copy = Ord::min(self.state.length, self.writer.remaining());
            let copy = Ord::min(copy, self.bit_reader.bytes_remaining());

            if copy == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }

            self.writer.extend(&self.bit_reader.as_slice()[..copy]);
            self.bit_reader.advance(copy);

            self.state.length -= copy;
        }

        self.state.mode = Mode::Type;
        ControlFlow::Continue(())
    }

    /// get dynamic table entries descriptor
    fn table(&mut self) -> Step {
        need_bits!(self, 14);
        self.state.nlen = self.bit_reader.bits(5) as usize + 257;
        self.bit_reader.drop_bits(5);
        self.state.ndist = self.bit_reader.bits(5) as usize + 1;
        self.bit_reader.drop_bits(5);
        self.state.ncode = self.bit_reader.bits(4) as usize + 4;
        self.bit_reader.drop_bits(4);

        if self.state.nlen > 286 || self.state.ndist > 30 {
            return self.bad("too many length or distance symbols");
        }

        self.state.have = 0;
        self.state.mode = Mode::LenLens;
        ControlFlow::Continue(())
    }

    /// get code length code lengths (not a typo)
    fn len_lens(&mut self) -> Step {
        // permutation of code lengths ;
        const ORDER: [u16; 19] = [
            16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
        ];

        while self.state.have < self.state.ncode {
            need_bits!(self, 3);
            self.state.lens[ORDER[self.state.have] as usize] = self.bit_reader.bits(3) as u16;
            self.state.have += 1;
            self.bit_reader.drop_bits(3);
        }

        let state = &mut *self.state;

        while state.have < 19 {
            state.lens[ORDER[state.have] as usize] = 0;
            state.have += 1;
        }

        let InflateTable::Success(root) = inflate_table(
            CodeType::Codes,
            &state.lens,
            19,
            &mut state.codes_codes,
            7,
            &mut state.work,
        ) else {
            return self.bad("invalid code lengths set");
        };

        state.len_table = Table {
            codes: Codes::Codes,
            bits: root,
        };

        state.have = 0;
        state.mode = Mode::CodeLens;
        ControlFlow::Continue(())
    }

    /// get length and distance code code lengths
    fn code_lens(&mut self) -> Step {
        while self.state.have < self.state.nlen + self.state.ndist {
            let here = loop {
                let bits = self.bit_reader.bits(self.state.len_table.bits);
                let here = self.state.len_table_get(bits as usize);
                if here.bits <= self.bit_reader.bits_in_buffer() {
                    break here;
                }

                pull_byte!(self);
            };

            let here_bits = here.bits;

            let (len, copy) = match here.val {
                0..=15 => {
                    self.bit_reader.drop_bits(here_bits);
                    self.state.lens[self.state.have] = here.val;
                    self.state.have += 1;
                    continue;
                }
                16 => {
                    need_bits!(self, here_bits as usize + 2);
                    self.bit_reader.drop_bits(here_bits);
                    if self.state.have == 0 {
                        return self.bad("invalid bit length repeat");
                    }

                    let len = self.state.lens[self.state.have - 1];
                    let copy = 3 + self.bit_reader.bits(2) as usize;
                    self.bit_reader.drop_bits(2);

                    (len, copy)
                }
                17 => {
                    need_bits!(self, here_bits as usize + 3);
                    self.bit_reader.drop_bits(here_bits);
                    let copy = 3 + self.bit_reader.bits(3) as usize;
                    self.bit_reader.drop_bits(3);

                    (0, copy)
                }
                _ => {
                    need_bits!(self, here_bits as usize + 7);
                    self.bit_reader.drop_bits(here_bits);
                    let copy = 11 + self.bit_reader.bits(7) as usize;
                    self.bit_reader.drop_bits(7);

                    (0, copy)
                }
            };

            let state = &mut *self.state;
            if state.have + copy > state.nlen + state.ndist {
                return self.bad("invalid bit length repeat");
            }

            state.lens[state.have..][..copy].fill(len);
            state.have += copy;
        }

        let state = &mut *self.state;

        // check for end-of-block code (better have one)
        if state.lens[256] == 0 {
            return self.bad("invalid code -- missing end-of-block");
        }

        // build code tables
        let InflateTable::Success(root) = inflate_table(
            CodeType::Lens,
            &state.lens,
            state.nlen,
            &mut state.len_codes,
            10,
            &mut state.work,
        ) else {
            return self.bad("invalid literal/lengths set");
        };

        state.len_table = Table {
            codes: Codes::Len,
            bits: root,
        };

        let InflateTable::Success(root) = inflate_table(
            CodeType::Dists,
            &state.lens[state.nlen..],
            state.ndist,
            &mut state.dist_codes,
            9,
            &mut state.work,
        ) else {
            return self.bad("invalid distances set");
        };

        state.dist_table = Table {
            codes: Codes::Dist,
            bits: root,
        };

        state.mode = Mode::Len;
        ControlFlow::Continue(())
    }

    fn len(&mut self) -> Step {
        let avail_in = self.bit_reader.bytes_remaining();
        let avail_out = self.writer.remaining();

        if avail_in >= INFLATE_FAST_MIN_HAVE && avail_out >= INFLATE_FAST_MIN_LEFT {
            return self.inflate_fast();
        }

        // get a literal, length, or end-of-block code
        let mut here;
        loop {
            let bits = self.bit_reader.bits(self.state.len_table.bits);
            here = self.state.len_table_get(bits as usize);

            if here.bits <= self.bit_reader.bits_in_buffer() {
                break;
            }

            pull_byte!(self);
        }

        if here.op != 0 && here.op & 0xf0 == 0 {
            let last = here;
            loop {
                let bits = self.bit_reader.bits((last.bits + last.op) as usize) as u16;
                here = self
                    .state
                    .len_table_get((last.val + (bits >> last.bits)) as usize);
                if last.bits + here.bits <= self.bit_reader.bits_in_buffer() {
                    break;
                }

                pull_byte!(self);
            }

            self.bit_reader.drop_bits(last.bits);
        }

        self.bit_reader.drop_bits(here.bits);
        self.state.length = here.val as usize;

        if here.op == 0 {
            self.state.mode = Mode::Lit;
        } else if here.op & 32 != 0 {
            self.state.mode = Mode::Type;
        } else if here.op & 64 != 0 {
            return self.bad("invalid literal/length code");
        } else {
            self.state.extra = (here.op & MAX_BITS) as usize;
            self.state.mode = Mode::LenExt;
        }

        ControlFlow::Continue(())
    }

    fn lit(&mut self) -> Step {
        if self.writer.is_full() {
            return self.inflate_leave(ReturnCode::Ok);
        }

        self.writer.push(self.state.length as u8);

        self.state.mode = Mode::Len;
        ControlFlow::Continue(())
    }

    fn len_ext(&mut self) -> Step {
        let extra = self.state.extra;

        if extra != 0 {
            need_bits!(self, extra);
            self.state.length += self.bit_reader.bits(extra) as usize;
            self.bit_reader.drop_bits(extra as u8);
        }

        self.state.mode = Mode::Dist;
        ControlFlow::Continue(())
    }

    fn dist(&mut self) -> Step {
        let mut here;
        loop {
            let bits = self.bit_reader.bits(self.state.dist_table.bits) as usize;
            here = self.state.dist_table_get(bits);
            if here.bits <= self.bit_reader.bits_in_buffer() {
                break;
            }

            pull_byte!(self);
        }

        if here.op & 0xf0 == 0 {
            let last = here;

            loop {
                let bits = self.bit_reader.bits((last.bits + last.op) as usize);
                here = self
                    .state
                    .dist_table_get(last.val as usize + ((bits as usize) >> last.bits));

                if last.bits + here.bits <= self.bit_reader.bits_in_buffer() {
                    break;
                }

                pull_byte!(self);
            }

            self.bit_reader.drop_bits(last.bits);
        }

        self.bit_reader.drop_bits(here.bits);

        if here.op & 64 != 0 {
            return self.bad("invalid distance code");
        }

        self.state.offset = here.val as usize;

        self.state.extra = (here.op & MAX_BITS) as usize;
        self.state.mode = Mode::DistExt;
        ControlFlow::Continue(())
    }

    fn dist_ext(&mut self) -> Step {
        let extra = self.state.extra;

        if extra > 0 {
            need_bits!(self, extra);
            self.state.offset += self.bit_reader.bits(extra) as usize;
            self.bit_reader.drop_bits(extra as u8);
        }

        self.state.mode = Mode::Match;
        ControlFlow::Continue(())
    }

    /// copy match from window to output
    fn match_(&mut self) -> Step {
        if self.writer.is_full() {
            return self.inflate_leave(ReturnCode::Ok);
        }

        let left = self.writer.remaining();
        let written = self.writer.len();
        let state = &mut *self.state;

        let copy = if state.offset > written {
            // (part of) the match is in the history of earlier calls
            let dist = state.offset - written;

            if dist > state.window.have() {
                return self.bad("invalid distance too far back");
            }

            let copy = Ord::min(Ord::min(dist, state.length), left);

            let (first, second) = state.window.back(dist, copy);
            self.writer.extend(first);
            self.writer.extend(second);

            copy
        } else {
            let copy = Ord::min(state.length, left);
            self.writer.copy_match(state.offset, copy);

            copy
        };

        state.length -= copy;

        if state.length == 0 {
            state.mode = Mode::Len;
        }

        ControlFlow::Continue(())
    }

    fn check(&mut self) -> Step {
        if self.state.wrap != 0 {
            need_bits!(self, 32);

            self.update_checksum();

            // stored big-endian
            let given_checksum = (self.bit_reader.bits(32) as u32).swap_bytes();

            if self.state.wrap & 4 != 0 && given_checksum != self.state.checksum {
                return self.bad("incorrect data check");
            }

            self.bit_reader.init_bits();
        }

        trace!("inflate: check matches trailer");

        self.state.mode = Mode::Done;
        self.inflate_leave(ReturnCode::StreamEnd)
    }

    fn bad(&mut self, msg: &'static str) -> Step {
        trace!(msg, "data error");

        self.state.mode = Mode::Bad;
        self.state.error_message = Some(msg);
        self.inflate_leave(ReturnCode::DataError)
    }

    // NOTE: it is crucial for the internal bookkeeping that this is the only route for actually
    // leaving the dispatch loop
    fn inflate_leave(&mut self, return_code: ReturnCode) -> Step {
        // actual logic is in `inflate` itself
        ControlFlow::Break(return_code)
    }

    /// Fold the output written since the last update into the checksum.
    fn update_checksum(&mut self) {
        let unchecked = &self.writer.filled()[self.checked..];

        if self.state.wrap & 4 != 0 && !unchecked.is_empty() {
            self.state.checksum = adler32_with(self.state.dispatch, self.state.checksum, unchecked);
        }

        self.checked = self.writer.len();
    }

    /// Decode literals and matches until the end of the block, or until the input or output
    /// runs low. Bounds are checked once per symbol rather than once per bit.
    fn inflate_fast(&mut self) -> Step {
        let bit_reader = &mut self.bit_reader;
        let writer = &mut self.writer;
        let state = &*self.state;

        let lcode = state.len_table_ref();
        let dcode = state.dist_table_ref();

        let lmask = (1u64 << state.len_table.bits) - 1;
        let dmask = (1u64 << state.dist_table.bits) - 1;

        let mut bad = None;
        let mut mode = Mode::Len;

        'outer: loop {
            bit_reader.refill();

            let mut here = lcode[(bit_reader.hold() & lmask) as usize];

            'dolen: loop {
                bit_reader.drop_bits(here.bits);
                let op = here.op;

                if op == 0 {
                    writer.push(here.val as u8);
                } else if op & 16 != 0 {
                    let op = op & MAX_BITS;
                    let len = here.val as usize + bit_reader.bits(op as usize) as usize;
                    bit_reader.drop_bits(op);

                    if bit_reader.bits_in_buffer() < MAX_BITS + MAX_DIST_EXTRA_BITS {
                        bit_reader.refill();
                    }

                    here = dcode[(bit_reader.hold() & dmask) as usize];

                    'dodist: loop {
                        bit_reader.drop_bits(here.bits);
                        let op = here.op;

                        if op & 16 != 0 {
                            let op = op & MAX_BITS;
                            let dist = here.val as usize + bit_reader.bits(op as usize) as usize;
                            bit_reader.drop_bits(op);

                            // max distance in output
                            let written = writer.len();

                            if dist > written {
                                // copy from the window first
                                let op = dist - written;
                                if op > state.window.have() {
                                    bad = Some("invalid distance too far back");
                                    break 'outer;
                                }

                                let from_window = Ord::min(op, len);
                                let (first, second) = state.window.back(op, from_window);
                                writer.extend(first);
                                writer.extend(second);

                                if op < len {
                                    // the rest comes from this call's output
                                    writer.copy_match(dist, len - op);
                                }
                            } else {
                                writer.copy_match(dist, len);
                            }
                        } else if op & 64 == 0 {
                            // 2nd level distance code
                            here = dcode[here.val as usize + bit_reader.bits(op as usize) as usize];
                            continue 'dodist;
                        } else {
                            bad = Some("invalid distance code");
                            break 'outer;
                        }

                        break 'dodist;
                    }
                } else if op & 64 == 0 {
                    // 2nd level length code
                    here = lcode[here.val as usize + bit_reader.bits(op as usize) as usize];
                    continue 'dolen;
                } else if op & 32 != 0 {
                    // end of block
                    mode = Mode::Type;
                    break 'outer;
                } else {
                    bad = Some("invalid literal/length code");
                    break 'outer;
                }

                break 'dolen;
            }

            if bit_reader.bytes_remaining() >= INFLATE_FAST_MIN_HAVE
                && writer.remaining() >= INFLATE_FAST_MIN_LEFT
            {
                continue;
            }

            break 'outer;
        }

        // return unused bytes (on entry, bits < 8, so in won't go too far back)
        bit_reader.return_unused_bytes();

        if let Some(msg) = bad {
            return self.bad(msg);
        }

        self.state.mode = mode;
        ControlFlow::Continue(())
    }
}

fn inflate(stream: &mut InflateStream, flush: Flush) -> ReturnCode {
    // skip check
    if let Mode::Type = stream.state.mode {
        stream.state.mode = Mode::TypeDo;
    }

    stream.state.flush = flush;

    let mut err = stream.dispatch();

    let in_read = stream.bit_reader.consumed();
    let out_written = stream.writer.len();

    let mode = stream.state.mode;

    let valid_mode = !matches!(mode, Mode::Bad | Mode::Mem);
    let not_done = !matches!(mode, Mode::Check | Mode::Done);

    let must_update_window = stream.state.window.size() != 0
        || (out_written != 0 && valid_mode && (not_done || flush != Flush::Finish));

    stream.update_checksum();

    if must_update_window {
        let state = &mut *stream.state;

        match state.window.ensure(state.wbits) {
            Ok(()) => state.window.extend(stream.writer.filled()),
            Err(_) => {
                state.mode = Mode::Mem;
                err = ReturnCode::MemError;
            }
        }
    }

    let state = &mut *stream.state;
    state.total_in += in_read as u64;
    state.total_out += out_written as u64;

    if ((in_read == 0 && out_written == 0) || flush == Flush::Finish) && err == ReturnCode::Ok {
        ReturnCode::BufError
    } else {
        err
    }
}

fn set_dictionary(state: &mut State, dictionary: &[u8]) -> Result<(), Error> {
    if state.wrap != 0 && state.mode != Mode::Dict {
        return Err(Error::stream("dictionary not expected"));
    }

    // check for correct dictionary identifier
    if state.mode == Mode::Dict {
        let dictid = adler32_with(state.dispatch, ADLER32_INITIAL_VALUE, dictionary);

        if dictid != state.checksum {
            return Err(Error::data("incorrect dictionary"));
        }
    }

    if let Err(err) = state.window.ensure(state.wbits) {
        state.mode = Mode::Mem;
        return Err(err);
    }

    state.window.extend(dictionary);
    state.flags.update(Flags::HAVE_DICT, true);

    Ok(())
}

/// A streaming decompressor.
///
/// Input and output can be split at arbitrary points across [`Inflate::inflate`] calls; the
/// stream is complete once a call returns [`ReturnCode::StreamEnd`].
pub struct Inflate {
    state: Box<State>,
}

impl Inflate {
    pub fn new(config: InflateConfig, dispatch: Dispatch) -> Result<Self, Error> {
        Ok(Self {
            state: State::new(config, dispatch),
        })
    }

    /// Decompress as much of `input` into `output` as possible.
    ///
    /// `code` is `Ok` when progress was made, `StreamEnd` at the end of the stream, `NeedDict`
    /// when the stream needs a preset dictionary (its id is then [`Inflate::adler`]), and
    /// `BufError` when no progress was possible. `DataError` leaves a message in
    /// [`Inflate::msg`].
    pub fn inflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Progress {
        let mut stream = InflateStream::new(input, output, &mut self.state);

        let code = inflate(&mut stream, flush);

        let consumed = stream.bit_reader.consumed();
        let produced = stream.writer.len();
        (stream.state.hold, stream.state.bits) = stream.bit_reader.into_parts();

        Progress {
            consumed,
            produced,
            code,
        }
    }

    /// Provide the preset dictionary. For a zlib stream, call this after `inflate` returned
    /// `NeedDict`; for a raw stream, any time before the data that refers to it.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), Error> {
        set_dictionary(&mut self.state, dictionary)
    }

    /// Start a new stream with the same configuration.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn total_in(&self) -> u64 {
        self.state.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.state.total_out
    }

    /// Adler-32 of the output so far, or the id of the dictionary the stream asks for.
    pub fn adler(&self) -> u32 {
        self.state.checksum
    }

    /// Description of the data error that stopped the stream.
    pub fn msg(&self) -> Option<&'static str> {
        self.state.error_message
    }
}

/// Inflate `input` into `output` in one call, with runtime-detected kernels.
///
/// Returns the written prefix of `output`. Truncated input and streams that need a dictionary
/// are a `DataError`; an `output` that is too small is a `BufError`.
pub fn uncompress_slice<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: InflateConfig,
) -> (&'a mut [u8], ReturnCode) {
    uncompress_slice_with(output, input, config, Dispatch::detect())
}

pub fn uncompress_slice_with<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: InflateConfig,
    dispatch: Dispatch,
) -> (&'a mut [u8], ReturnCode) {
    let mut state = State::new(config, dispatch);

    let (err, written, left) = {
        let mut stream = InflateStream::new(input, &mut *output, &mut state);
        let err = inflate(&mut stream, Flush::Finish);

        (err, stream.writer.len(), stream.writer.remaining())
    };

    let ret = match err {
        ReturnCode::StreamEnd => ReturnCode::Ok,
        ReturnCode::NeedDict => ReturnCode::DataError,
        // the input ended while there was still room for output
        ReturnCode::BufError if left != 0 => ReturnCode::DataError,
        _ => err,
    };

    (&mut output[..written], ret)
}

/// Inflate a complete stream into a vector that grows as needed.
///
/// The output starts at `output_hint` bytes, or `max(4 * input.len(), 64)`, and doubles whenever
/// it fills up.
pub fn decompress_with(
    input: &[u8],
    output_hint: Option<usize>,
    config: InflateConfig,
    dispatch: Dispatch,
) -> Result<Vec<u8>, Error> {
    let mut inflate = Inflate::new(config, dispatch)?;

    let mut capacity = match output_hint {
        Some(hint) => Ord::max(hint, 1),
        None => Ord::max(input.len().saturating_mul(4), 64),
    };

    let mut output = Vec::new();
    let mut consumed = 0;
    let mut filled = 0;

    loop {
        output
            .try_reserve_exact(capacity - output.len())
            .map_err(|_| Error::alloc(capacity))?;
        output.resize(capacity, 0);

        let progress = inflate.inflate(&input[consumed..], &mut output[filled..], Flush::NoFlush);
        consumed += progress.consumed;
        filled += progress.produced;

        match progress.code {
            ReturnCode::StreamEnd => {
                output.truncate(filled);
                trace!(consumed, filled, "decompressed");

                return Ok(output);
            }
            ReturnCode::Ok | ReturnCode::BufError => {
                if filled < output.len() {
                    // the input ran out before the end of the stream
                    return Err(Error::data("unexpected end of stream"));
                }

                capacity = capacity
                    .checked_mul(2)
                    .ok_or_else(|| Error::alloc(usize::MAX))?;
            }
            ReturnCode::NeedDict => return Err(Error::data("need dictionary")),
            code => {
                let message = inflate.msg().unwrap_or(code.error_message());
                return Err(Error::from_return_code(code, message, output.len()));
            }
        }
    }
}
