//! Compression: the streaming [`Deflate`] engine and the one-shot [`compress_slice`].

use tracing::{debug, warn};

use crate::{
    adler32::adler32_with, cpu_features::Dispatch, trace, Error, Flush, Progress, ReturnCode,
    ADLER32_INITIAL_VALUE, DEFAULT_LEVEL, DEF_WBITS, MAX_WBITS, MIN_WBITS,
};

use self::{
    algorithm::CONFIGURATION_TABLE,
    bitstream::BitWriter,
    hash_calc::{HashCalc, Sse41HashCalc, StandardHashCalc},
    sym_buf::SymBuf,
    trees::Trees,
    window::Window,
};

pub(crate) mod algorithm;
mod bitstream;
pub(crate) mod compare256;
mod hash_calc;
mod longest_match;
mod pending;
mod slide_hash;
mod sym_buf;
mod trees;
mod trees_tbl;
mod window;

/// The input, output and engine state of a single call.
pub(crate) struct DeflateStream<'a> {
    pub(crate) next_in: &'a [u8],
    pub(crate) next_out: &'a mut [u8],
    pub(crate) state: &'a mut State,
}

pub(crate) const HASH_SIZE: usize = 65536;
/// log2(HASH_SIZE)
#[allow(unused)]
const HASH_BITS: usize = 16;

/// Maximum value for mem_level
const MAX_MEM_LEVEL: i32 = 9;
const DEF_MEM_LEVEL: i32 = if MAX_MEM_LEVEL > 8 { 8 } else { MAX_MEM_LEVEL };

/// Size of the zlib header plus trailer
const ZLIB_WRAPLEN: usize = 6;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "__internal-fuzz", derive(arbitrary::Arbitrary))]
pub enum Method {
    #[default]
    Deflated = 8,
}

impl TryFrom<i32> for Method {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Deflated),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "__internal-fuzz", derive(arbitrary::Arbitrary))]
pub struct DeflateConfig {
    pub level: i32,
    pub method: Method,
    /// 8..=15 for a zlib stream, -15..=-8 for raw deflate
    pub window_bits: i32,
    pub mem_level: i32,
    pub strategy: Strategy,
}

#[cfg(any(test, feature = "__internal-test"))]
impl quickcheck::Arbitrary for DeflateConfig {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let mem_levels: Vec<_> = (1..=9).collect();
        let levels: Vec<_> = (0..=9).collect();
        let window_bits: Vec<_> = (-15..=-9).chain(9..=15).collect();

        Self {
            level: *g.choose(&levels).unwrap(),
            method: Method::Deflated,
            window_bits: *g.choose(&window_bits).unwrap(),
            mem_level: *g.choose(&mem_levels).unwrap(),
            strategy: *g
                .choose(&[
                    Strategy::Default,
                    Strategy::Filtered,
                    Strategy::HuffmanOnly,
                    Strategy::Rle,
                    Strategy::Fixed,
                ])
                .unwrap(),
        }
    }
}

impl DeflateConfig {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            method: Method::Deflated,
            window_bits: MAX_WBITS,
            mem_level: DEF_MEM_LEVEL,
            strategy: Strategy::Default,
        }
    }
}

/// A config with out-of-range values replaced by their defaults.
struct Resolved {
    level: i8,
    wrap: i8,
    window_bits: usize,
    mem_level: usize,
}

impl DeflateConfig {
    fn resolve(&self) -> Resolved {
        let level = match self.level {
            -1 => DEFAULT_LEVEL,
            level @ 0..=9 => level,
            level => {
                warn!(level, "compression level out of range, using {DEFAULT_LEVEL}");
                DEFAULT_LEVEL
            }
        };

        let wrap = if self.window_bits < 0 { 0 } else { 1 };

        let window_bits = match self.window_bits.unsigned_abs() as i32 {
            // a 256 byte window is not supported by the match finder
            MIN_WBITS => MIN_WBITS + 1,
            bits @ MIN_WBITS..=MAX_WBITS => bits,
            bits => {
                warn!(window_bits = bits, "window bits out of range, using {DEF_WBITS}");
                DEF_WBITS
            }
        };

        let mem_level = match self.mem_level {
            mem_level @ 1..=MAX_MEM_LEVEL => mem_level,
            mem_level => {
                warn!(mem_level, "memory level out of range, using {DEF_MEM_LEVEL}");
                DEF_MEM_LEVEL
            }
        };

        Resolved {
            level: level as i8,
            wrap,
            window_bits: window_bits as usize,
            mem_level: mem_level as usize,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Value {
    a: u16,
    b: u16,
}

impl Value {
    pub(crate) const fn new(a: u16, b: u16) -> Self {
        Self { a, b }
    }

    pub(crate) fn freq_mut(&mut self) -> &mut u16 {
        &mut self.a
    }

    pub(crate) fn code_mut(&mut self) -> &mut u16 {
        &mut self.a
    }

    pub(crate) fn dad_mut(&mut self) -> &mut u16 {
        &mut self.b
    }

    pub(crate) fn len_mut(&mut self) -> &mut u16 {
        &mut self.b
    }

    #[inline(always)]
    pub(crate) const fn freq(self) -> u16 {
        self.a
    }

    pub(crate) fn code(self) -> u16 {
        self.a
    }

    pub(crate) fn dad(self) -> u16 {
        self.b
    }

    pub(crate) fn len(self) -> u16 {
        self.b
    }
}

/// number of length codes, not counting the special END_BLOCK code
pub(crate) const LENGTH_CODES: usize = 29;

/// number of literal bytes 0..255
pub(crate) const LITERALS: usize = 256;

/// number of Literal or Length codes, including the END_BLOCK code
pub(crate) const L_CODES: usize = LITERALS + 1 + LENGTH_CODES;

/// number of distance codes
pub(crate) const D_CODES: usize = 30;

/// number of codes used to transfer the bit lengths
pub(crate) const BL_CODES: usize = 19;

/// maximum heap size
pub(crate) const HEAP_SIZE: usize = 2 * L_CODES + 1;

/// all codes must not exceed MAX_BITS bits
pub(crate) const MAX_BITS: usize = 15;

/// Bit length codes must not exceed MAX_BL_BITS bits
pub(crate) const MAX_BL_BITS: usize = 7;

pub(crate) const DIST_CODE_LEN: usize = 512;

/// end of block literal code
pub(crate) const END_BLOCK: usize = 256;

pub(crate) struct State {
    status: Status,

    /// output still pending, and the bits of the block being written
    pub(crate) bit_writer: BitWriter,

    /// value of flush param for previous deflate call
    last_flush: i32,

    /// 1 for a zlib stream, 0 for raw deflate. Negated once the trailer is written.
    pub(crate) wrap: i8,

    pub(crate) strategy: Strategy,
    pub(crate) level: i8,

    pub(crate) dispatch: Dispatch,

    /// Use a faster search when the previous match is longer than this
    pub(crate) good_match: usize,

    /// Stop searching when current match exceeds this
    pub(crate) nice_match: usize,

    pub(crate) trees: Trees,

    pub(crate) match_length: usize, /* length of best match */
    pub(crate) prev_match: usize,   /* previous match */
    pub(crate) match_available: bool, /* set if previous match exists */
    pub(crate) strstart: usize,     /* start of string to insert */
    pub(crate) match_start: usize,  /* start of matching string */

    /// Length of the best match at previous step. Matches not greater than this
    /// are discarded. This is used in the lazy match evaluation.
    pub(crate) prev_length: usize,

    /// To speed up deflation, hash chains are never searched beyond this length.
    /// A higher limit improves compression ratio but degrades the speed.
    pub(crate) max_chain_length: usize,

    /// Attempt to find a better match only when the current match is strictly smaller
    /// than this value. This mechanism is used only for compression levels >= 4.
    /// For the greedy levels this is the maximum length of a match whose strings are all
    /// inserted in the hash table.
    pub(crate) max_lazy_match: usize,

    /// Window position at the beginning of the current output block. Gets
    /// negative when the window is moved backwards.
    pub(crate) block_start: isize,

    pub(crate) window: Window,

    pub(crate) sym_buf: SymBuf,

    /// Size of match buffer for literals/lengths. Frequencies fit in 16 bit counters, and
    /// smaller buffers adapt faster to changes in the input statistics at the cost of sending
    /// trees more often.
    lit_bufsize: usize,

    /// Actual size of window: 2*wSize
    pub(crate) window_size: usize,

    /// bytes at end of window left to insert
    pub(crate) insert: usize,

    pub(crate) w_size: usize,    /* LZ77 window size (32K by default) */
    pub(crate) w_bits: usize,    /* log2(w_size)  (9..16) */
    pub(crate) w_mask: usize,    /* w_size - 1 */
    pub(crate) lookahead: usize, /* number of valid bytes ahead in window */

    pub(crate) prev: Vec<u16>,
    pub(crate) head: Vec<u16>,

    pub(crate) insert_string: fn(state: &mut State, string: usize, count: usize),
    pub(crate) quick_insert_string: fn(state: &mut State, string: usize) -> u16,

    /// running adler32 of the uncompressed data
    pub(crate) adler: u32,
    pub(crate) total_in: u64,
    pub(crate) total_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "__internal-fuzz", derive(arbitrary::Arbitrary))]
pub enum Strategy {
    #[default]
    Default = 0,
    Filtered = 1,
    HuffmanOnly = 2,
    Rle = 3,
    Fixed = 4,
}

impl TryFrom<i32> for Strategy {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Strategy::Default),
            1 => Ok(Strategy::Filtered),
            2 => Ok(Strategy::HuffmanOnly),
            3 => Ok(Strategy::Rle),
            4 => Ok(Strategy::Fixed),
            _ => Err(()),
        }
    }
}

fn alloc_table(len: usize) -> Result<Vec<u16>, Error> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| Error::alloc(len * core::mem::size_of::<u16>()))?;
    table.resize(len, 0);
    Ok(table)
}

impl State {
    pub(crate) fn new(config: &DeflateConfig, dispatch: Dispatch) -> Result<Box<Self>, Error> {
        let Resolved {
            level,
            wrap,
            window_bits,
            mem_level,
        } = config.resolve();

        let w_size = 1 << window_bits;
        let lit_bufsize = 1 << (mem_level + 6); // 16K elements by default

        let (insert_string, quick_insert_string): (fn(&mut State, usize, usize), _) =
            if Sse41HashCalc::is_supported(dispatch) {
                (
                    Sse41HashCalc::insert_string,
                    Sse41HashCalc::quick_insert_string as fn(&mut State, usize) -> u16,
                )
            } else {
                (
                    StandardHashCalc::insert_string,
                    StandardHashCalc::quick_insert_string as fn(&mut State, usize) -> u16,
                )
            };

        let mut state = Box::new(State {
            status: Status::Init,

            // window
            w_bits: window_bits,
            w_size,
            w_mask: w_size - 1,

            // allocated values
            window: Window::new(window_bits)?,
            prev: alloc_table(w_size)?,
            head: alloc_table(HASH_SIZE)?,
            bit_writer: BitWriter::new(4 * lit_bufsize)?,
            sym_buf: SymBuf::new(lit_bufsize)?,

            lit_bufsize,

            level,
            strategy: config.strategy,
            dispatch,

            // these fields are set by reset
            last_flush: 0,
            wrap,
            strstart: 0,
            block_start: 0,
            window_size: 0,
            insert: 0,
            lookahead: 0,
            max_chain_length: 0,
            max_lazy_match: 0,
            good_match: 0,
            nice_match: 0,

            trees: Trees::new(),

            match_start: 0,
            match_length: 0,
            prev_match: 0,
            match_available: false,
            prev_length: 0,

            insert_string,
            quick_insert_string,

            adler: ADLER32_INITIAL_VALUE,
            total_in: 0,
            total_out: 0,
        });

        state.reset();

        debug!(
            level,
            wrap,
            window_bits,
            mem_level,
            strategy = ?config.strategy,
            ?dispatch,
            "deflate engine initialized"
        );

        Ok(state)
    }

    pub(crate) fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// The greedy levels reuse `max_lazy_match` as the maximum length of a match whose strings
    /// are all inserted in the hash table.
    pub(crate) fn max_insert_length(&self) -> usize {
        self.max_lazy_match
    }

    /// Record a literal. Returns whether the current block should be flushed.
    pub(crate) fn tally_lit(&mut self, unmatched: u8) -> bool {
        self.sym_buf.push_lit(unmatched);
        self.trees.tally_lit(unmatched);

        self.sym_buf.should_flush_block()
    }

    /// Record a match of `len + STD_MIN_MATCH` bytes at distance `dist`. Returns whether the
    /// current block should be flushed.
    pub(crate) fn tally_dist(&mut self, dist: usize, len: usize) -> bool {
        debug_assert!(
            dist >= 1 && dist <= self.max_dist(),
            "tally_dist: bad match distance {dist}"
        );

        self.sym_buf.push_dist(dist as u16, len as u8);
        self.trees.tally_dist(dist, len);

        self.sym_buf.should_flush_block()
    }

    fn header(&self) -> u16 {
        // preset dictionary flag in zlib header
        const PRESET_DICT: u16 = 0x20;

        // The deflate compression method (the only one supported in this version)
        const Z_DEFLATED: u16 = Method::Deflated as u16;

        let dict = match self.strstart {
            0 => 0,
            _ => PRESET_DICT,
        };

        let h =
            (Z_DEFLATED + ((self.w_bits as u16 - 8) << 4)) << 8 | (self.level_flags() << 6) | dict;

        h + 31 - (h % 31)
    }

    fn level_flags(&self) -> u16 {
        if self.strategy >= Strategy::HuffmanOnly || self.level < 2 {
            0
        } else if self.level < 6 {
            1
        } else if self.level == 6 {
            2
        } else {
            3
        }
    }

    /// Only moves between the busy states. `Init` and the finishing states are set explicitly.
    fn set_busy(&mut self, status: Status) {
        if self.status.is_busy() {
            self.status = status;
        }
    }

    fn reset(&mut self) {
        self.reset_keep();
        self.lm_init();
    }

    fn reset_keep(&mut self) {
        self.total_in = 0;
        self.total_out = 0;

        self.bit_writer.reset();

        // can be made negative by deflate(..., Finish);
        self.wrap = self.wrap.abs();

        self.status = Status::Init;
        self.adler = ADLER32_INITIAL_VALUE;
        self.last_flush = -2;

        self.trees.init_block();
        self.sym_buf.clear();
    }

    fn lm_init(&mut self) {
        self.window_size = 2 * self.w_size;

        self.head.fill(0);

        // Set the default configuration parameters:
        self.lm_set_level(self.level);

        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.insert = 0;
        self.match_length = STD_MIN_MATCH - 1;
        self.prev_length = STD_MIN_MATCH - 1;
        self.match_available = false;
        self.match_start = 0;
    }

    fn lm_set_level(&mut self, level: i8) {
        let config = &CONFIGURATION_TABLE[level as usize];

        self.max_lazy_match = config.max_lazy as usize;
        self.good_match = config.good_length as usize;
        self.nice_match = config.nice_length as usize;
        self.max_chain_length = config.max_chain as usize;

        self.level = level;
    }
}

/// Where the compressor is in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing written yet; a preset dictionary may still be set.
    Init,
    /// Copying input into the window.
    ReadingInput,
    /// Looking for matches in the window.
    Matching,
    /// Writing a block to the output.
    Emitting,
    /// The final block is (being) written.
    Finishing,
    /// The trailer was written completely.
    Done,
}

impl Status {
    fn is_busy(self) -> bool {
        matches!(
            self,
            Status::ReadingInput | Status::Matching | Status::Emitting
        )
    }

    fn is_finishing(self) -> bool {
        matches!(self, Status::Finishing | Status::Done)
    }
}

const fn rank_flush(f: i32) -> i32 {
    // rank Z_BLOCK between Z_NO_FLUSH and Z_PARTIAL_FLUSH
    ((f) * 2) - (if (f) > 4 { 9 } else { 0 })
}

#[derive(Debug)]
pub(crate) enum BlockState {
    /// block not completed, need more input or more output
    NeedMore = 0,
    /// block flush performed
    BlockDone = 1,
    /// finish started, need only more output at next deflate
    FinishStarted = 2,
    /// finish done, accept no more input or output
    FinishDone = 3,
}

// Maximum stored block length in deflate format (not including header).
pub(crate) const MAX_STORED: usize = 65535; // so u16::max

pub(crate) fn read_buf_window(stream: &mut DeflateStream, offset: usize, size: usize) -> usize {
    let len = Ord::min(stream.next_in.len(), size);

    if len == 0 {
        return 0;
    }

    let (data, rest) = stream.next_in.split_at(len);

    let state = &mut stream.state;
    state.window.copy_in(offset, data);

    if state.wrap == 1 {
        state.adler = adler32_with(state.dispatch, state.adler, data);
    }

    stream.next_in = rest;
    state.total_in += len as u64;

    len
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockType {
    StoredBlock = 0,
    StaticTrees = 1,
    DynamicTrees = 2,
}

/// The minimum match length mandated by the deflate standard
pub(crate) const STD_MIN_MATCH: usize = 3;
/// The maximum match length mandated by the deflate standard
pub(crate) const STD_MAX_MATCH: usize = 258;

/// The minimum wanted match length, affects deflate_fast and deflate_slow
pub(crate) const WANT_MIN_MATCH: usize = 4;

pub(crate) const MIN_LOOKAHEAD: usize = STD_MAX_MATCH + STD_MIN_MATCH + 1;

/// Fill the window when the lookahead becomes insufficient, sliding it down by `w_size` when
/// the upper half is needed. Updates `strstart` and `lookahead`, and inserts the strings that
/// became hashable.
pub(crate) fn fill_window(stream: &mut DeflateStream) {
    debug_assert!(stream.state.lookahead < MIN_LOOKAHEAD);

    stream.state.set_busy(Status::ReadingInput);

    let wsize = stream.state.w_size;

    loop {
        let state = &mut stream.state;
        let mut more = state.window_size - state.lookahead - state.strstart;

        // If the window is almost full and there is insufficient lookahead,
        // move the upper half to the lower one to make room in the upper half.
        if state.strstart >= wsize + state.max_dist() {
            state.window.filled_mut().copy_within(wsize..2 * wsize, 0);

            if state.match_start >= wsize {
                state.match_start -= wsize;
            } else {
                state.match_start = 0;
                state.prev_length = 0;
            }
            state.strstart -= wsize; /* we now have strstart >= MAX_DIST */
            state.block_start -= wsize as isize;
            if state.insert > state.strstart {
                state.insert = state.strstart;
            }

            self::slide_hash::slide_hash(state);

            more += wsize;
        }

        if stream.next_in.is_empty() {
            break;
        }

        // If there was no sliding:
        //    strstart <= WSIZE+MAX_DIST-1 && lookahead <= MIN_LOOKAHEAD - 1 &&
        //    more == window_size - lookahead - strstart
        // => more >= window_size - (MIN_LOOKAHEAD-1 + WSIZE + MAX_DIST-1)
        // => more >= window_size - 2*WSIZE + 2
        // window_size == 2*WSIZE so more >= 2.
        // If there was sliding, more >= WSIZE. So in all cases, more >= 2.
        debug_assert!(more >= 2, "more < 2");

        let offset = stream.state.strstart + stream.state.lookahead;
        let n = read_buf_window(stream, offset, more);

        let state = &mut stream.state;
        state.lookahead += n;

        // Insert the strings that now have enough bytes behind them
        if state.lookahead + state.insert >= STD_MIN_MATCH {
            let string = state.strstart - state.insert;
            if string >= 1 {
                (state.quick_insert_string)(state, string + 2 - STD_MIN_MATCH);
            }
            let mut count = state.insert;
            if state.lookahead == 1 {
                count -= 1;
            }
            if count > 0 {
                (state.insert_string)(state, string, count);
                state.insert -= count;
            }
        }

        if !(stream.state.lookahead < MIN_LOOKAHEAD && !stream.next_in.is_empty()) {
            break;
        }
    }

    stream.state.set_busy(Status::Matching);

    debug_assert!(
        stream.state.strstart <= stream.state.window_size - MIN_LOOKAHEAD,
        "not enough room for search"
    );
}

pub(crate) fn flush_block_only(stream: &mut DeflateStream, is_last: bool) {
    let state = &mut stream.state;
    state.set_busy(Status::Emitting);

    let window_offset = (state.block_start >= 0).then_some(state.block_start as usize);
    let stored_len = (state.strstart as isize - state.block_start) as usize;
    self::trees::flush_block(state, window_offset, stored_len, is_last);

    stream.state.block_start = stream.state.strstart as isize;
    flush_pending(stream)
}

pub(crate) fn deflate(stream: &mut DeflateStream, flush: Flush) -> ReturnCode {
    if stream.state.status.is_finishing() && flush != Flush::Finish {
        return ReturnCode::StreamError;
    }

    if stream.next_out.is_empty() {
        return ReturnCode::BufError;
    }

    let old_flush = stream.state.last_flush;
    stream.state.last_flush = flush as i32;

    /* Flush as much pending output as possible */
    if !stream.state.bit_writer.pending.is_empty() {
        flush_pending(stream);
        if stream.next_out.is_empty() {
            // Since the output is full, deflate will be called again with more output space,
            // but possibly with both pending and input empty. There won't be anything to do,
            // but this is not an error situation so make sure we return Ok instead of
            // BufError at the next call.
            stream.state.last_flush = -1;
            return ReturnCode::Ok;
        }

        // Make sure there is something to do and avoid duplicate consecutive flushes. For
        // repeated and useless calls with Finish, we keep returning StreamEnd instead of
        // BufError.
    } else if stream.next_in.is_empty()
        && rank_flush(flush as i32) <= rank_flush(old_flush)
        && flush != Flush::Finish
    {
        return ReturnCode::BufError;
    }

    /* User must not provide more input after the first FINISH: */
    if stream.state.status.is_finishing() && !stream.next_in.is_empty() {
        return ReturnCode::BufError;
    }

    /* Write the header */
    if stream.state.status == Status::Init && stream.state.wrap == 0 {
        stream.state.status = Status::ReadingInput;
    }

    if stream.state.status == Status::Init {
        let state = &mut stream.state;
        let header = state.header();
        state.bit_writer.pending.extend(&header.to_be_bytes());

        /* Save the adler32 of the preset dictionary: */
        if state.strstart != 0 {
            let adler = state.adler;
            state.bit_writer.pending.extend(&adler.to_be_bytes());
        }

        state.adler = ADLER32_INITIAL_VALUE;
        state.status = Status::ReadingInput;

        // compression must start with an empty pending buffer
        flush_pending(stream);

        if !stream.state.bit_writer.pending.is_empty() {
            stream.state.last_flush = -1;

            return ReturnCode::Ok;
        }
    }

    // Start a new block or continue the current one.
    let state = &mut stream.state;
    if !stream.next_in.is_empty()
        || state.lookahead != 0
        || (flush != Flush::NoFlush && !state.status.is_finishing())
    {
        let bstate = self::algorithm::run(stream, flush);

        let state = &mut stream.state;

        if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
            state.status = Status::Finishing;
        }

        match bstate {
            BlockState::NeedMore | BlockState::FinishStarted => {
                if stream.next_out.is_empty() {
                    state.last_flush = -1; /* avoid BUF_ERROR next call, see above */
                }
                return ReturnCode::Ok;
                // If flush != NoFlush and the output is full, the next call of deflate should
                // use the same flush parameter to make sure that the flush is complete. So we
                // don't have to output an empty block here, this will be done at next call.
                // This also ensures that for a very small output buffer, we emit at most one
                // empty block.
            }
            BlockState::BlockDone => {
                match flush {
                    Flush::PartialFlush => state.bit_writer.align(),
                    Flush::Block => {}
                    _ => {
                        // Full or sync flush. For a full flush, this empty block is recognized
                        // as a restart marker.
                        state.bit_writer.stored_block(&[], false);

                        if flush == Flush::FullFlush {
                            // forget history
                            state.head.fill(0);

                            if state.lookahead == 0 {
                                state.strstart = 0;
                                state.block_start = 0;
                                state.insert = 0;
                            }
                        }
                    }
                }

                flush_pending(stream);

                if stream.next_out.is_empty() {
                    stream.state.last_flush = -1; /* avoid BUF_ERROR at next call, see above */
                    return ReturnCode::Ok;
                }
            }
            BlockState::FinishDone => { /* do nothing */ }
        }
    }

    if flush != Flush::Finish {
        return ReturnCode::Ok;
    }

    // write the trailer
    if stream.state.wrap == 1 {
        let adler = stream.state.adler;
        stream.state.bit_writer.pending.extend(&adler.to_be_bytes());
    }

    flush_pending(stream);

    // If the output is full, the application will call deflate again to flush the rest.
    if stream.state.wrap > 0 {
        stream.state.wrap = -stream.state.wrap; /* write the trailer only once! */
    }

    if stream.state.bit_writer.pending.is_empty() {
        debug_assert_eq!(stream.state.bit_writer.bits_used(), 0, "bit buffer not flushed");
        stream.state.status = Status::Done;
        return ReturnCode::StreamEnd;
    }

    ReturnCode::Ok
}

pub(crate) fn flush_pending(stream: &mut DeflateStream) {
    let state = &mut stream.state;

    state.bit_writer.flush();

    let pending = state.bit_writer.pending.pending();
    let len = Ord::min(pending.len(), stream.next_out.len());

    if len == 0 {
        return;
    }

    trace!("[FLUSH {len} bytes]");
    let (dst, rest) = core::mem::take(&mut stream.next_out).split_at_mut(len);
    dst.copy_from_slice(&pending[..len]);

    stream.next_out = rest;
    state.total_out += len as u64;
    state.bit_writer.pending.advance(len);
}

fn params(stream: &mut DeflateStream, level: i32, strategy: Strategy) -> ReturnCode {
    let level = if level == -1 { DEFAULT_LEVEL } else { level };

    if !(0..=9).contains(&level) {
        return ReturnCode::StreamError;
    }

    let level = level as i8;

    let algorithm = CONFIGURATION_TABLE[stream.state.level as usize].algorithm;

    let state = &mut stream.state;

    if (strategy != state.strategy || algorithm != CONFIGURATION_TABLE[level as usize].algorithm)
        && state.last_flush != -2
    {
        // Flush the last buffer.
        let err = deflate(stream, Flush::Block);
        if err == ReturnCode::StreamError {
            return err;
        }

        let state = &mut stream.state;

        if !stream.next_in.is_empty()
            || ((state.strstart as isize - state.block_start) + state.lookahead as isize) != 0
        {
            return ReturnCode::BufError;
        }
    }

    let state = &mut stream.state;

    if state.level != level {
        state.lm_set_level(level);
    }

    state.strategy = strategy;

    ReturnCode::Ok
}

fn set_dictionary(state: &mut State, mut dictionary: &[u8]) -> Result<(), Error> {
    let wrap = state.wrap;

    if (wrap != 0 && state.status != Status::Init) || state.lookahead != 0 {
        return Err(Error::stream(
            "a dictionary must be set before the first compressed data",
        ));
    }

    // when using zlib wrappers, compute Adler-32 for provided dictionary
    if wrap == 1 {
        state.adler = adler32_with(state.dispatch, state.adler, dictionary);
    }

    // avoid computing Adler-32 in read_buf_window
    state.wrap = 0;
    let total_in = state.total_in;

    // if dictionary would fill window, just replace the history
    if dictionary.len() >= state.w_size {
        if wrap == 0 {
            // clear the hash table
            state.head.fill(0);

            state.strstart = 0;
            state.block_start = 0;
            state.insert = 0;
        }

        // use the tail
        dictionary = &dictionary[dictionary.len() - state.w_size..];
    }

    // insert dictionary into window and hash
    let mut stream = DeflateStream {
        next_in: dictionary,
        next_out: &mut [],
        state,
    };
    fill_window(&mut stream);

    while stream.state.lookahead >= STD_MIN_MATCH {
        let str = stream.state.strstart;
        let n = stream.state.lookahead - (STD_MIN_MATCH - 1);
        (stream.state.insert_string)(stream.state, str, n);
        stream.state.strstart = str + n;
        stream.state.lookahead = STD_MIN_MATCH - 1;
        fill_window(&mut stream);
    }

    let state = stream.state;

    state.strstart += state.lookahead;
    state.block_start = state.strstart as _;
    state.insert = state.lookahead;
    state.lookahead = 0;
    state.prev_length = 0;
    state.match_available = false;

    // the dictionary does not count as input
    state.total_in = total_in;

    state.wrap = wrap;

    Ok(())
}

/// A streaming compressor.
///
/// Input is consumed and output produced across any number of [`Deflate::deflate`] calls; the
/// stream is complete once a call with [`Flush::Finish`] returns [`ReturnCode::StreamEnd`].
pub struct Deflate {
    state: Box<State>,
}

impl Deflate {
    pub fn new(config: DeflateConfig, dispatch: Dispatch) -> Result<Self, Error> {
        Ok(Self {
            state: State::new(&config, dispatch)?,
        })
    }

    /// Compress as much of `input` into `output` as fits.
    ///
    /// `code` is `Ok` when progress was made, `StreamEnd` when a finished stream was written
    /// completely, and `BufError` when no progress was possible.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Progress {
        let (input_len, output_len) = (input.len(), output.len());

        let mut stream = DeflateStream {
            next_in: input,
            next_out: output,
            state: &mut self.state,
        };

        let code = deflate(&mut stream, flush);

        Progress {
            consumed: input_len - stream.next_in.len(),
            produced: output_len - stream.next_out.len(),
            code,
        }
    }

    /// Change the level and strategy. Data compressed so far is flushed into `output` first
    /// when the change affects how it is compressed.
    pub fn params(&mut self, output: &mut [u8], level: i32, strategy: Strategy) -> Progress {
        let output_len = output.len();

        let mut stream = DeflateStream {
            next_in: &[],
            next_out: output,
            state: &mut self.state,
        };

        let code = params(&mut stream, level, strategy);

        Progress {
            consumed: 0,
            produced: output_len - stream.next_out.len(),
            code,
        }
    }

    /// Prime the history with `dictionary`. For a zlib stream this must happen before the first
    /// call to [`Deflate::deflate`]; the decompressor needs the same dictionary.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), Error> {
        set_dictionary(&mut self.state, dictionary)
    }

    /// Start a new stream with the same configuration.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn total_in(&self) -> u64 {
        self.state.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.state.total_out
    }

    /// Adler-32 of the input consumed so far (of the dictionary before compression starts).
    pub fn adler(&self) -> u32 {
        self.state.adler
    }

    /// Upper bound on the compressed size of `source_len` bytes with this configuration.
    pub fn bound(&self, source_len: usize) -> usize {
        let wrap_len = match self.state.wrap.abs() {
            0 => 0,
            // a dictionary id may follow the header
            _ if self.state.strstart != 0 => ZLIB_WRAPLEN + 4,
            _ => ZLIB_WRAPLEN,
        };

        compress_bound_help(source_len, wrap_len)
    }
}

/// Compress `input` into `output` in one call, with runtime-detected kernels.
///
/// Returns the written prefix of `output`. The code is `BufError` when `output` is too small
/// (size it with [`compress_bound`]).
pub fn compress_slice<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: DeflateConfig,
) -> (&'a mut [u8], ReturnCode) {
    compress_slice_with(output, input, config, Dispatch::detect())
}

pub fn compress_slice_with<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: DeflateConfig,
    dispatch: Dispatch,
) -> (&'a mut [u8], ReturnCode) {
    let mut state = match State::new(&config, dispatch) {
        Ok(state) => state,
        Err(err) => return (&mut [], err.return_code()),
    };

    let output_len = output.len();

    let mut stream = DeflateStream {
        next_in: input,
        next_out: &mut *output,
        state: &mut state,
    };

    let err = deflate(&mut stream, Flush::Finish);
    let written = output_len - stream.next_out.len();

    let code = match err {
        ReturnCode::StreamEnd => ReturnCode::Ok,
        // the output was too small to hold the whole stream
        ReturnCode::Ok => ReturnCode::BufError,
        other => other,
    };

    (&mut output[..written], code)
}

/// Upper bound on the size of the zlib stream produced for `source_len` input bytes, at any
/// level and strategy.
pub fn compress_bound(source_len: usize) -> usize {
    compress_bound_help(source_len, ZLIB_WRAPLEN)
}

fn compress_bound_help(source_len: usize, wrap_len: usize) -> usize {
    source_len // The source size itself
        // worst case literal encoding is 9 bits per byte
        .wrapping_add(source_len.wrapping_add(7) >> 3)
        // block headers and end-of-block codes
        .wrapping_add(source_len.wrapping_add(63) >> 6)
        // stored block header of an empty final block
        .wrapping_add(5)
        // none or zlib wrapper
        .wrapping_add(wrap_len)
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::inflate::{uncompress_slice, Inflate, InflateConfig};

    /// Deterministic text-like input with a bit of repetition.
    fn sample_text(len: usize) -> Vec<u8> {
        const WORDS: &[&str] = &[
            "deflate", "window", "match", "the", "of", "huffman", "tree", "block", "stream",
            "literal", "distance", "a", "and", "lazy", "chain",
        ];

        let mut out = Vec::with_capacity(len);
        let mut seed = 0x2545_f491u32;
        while out.len() < len {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            out.extend_from_slice(WORDS[seed as usize % WORDS.len()].as_bytes());
            out.push(if seed % 11 == 0 { b'\n' } else { b' ' });
        }
        out.truncate(len);
        out
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut seed = 0x9e37_79b9u32;
        (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 24) as u8
            })
            .collect()
    }

    fn compress_vec(input: &[u8], config: DeflateConfig, dispatch: Dispatch) -> Vec<u8> {
        let mut output = vec![0; compress_bound(input.len())];
        let (output, err) = compress_slice_with(&mut output, input, config, dispatch);
        assert_eq!(err, ReturnCode::Ok);
        output.to_vec()
    }

    fn flate2_decompress(compressed: &[u8]) -> Vec<u8> {
        use std::io::Read;

        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(compressed)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn round_trip(input: &[u8], config: DeflateConfig) {
        let compressed = compress_vec(input, config, Dispatch::detect());

        let mut output = vec![0; input.len()];
        let inflate_config = InflateConfig {
            window_bits: config.window_bits,
        };
        let (output, err) = uncompress_slice(&mut output, &compressed, inflate_config);
        assert_eq!(err, ReturnCode::Ok, "{config:?}");
        assert_eq!(input, output, "{config:?}");

        if config.window_bits > 0 {
            assert_eq!(flate2_decompress(&compressed), input, "{config:?}");
        }
    }

    #[test]
    fn hello_world_huffman_only() {
        const EXPECTED: &[u8] = &[
            0x78, 0x01, 0xf3, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0x08, 0xcf, 0x2f, 0xca, 0x49, 0x51,
            0xe4, 0x02, 0x00, 0x20, 0x91, 0x04, 0x48,
        ];

        let input = "Hello World!\n";

        let mut output = vec![0; 128];

        let config = DeflateConfig {
            level: 6,
            method: Method::Deflated,
            window_bits: crate::MAX_WBITS,
            mem_level: DEF_MEM_LEVEL,
            strategy: Strategy::HuffmanOnly,
        };

        let (output, err) = compress_slice(&mut output, input.as_bytes(), config);

        assert_eq!(err, ReturnCode::Ok);

        assert_eq!(output.len(), EXPECTED.len());

        assert_eq!(EXPECTED, output);
    }

    #[test]
    fn hello_repeated_greedy_and_lazy() {
        let input = b"hello hello hello hello";

        // greedy and lazy find the same single match here; only the header differs
        let fast = compress_vec(input, DeflateConfig::new(1), Dispatch::detect());
        assert_eq!(
            fast,
            [
                0x78, 0x01, 0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0xc8, 0x40, 0x27, 0x01, 0x68,
                0x03, 0x08, 0xb1
            ]
        );

        let slow = compress_vec(input, DeflateConfig::new(9), Dispatch::detect());
        assert_eq!(slow[..2], [0x78, 0xda]);
        assert_eq!(slow[2..], fast[2..]);
    }

    #[test]
    fn simple_rle() {
        let config = DeflateConfig {
            strategy: Strategy::Rle,
            ..DeflateConfig::default()
        };

        let output = compress_vec(b"aaaaaaaaaabbbbbbbbbbbb", config, Dispatch::Scalar);
        assert_eq!(
            output,
            [0x78, 0x01, 0x4b, 0x84, 0x83, 0x24, 0x24, 0x00, 0x00, 0x60, 0x41, 0x08, 0x63]
        );
    }

    #[test]
    fn empty_input() {
        for level in 1..=9 {
            let output = compress_vec(b"", DeflateConfig::new(level), Dispatch::detect());
            assert_eq!(output[2..], [0x03, 0x00, 0x00, 0x00, 0x00, 0x01], "level {level}");
        }

        let output = compress_vec(b"", DeflateConfig::new(0), Dispatch::detect());
        assert_eq!(
            output,
            [0x78, 0x01, 0x01, 0x00, 0x00, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01]
        );
        assert_eq!(output.len(), compress_bound(0));
    }

    #[test]
    fn round_trip_levels() {
        let text = sample_text(100_000);
        let binary = noise(20_000);

        for level in 0..=9 {
            round_trip(&text, DeflateConfig::new(level));
            round_trip(&binary, DeflateConfig::new(level));
        }
    }

    #[test]
    fn round_trip_strategies_and_windows() {
        let text = sample_text(70_000);

        for strategy in [
            Strategy::Filtered,
            Strategy::HuffmanOnly,
            Strategy::Rle,
            Strategy::Fixed,
        ] {
            round_trip(
                &text,
                DeflateConfig {
                    strategy,
                    ..DeflateConfig::default()
                },
            );
        }

        for window_bits in [9, 10, 12, -15, -9] {
            for mem_level in [1, 8, 9] {
                round_trip(
                    &text,
                    DeflateConfig {
                        window_bits,
                        mem_level,
                        ..DeflateConfig::new(9)
                    },
                );
            }
        }
    }

    #[test]
    fn repeated_byte_ratio() {
        let input = vec![b'x'; 1 << 20];
        let output = compress_vec(&input, DeflateConfig::new(9), Dispatch::detect());

        assert!(output.len() * 100 < input.len(), "{}", output.len());
        round_trip(&input, DeflateConfig::new(9));
    }

    #[test]
    fn higher_levels_compress_better() {
        let input = sample_text(200_000);

        let l1 = compress_vec(&input, DeflateConfig::new(1), Dispatch::detect()).len();
        let l6 = compress_vec(&input, DeflateConfig::new(6), Dispatch::detect()).len();
        let l9 = compress_vec(&input, DeflateConfig::new(9), Dispatch::detect()).len();

        assert!(l9 <= l6, "{l9} > {l6}");
        assert!(l6 <= l1, "{l6} > {l1}");
    }

    #[test]
    fn vectorized_output_equals_scalar() {
        let input = sample_text(150_000);
        let detected = Dispatch::detect();
        let narrowed = Dispatch::Vectorized(detected.features().without_avx2());

        for level in 0..=9 {
            let config = DeflateConfig::new(level);
            let scalar = compress_vec(&input, config, Dispatch::Scalar);
            assert_eq!(scalar, compress_vec(&input, config, detected), "level {level}");
            assert_eq!(scalar, compress_vec(&input, config, narrowed), "level {level}");
        }
    }

    #[test]
    fn output_too_small() {
        let input = sample_text(10_000);

        let mut output = vec![0; 100];
        let (written, err) = compress_slice(&mut output, &input, DeflateConfig::default());
        assert_eq!(err, ReturnCode::BufError);
        assert_eq!(written.len(), 100);

        let (written, err) = compress_slice(&mut [], &input, DeflateConfig::default());
        assert_eq!(err, ReturnCode::BufError);
        assert!(written.is_empty());
    }

    #[test]
    fn out_of_range_config_is_clamped() {
        let input = sample_text(5_000);

        let config = DeflateConfig {
            level: 42,
            window_bits: 20,
            mem_level: 0,
            ..DeflateConfig::default()
        };
        let clamped = compress_vec(&input, config, Dispatch::Scalar);
        let default = compress_vec(&input, DeflateConfig::default(), Dispatch::Scalar);
        assert_eq!(clamped, default);

        // a 256 byte window is raised to 512 bytes
        let state = State::new(
            &DeflateConfig {
                window_bits: 8,
                ..DeflateConfig::default()
            },
            Dispatch::Scalar,
        )
        .unwrap();
        assert_eq!(state.w_bits, 9);
        assert_eq!(state.header(), 0x1895);
    }

    #[test]
    fn header_level_flags() {
        for (level, header) in [(0, 0x7801), (1, 0x7801), (2, 0x785e), (6, 0x789c), (9, 0x78da)] {
            let state = State::new(&DeflateConfig::new(level), Dispatch::Scalar).unwrap();
            assert_eq!(state.header(), header, "level {level}");
        }
    }

    #[test]
    fn streaming_in_small_pieces() {
        let input = sample_text(50_000);
        let one_shot = compress_vec(&input, DeflateConfig::default(), Dispatch::detect());

        let mut deflate = Deflate::new(DeflateConfig::default(), Dispatch::detect()).unwrap();
        let mut compressed = Vec::new();
        let mut buf = [0u8; 97];

        for chunk in input.chunks(1000) {
            let mut chunk = chunk;
            while !chunk.is_empty() {
                let progress = deflate.deflate(chunk, &mut buf, Flush::NoFlush);
                assert_eq!(progress.code, ReturnCode::Ok);
                compressed.extend_from_slice(&buf[..progress.produced]);
                chunk = &chunk[progress.consumed..];
            }
        }

        loop {
            let progress = deflate.deflate(&[], &mut buf, Flush::Finish);
            compressed.extend_from_slice(&buf[..progress.produced]);
            match progress.code {
                ReturnCode::Ok => continue,
                ReturnCode::StreamEnd => break,
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(deflate.status(), Status::Done);
        assert_eq!(deflate.total_in(), input.len() as u64);
        assert_eq!(deflate.total_out(), compressed.len() as u64);
        assert_eq!(deflate.adler(), crate::adler32(1, &input));

        // the stream does not depend on how input and output were split
        assert_eq!(compressed, one_shot);
    }

    #[test]
    fn status_transitions() {
        let mut deflate = Deflate::new(DeflateConfig::default(), Dispatch::Scalar).unwrap();
        assert_eq!(deflate.status(), Status::Init);

        let mut output = vec![0; 1024];
        let progress = deflate.deflate(b"some input", &mut output, Flush::NoFlush);
        assert_eq!(progress.code, ReturnCode::Ok);
        assert_eq!(progress.consumed, 10);
        assert!(matches!(
            deflate.status(),
            Status::ReadingInput | Status::Matching | Status::Emitting
        ));

        // the output can only hold part of the final block
        let mut small = [0u8; 3];
        let progress = deflate.deflate(&[], &mut small, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::Ok);
        assert_eq!(deflate.status(), Status::Finishing);

        // no more input is accepted, and other flush modes are an error
        let progress = deflate.deflate(b"more", &mut output, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::BufError);
        let progress = deflate.deflate(&[], &mut output, Flush::NoFlush);
        assert_eq!(progress.code, ReturnCode::StreamError);

        let progress = deflate.deflate(&[], &mut output, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        assert_eq!(deflate.status(), Status::Done);

        // repeated finish calls keep reporting the end of the stream
        let progress = deflate.deflate(&[], &mut output, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        assert_eq!(progress.produced, 0);

        deflate.reset();
        assert_eq!(deflate.status(), Status::Init);
        assert_eq!(deflate.total_in(), 0);
    }

    #[test]
    fn sync_flush_raw() {
        let config = DeflateConfig {
            window_bits: -15,
            ..DeflateConfig::default()
        };
        let mut deflate = Deflate::new(config, Dispatch::detect()).unwrap();

        let mut output = [0u8; 64];
        let progress = deflate.deflate(b"hello", &mut output, Flush::SyncFlush);
        assert_eq!(progress.code, ReturnCode::Ok);
        assert_eq!(
            output[..progress.produced],
            [0xca, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00, 0x00, 0x00, 0xff, 0xff]
        );

        // nothing to do, and no new flush point requested
        let progress = deflate.deflate(&[], &mut output, Flush::SyncFlush);
        assert_eq!(progress.code, ReturnCode::BufError);
    }

    #[test]
    fn flush_modes_round_trip() {
        let input = sample_text(30_000);

        for flush in [
            Flush::PartialFlush,
            Flush::SyncFlush,
            Flush::FullFlush,
            Flush::Block,
        ] {
            let mut deflate = Deflate::new(DeflateConfig::default(), Dispatch::detect()).unwrap();
            let mut compressed = vec![0; compress_bound(input.len()) + 1024];
            let mut written = 0;

            for chunk in input.chunks(4096) {
                let progress = deflate.deflate(chunk, &mut compressed[written..], flush);
                assert_eq!(progress.code, ReturnCode::Ok, "{flush:?}");
                assert_eq!(progress.consumed, chunk.len());
                written += progress.produced;
            }

            let progress = deflate.deflate(&[], &mut compressed[written..], Flush::Finish);
            assert_eq!(progress.code, ReturnCode::StreamEnd, "{flush:?}");
            written += progress.produced;

            assert_eq!(flate2_decompress(&compressed[..written]), input, "{flush:?}");
        }
    }

    #[test]
    fn params_switch_level_mid_stream() {
        let input = sample_text(40_000);
        let (first, second) = input.split_at(20_000);

        let mut deflate = Deflate::new(DeflateConfig::new(1), Dispatch::detect()).unwrap();
        let mut compressed = vec![0; compress_bound(input.len())];
        let mut written = 0;

        let progress = deflate.deflate(first, &mut compressed, Flush::NoFlush);
        assert_eq!(progress.consumed, first.len());
        written += progress.produced;

        let progress = deflate.params(&mut compressed[written..], 9, Strategy::Filtered);
        assert_eq!(progress.code, ReturnCode::Ok);
        written += progress.produced;

        let progress = deflate.deflate(second, &mut compressed[written..], Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        written += progress.produced;

        assert_eq!(flate2_decompress(&compressed[..written]), input);

        let progress = deflate.params(&mut compressed, 10, Strategy::Default);
        assert_eq!(progress.code, ReturnCode::StreamError);
    }

    #[test]
    fn preset_dictionary() {
        const EXPECTED: &[u8] = &[
            0x78, 0xbb, 0x1a, 0x0b, 0x04, 0x5d, 0xcb, 0x40, 0x30, 0x01, 0x1a, 0x0b, 0x04, 0x5d,
        ];

        let mut deflate = Deflate::new(DeflateConfig::default(), Dispatch::detect()).unwrap();
        deflate.set_dictionary(b"hello world").unwrap();
        assert_eq!(deflate.adler(), crate::adler32(1, b"hello world"));

        let mut output = [0u8; 64];
        let progress = deflate.deflate(b"hello world", &mut output, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        assert_eq!(&output[..progress.produced], EXPECTED);

        // too late for a dictionary now
        assert!(deflate.set_dictionary(b"hello").is_err());
    }

    #[test]
    fn long_dictionary_uses_the_tail() {
        let dictionary = noise(100_000);
        let input = &dictionary[90_000..91_000];

        let config = DeflateConfig {
            window_bits: -15,
            ..DeflateConfig::default()
        };
        let mut deflate = Deflate::new(config, Dispatch::detect()).unwrap();
        deflate.set_dictionary(&dictionary).unwrap();
        assert_eq!(deflate.total_in(), 0);

        let mut output = vec![0; 2048];
        let progress = deflate.deflate(input, &mut output, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);

        // a few long matches cover the input
        assert!(progress.produced < 40, "{}", progress.produced);

        let inflate_config = InflateConfig { window_bits: -15 };
        let mut inflate = Inflate::new(inflate_config, Dispatch::detect()).unwrap();
        inflate.set_dictionary(&dictionary).unwrap();

        let mut plain = vec![0; input.len()];
        let progress = inflate.inflate(&output[..progress.produced], &mut plain, Flush::Finish);
        assert_eq!(progress.code, ReturnCode::StreamEnd);
        assert_eq!(plain, input);
    }

    #[test]
    fn bound_holds_for_incompressible_data() {
        for len in [0, 1, 8, 9, 100, 1000, 65535, 65536, 100_000] {
            let input = noise(len);
            for level in 0..=9 {
                for mem_level in [1, 8] {
                    let config = DeflateConfig {
                        level,
                        mem_level,
                        ..DeflateConfig::default()
                    };
                    let output = compress_vec(&input, config, Dispatch::detect());
                    assert!(output.len() <= compress_bound(len), "{len} {level}");
                }
            }
        }
    }

    #[test]
    fn deflate_bound_accounts_for_wrapper() {
        let raw = Deflate::new(
            DeflateConfig {
                window_bits: -15,
                ..DeflateConfig::default()
            },
            Dispatch::Scalar,
        )
        .unwrap();
        let zlib = Deflate::new(DeflateConfig::default(), Dispatch::Scalar).unwrap();

        assert_eq!(zlib.bound(1000), compress_bound(1000));
        assert_eq!(raw.bound(1000) + ZLIB_WRAPLEN, compress_bound(1000));
    }

    #[test]
    fn window_slides_for_long_inputs() {
        // longer than several windows, with matches that cross the slide point
        let mut input = sample_text(40_000);
        input.extend_from_within(..30_000);
        input.extend(noise(10_000));
        input.extend_from_within(35_000..75_000);

        for level in [1, 4, 9] {
            for window_bits in [9, 15] {
                round_trip(
                    &input,
                    DeflateConfig {
                        window_bits,
                        ..DeflateConfig::new(level)
                    },
                );
            }
        }
    }

    #[test]
    fn distances_stay_inside_the_window() {
        // short repeats from the text, a run, and one long repeat of the noise
        let mut input = sample_text(4_000);
        input.extend(noise(2_000));
        input.extend_from_slice(&[b'-'; 200]);
        input.extend_from_within(..6_000);

        for (level, strategy) in [
            (1, Strategy::Default),
            (6, Strategy::Default),
            (9, Strategy::Default),
            (6, Strategy::Rle),
        ] {
            for window_bits in [9, 15] {
                let config = DeflateConfig {
                    window_bits,
                    strategy,
                    ..DeflateConfig::new(level)
                };

                let mut deflate = Deflate::new(config, Dispatch::detect()).unwrap();
                let mut output = vec![0; compress_bound(input.len())];

                // without a flush the whole input stays in one open block
                let progress = deflate.deflate(&input, &mut output, Flush::NoFlush);
                assert_eq!(progress.consumed, input.len());

                let state = &deflate.state;
                let max_dist = state.max_dist();

                let mut matches = 0;
                for (dist, _) in state.sym_buf.iter() {
                    if dist != 0 {
                        matches += 1;
                        assert!((1..=max_dist).contains(&(dist as usize)), "{config:?}: {dist}");
                    }
                }
                assert!(matches > 0, "{config:?}");

                // a chain only visits older positions while it stays in reach
                let limit = state.strstart.saturating_sub(max_dist);
                for &start in state.head.iter().filter(|&&pos| pos != 0) {
                    let mut cur = start as usize;
                    while cur > limit {
                        let next = state.prev[cur & state.w_mask] as usize;
                        assert!(next < cur, "{config:?}: {cur} links to {next}");
                        cur = next;
                    }
                }
            }
        }
    }

    quickcheck::quickcheck! {
        fn round_trip_arbitrary(data: Vec<u8>, config: DeflateConfig) -> bool {
            let compressed = compress_vec(&data, config, Dispatch::detect());

            let mut output = vec![0; data.len()];
            let inflate_config = InflateConfig { window_bits: config.window_bits };
            let (output, err) = uncompress_slice(&mut output, &compressed, inflate_config);

            err == ReturnCode::Ok && output == data.as_slice()
        }
    }
}
