//! Huffman tree construction and block emission.

use crate::deflate::{
    bitstream::BitWriter, sym_buf::SymBuf, BlockType, State, Strategy, Value, BL_CODES, D_CODES,
    END_BLOCK, HEAP_SIZE, LITERALS, L_CODES, MAX_BITS, MAX_BL_BITS, STD_MAX_MATCH, STD_MIN_MATCH,
};
use crate::trace;

use super::trees_tbl::{
    BASE_DIST, BASE_LENGTH, BL_ORDER, DIST_CODE, EXTRA_BLBITS, EXTRA_DBITS, EXTRA_LBITS,
    LENGTH_CODE, STATIC_DTREE, STATIC_LTREE,
};

pub(crate) struct StaticTreeDesc {
    /// static tree or empty
    static_tree: &'static [Value],
    /// extra bits for each code or empty
    extra_bits: &'static [u8],
    /// base index for extra_bits
    extra_base: usize,
    /// max number of elements in the tree
    elems: usize,
    /// max bit length for the codes
    max_length: u16,
}

impl StaticTreeDesc {
    const L: Self = Self {
        static_tree: &STATIC_LTREE,
        extra_bits: &EXTRA_LBITS,
        extra_base: LITERALS + 1,
        elems: L_CODES,
        max_length: MAX_BITS as u16,
    };

    const D: Self = Self {
        static_tree: &STATIC_DTREE,
        extra_bits: &EXTRA_DBITS,
        extra_base: 0,
        elems: D_CODES,
        max_length: MAX_BITS as u16,
    };

    const BL: Self = Self {
        static_tree: &[],
        extra_bits: &EXTRA_BLBITS,
        extra_base: 0,
        elems: BL_CODES,
        max_length: MAX_BL_BITS as u16,
    };
}

struct TreeDesc<const N: usize> {
    dyn_tree: [Value; N],
    max_code: usize,
    stat_desc: &'static StaticTreeDesc,
}

impl<const N: usize> TreeDesc<N> {
    const fn new(stat_desc: &'static StaticTreeDesc) -> Self {
        Self {
            dyn_tree: [Value::new(0, 0); N],
            max_code: 0,
            stat_desc,
        }
    }
}

/// State shared by the construction of all three trees.
struct Scratch {
    heap: Heap,
    /// number of codes at each bit length for an optimal tree
    bl_count: [u16; MAX_BITS + 1],
    /// bit length of current block with optimal trees
    opt_len: usize,
    /// bit length of current block with static trees
    static_len: usize,
}

/// Symbol frequencies of the current block and the trees built from them.
pub(crate) struct Trees {
    l_desc: TreeDesc<HEAP_SIZE>,
    d_desc: TreeDesc<{ 2 * D_CODES + 1 }>,
    bl_desc: TreeDesc<{ 2 * BL_CODES + 1 }>,
    scratch: Scratch,
    /// number of string matches in current block
    pub(crate) matches: usize,
}

impl Trees {
    pub(crate) fn new() -> Self {
        let mut trees = Self {
            l_desc: TreeDesc::new(&StaticTreeDesc::L),
            d_desc: TreeDesc::new(&StaticTreeDesc::D),
            bl_desc: TreeDesc::new(&StaticTreeDesc::BL),
            scratch: Scratch {
                heap: Heap::new(),
                bl_count: [0; MAX_BITS + 1],
                opt_len: 0,
                static_len: 0,
            },
            matches: 0,
        };

        trees.init_block();
        trees
    }

    /// Reset the frequencies for a new block.
    pub(crate) fn init_block(&mut self) {
        for value in &mut self.l_desc.dyn_tree[..L_CODES] {
            *value.freq_mut() = 0;
        }

        for value in &mut self.d_desc.dyn_tree[..D_CODES] {
            *value.freq_mut() = 0;
        }

        for value in &mut self.bl_desc.dyn_tree[..BL_CODES] {
            *value.freq_mut() = 0;
        }

        *self.l_desc.dyn_tree[END_BLOCK].freq_mut() = 1;
        self.scratch.opt_len = 0;
        self.scratch.static_len = 0;
        self.matches = 0;
    }

    #[inline(always)]
    pub(crate) fn tally_lit(&mut self, unmatched: u8) {
        *self.l_desc.dyn_tree[unmatched as usize].freq_mut() += 1;
    }

    /// `dist`: distance of the match, `len`: match length - STD_MIN_MATCH
    #[inline(always)]
    pub(crate) fn tally_dist(&mut self, dist: usize, len: usize) {
        debug_assert!(len <= STD_MAX_MATCH - STD_MIN_MATCH, "bad match length");

        self.matches += 1;

        let index = LENGTH_CODE[len] as usize + LITERALS + 1;
        *self.l_desc.dyn_tree[index].freq_mut() += 1;

        *self.d_desc.dyn_tree[d_code(dist - 1) as usize].freq_mut() += 1;
    }

    /// Build the literal, distance and bit length trees. Returns the index in `BL_ORDER` of the
    /// last bit length code to send.
    fn build_all(&mut self) -> usize {
        build_tree(&mut self.scratch, &mut self.l_desc);
        trace!(
            "lit data: dyn {}, stat {}",
            self.scratch.opt_len,
            self.scratch.static_len
        );

        build_tree(&mut self.scratch, &mut self.d_desc);
        trace!(
            "dist data: dyn {}, stat {}",
            self.scratch.opt_len,
            self.scratch.static_len
        );

        self.build_bl_tree()
    }

    /// Construct the Huffman tree for the bit lengths and return the index in
    /// `BL_ORDER` of the last bit length code to send.
    fn build_bl_tree(&mut self) -> usize {
        // Determine the bit length frequencies for literal and distance trees
        scan_tree(
            &mut self.bl_desc.dyn_tree,
            &mut self.l_desc.dyn_tree,
            self.l_desc.max_code,
        );
        scan_tree(
            &mut self.bl_desc.dyn_tree,
            &mut self.d_desc.dyn_tree,
            self.d_desc.max_code,
        );

        build_tree(&mut self.scratch, &mut self.bl_desc);

        // at least 4 bit length codes are sent
        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3 {
            let index = BL_ORDER[max_blindex] as usize;
            if self.bl_desc.dyn_tree[index].len() != 0 {
                break;
            }

            max_blindex -= 1;
        }

        // Update opt_len to include the bit length tree and counts
        self.scratch.opt_len += 3 * (max_blindex + 1) + 5 + 5 + 4;

        max_blindex
    }

    fn send_all_trees(&self, bit_writer: &mut BitWriter, lcodes: usize, dcodes: usize, blcodes: usize) {
        assert!(
            lcodes >= 257 && dcodes >= 1 && blcodes >= 4,
            "not enough codes"
        );
        assert!(
            lcodes <= L_CODES && dcodes <= D_CODES && blcodes <= BL_CODES,
            "too many codes"
        );

        bit_writer.send_bits(lcodes as u64 - 257, 5);
        bit_writer.send_bits(dcodes as u64 - 1, 5);
        bit_writer.send_bits(blcodes as u64 - 4, 4);

        let mut codes = [0u16; BL_CODES];
        for (code, &rank) in codes.iter_mut().zip(&BL_ORDER).take(blcodes) {
            *code = self.bl_desc.dyn_tree[rank as usize].len();
        }
        bit_writer.pack(&codes[..blcodes], &[3; BL_CODES][..blcodes]);

        let bl_tree = &self.bl_desc.dyn_tree;
        send_tree(bit_writer, bl_tree, &self.l_desc.dyn_tree, lcodes - 1);
        send_tree(bit_writer, bl_tree, &self.d_desc.dyn_tree, dcodes - 1);
    }
}

#[inline(always)]
const fn d_code(dist: usize) -> u8 {
    if dist < 256 {
        DIST_CODE[dist]
    } else {
        DIST_CODE[256 + (dist >> 7)]
    }
}

impl BitWriter {
    #[inline(always)]
    fn send_code(&mut self, code: usize, tree: &[Value]) {
        let node = tree[code];
        self.send_bits(node.code() as u64, node.len() as u8)
    }

    pub(crate) fn emit_tree(&mut self, block_type: BlockType, is_last_block: bool) {
        let header_bits = (block_type as u64) << 1 | (is_last_block as u64);
        self.send_bits(header_bits, 3);
    }

    pub(crate) fn emit_end_block(&mut self, ltree: &[Value]) {
        self.send_code(END_BLOCK, ltree);
    }

    pub(crate) fn emit_lit(&mut self, ltree: &[Value], c: u8) -> u16 {
        self.send_code(c as usize, ltree);

        ltree[c as usize].len()
    }

    /// Emit a match. `lc` is the match length - STD_MIN_MATCH, `dist` the match distance.
    pub(crate) fn emit_dist(&mut self, ltree: &[Value], dtree: &[Value], lc: u8, dist: usize) -> usize {
        let mut lc = lc as usize;

        // length code and its extra bits
        let mut code = LENGTH_CODE[lc] as usize;
        let c = code + LITERALS + 1;
        debug_assert!(c < L_CODES, "bad l_code");

        let mut match_bits = ltree[c].code() as u64;
        let mut match_bits_len = ltree[c].len() as usize;
        let mut extra = EXTRA_LBITS[code] as usize;
        if extra != 0 {
            lc -= BASE_LENGTH[code] as usize;
            match_bits |= (lc as u64) << match_bits_len;
            match_bits_len += extra;
        }

        // distance code and its extra bits
        let mut dist = dist - 1;
        code = d_code(dist) as usize;
        debug_assert!(code < D_CODES, "bad d_code");

        match_bits |= (dtree[code].code() as u64) << match_bits_len;
        match_bits_len += dtree[code].len() as usize;
        extra = EXTRA_DBITS[code] as usize;
        if extra != 0 {
            dist -= BASE_DIST[code] as usize;
            match_bits |= (dist as u64) << match_bits_len;
            match_bits_len += extra;
        }

        self.send_bits(match_bits, match_bits_len as u8);

        match_bits_len
    }

    /// A stored block holding `input_block`, starting byte aligned.
    pub(crate) fn stored_block(&mut self, input_block: &[u8], is_last: bool) {
        debug_assert!(input_block.len() <= u16::MAX as usize);

        self.emit_tree(BlockType::StoredBlock, is_last);
        self.finish();

        let stored_len = input_block.len() as u16;
        self.pending.extend(&stored_len.to_le_bytes());
        self.pending.extend(&(!stored_len).to_le_bytes());
        self.pending.extend(input_block);
    }

    /// An empty static block, used to flush pending bits without a byte aligned marker.
    pub(crate) fn align(&mut self) {
        self.emit_tree(BlockType::StaticTrees, false);
        self.emit_end_block(&STATIC_LTREE);
        self.flush();
    }

    fn compress_block(&mut self, sym_buf: &SymBuf, ltree: &[Value], dtree: &[Value]) {
        for (dist, lc) in sym_buf.iter() {
            match dist {
                0 => self.emit_lit(ltree, lc),
                _ => self.emit_dist(ltree, dtree, lc, dist as usize) as u16,
            };
        }

        self.emit_end_block(ltree)
    }
}

/// Determine the best encoding for the current block (dynamic trees, static trees or stored)
/// and write it out. `window_offset` is the start of the block in the window, `None` when it
/// is no longer available.
pub(crate) fn flush_block(
    state: &mut State,
    window_offset: Option<usize>,
    stored_len: usize,
    last: bool,
) {
    let mut opt_lenb;
    let static_lenb;
    let mut max_blindex = 0;

    if state.level == 0 {
        debug_assert!(window_offset.is_some(), "lost buf");
        // force a stored block
        opt_lenb = stored_len + 5;
        static_lenb = stored_len + 5;
    } else if state.sym_buf.is_empty() {
        // an empty static block
        opt_lenb = 0;
        static_lenb = 0;
        state.trees.scratch.static_len = 7;
    } else {
        max_blindex = state.trees.build_all();

        // Determine the best encoding. Compute the block lengths in bytes.
        opt_lenb = (state.trees.scratch.opt_len + 3 + 7) >> 3;
        static_lenb = (state.trees.scratch.static_len + 3 + 7) >> 3;

        trace!(
            "opt {}({}) stat {}({}) stored {} lit {}",
            opt_lenb,
            state.trees.scratch.opt_len,
            static_lenb,
            state.trees.scratch.static_len,
            stored_len,
            state.sym_buf.len()
        );

        if static_lenb <= opt_lenb || state.strategy == Strategy::Fixed {
            opt_lenb = static_lenb;
        }
    }

    let bit_writer = &mut state.bit_writer;

    match window_offset {
        Some(offset) if stored_len + 4 <= opt_lenb => {
            let range = offset..offset + stored_len;
            bit_writer.stored_block(&state.window.filled()[range], last);
        }
        _ if static_lenb == opt_lenb => {
            bit_writer.emit_tree(BlockType::StaticTrees, last);
            bit_writer.compress_block(&state.sym_buf, &STATIC_LTREE, &STATIC_DTREE);
        }
        _ => {
            let trees = &state.trees;
            bit_writer.emit_tree(BlockType::DynamicTrees, last);
            trees.send_all_trees(
                bit_writer,
                trees.l_desc.max_code + 1,
                trees.d_desc.max_code + 1,
                max_blindex + 1,
            );
            bit_writer.compress_block(
                &state.sym_buf,
                &trees.l_desc.dyn_tree,
                &trees.d_desc.dyn_tree,
            );
        }
    }

    state.trees.init_block();
    state.sym_buf.clear();

    if last {
        state.bit_writer.finish();
    }
}

fn build_tree<const N: usize>(scratch: &mut Scratch, desc: &mut TreeDesc<N>) {
    let tree = &mut desc.dyn_tree;
    let stree = desc.stat_desc.static_tree;
    let elements = desc.stat_desc.elems;

    let heap = &mut scratch.heap;
    let mut max_code = heap.initialize(&mut tree[..elements]);

    // The deflate format requires that at least one distance code exists, and that at least
    // one bit is sent even if there is only one possible code. So force at least two codes
    // of non zero frequency.
    while heap.heap_len < 2 {
        heap.heap_len += 1;
        let node = if max_code < 2 {
            max_code += 1;
            max_code
        } else {
            0
        };

        debug_assert!(node >= 0);
        let node = node as usize;

        heap.heap[heap.heap_len] = node as u32;
        *tree[node].freq_mut() = 1;
        heap.depth[node] = 0;
        scratch.opt_len = scratch.opt_len.wrapping_sub(1);
        if !stree.is_empty() {
            scratch.static_len = scratch.static_len.wrapping_sub(stree[node].len() as usize);
        }
        // node is 0 or 1 so it does not have extra bits
    }

    debug_assert!(max_code >= 0);
    let max_code = max_code as usize;
    desc.max_code = max_code;

    // The elements heap[heap_len/2+1 .. heap_len] are leaves of the tree,
    // establish sub-heaps of increasing lengths:
    let mut n = heap.heap_len / 2;
    while n >= 1 {
        heap.pqdownheap(tree, n);
        n -= 1;
    }

    heap.construct_huffman_tree(tree, elements);

    // At this point, the fields freq and dad are set. We can now
    // generate the bit lengths.
    gen_bitlen(scratch, desc);

    // The field len is now set, we can generate the bit codes
    gen_codes(&mut desc.dyn_tree, max_code, &scratch.bl_count);
}

fn gen_bitlen<const N: usize>(scratch: &mut Scratch, desc: &mut TreeDesc<N>) {
    let heap = &mut scratch.heap;

    let tree = &mut desc.dyn_tree;
    let max_code = desc.max_code;
    let stree = desc.stat_desc.static_tree;
    let extra = desc.stat_desc.extra_bits;
    let base = desc.stat_desc.extra_base;
    let max_length = desc.stat_desc.max_length;

    scratch.bl_count.fill(0);

    // In a first pass, compute the optimal bit lengths (which may
    // overflow in the case of the bit length tree).
    *tree[heap.heap[heap.heap_max] as usize].len_mut() = 0; // root of the heap

    // number of elements with bit length too large
    let mut overflow: i32 = 0;

    for h in heap.heap_max + 1..HEAP_SIZE {
        let n = heap.heap[h] as usize;
        let mut bits = tree[tree[n].dad() as usize].len() + 1;

        if bits > max_length {
            bits = max_length;
            overflow += 1;
        }

        // overwrites tree[n].dad, which is no longer needed
        *tree[n].len_mut() = bits;

        // not a leaf node
        if n > max_code {
            continue;
        }

        scratch.bl_count[bits as usize] += 1;
        let mut xbits = 0;
        if n >= base {
            xbits = extra[n - base] as usize;
        }

        let f = tree[n].freq() as usize;
        scratch.opt_len = scratch.opt_len.wrapping_add(f * (bits as usize + xbits));

        if !stree.is_empty() {
            scratch.static_len = scratch
                .static_len
                .wrapping_add(f * (stree[n].len() as usize + xbits));
        }
    }

    if overflow == 0 {
        return;
    }

    trace!("bit length overflow");

    // Find the first bit length which could increase
    loop {
        let mut bits = max_length as usize - 1;
        while scratch.bl_count[bits] == 0 {
            bits -= 1;
        }
        scratch.bl_count[bits] -= 1; // move one leaf down the tree
        scratch.bl_count[bits + 1] += 2; // move one overflow item as its brother
        scratch.bl_count[max_length as usize] -= 1;
        // The brother of the overflow item also moves one step up,
        // but this does not affect bl_count[max_length]
        overflow -= 2;

        if overflow <= 0 {
            break;
        }
    }

    // Now recompute all bit lengths, scanning in increasing frequency.
    let mut h = HEAP_SIZE;
    for bits in (1..=max_length).rev() {
        let mut n = scratch.bl_count[bits as usize];
        while n != 0 {
            h -= 1;
            let m = heap.heap[h] as usize;
            if m > max_code {
                continue;
            }

            if tree[m].len() != bits {
                scratch.opt_len = scratch
                    .opt_len
                    .wrapping_add(bits as usize * tree[m].freq() as usize)
                    .wrapping_sub(tree[m].len() as usize * tree[m].freq() as usize);
                *tree[m].len_mut() = bits;
            }

            n -= 1;
        }
    }
}

fn gen_codes(tree: &mut [Value], max_code: usize, bl_count: &[u16]) {
    // next code value for each bit length
    let mut next_code = [0; MAX_BITS + 1];
    let mut code = 0;

    // The distribution counts are first used to generate the code values
    // without bit reversal.
    for bits in 1..=MAX_BITS {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    // the last code must be all ones
    debug_assert!(
        code + bl_count[MAX_BITS] - 1 == (1 << MAX_BITS) - 1,
        "inconsistent bit counts"
    );

    trace!("gen_codes: max_code {max_code}");

    for n in 0..=max_code {
        let len = tree[n].len();
        if len == 0 {
            continue;
        }

        debug_assert!((1..=15).contains(&len), "code length must be 1-15");
        *tree[n].code_mut() = next_code[len as usize].reverse_bits() >> (16 - len);
        next_code[len as usize] += 1;
    }
}

/// repeat previous bit length 3-6 times (2 bits of repeat count)
const REP_3_6: usize = 16;

/// repeat a zero length 3-10 times  (3 bits of repeat count)
const REPZ_3_10: usize = 17;

/// repeat a zero length 11-138 times  (7 bits of repeat count)
const REPZ_11_138: usize = 18;

/// Scan a literal or distance tree to determine the frequencies of the codes in the bit length
/// tree.
fn scan_tree(bl_tree: &mut [Value], tree: &mut [Value], max_code: usize) {
    let mut prevlen = -1isize; // last emitted length
    let mut curlen: isize;
    let mut nextlen = tree[0].len(); // length of next code
    let mut count = 0; // repeat count of the current code
    let mut max_count = 7;
    let mut min_count = 4;

    if nextlen == 0 {
        max_count = 138;
        min_count = 3;
    }

    *tree[max_code + 1].len_mut() = 0xffff; // guard

    for n in 0..=max_code {
        curlen = nextlen as isize;
        nextlen = tree[n + 1].len();
        count += 1;
        if count < max_count && curlen == nextlen as isize {
            continue;
        } else if count < min_count {
            *bl_tree[curlen as usize].freq_mut() += count;
        } else if curlen != 0 {
            if curlen != prevlen {
                *bl_tree[curlen as usize].freq_mut() += 1;
            }
            *bl_tree[REP_3_6].freq_mut() += 1;
        } else if count <= 10 {
            *bl_tree[REPZ_3_10].freq_mut() += 1;
        } else {
            *bl_tree[REPZ_11_138].freq_mut() += 1;
        }

        count = 0;
        prevlen = curlen;

        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        } else if curlen == nextlen as isize {
            max_count = 6;
            min_count = 3;
        } else {
            max_count = 7;
            min_count = 4;
        }
    }
}

/// Send a literal or distance tree in compressed form, using the codes in `bl_tree`.
fn send_tree(bit_writer: &mut BitWriter, bl_tree: &[Value], tree: &[Value], max_code: usize) {
    let mut prevlen: isize = -1;
    let mut curlen;
    let mut nextlen = tree[0].len();
    let mut count = 0;
    let mut max_count = 7;
    let mut min_count = 4;

    // guard already set by scan_tree
    if nextlen == 0 {
        max_count = 138;
        min_count = 3;
    }

    for n in 0..=max_code {
        curlen = nextlen;
        nextlen = tree[n + 1].len();
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        } else if count < min_count {
            for _ in 0..count {
                bit_writer.send_code(curlen as usize, bl_tree);
            }
        } else if curlen != 0 {
            if curlen as isize != prevlen {
                bit_writer.send_code(curlen as usize, bl_tree);
                count -= 1;
            }
            debug_assert!((3..=6).contains(&count), " 3_6?");
            bit_writer.send_code(REP_3_6, bl_tree);
            bit_writer.send_bits(count - 3, 2);
        } else if count <= 10 {
            bit_writer.send_code(REPZ_3_10, bl_tree);
            bit_writer.send_bits(count - 3, 3);
        } else {
            bit_writer.send_code(REPZ_11_138, bl_tree);
            bit_writer.send_bits(count - 11, 7);
        }

        count = 0;
        prevlen = curlen as isize;

        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        } else if curlen == nextlen {
            max_count = 6;
            min_count = 3;
        } else {
            max_count = 7;
            min_count = 4;
        }
    }
}

/// The sons of heap[n] are heap[2*n] and heap[2*n+1]. heap[0] is not used.
/// The same heap array is used to build all trees.
struct Heap {
    heap: [u32; HEAP_SIZE],

    /// number of elements in the heap
    heap_len: usize,

    /// element of the largest frequency
    heap_max: usize,

    depth: [u8; HEAP_SIZE],
}

impl Heap {
    fn new() -> Self {
        Self {
            heap: [0; HEAP_SIZE],
            heap_len: 0,
            heap_max: 0,
            depth: [0; HEAP_SIZE],
        }
    }

    /// Construct the initial heap, with least frequent element in heap[SMALLEST].
    fn initialize(&mut self, tree: &mut [Value]) -> isize {
        let mut max_code = -1;

        self.heap_len = 0;
        self.heap_max = HEAP_SIZE;

        for (n, node) in tree.iter_mut().enumerate() {
            if node.freq() > 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = n as u32;
                max_code = n as isize;
                self.depth[n] = 0;
            } else {
                *node.len_mut() = 0;
            }
        }

        max_code
    }

    /// Index within the heap array of least frequent node in the Huffman tree
    const SMALLEST: usize = 1;

    fn smaller(tree: &[Value], n: u32, m: u32, depth: &[u8]) -> bool {
        let (n, m) = (n as usize, m as usize);

        match Ord::cmp(&tree[n].freq(), &tree[m].freq()) {
            core::cmp::Ordering::Less => true,
            core::cmp::Ordering::Equal => depth[n] <= depth[m],
            core::cmp::Ordering::Greater => false,
        }
    }

    fn pqdownheap(&mut self, tree: &[Value], mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1; // left son of k

        while j <= self.heap_len {
            // Set j to the smallest of the two sons
            if j < self.heap_len && Self::smaller(tree, self.heap[j + 1], self.heap[j], &self.depth)
            {
                j += 1;
            }

            // Exit if v is smaller than both sons
            if Self::smaller(tree, v, self.heap[j], &self.depth) {
                break;
            }

            // Exchange v with the smallest son
            self.heap[k] = self.heap[j];
            k = j;

            j <<= 1;
        }

        self.heap[k] = v;
    }

    /// Remove the smallest element from the heap and recreate the heap with
    /// one less element.
    fn pqremove(&mut self, tree: &[Value]) -> u32 {
        let top = self.heap[Self::SMALLEST];
        self.heap[Self::SMALLEST] = self.heap[self.heap_len];
        self.heap_len -= 1;

        self.pqdownheap(tree, Self::SMALLEST);

        top
    }

    /// Construct the Huffman tree by repeatedly combining the least two frequent nodes.
    fn construct_huffman_tree(&mut self, tree: &mut [Value], mut node: usize) {
        loop {
            let n = self.pqremove(tree) as usize; // node of least frequency
            let m = self.heap[Heap::SMALLEST] as usize; // node of next least frequency

            // keep the nodes sorted by frequency
            self.heap_max -= 1;
            self.heap[self.heap_max] = n as u32;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m as u32;

            // Create a new node father of n and m
            *tree[node].freq_mut() = tree[n].freq() + tree[m].freq();
            self.depth[node] = Ord::max(self.depth[n], self.depth[m]) + 1;

            *tree[n].dad_mut() = node as u16;
            *tree[m].dad_mut() = node as u16;

            // and insert the new node in the heap
            self.heap[Heap::SMALLEST] = node as u32;
            node += 1;

            self.pqdownheap(tree, Heap::SMALLEST);

            if self.heap_len < 2 {
                break;
            }
        }

        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[Heap::SMALLEST];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tree_from_freqs(freqs: &[u16]) -> TreeDesc<HEAP_SIZE> {
        let mut desc = TreeDesc::new(&StaticTreeDesc::L);
        for (value, &freq) in desc.dyn_tree.iter_mut().zip(freqs) {
            *value.freq_mut() = freq;
        }
        desc
    }

    fn scratch() -> Scratch {
        Scratch {
            heap: Heap::new(),
            bl_count: [0; MAX_BITS + 1],
            opt_len: 0,
            static_len: 0,
        }
    }

    #[test]
    fn huffman_lengths_satisfy_kraft() {
        let mut freqs = [0u16; L_CODES];
        for (i, freq) in freqs.iter_mut().enumerate().take(40) {
            *freq = (i as u16 * 17) % 31 + 1;
        }
        freqs[END_BLOCK] = 1;

        let mut desc = tree_from_freqs(&freqs);
        build_tree(&mut scratch(), &mut desc);

        let kraft: f64 = desc.dyn_tree[..L_CODES]
            .iter()
            .filter(|v| v.len() > 0)
            .map(|v| 2f64.powi(-(v.len() as i32)))
            .sum();
        assert!((kraft - 1.0).abs() < 1e-9, "{kraft}");
        assert_eq!(desc.max_code, END_BLOCK);
    }

    #[test]
    fn single_symbol_gets_two_codes() {
        let mut freqs = [0u16; L_CODES];
        freqs[END_BLOCK] = 1;

        let mut desc = tree_from_freqs(&freqs);
        build_tree(&mut scratch(), &mut desc);

        let used: Vec<_> = desc.dyn_tree[..L_CODES]
            .iter()
            .filter(|v| v.len() > 0)
            .collect();
        assert_eq!(used.len(), 2);
        assert!(used.iter().all(|v| v.len() == 1));
    }

    #[test]
    fn lengths_are_capped() {
        // fibonacci frequencies force a very deep tree
        let mut freqs = [0u16; L_CODES];
        let (mut a, mut b) = (1u16, 1u16);
        for freq in freqs.iter_mut().take(22) {
            *freq = a;
            (a, b) = (b, a.saturating_add(b));
        }

        let mut desc = tree_from_freqs(&freqs);
        build_tree(&mut scratch(), &mut desc);

        assert!(desc.dyn_tree[..L_CODES]
            .iter()
            .all(|v| v.len() as usize <= MAX_BITS));
    }

    #[test]
    fn static_block_of_literals() {
        let mut bit_writer = BitWriter::new(64).unwrap();
        let mut sym_buf = SymBuf::new(16).unwrap();
        sym_buf.push_lit(b'a');

        bit_writer.emit_tree(BlockType::StaticTrees, true);
        bit_writer.compress_block(&sym_buf, &STATIC_LTREE, &STATIC_DTREE);
        bit_writer.finish();

        // a raw deflate stream holding "a"
        assert_eq!(bit_writer.pending.pending(), [0x4b, 0x04, 0x00]);
    }
}
