#![forbid(unsafe_code)]

use crate::{
    deflate::{algorithm::flush_block, fill_window, BlockState, DeflateStream, MAX_STORED},
    Flush,
};

/// Copy without compression as much as possible from the input stream.
///
/// Stored blocks are limited to what fits in the pending buffer, and a block is also ended
/// before its start could slide out of the window.
pub fn deflate_stored(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    // 5 bytes of block header
    let max_block_size = Ord::min(stream.state.bit_writer.pending.capacity() - 5, MAX_STORED);

    loop {
        // Fill the window as much as possible
        if stream.state.lookahead <= 1 {
            fill_window(stream);

            if stream.state.lookahead == 0 {
                match flush {
                    Flush::NoFlush => return BlockState::NeedMore,
                    _ => break, // flush the current block
                }
            }
        }

        let state = &mut stream.state;
        state.strstart += state.lookahead;
        state.lookahead = 0;

        // Emit a stored block if pending would be full
        let max_start = state.block_start + max_block_size as isize;
        if state.strstart as isize >= max_start {
            state.lookahead = (state.strstart as isize - max_start) as usize;
            state.strstart = max_start as usize;
            flush_block!(stream, false);
        }

        // Flush if we may have to slide, otherwise block_start may become negative and the data
        // will be gone
        let state = &stream.state;
        if state.strstart as isize - state.block_start >= state.max_dist() as isize {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = 0;

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if stream.state.strstart as isize > stream.state.block_start {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}
