#![forbid(unsafe_code)]

use crate::{
    deflate::{
        algorithm::flush_block, compare256::match_len, fill_window, BlockState, DeflateStream,
        STD_MAX_MATCH, STD_MIN_MATCH,
    },
    Flush,
};

/// Only matches at distance one (runs of the same byte), without hash tables.
pub fn deflate_rle(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        // Make sure that we always have enough lookahead, except at the end of the input file.
        // We need STD_MAX_MATCH bytes for the longest run, plus one for the unrolled loop.
        if stream.state.lookahead <= STD_MAX_MATCH {
            fill_window(stream);
            if stream.state.lookahead <= STD_MAX_MATCH && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }

            if stream.state.lookahead == 0 {
                break; // flush the current block
            }
        }

        let state = &mut stream.state;

        // See how many times the previous byte repeats
        let mut match_len_run = 0;
        if state.lookahead >= STD_MIN_MATCH && state.strstart > 0 {
            let scan = &state.window.filled()[state.strstart - 1..];

            if scan[0] == scan[1] && scan[1] == scan[2] {
                match_len_run = 2 + match_len(state.dispatch, &scan[3..], &scan[2..]);
                match_len_run = Ord::min(match_len_run, state.lookahead);
            }
        }

        // Emit match if have run of STD_MIN_MATCH or longer, else emit literal
        let bflush = if match_len_run >= STD_MIN_MATCH {
            let bflush = state.tally_dist(1, match_len_run - STD_MIN_MATCH);

            state.lookahead -= match_len_run;
            state.strstart += match_len_run;

            bflush
        } else {
            let lc = state.window.filled()[state.strstart];
            let bflush = state.tally_lit(lc);

            state.lookahead -= 1;
            state.strstart += 1;

            bflush
        };

        if bflush {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = 0;

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}
