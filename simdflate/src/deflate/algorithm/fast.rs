#![forbid(unsafe_code)]

use crate::{
    deflate::{
        algorithm::flush_block, fill_window, longest_match::longest_match, BlockState,
        DeflateStream, MIN_LOOKAHEAD, STD_MIN_MATCH, WANT_MIN_MATCH,
    },
    Flush,
};

/// Greedy matching: a match is taken as soon as it is found. New strings are inserted in the
/// hash table only for short matches.
pub fn deflate_fast(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        // Make sure that we always have enough lookahead, except at the end of the input file.
        // We need STD_MAX_MATCH bytes for the next match, plus WANT_MIN_MATCH bytes to insert
        // the string following the next match.
        if stream.state.lookahead < MIN_LOOKAHEAD {
            fill_window(stream);
            if stream.state.lookahead < MIN_LOOKAHEAD && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }

            if stream.state.lookahead == 0 {
                break; // flush the current block
            }
        }

        let state = &mut stream.state;

        // Insert the string window[strstart .. strstart + 3] in the dictionary, and set
        // hash_head to the head of the hash chain
        let strstart = state.strstart;
        let mut hash_head = 0;
        if state.lookahead >= WANT_MIN_MATCH {
            hash_head = (state.quick_insert_string)(state, strstart);
        }

        // Find the longest match, discarding those <= prev_length.
        // At this point we have always match_length < STD_MIN_MATCH
        let dist = state.strstart as isize - hash_head as isize;
        if hash_head != 0 && dist > 0 && dist <= state.max_dist() as isize {
            // To simplify the code, we prevent matches with the string of window index 0
            (state.match_length, state.match_start) = longest_match(state, hash_head);
        }

        let bflush;
        if state.match_length >= STD_MIN_MATCH {
            bflush = state.tally_dist(
                state.strstart - state.match_start,
                state.match_length - STD_MIN_MATCH,
            );

            state.lookahead -= state.match_length;

            // Insert new strings in the hash table only if the match length is not too large.
            // This saves time but degrades compression.
            if state.match_length <= state.max_insert_length() && state.lookahead >= WANT_MIN_MATCH
            {
                // string at strstart already in table
                state.match_length -= 1;
                state.strstart += 1;

                let (string, count) = (state.strstart, state.match_length);
                (state.insert_string)(state, string, count);
                state.strstart += state.match_length;
            } else {
                state.strstart += state.match_length;
            }

            state.match_length = 0;
        } else {
            // No match, output a literal byte
            let lc = state.window.filled()[state.strstart];
            bflush = state.tally_lit(lc);
            state.lookahead -= 1;
            state.strstart += 1;
        }

        if bflush {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = Ord::min(stream.state.strstart, STD_MIN_MATCH - 1);

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}
