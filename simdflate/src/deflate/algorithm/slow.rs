#![forbid(unsafe_code)]

use crate::{
    deflate::{
        algorithm::flush_block, fill_window, flush_block_only, longest_match::longest_match,
        BlockState, DeflateStream, Strategy, MIN_LOOKAHEAD, STD_MIN_MATCH, WANT_MIN_MATCH,
    },
    Flush,
};

/// Matches of length 3 are discarded if their distance exceeds TOO_FAR
const TOO_FAR: usize = 4096;

/// Lazy evaluation of matches: a match is finally adopted only if there is no better match at
/// the next window position.
pub fn deflate_slow(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        // Make sure that we always have enough lookahead, except at the end of the input file.
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
        state.prev_length = state.match_length;
        state.prev_match = state.match_start;
        state.match_length = STD_MIN_MATCH - 1;

        let dist = state.strstart as isize - hash_head as isize;
        if hash_head != 0
            && state.prev_length < state.max_lazy_match
            && dist > 0
            && dist <= state.max_dist() as isize
        {
            // To simplify the code, we prevent matches with the string of window index 0
            (state.match_length, state.match_start) = longest_match(state, hash_head);

            // If prev_match is also STD_MIN_MATCH, match_start is garbage but we will ignore
            // the current match anyway.
            if state.match_length <= 5
                && (state.strategy == Strategy::Filtered
                    || (state.match_length == STD_MIN_MATCH
                        && state.strstart - state.match_start > TOO_FAR))
            {
                state.match_length = STD_MIN_MATCH - 1;
            }
        }

        // If there was a match at the previous step and the current match is not better,
        // output the previous match
        if state.prev_length >= STD_MIN_MATCH && state.match_length <= state.prev_length {
            let max_insert = (state.strstart + state.lookahead).saturating_sub(WANT_MIN_MATCH);

            let bflush = state.tally_dist(
                state.strstart - 1 - state.prev_match,
                state.prev_length - STD_MIN_MATCH,
            );

            // Insert in hash table all strings up to the end of the match. strstart-1 and
            // strstart are already inserted. If there is not enough lookahead, the last two
            // strings are not inserted in the hash table.
            state.lookahead -= state.prev_length - 1;
            state.prev_length -= 2;

            loop {
                state.strstart += 1;
                let strstart = state.strstart;
                if strstart <= max_insert {
                    (state.quick_insert_string)(state, strstart);
                }

                state.prev_length -= 1;
                if state.prev_length == 0 {
                    break;
                }
            }

            state.match_available = false;
            state.match_length = STD_MIN_MATCH - 1;
            state.strstart += 1;

            if bflush {
                flush_block!(stream, false);
            }
        } else if state.match_available {
            // If there was no match at the previous position, output a single literal. If there
            // was a match but the current match is longer, truncate the previous match to a
            // single literal.
            let lc = state.window.filled()[state.strstart - 1];
            let bflush = state.tally_lit(lc);
            if bflush {
                flush_block_only(stream, false);
            }

            stream.state.strstart += 1;
            stream.state.lookahead -= 1;

            if stream.next_out.is_empty() {
                return BlockState::NeedMore;
            }
        } else {
            // There is no previous match to compare with, wait for the next step to decide.
            state.match_available = true;
            state.strstart += 1;
            state.lookahead -= 1;
        }
    }

    debug_assert_ne!(flush, Flush::NoFlush, "no flush?");

    let state = &mut stream.state;
    if state.match_available {
        let lc = state.window.filled()[state.strstart - 1];
        let _ = state.tally_lit(lc);
        state.match_available = false;
    }

    state.insert = Ord::min(state.strstart, STD_MIN_MATCH - 1);

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}
