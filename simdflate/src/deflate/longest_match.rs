use crate::deflate::{compare256::match_len, State, MIN_LOOKAHEAD, STD_MIN_MATCH};

/// Find the longest match for the string at `strstart`, walking the hash chain that starts at
/// `cur_match`. Returns the match length (at most `lookahead`) and the start of the match.
///
/// A length below `STD_MIN_MATCH` means no usable match was found.
pub fn longest_match(state: &State, mut cur_match: u16) -> (usize, usize) {
    let lookahead = state.lookahead;
    let mut match_start = state.match_start;

    if lookahead < STD_MIN_MATCH {
        return (0, match_start);
    }

    let strstart = state.strstart;
    let window = state.window.filled();
    let scan = &window[strstart..];

    debug_assert!(
        strstart <= state.window_size - MIN_LOOKAHEAD,
        "need lookahead"
    );

    let mut best_len = Ord::max(state.prev_length, STD_MIN_MATCH - 1);

    // Do not waste too much time if we already have a good match
    let mut chain_length = state.max_chain_length;
    if best_len >= state.good_match {
        chain_length >>= 1;
    }

    // Do not look for matches beyond the end of the input
    let nice_match = Ord::min(state.nice_match, lookahead);

    // Stop when cur_match becomes <= limit. Matches with window index 0 are never used.
    let limit = strstart.saturating_sub(state.max_dist());

    while chain_length > 0 {
        let candidate = cur_match as usize;
        if candidate >= strstart || candidate <= limit {
            break;
        }

        if !quick_reject(scan, &window[candidate..], best_len) {
            let len = 2 + match_len(state.dispatch, &scan[2..], &window[candidate + 2..]);

            if len > best_len {
                match_start = candidate;
                best_len = len;

                if len >= nice_match {
                    break;
                }
            }
        }

        chain_length -= 1;
        cur_match = state.prev[candidate & state.w_mask];
    }

    (Ord::min(best_len, lookahead), match_start)
}

/// A candidate can only beat `best_len` if it agrees with the current string at the start and
/// around offset `best_len`.
#[inline(always)]
fn quick_reject(scan: &[u8], candidate: &[u8], best_len: usize) -> bool {
    #[inline(always)]
    fn differ<const N: usize>(a: &[u8], b: &[u8], offset: usize) -> bool {
        a[offset..][..N] != b[offset..][..N]
    }

    if best_len >= 8 {
        differ::<8>(scan, candidate, best_len - 7) || differ::<8>(scan, candidate, 0)
    } else if best_len >= 4 {
        differ::<4>(scan, candidate, best_len - 3) || differ::<4>(scan, candidate, 0)
    } else {
        differ::<2>(scan, candidate, best_len - 1) || differ::<2>(scan, candidate, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::deflate::DeflateConfig;
    use crate::Dispatch;

    fn state_with(data: &[u8], strstart: usize, dispatch: Dispatch) -> Box<State> {
        let mut state = State::new(&DeflateConfig::new(9), dispatch).unwrap();
        state.window.copy_in(0, data);
        state.strstart = strstart;
        state.lookahead = data.len() - strstart;
        state
    }

    fn link(state: &mut State, from: usize, to: u16) {
        state.prev[from & state.w_mask] = to;
    }

    #[test]
    fn finds_longest_in_chain() {
        //               0         1         2
        //               012345678901234567890123456
        let data = b"_abcdXXXX_abcdefgh_abcdefgh!";

        for dispatch in [Dispatch::Scalar, Dispatch::detect()] {
            let mut state = state_with(data, 19, dispatch);
            // chain: 10 -> 1
            link(&mut state, 10, 1);

            let (len, start) = longest_match(&state, 10);
            assert_eq!((len, start), (8, 10));
        }
    }

    #[test]
    fn later_candidate_wins_when_longer() {
        let data = b"_abcdefgh_abcd___abcdefgh!";

        let mut state = state_with(data, 17, Dispatch::Scalar);
        link(&mut state, 10, 1);

        // the chain starts at the short match
        let (len, start) = longest_match(&state, 10);
        assert_eq!((len, start), (8, 1));
    }

    #[test]
    fn short_lookahead_has_no_match() {
        let data = b"_ab_ab";
        let state = state_with(data, 4, Dispatch::Scalar);
        assert_eq!(longest_match(&state, 1).0, 0);
    }

    #[test]
    fn clamped_to_lookahead() {
        let data = b"_aaaaaaaaaaaaaaaaaaaa";
        let mut state = state_with(data, 2, Dispatch::Scalar);
        state.lookahead = 5;

        let (len, start) = longest_match(&state, 1);
        assert_eq!((len, start), (5, 1));
    }

    #[test]
    fn index_zero_is_never_matched() {
        let data = b"abcdabcd";
        let state = state_with(data, 4, Dispatch::Scalar);
        assert!(longest_match(&state, 0).0 < STD_MIN_MATCH);
    }
}
