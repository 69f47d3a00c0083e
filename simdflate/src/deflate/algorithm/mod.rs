use crate::{
    deflate::{BlockState, DeflateStream, Strategy},
    Flush,
};

use self::{
    fast::deflate_fast, huff::deflate_huff, rle::deflate_rle, slow::deflate_slow,
    stored::deflate_stored,
};

mod fast;
mod huff;
mod rle;
mod slow;
mod stored;

/// Write the current block and return early when the output buffer is full.
macro_rules! flush_block {
    ($stream:expr, $is_last_block:expr) => {
        $crate::deflate::flush_block_only($stream, $is_last_block);

        if $stream.next_out.is_empty() {
            return match $is_last_block {
                true => $crate::deflate::BlockState::FinishStarted,
                false => $crate::deflate::BlockState::NeedMore,
            };
        }
    };
}

pub(crate) use flush_block;

pub fn run(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    match stream.state.strategy {
        _ if stream.state.level == 0 => deflate_stored(stream, flush),
        Strategy::HuffmanOnly => deflate_huff(stream, flush),
        Strategy::Rle => deflate_rle(stream, flush),
        Strategy::Default | Strategy::Filtered | Strategy::Fixed => {
            match CONFIGURATION_TABLE[stream.state.level as usize].algorithm {
                Algorithm::Stored => deflate_stored(stream, flush),
                Algorithm::Fast => deflate_fast(stream, flush),
                Algorithm::Slow => deflate_slow(stream, flush),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Stored,
    /// greedy matching
    Fast,
    /// lazy matching
    Slow,
}

pub(crate) struct Config {
    pub good_length: u16, /* reduce lazy search above this match length */
    pub max_lazy: u16,    /* do not perform lazy search above this match length */
    pub nice_length: u16, /* quit search above this match length */
    pub max_chain: u16,
    pub algorithm: Algorithm,
}

impl Config {
    const fn new(
        good_length: u16,
        max_lazy: u16,
        nice_length: u16,
        max_chain: u16,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            algorithm,
        }
    }
}

pub(crate) const CONFIGURATION_TABLE: [Config; 10] = {
    [
        Config::new(0, 0, 0, 0, Algorithm::Stored), // 0 /* store only */
        Config::new(4, 4, 8, 4, Algorithm::Fast),   // 1 /* max speed, no lazy matches */
        Config::new(4, 5, 16, 8, Algorithm::Fast),  // 2
        Config::new(4, 6, 32, 32, Algorithm::Fast), // 3
        Config::new(4, 4, 16, 16, Algorithm::Slow), // 4 /* lazy matches */
        Config::new(8, 16, 32, 32, Algorithm::Slow), // 5
        Config::new(8, 16, 128, 128, Algorithm::Slow), // 6
        Config::new(8, 32, 128, 256, Algorithm::Slow), // 7
        Config::new(32, 128, 258, 1024, Algorithm::Slow), // 8
        Config::new(32, 258, 258, 4096, Algorithm::Slow), // 9 /* max compression */
    ]
};
