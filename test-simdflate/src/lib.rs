#[cfg(test)]
mod abi;
pub mod end_to_end;
pub mod helpers;
