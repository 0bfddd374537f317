//! Random byte generation for challenges, handles and test fixtures.

use rand::RngCore;

/// Generate a vector of `len` random bytes from the thread-local CSPRNG.
pub fn random_vec(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

/// Generate a fixed-size array of random bytes from the thread-local CSPRNG.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut data = [0u8; N];
    rand::thread_rng().fill_bytes(&mut data);
    data
}
