//! Memory and comparison helpers for secret material

use zeroize::Zeroize;

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Memory protection utilities
pub struct SecureMemory;

impl SecureMemory {
    /// Force memory clearing with compiler barrier
    pub fn secure_clear(data: &mut [u8]) {
        data.zeroize();
        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
    }
}
