use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` cell supporting lock-free accumulation from many threads.
///
/// The value is stored as its IEEE-754 bit pattern inside an [`AtomicU32`]; `fetch_add`
/// is a compare-and-swap loop. Summation order across threads is unspecified, so results
/// are reproducible only up to floating-point rounding.
#[repr(transparent)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub const fn zero() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Adds `delta` and returns the previous value.
    #[inline]
    pub fn fetch_add(&self, delta: f32) -> f32 {
        let previous = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f32::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f32::from_bits(previous)
    }

    /// Reads the value through exclusive access, without atomic operations.
    #[inline]
    pub fn get(&mut self) -> f32 {
        f32::from_bits(*self.bits.get_mut())
    }

    #[inline]
    pub fn set(&mut self, value: f32) {
        *self.bits.get_mut() = value.to_bits();
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn zero_has_all_bits_clear() {
        let value = AtomicF32::zero();
        assert_eq!(value.load(), 0.0);
        assert_eq!(value.load().to_bits(), 0);
    }

    #[test]
    fn fetch_add_returns_previous_value() {
        let value = AtomicF32::new(1.5);
        let previous = value.fetch_add(2.0);
        assert_eq!(previous, 1.5);
        assert_eq!(value.load(), 3.5);
    }

    #[test]
    fn exclusive_accessors_bypass_atomics() {
        let mut value = AtomicF32::new(4.0);
        assert_eq!(value.get(), 4.0);
        value.set(-2.0);
        assert_eq!(value.load(), -2.0);
    }

    #[test]
    fn concurrent_additions_are_not_lost() {
        let value = Arc::new(AtomicF32::zero());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let value = Arc::clone(&value);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        value.fetch_add(1.0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(value.load(), 8000.0);
    }
}
