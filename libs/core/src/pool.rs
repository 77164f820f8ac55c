use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::header::{Header, RequestHeader, ResponseHeader};

/// Default number of idle headers kept per pool
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Process-wide pool of request headers
pub static REQUEST_POOL: Lazy<HeaderPool<RequestHeader>> = Lazy::new(HeaderPool::default);

/// Process-wide pool of response headers
pub static RESPONSE_POOL: Lazy<HeaderPool<ResponseHeader>> = Lazy::new(HeaderPool::default);

/// A bounded, thread-safe free list of headers of one type
///
/// An empty pool hands out fresh defaults and a full pool drops what it is
/// given.
pub struct HeaderPool<H> {
    idle: Mutex<Vec<H>>,
    capacity: usize,
}

impl<H: Header> HeaderPool<H> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Take a reset header, recycled if one is idle
    ///
    /// The guard hands the header back when dropped
    pub fn acquire(&self) -> Pooled<'_, H> {
        let recycled = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();
        Pooled {
            pool: self,
            header: recycled.unwrap_or_default(),
        }
    }

    /// Reset `header` and keep it for a later `acquire`
    pub fn release(&self, mut header: H) {
        header.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.capacity {
            idle.push(header);
        }
    }

    /// Number of headers currently waiting to be reused
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<H: Header> Default for HeaderPool<H> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }
}

/// A header borrowed from a [`HeaderPool`]
pub struct Pooled<'a, H: Header> {
    pool: &'a HeaderPool<H>,
    header: H,
}

impl<H: Header> Pooled<'_, H> {
    /// Detach the header from the pool
    pub fn into_inner(mut self) -> H {
        let header = std::mem::take(&mut self.header);
        std::mem::forget(self);
        header
    }
}

impl<H: Header> Deref for Pooled<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.header
    }
}

impl<H: Header> DerefMut for Pooled<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.header
    }
}

impl<H: Header> Drop for Pooled<'_, H> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.header));
    }
}
