//! Compiled kernel cache keyed by bytecode hash.

use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use crate::decode::decode;
use crate::error::ShaderError;
use crate::jit::{compile, CompiledShader};

pub const DEFAULT_KERNEL_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelSource {
    /// The kernel was already cached.
    Memory,
    /// The bytecode was decoded and compiled, and the kernel inserted into the cache.
    Compiled,
}

#[derive(Debug, Clone)]
pub struct KernelLookup {
    pub source: KernelSource,
    kernel: Arc<CompiledShader>,
}

impl KernelLookup {
    pub fn kernel(&self) -> Arc<CompiledShader> {
        Arc::clone(&self.kernel)
    }
}

impl Deref for KernelLookup {
    type Target = CompiledShader;

    fn deref(&self) -> &Self::Target {
        &self.kernel
    }
}

/// Bounded in-memory cache of compiled kernels. Least recently used kernels are evicted first.
pub struct KernelCache {
    map: LruCache<blake3::Hash, Arc<CompiledShader>>,
}

impl KernelCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            map: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns the kernel for `bytes`, decoding and compiling it on a miss. Failed compilations
    /// are not cached.
    pub fn get_or_compile(&mut self, bytes: &[u8]) -> Result<KernelLookup, ShaderError> {
        let hash = blake3::hash(bytes);
        if let Some(kernel) = self.map.get(&hash) {
            return Ok(KernelLookup {
                source: KernelSource::Memory,
                kernel: Arc::clone(kernel),
            });
        }

        let kernel = Arc::new(compile(&decode(bytes)?)?);
        debug!(hash = %hash.to_hex(), "compiled kernel");
        self.map.put(hash, Arc::clone(&kernel));
        Ok(KernelLookup {
            source: KernelSource::Compiled,
            kernel,
        })
    }
}

impl Default for KernelCache {
    fn default() -> Self {
        Self::new(DEFAULT_KERNEL_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(tokens: &[u32]) -> Vec<u8> {
        tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
    }

    #[test]
    fn second_lookup_hits_memory() {
        let mut cache = KernelCache::default();
        let shader = bytes(&[0xFFFF_0200, 0x0000_0000, 0x0000_FFFF]);
        let first = cache.get_or_compile(&shader).unwrap();
        assert_eq!(first.source, KernelSource::Compiled);
        let second = cache.get_or_compile(&shader).unwrap();
        assert_eq!(second.source, KernelSource::Memory);
        assert!(Arc::ptr_eq(&first.kernel(), &second.kernel()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = KernelCache::default();
        assert!(cache.get_or_compile(&bytes(&[0xFFFF_0300])).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = KernelCache::new(NonZeroUsize::new(1).unwrap());
        let a = bytes(&[0xFFFF_0200, 0x0000_FFFF]);
        let b = bytes(&[0xFFFF_0200, 0x0000_0000, 0x0000_FFFF]);
        cache.get_or_compile(&a).unwrap();
        cache.get_or_compile(&b).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get_or_compile(&a).unwrap().source,
            KernelSource::Compiled
        );
    }
}
