//! Tiered cluster memory
//!
//! Two tiers are modelled:
//! - `Main`: large, shared by every cluster, slow to reach
//! - `L1`: the cluster-local scratchpad (TCDM), small and single-cycle
//!
//! Buffers are byte vectors addressed by `(handle, offset)`. Typed accesses
//! go through `bytemuck` so that any `Pod` element can be stored without
//! alignment requirements on the backing storage.
//!
//! The manager is shared between cores as `Arc<parking_lot::RwLock<MemoryManager>>`.

use crate::error::{Result, RuntimeError};
use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ================================================================================================
// Handles and Addresses
// ================================================================================================

/// Memory tier a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    Main,
    L1,
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryTier::Main => write!(f, "main"),
            MemoryTier::L1 => write!(f, "l1"),
        }
    }
}

/// Opaque buffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf{}", self.0)
    }
}

/// Byte address inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub buffer: BufferHandle,
    pub offset: usize,
}

impl Address {
    pub const fn new(buffer: BufferHandle, offset: usize) -> Self {
        Self { buffer, offset }
    }

    /// Start of a buffer
    pub const fn base(buffer: BufferHandle) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Address `bytes` further into the same buffer
    pub const fn offset_by(self, bytes: usize) -> Self {
        Self {
            buffer: self.buffer,
            offset: self.offset + bytes,
        }
    }

    /// Address of element `index` in an array of `T` starting here
    pub const fn element<T>(self, index: usize) -> Self {
        self.offset_by(index * std::mem::size_of::<T>())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#x}", self.buffer, self.offset)
    }
}

// ================================================================================================
// Memory Manager
// ================================================================================================

#[derive(Debug)]
struct Allocation {
    tier: MemoryTier,
    bytes: Vec<u8>,
}

/// Owner of every buffer on the simulated cluster
#[derive(Debug)]
pub struct MemoryManager {
    buffers: HashMap<u64, Allocation>,
    next_id: u64,
    l1_capacity: usize,
    l1_used: usize,
}

impl MemoryManager {
    /// Create a manager whose L1 tier holds at most `l1_capacity` bytes
    pub fn new(l1_capacity: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            next_id: 0,
            l1_capacity,
            l1_used: 0,
        }
    }

    /// Allocate a zeroed buffer of `size` bytes in `tier`
    pub fn allocate(&mut self, tier: MemoryTier, size: usize) -> Result<BufferHandle> {
        if tier == MemoryTier::L1 {
            let available = self.l1_available();
            if size > available {
                return Err(RuntimeError::OutOfMemory {
                    tier,
                    requested: size,
                    available,
                });
            }
            self.l1_used += size;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.buffers.insert(
            id,
            Allocation {
                tier,
                bytes: vec![0; size],
            },
        );

        tracing::trace!(buffer = id, %tier, size, "allocated buffer");
        Ok(BufferHandle(id))
    }

    /// Allocate room for `len` elements of `T`
    pub fn allocate_array<T: Pod>(&mut self, tier: MemoryTier, len: usize) -> Result<BufferHandle> {
        self.allocate(tier, len * std::mem::size_of::<T>())
    }

    /// Bytes still free in L1
    pub fn l1_available(&self) -> usize {
        self.l1_capacity - self.l1_used
    }

    /// Tier a buffer was allocated in
    pub fn tier(&self, handle: BufferHandle) -> Result<MemoryTier> {
        Ok(self.allocation(handle)?.tier)
    }

    /// Buffer size in bytes
    pub fn buffer_size(&self, handle: BufferHandle) -> Result<usize> {
        Ok(self.allocation(handle)?.bytes.len())
    }

    /// Typed read of one element
    pub fn read<T: Pod>(&self, addr: Address) -> Result<T> {
        let bytes = self.slice(addr, std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Typed write of one element
    pub fn write<T: Pod>(&mut self, addr: Address, value: T) -> Result<()> {
        let bytes = self.slice_mut(addr, std::mem::size_of::<T>())?;
        bytes.copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Copy a host slice into memory starting at `addr`
    pub fn write_slice<T: Pod>(&mut self, addr: Address, data: &[T]) -> Result<()> {
        let src: &[u8] = bytemuck::cast_slice(data);
        self.slice_mut(addr, src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Copy `len` elements starting at `addr` back to the host
    pub fn read_vec<T: Pod>(&self, addr: Address, len: usize) -> Result<Vec<T>> {
        let size = std::mem::size_of::<T>();
        let bytes = self.slice(addr, len * size)?;
        Ok(bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect())
    }

    fn allocation(&self, handle: BufferHandle) -> Result<&Allocation> {
        self.buffers
            .get(&handle.0)
            .ok_or(RuntimeError::InvalidBufferHandle(handle.0))
    }

    fn slice(&self, addr: Address, size: usize) -> Result<&[u8]> {
        let bytes = &self.allocation(addr.buffer)?.bytes;
        check_bounds(addr.offset, size, bytes.len())?;
        Ok(&bytes[addr.offset..addr.offset + size])
    }

    fn slice_mut(&mut self, addr: Address, size: usize) -> Result<&mut [u8]> {
        let bytes = &mut self
            .buffers
            .get_mut(&addr.buffer.0)
            .ok_or(RuntimeError::InvalidBufferHandle(addr.buffer.0))?
            .bytes;
        check_bounds(addr.offset, size, bytes.len())?;
        Ok(&mut bytes[addr.offset..addr.offset + size])
    }
}

fn check_bounds(offset: usize, size: usize, buffer_size: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer_size => Ok(()),
        _ => Err(RuntimeError::OutOfBounds {
            offset,
            size,
            buffer_size,
        }),
    }
}
