//! Stream descriptors and address generators
//!
//! A [`StreamDescriptor`] is the value written into a data mover's
//! configuration registers: a one-dimensional loop (`bound` elements,
//! `stride` bytes apart), a repetition count, a base address and a direction.
//! Once written, an [`AddressGenerator`] walks the pattern one access at a
//! time as the core reads or writes the bound register.
//!
//! `repeat = r` replays the whole pattern `r` times, so a generator issues
//! `bound * repeat` accesses before it is exhausted.

use crate::error::{Result, RuntimeError};
use crate::isa::{Element, FloatType, FpRegister};
use crate::memory::Address;
use std::fmt;

/// One of the two stream data movers of a core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataMover {
    /// Bound to `ft0`
    Dm0,
    /// Bound to `ft1`
    Dm1,
}

impl DataMover {
    pub const ALL: [DataMover; 2] = [DataMover::Dm0, DataMover::Dm1];

    /// Register whose reads/writes this data mover serves
    pub const fn register(self) -> FpRegister {
        match self {
            DataMover::Dm0 => FpRegister::FT0,
            DataMover::Dm1 => FpRegister::FT1,
        }
    }

    /// Data mover bound to `reg`, if any
    pub fn for_register(reg: FpRegister) -> Option<Self> {
        Self::ALL.into_iter().find(|dm| dm.register() == reg)
    }

    pub const fn index(self) -> usize {
        match self {
            DataMover::Dm0 => 0,
            DataMover::Dm1 => 1,
        }
    }
}

impl fmt::Display for DataMover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dm{}", self.index())
    }
}

/// Whether register accesses pull from or push to memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDirection {
    Read,
    Write,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamDirection::Read => write!(f, "read"),
            StreamDirection::Write => write!(f, "write"),
        }
    }
}

// ================================================================================================
// Descriptor
// ================================================================================================

/// Access pattern for one data mover
///
/// Built the way the configuration registers are written:
///
/// ```rust
/// use ssr_runtime::{Address, BufferHandle, StreamDescriptor};
///
/// let input = Address::base(BufferHandle::new(0));
/// let desc = StreamDescriptor::contiguous::<f32>(1024).repeat(1).read(input);
/// assert_eq!(desc.total_accesses(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamDescriptor {
    element: FloatType,
    bound: usize,
    stride: usize,
    repeat: u32,
    base: Option<Address>,
    direction: Option<StreamDirection>,
}

impl StreamDescriptor {
    /// One-dimensional loop of `bound` elements `stride` bytes apart
    pub fn loop_1d(element: FloatType, bound: usize, stride: usize) -> Self {
        Self {
            element,
            bound,
            stride,
            repeat: 1,
            base: None,
            direction: None,
        }
    }

    /// Unit-stride loop over `bound` elements of `T`
    pub fn contiguous<T: Element>(bound: usize) -> Self {
        Self::loop_1d(T::TYPE, bound, std::mem::size_of::<T>())
    }

    /// Replay the whole pattern `repeat` times
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Stream reads from `base`
    pub fn read(mut self, base: Address) -> Self {
        self.base = Some(base);
        self.direction = Some(StreamDirection::Read);
        self
    }

    /// Stream writes to `base`
    pub fn write(mut self, base: Address) -> Self {
        self.base = Some(base);
        self.direction = Some(StreamDirection::Write);
        self
    }

    pub fn element(&self) -> FloatType {
        self.element
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat
    }

    pub fn base(&self) -> Option<Address> {
        self.base
    }

    pub fn direction(&self) -> Option<StreamDirection> {
        self.direction
    }

    /// Accesses the pattern issues before exhaustion
    pub fn total_accesses(&self) -> u64 {
        self.bound as u64 * self.repeat as u64
    }

    /// Reject descriptors the hardware could not be configured with
    pub fn validate(&self) -> Result<()> {
        if self.repeat == 0 {
            return Err(RuntimeError::invalid_descriptor("repeat must be at least 1"));
        }
        if self.base.is_none() || self.direction.is_none() {
            return Err(RuntimeError::invalid_descriptor(
                "descriptor has no base address or direction",
            ));
        }
        Ok(())
    }
}

// ================================================================================================
// Address Generator
// ================================================================================================

/// Live state of a configured data mover
#[derive(Debug, Clone)]
pub struct AddressGenerator {
    descriptor: StreamDescriptor,
    base: Address,
    direction: StreamDirection,
    issued: u64,
}

impl AddressGenerator {
    /// Arm a generator with a validated descriptor
    pub fn new(descriptor: StreamDescriptor) -> Result<Self> {
        descriptor.validate()?;
        let (Some(base), Some(direction)) = (descriptor.base(), descriptor.direction()) else {
            return Err(RuntimeError::invalid_descriptor("descriptor has no base address or direction"));
        };
        Ok(Self {
            descriptor,
            base,
            direction,
            issued: 0,
        })
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn direction(&self) -> StreamDirection {
        self.direction
    }

    /// Accesses issued so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Accesses left in the pattern
    pub fn remaining(&self) -> u64 {
        self.descriptor.total_accesses().saturating_sub(self.issued)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Address of the next access, advancing the generator
    ///
    /// Past exhaustion the generator keeps walking linearly beyond the last
    /// element instead of wrapping, the way an over-driven mover runs off the
    /// end of its buffer.
    pub fn next_address(&mut self) -> Address {
        let total = self.descriptor.total_accesses();
        let bound = self.descriptor.bound().max(1) as u64;
        let index = if self.issued < total {
            self.issued % bound
        } else {
            bound + (self.issued - total)
        };
        self.issued += 1;
        self.base.offset_by(index as usize * self.descriptor.stride())
    }
}
