use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const WORD_SIZE: u64 = 8;
/// Default cap on the simulated stack, in bytes.
pub const DEFAULT_STACK_LIMIT: u64 = 64 * 1024 * 1024;

pub trait Bus {
    fn read_u32(&mut self, addr: u64) -> Result<u32>;
    fn read_u64(&mut self, addr: u64) -> Result<u64>;
    fn write_u32(&mut self, addr: u64, val: u32) -> Result<()>;
    fn write_u64(&mut self, addr: u64, val: u64) -> Result<()>;
}

/// Byte-addressable stack region that grows in either direction on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    bytes: Vec<u8>,
    top: u64, // lowest mapped address
    bot: u64, // highest mapped address, inclusive
    little_endian: bool,
    limit: u64,
}

impl Stack {
    /// A single zeroed word starting at `sp`.
    pub fn new(sp: u64, little_endian: bool) -> Result<Self> {
        let Some(bot) = sp.checked_add(WORD_SIZE - 1) else {
            bail!("no room for a stack word at {sp:#x}");
        };
        Ok(Self {
            bytes: vec![0; WORD_SIZE as usize],
            top: sp,
            bot,
            little_endian,
            limit: DEFAULT_STACK_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn top(&self) -> u64 {
        self.top
    }

    pub fn bot(&self) -> u64 {
        self.bot
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.top && addr <= self.bot
    }

    pub fn byte(&self, addr: u64) -> Option<u8> {
        self.contains(addr)
            .then(|| self.bytes[(addr - self.top) as usize])
    }

    /// Makes `addr` addressable. Existing bytes keep their addresses; new
    /// bytes are zero. The lower bound rounds down to a word, the upper bound
    /// rounds up and always gains at least one word.
    pub fn grow(&mut self, addr: u64) -> Result<()> {
        if addr < self.top {
            let new_top = addr - addr % WORD_SIZE;
            self.check_limit((self.bot - new_top).saturating_add(1))?;
            let extra = (self.top - new_top) as usize;
            trace!(from = self.top, to = new_top, "stack grows down");
            let mut grown = vec![0u8; extra];
            grown.extend_from_slice(&self.bytes);
            self.bytes = grown;
            self.top = new_top;
        } else if addr > self.bot {
            let pad = match addr % WORD_SIZE {
                0 => WORD_SIZE,
                r => WORD_SIZE - r,
            };
            let Some(end) = addr.checked_add(pad) else {
                bail!("stack cannot grow past {addr:#x}");
            };
            self.check_limit(end - self.top)?;
            trace!(from = self.bot, to = end - 1, "stack grows up");
            self.bytes.resize((end - self.top) as usize, 0);
            self.bot = end - 1;
        }
        Ok(())
    }

    /// Grows so that `len` bytes starting at `addr` are all mapped.
    pub fn ensure(&mut self, addr: u64, len: u64) -> Result<()> {
        let Some(last) = addr.checked_add(len.saturating_sub(1)) else {
            bail!("{len}-byte access at {addr:#x} wraps the address space");
        };
        self.grow(addr)?;
        self.grow(last)
    }

    fn check_limit(&self, size: u64) -> Result<()> {
        ensure!(
            size <= self.limit,
            "stack would grow to {size} bytes (limit {})",
            self.limit
        );
        Ok(())
    }

    fn offset(&self, addr: u64, len: usize) -> Result<usize> {
        let last = addr.checked_add(len as u64 - 1);
        ensure!(
            self.contains(addr) && last.is_some_and(|l| l <= self.bot),
            "{len}-byte access at {addr:#x} outside stack [{:#x}, {:#x}]",
            self.top,
            self.bot
        );
        Ok((addr - self.top) as usize)
    }

    fn load<const N: usize>(&mut self, addr: u64) -> Result<[u8; N]> {
        self.ensure(addr, N as u64)?;
        let off = self.offset(addr, N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(&self.bytes[off..off + N]);
        Ok(buf)
    }

    fn store<const N: usize>(&mut self, addr: u64, data: [u8; N]) -> Result<()> {
        self.ensure(addr, N as u64)?;
        let off = self.offset(addr, N)?;
        self.bytes[off..off + N].copy_from_slice(&data);
        Ok(())
    }
}

impl Bus for Stack {
    fn read_u32(&mut self, addr: u64) -> Result<u32> {
        let b = self.load::<4>(addr)?;
        Ok(if self.little_endian { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }
    fn read_u64(&mut self, addr: u64) -> Result<u64> {
        let b = self.load::<8>(addr)?;
        Ok(if self.little_endian { u64::from_le_bytes(b) } else { u64::from_be_bytes(b) })
    }
    fn write_u32(&mut self, addr: u64, val: u32) -> Result<()> {
        let b = if self.little_endian { val.to_le_bytes() } else { val.to_be_bytes() };
        self.store(addr, b)
    }
    fn write_u64(&mut self, addr: u64, val: u64) -> Result<()> {
        let b = if self.little_endian { val.to_le_bytes() } else { val.to_be_bytes() };
        self.store(addr, b)
    }
}
