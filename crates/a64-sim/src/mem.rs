use crate::error::{Result, SimError};

/// Little-endian memory as seen by the simulated core.
pub trait SimBus {
    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<()>;
    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<()>;

    fn read_u8(&self, addr: u64) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_bytes(addr, &mut b)?;
        Ok(b[0])
    }

    fn read_u16(&self, addr: u64) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_bytes(addr, &mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32(&self, addr: u64) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_bytes(addr, &mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_u64(&self, addr: u64) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_bytes(addr, &mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    fn read_u128(&self, addr: u64) -> Result<u128> {
        let mut b = [0u8; 16];
        self.read_bytes(addr, &mut b)?;
        Ok(u128::from_le_bytes(b))
    }

    fn write_u8(&mut self, addr: u64, val: u8) -> Result<()> {
        self.write_bytes(addr, &[val])
    }

    fn write_u16(&mut self, addr: u64, val: u16) -> Result<()> {
        self.write_bytes(addr, &val.to_le_bytes())
    }

    fn write_u32(&mut self, addr: u64, val: u32) -> Result<()> {
        self.write_bytes(addr, &val.to_le_bytes())
    }

    fn write_u64(&mut self, addr: u64, val: u64) -> Result<()> {
        self.write_bytes(addr, &val.to_le_bytes())
    }

    fn write_u128(&mut self, addr: u64, val: u128) -> Result<()> {
        self.write_bytes(addr, &val.to_le_bytes())
    }

    /// Fetch one instruction word.
    fn fetch_u32(&self, pc: u64) -> Result<u32> {
        self.read_u32(pc)
    }
}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    data: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn range(&self, addr: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let end = addr.checked_add(len as u64)?;
        if addr < self.base || end > self.end() {
            return None;
        }
        let start = (addr - self.base) as usize;
        Some(start..start + len)
    }
}

/// A handful of disjoint zero-initialised regions.
///
/// Code, literal pools and the simulated stack each get their own mapping.
/// Accesses must fall entirely inside one region; anything else is a
/// [`SimError::MemoryFault`], which is also how a simulated stack overflow
/// shows up.
#[derive(Debug, Clone, Default)]
pub struct SparseMemory {
    regions: Vec<Region>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, base: u64, len: u64) -> Result<()> {
        let overlap = SimError::MapOverlap { base, len };
        let end = base.checked_add(len).ok_or(overlap.clone())?;
        if len == 0 || self.regions.iter().any(|r| base < r.end() && r.base < end) {
            return Err(overlap);
        }
        let size = usize::try_from(len).map_err(|_| overlap)?;
        self.regions.push(Region {
            base,
            data: vec![0; size],
        });
        self.regions.sort_by_key(|r| r.base);
        Ok(())
    }

    /// Map a region sized to `data` and copy `data` into it.
    pub fn map_with(&mut self, base: u64, data: &[u8]) -> Result<()> {
        self.map(base, data.len() as u64)?;
        self.load(base, data)
    }

    pub fn load(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        self.write_bytes(addr, data)
    }

    pub fn slice(&self, addr: u64, len: usize) -> Result<&[u8]> {
        let region = self.region(addr, len)?;
        let range = region.range(addr, len).ok_or(SimError::MemoryFault { addr, len })?;
        Ok(&region.data[range])
    }

    pub fn is_mapped(&self, addr: u64, len: usize) -> bool {
        self.region(addr, len).is_ok()
    }

    fn region(&self, addr: u64, len: usize) -> Result<&Region> {
        self.regions
            .iter()
            .find(|r| r.range(addr, len).is_some())
            .ok_or(SimError::MemoryFault { addr, len })
    }
}

impl SimBus for SparseMemory {
    fn read_bytes(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let src = self.slice(addr, buf.len())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_bytes(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let len = data.len();
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.range(addr, len).is_some())
            .ok_or(SimError::MemoryFault { addr, len })?;
        let range = region
            .range(addr, len)
            .ok_or(SimError::MemoryFault { addr, len })?;
        region.data[range].copy_from_slice(data);
        Ok(())
    }
}
