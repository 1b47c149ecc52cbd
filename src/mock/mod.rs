pub mod dual_slot;

use std::{cell::RefCell, collections::BTreeMap, rc::Rc, vec::Vec};

use crate::{
    flash::{AreaId, FlashArea, FlashMap, Sector},
    Error,
};

struct Store {
    mem: Vec<u8>,
    sectors: Vec<Sector>,
    align: u32,
    erased_val: u8,
    fail_reads: bool,
    fail_sector_lookups: bool,
}

/// RAM-backed flash map enforcing the device rules the core relies on:
/// aligned writes, whole-sector erases, and no rewriting a programmed byte
/// without an erase in between.
pub struct MockFlash {
    areas: BTreeMap<AreaId, Rc<RefCell<Store>>>,
}

impl MockFlash {
    pub fn new() -> MockFlash {
        MockFlash {
            areas: BTreeMap::new(),
        }
    }

    /// Add an erased area with the given write alignment and sector sizes.
    pub fn add_area(&mut self, id: AreaId, align: u32, erased_val: u8, sector_sizes: &[u32]) {
        let mut sectors = Vec::new();
        let mut off = 0;
        for size in sector_sizes {
            sectors.push(Sector { off, size: *size });
            off += size;
        }
        let store = Store {
            mem: std::vec![erased_val; off as usize],
            sectors,
            align,
            erased_val,
            fail_reads: false,
            fail_sector_lookups: false,
        };
        self.areas.insert(id, Rc::new(RefCell::new(store)));
    }

    /// Make every read of `id` fail.
    pub fn fail_reads(&mut self, id: AreaId) {
        self.areas[&id].borrow_mut().fail_reads = true;
    }

    /// Make every sector query of `id` fail.
    pub fn fail_sector_lookups(&mut self, id: AreaId) {
        self.areas[&id].borrow_mut().fail_sector_lookups = true;
    }

    /// Number of handles currently open on `id`.
    pub fn open_handles(&self, id: AreaId) -> usize {
        Rc::strong_count(&self.areas[&id]) - 1
    }
}

impl FlashMap for MockFlash {
    type Area = MockArea;

    fn open(&self, id: AreaId) -> Result<MockArea, Error> {
        let store = self.areas.get(&id).ok_or(Error::Flash)?;
        Ok(MockArea {
            id,
            store: Rc::clone(store),
        })
    }
}

pub struct MockArea {
    id: AreaId,
    store: Rc<RefCell<Store>>,
}

impl FlashArea for MockArea {
    fn id(&self) -> AreaId {
        self.id
    }

    fn off(&self) -> u32 {
        0
    }

    fn size(&self) -> u32 {
        self.store.borrow().mem.len() as u32
    }

    fn align(&self) -> u32 {
        self.store.borrow().align
    }

    fn erased_val(&self) -> u8 {
        self.store.borrow().erased_val
    }

    fn read(&mut self, off: u32, buf: &mut [u8]) -> Result<(), Error> {
        let store = self.store.borrow();
        if store.fail_reads {
            return Err(Error::Flash);
        }
        let off = off as usize;
        let end = off.checked_add(buf.len()).ok_or(Error::Flash)?;
        if end > store.mem.len() {
            return Err(Error::Flash);
        }
        buf.copy_from_slice(&store.mem[off..end]);
        Ok(())
    }

    fn write(&mut self, off: u32, buf: &[u8]) -> Result<(), Error> {
        let mut store = self.store.borrow_mut();
        if off % store.align != 0 || buf.len() as u32 % store.align != 0 {
            return Err(Error::Flash);
        }
        let off = off as usize;
        let end = off.checked_add(buf.len()).ok_or(Error::Flash)?;
        if end > store.mem.len() {
            return Err(Error::Flash);
        }
        // A programmed byte may only return to the erased value via erase.
        let erased_val = store.erased_val;
        for (old, new) in store.mem[off..end].iter().zip(buf) {
            if *old != erased_val && old != new {
                return Err(Error::Flash);
            }
        }
        store.mem[off..end].copy_from_slice(buf);
        Ok(())
    }

    fn erase(&mut self, off: u32, len: u32) -> Result<(), Error> {
        let mut store = self.store.borrow_mut();
        let starts_a_sector = store.sectors.iter().any(|s| s.off == off);
        let ends_a_sector = store.sectors.iter().any(|s| s.end() == off + len);
        if !starts_a_sector || !ends_a_sector {
            return Err(Error::Flash);
        }
        let erased_val = store.erased_val;
        store.mem[off as usize..(off + len) as usize].fill(erased_val);
        Ok(())
    }

    fn sector_count(&self) -> usize {
        self.store.borrow().sectors.len()
    }

    fn sector_at(&self, idx: usize) -> Result<Sector, Error> {
        let store = self.store.borrow();
        if store.fail_sector_lookups {
            return Err(Error::Geometry);
        }
        store.sectors.get(idx).copied().ok_or(Error::Geometry)
    }

    fn sector_containing(&self, off: u32) -> Result<Sector, Error> {
        let store = self.store.borrow();
        if store.fail_sector_lookups {
            return Err(Error::Geometry);
        }
        store
            .sectors
            .iter()
            .find(|s| s.off <= off && off < s.end())
            .copied()
            .ok_or(Error::Geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_respect_alignment_and_programming_rules() {
        let mut map = MockFlash::new();
        map.add_area(AreaId::Primary(0), 8, 0xff, &[0x100, 0x100]);
        let mut fap = map.open(AreaId::Primary(0)).unwrap();

        assert!(fap.write(4, &[0u8; 8]).is_err());
        assert!(fap.write(0, &[0u8; 4]).is_err());
        fap.write(0, &[0u8; 8]).unwrap();

        // Same value again is fine, flipping bits back is not.
        fap.write(0, &[0u8; 8]).unwrap();
        assert!(fap.write(0, &[1u8; 8]).is_err());

        fap.erase(0, 0x100).unwrap();
        fap.write(0, &[1u8; 8]).unwrap();
    }

    #[test]
    fn erases_cover_whole_sectors() {
        let mut map = MockFlash::new();
        map.add_area(AreaId::Primary(0), 8, 0xff, &[0x100, 0x100]);
        let mut fap = map.open(AreaId::Primary(0)).unwrap();

        assert!(fap.erase(8, 0x100).is_err());
        assert!(fap.erase(0, 0x80).is_err());
        fap.erase(0x100, 0x100).unwrap();
        fap.erase(0, 0x200).unwrap();
    }

    #[test]
    fn reopened_areas_observe_earlier_writes() {
        let mut map = MockFlash::new();
        map.add_area(AreaId::Scratch, 8, 0xff, &[0x100]);

        let mut fap = map.open(AreaId::Scratch).unwrap();
        fap.write(0, &[0x42; 8]).unwrap();
        drop(fap);
        assert_eq!(map.open_handles(AreaId::Scratch), 0);

        let mut fap = map.open(AreaId::Scratch).unwrap();
        let mut buf = [0u8; 8];
        fap.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0x42; 8]);
    }
}
