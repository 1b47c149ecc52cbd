//! Mounting a [`FlashArea`] over an `embedded-storage` NOR flash.

use embedded_storage::nor_flash::NorFlash;

use crate::{
    flash::{AreaId, FlashArea, Sector},
    Error,
};

/// [`FlashArea`] over a region of any [`NorFlash`] device.
///
/// Geometry follows the trait constants: uniform `ERASE_SIZE` sectors,
/// `WRITE_SIZE` write units and `0xFF` as the erased value.
pub struct NorArea<F> {
    flash: F,
    id: AreaId,
    off: u32,
    size: u32,
}

impl<F: NorFlash> NorArea<F> {
    /// Mount `id` on `[off, off + size)` of `flash`.
    ///
    /// The region must cover whole erase units.
    pub fn new(flash: F, id: AreaId, off: u32, size: u32) -> Result<Self, Error> {
        let erase_sz = F::ERASE_SIZE as u32;
        if size == 0 || off % erase_sz != 0 || size % erase_sz != 0 {
            return Err(Error::Geometry);
        }
        if (off + size) as usize > flash.capacity() {
            return Err(Error::Geometry);
        }
        Ok(Self { flash, id, off, size })
    }

    /// Hand the underlying device back.
    pub fn release(self) -> F {
        self.flash
    }
}

impl<F: NorFlash> FlashArea for NorArea<F> {
    fn id(&self) -> AreaId {
        self.id
    }

    fn off(&self) -> u32 {
        self.off
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn align(&self) -> u32 {
        F::WRITE_SIZE as u32
    }

    fn erased_val(&self) -> u8 {
        0xff
    }

    fn read(&mut self, off: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.flash.read(self.off + off, buf).map_err(|_| Error::Flash)
    }

    fn write(&mut self, off: u32, buf: &[u8]) -> Result<(), Error> {
        self.flash.write(self.off + off, buf).map_err(|_| Error::Flash)
    }

    fn erase(&mut self, off: u32, len: u32) -> Result<(), Error> {
        let from = self.off + off;
        self.flash.erase(from, from + len).map_err(|_| Error::Flash)
    }

    fn sector_count(&self) -> usize {
        (self.size / F::ERASE_SIZE as u32) as usize
    }

    fn sector_at(&self, idx: usize) -> Result<Sector, Error> {
        if idx >= self.sector_count() {
            return Err(Error::Geometry);
        }
        Ok(Sector {
            off: idx as u32 * F::ERASE_SIZE as u32,
            size: F::ERASE_SIZE as u32,
        })
    }

    fn sector_containing(&self, off: u32) -> Result<Sector, Error> {
        if off >= self.size {
            return Err(Error::Geometry);
        }
        self.sector_at((off / F::ERASE_SIZE as u32) as usize)
    }
}
