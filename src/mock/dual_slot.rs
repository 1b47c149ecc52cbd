//! Ready-made device: two 32 KiB image slots and a one-sector scratch,
//! uniform 4 KiB sectors.

use crate::flash::AreaId;
use crate::mock::MockFlash;

const SLOT_SECTORS: [u32; 8] = [0x1000; 8];
const SCRATCH_SECTORS: [u32; 1] = [0x1000];

pub fn device() -> MockFlash {
    device_with(8, 0xff)
}

pub fn device_with_align(align: u32) -> MockFlash {
    device_with(align, 0xff)
}

pub fn device_with_erased_val(erased_val: u8) -> MockFlash {
    device_with(8, erased_val)
}

fn device_with(align: u32, erased_val: u8) -> MockFlash {
    let mut map = MockFlash::new();
    map.add_area(AreaId::Primary(0), align, erased_val, &SLOT_SECTORS);
    map.add_area(AreaId::Secondary(0), align, erased_val, &SLOT_SECTORS);
    map.add_area(AreaId::Scratch, align, erased_val, &SCRATCH_SECTORS);
    map
}
