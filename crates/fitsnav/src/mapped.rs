//! Writable memory mapping of a data segment and in-place pixel flipping.

use std::fs::{File, OpenOptions};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use bytemuck::Pod;
use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::data::{locate_data, DataSegment};
use crate::error::{Error, Result};

/// A shared, writable mapping of exactly one data segment.
///
/// The mapping is released when this value is dropped, on every exit path.
/// Writes go straight to the file; call [`MappedData::flush`] to force them
/// to disk before the drop.
pub struct MappedData {
    map: MmapMut,
    segment: DataSegment,
}

impl MappedData {
    /// Map `segment` of `file`, which must be opened for reading and writing.
    pub fn open(file: &File, segment: DataSegment) -> Result<Self> {
        let len = usize::try_from(segment.length)
            .map_err(|_| Error::InvalidLayout("data segment larger than address space"))?;
        // SAFETY: the range was bounds-checked against the file length by
        // `locate_data`. Callers must not truncate or concurrently write the
        // file while it is mapped.
        let map = unsafe {
            MmapOptions::new()
                .offset(segment.offset)
                .len(len)
                .map_mut(file)?
        };
        Ok(Self { map, segment })
    }

    /// The segment this mapping covers.
    pub fn segment(&self) -> &DataSegment {
        &self.segment
    }

    /// Flush outstanding modifications to disk.
    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl Deref for MappedData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.map
    }
}

impl DerefMut for MappedData {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

/// Reverse the order of `T`-sized pixels if `row` can be viewed as `[T]`.
fn reverse_as<T: Pod>(row: &mut [u8]) -> bool {
    match bytemuck::try_cast_slice_mut::<u8, T>(row) {
        Ok(pixels) => {
            pixels.reverse();
            true
        }
        Err(_) => false,
    }
}

fn reverse_pixels(row: &mut [u8], bytes_per_pixel: usize) {
    let done = match bytes_per_pixel {
        1 => {
            row.reverse();
            true
        }
        2 => reverse_as::<u16>(row),
        4 => reverse_as::<u32>(row),
        8 => reverse_as::<u64>(row),
        _ => false,
    };
    if !done {
        row.reverse();
        for pixel in row.chunks_exact_mut(bytes_per_pixel) {
            pixel.reverse();
        }
    }
}

/// Mirror every row of `data` along the x axis.
///
/// `data` is a sequence of rows of `row_pixels` pixels, each
/// `bytes_per_pixel` wide. Pixel bytes are moved as opaque units, so byte
/// order is preserved.
pub fn flip_rows(data: &mut [u8], row_pixels: usize, bytes_per_pixel: usize) -> Result<()> {
    if row_pixels == 0 || bytes_per_pixel == 0 {
        return Err(Error::InvalidLayout("zero row width or pixel size"));
    }
    let row_len = row_pixels
        .checked_mul(bytes_per_pixel)
        .ok_or(Error::InvalidLayout("row length overflow"))?;
    for row in data.chunks_exact_mut(row_len) {
        reverse_pixels(row, bytes_per_pixel);
    }
    Ok(())
}

/// Flip the pixels of HDU `hdu_index` in `path` along the x axis, in place.
pub fn flip_x_in_file<P: AsRef<Path>>(path: P, hdu_index: usize) -> Result<DataSegment> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let segment = locate_data(&mut file, hdu_index)?;
    if segment.bitpix_bytes == 0 {
        return Err(Error::InvalidLayout("unknown BITPIX"));
    }
    let to_usize =
        |v: u64| usize::try_from(v).map_err(|_| Error::InvalidLayout("axis too large"));
    let naxis1 = segment
        .axes
        .first()
        .copied()
        .ok_or(Error::NoDataSegment { index: hdu_index })?;
    let row_pixels = to_usize(naxis1)?;
    let bytes_per_pixel = to_usize(segment.bitpix_bytes)?;

    let mut mapped = MappedData::open(&file, segment)?;
    flip_rows(&mut mapped, row_pixels, bytes_per_pixel)?;
    mapped.flush()?;
    debug!(
        index = hdu_index,
        row_pixels, bytes_per_pixel, "flipped data segment along x"
    );
    Ok(mapped.segment().clone())
}
