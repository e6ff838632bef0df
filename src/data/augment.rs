// ============================================================
// Layer 4 — Volume Augmentation
// ============================================================
// Training samples are random sub-volumes of a subject, each
// possibly mirrored along the spatial axes:
//
//   random_crop  → a [x, y, z] window at a uniform random origin
//   random_flip  → each spatial axis mirrored with probability p
//
// Volume and label always receive the same crop and the same
// flips, so every voxel keeps its annotation.
//
// All work happens on host buffers ([C, X, Y, Z] / [X, Y, Z],
// row-major) before the batcher moves anything to the device.
//
// Reference: rand crate documentation (Rng::gen_range, gen_bool)

use rand::Rng;

use crate::data::{DataError, DataResult};
use crate::domain::volume::{LabelVolume, Subject, Volume};

#[inline]
fn offset(extent: [usize; 3], x: usize, y: usize, z: usize) -> usize {
    (x * extent[1] + y) * extent[2] + z
}

/// Copy the `size` window at `origin` out of a row-major [X, Y, Z] buffer.
fn crop_3d<T: Copy>(src: &[T], extent: [usize; 3], origin: [usize; 3], size: [usize; 3]) -> Vec<T> {
    let mut out = Vec::with_capacity(size.iter().product());
    for x in origin[0]..origin[0] + size[0] {
        for y in origin[1]..origin[1] + size[1] {
            let start = offset(extent, x, y, origin[2]);
            out.extend_from_slice(&src[start..start + size[2]]);
        }
    }
    out
}

/// Mirror a row-major [X, Y, Z] buffer along `axis` in place.
fn flip_3d<T>(buf: &mut [T], extent: [usize; 3], axis: usize) {
    let [nx, ny, nz] = extent;
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let (fx, fy, fz) = match axis {
                    0 => (nx - 1 - x, y, z),
                    1 => (x, ny - 1 - y, z),
                    _ => (x, y, nz - 1 - z),
                };
                let a = offset(extent, x, y, z);
                let b = offset(extent, fx, fy, fz);
                if a < b {
                    buf.swap(a, b);
                }
            }
        }
    }
}

/// Crop volume and label to `size` at `origin`.
pub fn crop(subject: &Subject, origin: [usize; 3], size: [usize; 3]) -> DataResult<(Volume, LabelVolume)> {
    let extent = subject.volume.extent();
    if (0..3).any(|i| origin[i] + size[i] > extent[i]) {
        return Err(DataError::CropTooLarge { subject: subject.id.clone(), sample: size, extent });
    }

    let channels = (0..subject.volume.channels())
        .map(|c| crop_3d(subject.volume.channel(c), extent, origin, size))
        .collect();
    let label = crop_3d(subject.label.data(), extent, origin, size);

    let shape_err = |source| DataError::Shape { subject: subject.id.clone(), source };
    let volume = Volume::from_channels(size, channels).map_err(shape_err)?;
    let label  = LabelVolume::new(size, label).map_err(shape_err)?;
    Ok((volume, label))
}

/// Crop a `size` window at a uniformly random origin.
pub fn random_crop<R: Rng>(subject: &Subject, size: [usize; 3], rng: &mut R) -> DataResult<(Volume, LabelVolume)> {
    let extent = subject.volume.extent();
    if (0..3).any(|i| size[i] > extent[i]) {
        return Err(DataError::CropTooLarge { subject: subject.id.clone(), sample: size, extent });
    }
    let origin = [0, 1, 2].map(|i| rng.gen_range(0..=extent[i] - size[i]));
    crop(subject, origin, size)
}

/// Mirror volume (every channel) and label along spatial `axis` (0 = X, 1 = Y, 2 = Z).
pub fn flip(volume: &mut Volume, label: &mut LabelVolume, axis: usize) {
    let extent = label.shape();
    let voxels = extent.iter().product::<usize>().max(1);

    for channel in volume.data_mut().chunks_mut(voxels) {
        flip_3d(channel, extent, axis);
    }
    flip_3d(label.data_mut(), extent, axis);
}

/// Mirror along each spatial axis independently with probability `prob`.
pub fn random_flip<R: Rng>(volume: &mut Volume, label: &mut LabelVolume, prob: f64, rng: &mut R) {
    for axis in 0..3 {
        if rng.gen_bool(prob) {
            flip(volume, label, axis);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    /// 2 channels over a [2, 3, 4] grid; channel 1 = channel 0 + 100,
    /// label = voxel index mod 5.
    fn subject() -> Subject {
        let extent = [2, 3, 4];
        let n = 24;
        let c0: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let c1: Vec<f32> = (0..n).map(|i| i as f32 + 100.0).collect();
        let volume = Volume::from_channels(extent, vec![c0, c1]).unwrap();
        let label  = LabelVolume::new(extent, (0..n).map(|i| (i % 5) as u8).collect()).unwrap();
        Subject::new("s", volume, label).unwrap()
    }

    #[test]
    fn test_crop_picks_window() {
        let (v, l) = crop(&subject(), [1, 1, 2], [1, 2, 2]).unwrap();
        assert_eq!(v.shape(), [2, 1, 2, 2]);
        // voxels (1,1,2) (1,1,3) (1,2,2) (1,2,3) → 18 19 22 23
        assert_eq!(v.channel(0), &[18.0, 19.0, 22.0, 23.0]);
        assert_eq!(v.channel(1), &[118.0, 119.0, 122.0, 123.0]);
        assert_eq!(l.data(), &[3, 4, 2, 3]);
    }

    #[test]
    fn test_crop_too_large() {
        let err = crop(&subject(), [0, 0, 1], [2, 3, 4]).unwrap_err();
        assert!(matches!(err, DataError::CropTooLarge { .. }));

        let mut rng = StdRng::seed_from_u64(0);
        let err = random_crop(&subject(), [3, 1, 1], &mut rng).unwrap_err();
        assert!(matches!(err, DataError::CropTooLarge { .. }));
    }

    #[test]
    fn test_random_crop_keeps_label_in_sync() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (v, l) = random_crop(&subject(), [1, 2, 3], &mut rng).unwrap();
            assert_eq!(l.shape(), [1, 2, 3]);
            for (value, class) in v.channel(0).iter().zip(l.data()) {
                assert_eq!((*value as usize % 5) as u8, *class);
            }
        }
    }

    #[test]
    fn test_full_size_crop_is_identity() {
        let s = subject();
        let mut rng = StdRng::seed_from_u64(1);
        let (v, l) = random_crop(&s, [2, 3, 4], &mut rng).unwrap();
        assert_eq!(v, s.volume);
        assert_eq!(l, s.label);
    }

    #[test]
    fn test_flip_last_axis() {
        let s = subject();
        let (mut v, mut l) = (s.volume, s.label);
        flip(&mut v, &mut l, 2);
        assert_eq!(&v.channel(0)[..4], &[3.0, 2.0, 1.0, 0.0]);
        assert_eq!(&v.channel(1)[..4], &[103.0, 102.0, 101.0, 100.0]);
        assert_eq!(&l.data()[..4], &[3, 2, 1, 0]);
    }

    #[test]
    fn test_flip_twice_is_identity() {
        for axis in 0..3 {
            let s = subject();
            let (mut v, mut l) = (s.volume.clone(), s.label.clone());
            flip(&mut v, &mut l, axis);
            assert_ne!(v, s.volume);
            flip(&mut v, &mut l, axis);
            assert_eq!(v, s.volume);
            assert_eq!(l, s.label);
        }
    }

    #[test]
    fn test_random_flip_probability_bounds() {
        let s = subject();
        let mut rng = StdRng::seed_from_u64(3);

        let (mut v, mut l) = (s.volume.clone(), s.label.clone());
        random_flip(&mut v, &mut l, 0.0, &mut rng);
        assert_eq!(v, s.volume);

        // p = 1 flips all three axes: element 0 lands at the last voxel
        let (mut v, mut l) = (s.volume.clone(), s.label.clone());
        random_flip(&mut v, &mut l, 1.0, &mut rng);
        assert_eq!(v.channel(0)[0], 23.0);
        assert_eq!(l.data()[0], (23 % 5) as u8);
    }
}
