//! Analysis tap: the single point time-domain samples are read from.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Ring capacity, comfortably above the largest analysis window
const TAP_CAPACITY: usize = 1 << 15;

/// Fixed-capacity ring of the most recent time-domain samples.
///
/// Single writer (the output callback) and single reader (the renderer).
/// Reads are snapshots, not a stream: two reads in the same tick may see
/// different data while a live source keeps writing.
pub struct AnalysisTap {
    ring: Mutex<Ring>,
    window_size: AtomicUsize,
    sample_rate: AtomicU32,
}

struct Ring {
    buf: Vec<f32>,
    write: usize,
    len: usize,
}

impl AnalysisTap {
    pub fn new(window_size: usize, sample_rate: u32) -> Self {
        Self {
            ring: Mutex::new(Ring {
                buf: vec![0.0; TAP_CAPACITY],
                write: 0,
                len: 0,
            }),
            window_size: AtomicUsize::new(window_size),
            sample_rate: AtomicU32::new(sample_rate),
        }
    }

    /// Append freshly generated samples (writer side)
    pub fn push(&self, samples: &[f32]) {
        let ring = &mut *self.ring.lock().unwrap();
        for &sample in samples {
            ring.buf[ring.write] = sample;
            ring.write = (ring.write + 1) % TAP_CAPACITY;
        }
        ring.len = (ring.len + samples.len()).min(TAP_CAPACITY);
    }

    /// Snapshot the most recent `out.len()` samples in time order,
    /// zero-padding the front until enough have been produced
    pub fn get_time_domain(&self, out: &mut [f32]) {
        let ring = &*self.ring.lock().unwrap();
        let want = out.len();
        let have = ring.len.min(want);
        let pad = want - have;
        out[..pad].fill(0.0);
        for k in 0..have {
            let index = (ring.write + TAP_CAPACITY - have + k) % TAP_CAPACITY;
            out[pad + k] = ring.buf[index];
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size.load(Ordering::Relaxed)
    }

    pub fn set_window_size(&self, size: usize) {
        self.window_size.store(size, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_returns_most_recent_in_order() {
        let tap = AnalysisTap::new(4, 44100);
        tap.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        tap.get_time_domain(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn snapshot_zero_pads_until_warm() {
        let tap = AnalysisTap::new(4, 44100);
        tap.push(&[0.5, -0.5]);

        let mut out = [9.0; 4];
        tap.get_time_domain(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, -0.5]);
    }

    #[test]
    fn ring_wraps_past_capacity() {
        let tap = AnalysisTap::new(4, 44100);
        for chunk in 0..(TAP_CAPACITY / 4 + 3) {
            let base = chunk as f32;
            tap.push(&[base, base + 0.25, base + 0.5, base + 0.75]);
        }

        let mut out = [0.0; 4];
        tap.get_time_domain(&mut out);
        let last = (TAP_CAPACITY / 4 + 2) as f32;
        assert_eq!(out, [last, last + 0.25, last + 0.5, last + 0.75]);
    }

    #[test]
    fn attributes_are_mutable() {
        let tap = AnalysisTap::new(2048, 44100);
        tap.set_window_size(1024);
        tap.set_sample_rate(48000);
        assert_eq!(tap.window_size(), 1024);
        assert_eq!(tap.sample_rate(), 48000);
    }
}
