//! Frame-difference motion analysis
//!
//! Pipeline over two consecutive frames: absolute per-channel difference,
//! grayscale conversion, 5x5 box blur, fixed-threshold binarization,
//! dilation to merge nearby regions, connected-region extraction. Motion
//! is declared when any region's area exceeds the configured pixel
//! threshold.

use crate::Frame;

/// Per-pixel intensity delta below which a pixel is considered unchanged
pub const PIXEL_DELTA_THRESHOLD: u8 = 20;

/// Dilation passes applied to the binary mask
pub const DILATE_ITERATIONS: usize = 3;

/// Blur kernel half-width (5x5 box)
const BLUR_RADIUS: i64 = 2;

/// Area, in pixels, of the largest changed region between two frames.
///
/// Returns 0 when the frames disagree on dimensions; the source contract
/// says they never do.
pub fn largest_motion_area(prev: &Frame, curr: &Frame) -> u32 {
    if prev.width() != curr.width() || prev.height() != curr.height() {
        return 0;
    }

    let w = prev.width() as usize;
    let h = prev.height() as usize;

    let gray = grayscale_delta(prev.data(), curr.data());
    let blurred = box_blur(&gray, w, h);
    let mut mask = binarize(&blurred, PIXEL_DELTA_THRESHOLD);
    for _ in 0..DILATE_ITERATIONS {
        mask = dilate(&mask, w, h);
    }

    region_areas(&mask, w, h).into_iter().max().unwrap_or(0)
}

/// Whether the change between two frames crosses the area threshold
pub fn detect_motion(prev: &Frame, curr: &Frame, area_threshold: u32) -> bool {
    largest_motion_area(prev, curr) > area_threshold
}

/// Absolute per-channel difference collapsed to one intensity channel
fn grayscale_delta(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.chunks_exact(3)
        .zip(b.chunks_exact(3))
        .map(|(pa, pb)| {
            let dr = pa[0].abs_diff(pb[0]) as u32;
            let dg = pa[1].abs_diff(pb[1]) as u32;
            let db = pa[2].abs_diff(pb[2]) as u32;
            // ITU-R BT.601 luma weights
            ((dr * 299 + dg * 587 + db * 114) / 1000) as u8
        })
        .collect()
}

/// 5x5 box blur with clamped borders
fn box_blur(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];

    for y in 0..h {
        for x in 0..w {
            let mut sum: u32 = 0;
            for dy in -BLUR_RADIUS..=BLUR_RADIUS {
                for dx in -BLUR_RADIUS..=BLUR_RADIUS {
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;
                    let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
                    sum += src[sy * w + sx] as u32;
                }
            }
            out[y * w + x] = (sum / 25) as u8;
        }
    }

    out
}

/// Fixed-threshold binarization to a 0/255 mask
fn binarize(src: &[u8], threshold: u8) -> Vec<u8> {
    src.iter()
        .map(|&v| if v > threshold { 255 } else { 0 })
        .collect()
}

/// One 3x3 dilation pass
fn dilate(mask: &[u8], w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; mask.len()];

    for y in 0..h {
        for x in 0..w {
            'search: for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sy = y as i64 + dy;
                    let sx = x as i64 + dx;
                    if sy < 0 || sy >= h as i64 || sx < 0 || sx >= w as i64 {
                        continue;
                    }
                    if mask[sy as usize * w + sx as usize] != 0 {
                        out[y * w + x] = 255;
                        break 'search;
                    }
                }
            }
        }
    }

    out
}

/// Areas of all 8-connected regions in a binary mask
fn region_areas(mask: &[u8], w: usize, h: usize) -> Vec<u32> {
    let mut visited = vec![false; mask.len()];
    let mut areas = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if mask[start] == 0 || visited[start] {
            continue;
        }

        let mut area: u32 = 0;
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            area += 1;
            let y = (idx / w) as i64;
            let x = (idx % w) as i64;

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let ny = y + dy;
                    let nx = x + dx;
                    if ny < 0 || ny >= h as i64 || nx < 0 || nx >= w as i64 {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if mask[nidx] != 0 && !visited[nidx] {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }

        areas.push(area);
    }

    areas
}
