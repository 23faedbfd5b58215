use image::{Rgb, RgbImage};

/// Source pixels overlapping one destination index along an axis, with the
/// length of each overlap.
type Span = Vec<(u32, f64)>;

fn axis_spans(src_len: u32, dst_len: u32) -> Vec<Span> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (d + 1) as f64 * scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-12).then_some((s, overlap))
                })
                .collect()
        })
        .collect()
}

/// Resize `src` to `width` x `height` by area averaging: every output pixel is
/// the mean of the source region it covers, each source pixel weighted by how
/// much of it falls inside.
///
/// Both target dimensions must be non-zero.
pub fn area_downsample(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    debug_assert!(width > 0 && height > 0, "area_downsample target must be non-empty");
    let (src_w, src_h) = src.dimensions();
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }

    let columns = axis_spans(src_w, width);
    let rows = axis_spans(src_h, height);

    let mut out = RgbImage::new(width, height);
    for (y, row_span) in rows.iter().enumerate() {
        for (x, col_span) in columns.iter().enumerate() {
            let mut acc = [0f64; 3];
            let mut total = 0f64;
            for &(sy, wy) in row_span {
                for &(sx, wx) in col_span {
                    let weight = wx * wy;
                    let px = src.get_pixel(sx, sy);
                    for (channel, sum) in acc.iter_mut().enumerate() {
                        *sum += f64::from(px[channel]) * weight;
                    }
                    total += weight;
                }
            }
            let mean = |sum: f64| (sum / total).round().clamp(0.0, 255.0) as u8;
            out.put_pixel(x as u32, y as u32, Rgb([mean(acc[0]), mean(acc[1]), mean(acc[2])]));
        }
    }
    out
}
