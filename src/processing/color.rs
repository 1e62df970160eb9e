use image::DynamicImage;

use super::{for_each_pixel, from_unit, to_unit};

const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// Blends every pixel towards its sepia tone by `amount` (0..=1).
pub fn sepia(img: DynamicImage, amount: f32) -> DynamicImage {
    let amount = amount.clamp(0.0, 1.0);
    if amount < 0.001 {
        return img;
    }

    let mut rgba = img.to_rgba8();
    for_each_pixel(&mut rgba, |px| {
        let rgb = [to_unit(px[0]), to_unit(px[1]), to_unit(px[2])];
        for (c, row) in SEPIA_MATRIX.iter().enumerate() {
            let toned = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            px[c] = from_unit(rgb[c] + (toned.min(1.0) - rgb[c]) * amount);
        }
    });
    DynamicImage::ImageRgba8(rgba)
}

/// Rotates hue by `degrees` in HSL space.
pub fn hue_rotate(img: DynamicImage, degrees: f32) -> DynamicImage {
    let shift = wrap_unit(degrees / 360.0);
    if shift < 0.001 / 360.0 || shift > 1.0 - 0.001 / 360.0 {
        return img;
    }

    let mut rgba = img.to_rgba8();
    for_each_pixel(&mut rgba, |px| {
        let (h, s, l) = rgb_to_hsl(to_unit(px[0]), to_unit(px[1]), to_unit(px[2]));
        if s <= 1e-6 {
            // greys have no hue to rotate
            return;
        }
        let (r, g, b) = hsl_to_rgb(wrap_unit(h + shift), s, l);
        px[0] = from_unit(r);
        px[1] = from_unit(g);
        px[2] = from_unit(b);
    });
    DynamicImage::ImageRgba8(rgba)
}

fn wrap_unit(v: f32) -> f32 {
    let w = v.rem_euclid(1.0);
    if w >= 1.0 { 0.0 } else { w }
}

fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g.max(b));
    let min = r.min(g.min(b));
    let l = (max + min) * 0.5;
    let d = max - min;
    if d <= 1e-6 {
        return (0.0, 0.0, l);
    }
    let s = d / (1.0 - (2.0 * l - 1.0).abs());
    let h = if (max - r).abs() < f32::EPSILON {
        ((g - b) / d) % 6.0
    } else if (max - g).abs() < f32::EPSILON {
        ((b - r) / d) + 2.0
    } else {
        ((r - g) / d) + 4.0
    };
    (wrap_unit(h / 6.0), s.clamp(0.0, 1.0), l.clamp(0.0, 1.0))
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s <= 1e-6 {
        return (l, l, l);
    }
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = wrap_unit(t);
    let v = if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    };
    v.clamp(0.0, 1.0)
}
