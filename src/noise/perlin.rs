use crate::foundation::math::Rng64;

/// Seeded gradient noise (classic Perlin) in 2, 3 and 4 dimensions.
///
/// The permutation table is shuffled from the seed, so the same seed yields
/// bit-identical output. Output is roughly in `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct Perlin {
    perm: [u8; 512],
}

impl Perlin {
    pub fn new(seed: u64) -> Self {
        let mut table: [u8; 256] = [0; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        // Fisher-Yates driven by SplitMix64.
        let mut rng = Rng64::new(seed);
        for i in (1..256usize).rev() {
            let j = (rng.next_u64() % (i as u64 + 1)) as usize;
            table.swap(i, j);
        }
        let mut perm = [0u8; 512];
        for i in 0..512 {
            perm[i] = table[i & 255];
        }
        Self { perm }
    }

    fn p(&self, i: usize) -> usize {
        usize::from(self.perm[i & 511])
    }

    pub fn noise2(&self, x: f64, y: f64) -> f64 {
        self.noise3(x, y, 0.0)
    }

    pub fn noise3(&self, x: f64, y: f64, z: f64) -> f64 {
        let xi = x.floor() as i64;
        let yi = y.floor() as i64;
        let zi = z.floor() as i64;
        let xf = x - xi as f64;
        let yf = y - yi as f64;
        let zf = z - zi as f64;
        let xi = (xi & 255) as usize;
        let yi = (yi & 255) as usize;
        let zi = (zi & 255) as usize;

        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let a = self.p(xi) + yi;
        let aa = self.p(a) + zi;
        let ab = self.p(a + 1) + zi;
        let b = self.p(xi + 1) + yi;
        let ba = self.p(b) + zi;
        let bb = self.p(b + 1) + zi;

        let x1 = lerp(
            grad3(self.p(aa), xf, yf, zf),
            grad3(self.p(ba), xf - 1.0, yf, zf),
            u,
        );
        let x2 = lerp(
            grad3(self.p(ab), xf, yf - 1.0, zf),
            grad3(self.p(bb), xf - 1.0, yf - 1.0, zf),
            u,
        );
        let y1 = lerp(x1, x2, v);

        let x3 = lerp(
            grad3(self.p(aa + 1), xf, yf, zf - 1.0),
            grad3(self.p(ba + 1), xf - 1.0, yf, zf - 1.0),
            u,
        );
        let x4 = lerp(
            grad3(self.p(ab + 1), xf, yf - 1.0, zf - 1.0),
            grad3(self.p(bb + 1), xf - 1.0, yf - 1.0, zf - 1.0),
            u,
        );
        let y2 = lerp(x3, x4, v);

        lerp(y1, y2, w)
    }

    pub fn noise4(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let xi = x.floor() as i64;
        let yi = y.floor() as i64;
        let zi = z.floor() as i64;
        let wi = w.floor() as i64;
        let xf = x - xi as f64;
        let yf = y - yi as f64;
        let zf = z - zi as f64;
        let wf = w - wi as f64;
        let xi = (xi & 255) as usize;
        let yi = (yi & 255) as usize;
        let zi = (zi & 255) as usize;
        let wi = (wi & 255) as usize;

        let fu = fade(xf);
        let fv = fade(yf);
        let fw = fade(zf);
        let ft = fade(wf);

        // Hash each of the 16 hypercube corners, then quadrilinear blend.
        let corner = |dx: usize, dy: usize, dz: usize, dw: usize| -> f64 {
            let h = self.p(self.p(self.p(self.p(xi + dx) + yi + dy) + zi + dz) + wi + dw);
            grad4(
                h,
                xf - dx as f64,
                yf - dy as f64,
                zf - dz as f64,
                wf - dw as f64,
            )
        };

        let x00 = lerp(corner(0, 0, 0, 0), corner(1, 0, 0, 0), fu);
        let x10 = lerp(corner(0, 1, 0, 0), corner(1, 1, 0, 0), fu);
        let x01 = lerp(corner(0, 0, 1, 0), corner(1, 0, 1, 0), fu);
        let x11 = lerp(corner(0, 1, 1, 0), corner(1, 1, 1, 0), fu);
        let y0 = lerp(x00, x10, fv);
        let y1 = lerp(x01, x11, fv);
        let z0 = lerp(y0, y1, fw);

        let x00 = lerp(corner(0, 0, 0, 1), corner(1, 0, 0, 1), fu);
        let x10 = lerp(corner(0, 1, 0, 1), corner(1, 1, 0, 1), fu);
        let x01 = lerp(corner(0, 0, 1, 1), corner(1, 0, 1, 1), fu);
        let x11 = lerp(corner(0, 1, 1, 1), corner(1, 1, 1, 1), fu);
        let y0 = lerp(x00, x10, fv);
        let y1 = lerp(x01, x11, fv);
        let z1 = lerp(y0, y1, fw);

        lerp(z0, z1, ft)
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn grad3(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    // 12 edge directions of a cube, selected by the low hash bits.
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

fn grad4(hash: usize, x: f64, y: f64, z: f64, w: f64) -> f64 {
    // 32 directions: pick three of the four axes, sign each.
    let h = hash & 31;
    let (u, v, s) = match h >> 3 {
        0 => (x, y, z),
        1 => (y, z, w),
        2 => (z, w, x),
        _ => (w, x, y),
    };
    (if h & 1 == 0 { u } else { -u })
        + (if h & 2 == 0 { v } else { -v })
        + (if h & 4 == 0 { s } else { -s })
}
