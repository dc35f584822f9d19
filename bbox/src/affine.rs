use crate::{common::*, HW};

/// 2x3 affine transform acting on `[x, y]` pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    rows: [[f64; 3]; 2],
}

/// The parameters of a box-to-patch crop.
///
/// The box of size `src_size` centered at `center` is scaled by `scale`,
/// rotated by `rotation` degrees and fitted onto a patch of size `dst_size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchSpec {
    pub center: [f64; 2],
    pub src_size: HW<f64>,
    pub dst_size: HW<f64>,
    pub scale: f64,
    pub rotation: f64,
}

impl Affine {
    pub fn identity() -> Self {
        Self {
            rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> [[f64; 3]; 2] {
        self.rows
    }

    /// Solves the unique transform that takes the three source points to
    /// the three destination points.
    pub fn from_points(src: [[f64; 2]; 3], dst: [[f64; 2]; 3]) -> Result<Self> {
        let [[x0, y0], [x1, y1], [x2, y2]] = src;
        let (dx1, dy1) = (x1 - x0, y1 - y0);
        let (dx2, dy2) = (x2 - x0, y2 - y0);
        let det = dx1 * dy2 - dx2 * dy1;
        ensure!(
            det.abs() > f64::EPSILON,
            "source points {:?} are collinear",
            src
        );

        let solve = |axis: usize| {
            let u0 = dst[0][axis];
            let du1 = dst[1][axis] - u0;
            let du2 = dst[2][axis] - u0;
            let a = (du1 * dy2 - du2 * dy1) / det;
            let b = (dx1 * du2 - dx2 * du1) / det;
            [a, b, u0 - a * x0 - b * y0]
        };

        Ok(Self {
            rows: [solve(0), solve(1)],
        })
    }

    /// Builds the box-to-patch transform, or the patch-to-box transform if
    /// `inverse` is set.
    ///
    /// The box center, the point half a box height below it and the point
    /// half a box width right of it are matched with the corresponding patch
    /// points. Both box offsets are rotated by the rotation angle.
    pub fn from_patch(spec: &PatchSpec, inverse: bool) -> Result<Self> {
        let PatchSpec {
            center: [cx, cy],
            ref src_size,
            ref dst_size,
            scale,
            rotation,
        } = *spec;

        let src_w = src_size.w() * scale;
        let src_h = src_size.h() * scale;
        let radians = rotation.to_radians();
        let [down_x, down_y] = rotate([0.0, src_h * 0.5], radians);
        let [right_x, right_y] = rotate([src_w * 0.5, 0.0], radians);

        let src = [
            [cx, cy],
            [cx + down_x, cy + down_y],
            [cx + right_x, cy + right_y],
        ];

        let dst_w = dst_size.w();
        let dst_h = dst_size.h();
        let dst = [
            [dst_w * 0.5, dst_h * 0.5],
            [dst_w * 0.5, dst_h],
            [dst_w, dst_h * 0.5],
        ];

        if inverse {
            Self::from_points(dst, src)
        } else {
            Self::from_points(src, dst)
        }
    }

    pub fn determinant(&self) -> f64 {
        let [[a, b, _], [d, e, _]] = self.rows;
        a * e - b * d
    }

    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        ensure!(det.abs() > f64::EPSILON, "the transform is not invertible");

        let [[a, b, c], [d, e, f]] = self.rows;
        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;

        Ok(Self {
            rows: [
                [ia, ib, -(ia * c + ib * f)],
                [id, ie, -(id * c + ie * f)],
            ],
        })
    }

    /// Maps a point through the transform in homogeneous coordinates.
    pub fn apply(&self, [x, y]: [f64; 2]) -> [f64; 2] {
        let [[a, b, c], [d, e, f]] = self.rows;
        [a * x + b * y + c, d * x + e * y + f]
    }

    pub fn to_homogeneous(&self) -> [[f64; 3]; 3] {
        let [row0, row1] = self.rows;
        [row0, row1, [0.0, 0.0, 1.0]]
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

/// Composition. `&lhs * &rhs` applies `rhs` first.
impl Mul<&Affine> for &Affine {
    type Output = Affine;

    fn mul(self, rhs: &Affine) -> Self::Output {
        let lhs = self.to_homogeneous();
        let rhs = rhs.to_homogeneous();
        let entry =
            |row: usize, col: usize| -> f64 { (0..3).map(|k| lhs[row][k] * rhs[k][col]).sum() };

        Affine {
            rows: [
                [entry(0, 0), entry(0, 1), entry(0, 2)],
                [entry(1, 0), entry(1, 1), entry(1, 2)],
            ],
        }
    }
}

fn rotate([x, y]: [f64; 2], radians: f64) -> [f64; 2] {
    let (sin, cos) = radians.sin_cos();
    [x * cos - y * sin, x * sin + y * cos]
}
