use crate::{common::*, HW};

/// Axis-aligned box given by its top-left corner, width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XYWH<T> {
    x: T,
    y: T,
    w: T,
    h: T,
}

impl<T> XYWH<T> {
    pub fn try_cast<V>(self) -> Option<XYWH<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(XYWH {
            x: V::from(self.x)?,
            y: V::from(self.y)?,
            w: V::from(self.w)?,
            h: V::from(self.h)?,
        })
    }
}

impl<T> XYWH<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Builds a box from `[x, y, width, height]`. The size must be positive.
    pub fn try_from_xywh(xywh: [T; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        ensure!(
            w > T::zero() && h > T::zero(),
            "box width and height must be positive"
        );
        Ok(Self { x, y, w, h })
    }

    pub fn x(&self) -> T {
        self.x
    }

    pub fn y(&self) -> T {
        self.y
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn h(&self) -> T {
        self.h
    }

    /// The right boundary, exclusive.
    pub fn r(&self) -> T {
        self.x + self.w
    }

    /// The bottom boundary, exclusive.
    pub fn b(&self) -> T {
        self.y + self.h
    }

    pub fn cx(&self) -> T {
        let two = T::one() + T::one();
        self.x + self.w / two
    }

    pub fn cy(&self) -> T {
        let two = T::one() + T::one();
        self.y + self.h / two
    }

    pub fn xywh(&self) -> [T; 4] {
        [self.x, self.y, self.w, self.h]
    }

    pub fn size(&self) -> HW<T> {
        HW {
            h: self.h,
            w: self.w,
        }
    }

    pub fn area(&self) -> T {
        self.w * self.h
    }

    /// Checks if the point lies in the half-open box.
    pub fn contains_point(&self, [x, y]: [T; 2]) -> bool {
        x >= self.x && x < self.r() && y >= self.y && y < self.b()
    }

    /// Checks if the other box lies entirely in this box.
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x && other.y >= self.y && other.r() <= self.r() && other.b() <= self.b()
    }
}
