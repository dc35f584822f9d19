use crate::common::*;

/// Height and width of an image or a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    pub(crate) h: T,
    pub(crate) w: T,
}

impl<T> HW<T> {
    pub fn try_cast<U>(self) -> Option<HW<U>>
    where
        T: ToPrimitive,
        U: NumCast,
    {
        Some(HW {
            h: U::from(self.h)?,
            w: U::from(self.w)?,
        })
    }
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        ensure!(
            h > T::zero() && w > T::zero(),
            "height and width must be positive"
        );
        Ok(Self { h, w })
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn hw(&self) -> [T; 2] {
        [self.h, self.w]
    }

    pub fn area(&self) -> T {
        self.h * self.w
    }
}

impl HW<usize> {
    /// Converts the size to floating point.
    pub fn to_f64(&self) -> HW<f64> {
        HW {
            h: self.h as f64,
            w: self.w as f64,
        }
    }
}
