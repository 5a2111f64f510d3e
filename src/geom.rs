//! Flat-coordinate geometries with an explicit axis layout.
//!
//! X is longitude and Y latitude. Z and M, when present, sit at the indices
//! reported by [`Layout::z_index`] and [`Layout::m_index`].

use geojson::Value;

use crate::error::{GpxError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    #[default]
    NoLayout,
    XY,
    XYZ,
    XYM,
    XYZM,
    /// More than four axes: Z at 2, M at 3, the rest unnamed.
    Extended(usize),
}

impl Layout {
    pub fn stride(self) -> usize {
        match self {
            Self::NoLayout => 0,
            Self::XY => 2,
            Self::XYZ | Self::XYM => 3,
            Self::XYZM => 4,
            Self::Extended(n) => n.max(4),
        }
    }

    pub fn z_index(self) -> Option<usize> {
        match self {
            Self::NoLayout | Self::XY | Self::XYM => None,
            Self::XYZ | Self::XYZM | Self::Extended(_) => Some(2),
        }
    }

    pub fn m_index(self) -> Option<usize> {
        match self {
            Self::NoLayout | Self::XY | Self::XYZ => None,
            Self::XYM => Some(2),
            Self::XYZM | Self::Extended(_) => Some(3),
        }
    }
}

fn check_stride(layout: Layout, flat_coords: &[f64]) -> Result<()> {
    let stride = layout.stride();
    let fits = if stride == 0 {
        flat_coords.is_empty()
    } else {
        flat_coords.len() % stride == 0
    };
    if fits {
        Ok(())
    } else {
        Err(GpxError::StrideMismatch {
            len: flat_coords.len(),
            stride,
        })
    }
}

fn chunks(layout: Layout, flat_coords: &[f64]) -> impl Iterator<Item = &[f64]> {
    flat_coords.chunks(layout.stride().max(1))
}

/// Keep X, Y and (when the layout has one) Z: GeoJSON positions carry no M.
fn position(layout: Layout, coord: &[f64]) -> Vec<f64> {
    let mut position = coord.iter().take(2).copied().collect::<Vec<_>>();
    if let Some(z) = layout.z_index().and_then(|i| coord.get(i)) {
        position.push(*z);
    }
    position
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    layout: Layout,
    flat_coords: Vec<f64>,
}

impl Point {
    pub fn new(layout: Layout, flat_coords: Vec<f64>) -> Result<Self> {
        if flat_coords.len() != layout.stride() {
            return Err(GpxError::StrideMismatch {
                len: flat_coords.len(),
                stride: layout.stride(),
            });
        }
        Ok(Self::from_parts(layout, flat_coords))
    }

    pub(crate) fn from_parts(layout: Layout, flat_coords: Vec<f64>) -> Self {
        Self {
            layout,
            flat_coords,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn flat_coords(&self) -> &[f64] {
        &self.flat_coords
    }

    pub fn to_geojson(&self) -> Value {
        Value::Point(position(self.layout, &self.flat_coords))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineString {
    layout: Layout,
    flat_coords: Vec<f64>,
}

impl LineString {
    pub fn new(layout: Layout, flat_coords: Vec<f64>) -> Result<Self> {
        check_stride(layout, &flat_coords)?;
        Ok(Self::from_parts(layout, flat_coords))
    }

    pub(crate) fn from_parts(layout: Layout, flat_coords: Vec<f64>) -> Self {
        Self {
            layout,
            flat_coords,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn flat_coords(&self) -> &[f64] {
        &self.flat_coords
    }

    pub fn num_coords(&self) -> usize {
        match self.layout.stride() {
            0 => 0,
            stride => self.flat_coords.len() / stride,
        }
    }

    /// Coordinate tuples in order.
    pub fn coords(&self) -> impl Iterator<Item = &[f64]> {
        chunks(self.layout, &self.flat_coords)
    }

    pub fn to_geojson(&self) -> Value {
        Value::LineString(self.coords().map(|c| position(self.layout, c)).collect())
    }
}

/// Several line strings sharing one flat coordinate buffer; `ends[i]` is the
/// exclusive end offset of line `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiLineString {
    layout: Layout,
    flat_coords: Vec<f64>,
    ends: Vec<usize>,
}

impl MultiLineString {
    pub fn new(layout: Layout, flat_coords: Vec<f64>, ends: Vec<usize>) -> Result<Self> {
        check_stride(layout, &flat_coords)?;
        let stride = layout.stride().max(1);
        let ascending = ends.windows(2).all(|w| w[0] <= w[1]);
        let aligned = ends.iter().all(|end| end % stride == 0);
        let within = ends
            .last()
            .map_or(flat_coords.is_empty(), |&end| end == flat_coords.len());
        if !(ascending && aligned && within) {
            return Err(GpxError::InvalidEnds {
                ends,
                len: flat_coords.len(),
                stride: layout.stride(),
            });
        }
        Ok(Self::from_parts(layout, flat_coords, ends))
    }

    pub(crate) fn from_parts(layout: Layout, flat_coords: Vec<f64>, ends: Vec<usize>) -> Self {
        Self {
            layout,
            flat_coords,
            ends,
        }
    }

    /// Build from separate lines, which must all share `layout`.
    pub fn from_line_strings(layout: Layout, lines: &[LineString]) -> Result<Self> {
        let mut flat_coords = Vec::new();
        let mut ends = Vec::with_capacity(lines.len());
        for line in lines {
            check_stride(layout, line.flat_coords())?;
            flat_coords.extend_from_slice(line.flat_coords());
            ends.push(flat_coords.len());
        }
        Self::new(layout, flat_coords, ends)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn flat_coords(&self) -> &[f64] {
        &self.flat_coords
    }

    pub fn ends(&self) -> &[usize] {
        &self.ends
    }

    pub fn num_line_strings(&self) -> usize {
        self.ends.len()
    }

    /// The flat coordinates of each component line, in order.
    pub fn line_coords(&self) -> impl Iterator<Item = &[f64]> {
        let starts = std::iter::once(0).chain(self.ends.iter().copied());
        starts
            .zip(self.ends.iter().copied())
            .map(move |(start, end)| &self.flat_coords[start..end])
    }

    pub fn to_geojson(&self) -> Value {
        Value::MultiLineString(
            self.line_coords()
                .map(|line| {
                    chunks(self.layout, line)
                        .map(|c| position(self.layout, c))
                        .collect()
                })
                .collect(),
        )
    }
}
