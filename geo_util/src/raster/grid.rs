/*
This file is part of the Building Aggregration Tool
Copyright (C) 2022 Novel-T

The Building Aggregration Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use core::fmt;
use anyhow::{Result, bail};
use geo::{Coord, Rect};

/// North up grid, square cells.  Row 0 is the top.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size: f64,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl GridSpec {
    /// Smallest grid covering the extent whose edges are multiples of cell_size
    pub fn snapped(extent: &Rect<f64>, cell_size: f64) -> Result<GridSpec> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            bail!("Cell size must be > 0, got {}", cell_size);
        }

        let left = (extent.min().x / cell_size).floor() * cell_size;
        let right = (extent.max().x / cell_size).ceil() * cell_size;
        let bottom = (extent.min().y / cell_size).floor() * cell_size;
        let top = (extent.max().y / cell_size).ceil() * cell_size;

        let num_cols = (((right - left) / cell_size).round() as usize).max(1);
        let num_rows = (((top - bottom) / cell_size).round() as usize).max(1);

        Ok(GridSpec {
            origin_x: left,
            origin_y: top,
            cell_size,
            num_rows,
            num_cols,
        })
    }

    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }

    pub fn num_cells(&self) -> usize {
        self.num_rows * self.num_cols
    }

    /// GDAL geo transform of a window, offset and size in (col, row) order
    pub fn window_geo_transform(&self, window_offset: (usize, usize)) -> [f64; 6] {
        [
            self.origin_x + window_offset.0 as f64 * self.cell_size,
            self.cell_size,
            0.0,
            self.origin_y - window_offset.1 as f64 * self.cell_size,
            0.0,
            -self.cell_size
        ]
    }

    pub fn window_extent(&self, window_offset: (usize, usize), window_size: (usize, usize)) -> Rect<f64> {
        let left = self.origin_x + window_offset.0 as f64 * self.cell_size;
        let top = self.origin_y - window_offset.1 as f64 * self.cell_size;

        Rect::new(
            Coord { x: left, y: top - window_size.1 as f64 * self.cell_size },
            Coord { x: left + window_size.0 as f64 * self.cell_size, y: top },
        )
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Origin X,Y: {}, {}  Cell size: {}  Rows: {} Cols: {}",
               self.origin_x,
               self.origin_y,
               self.cell_size,
               self.num_rows,
               self.num_cols
        )
    }
}
