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
use anyhow::{Context, Result};
use gdal::DriverManager;
use gdal::raster::rasterize;
use gdal::vector::Geometry;
use geo::Rect;
use crate::raster::GridSpec;
use crate::vector::{LabelledGeometry, extents_intersect};

pub const MEM_DRIVER: &str = "MEM";

/// Geometries to burn into one band, each with its burn value.
///
/// 0 is never a burn value, it marks cells touched by no geometry.
pub struct BurnLayer {
    geometries: Vec<Geometry>,
    burn_values: Vec<f64>,
    extents: Vec<Rect<f64>>,
}

impl BurnLayer {
    /// Takes the geometries, burning `burn_id(label)` for each
    pub fn new<F>(labelled: Vec<LabelledGeometry>, mut burn_id: F) -> Self
    where F: FnMut(&str) -> u32
    {
        let mut geometries = Vec::with_capacity(labelled.len());
        let mut burn_values = Vec::with_capacity(labelled.len());
        let mut extents = Vec::with_capacity(labelled.len());

        for lg in labelled.into_iter() {
            let id = burn_id(&lg.label);
            assert!(id > 0, "0 is reserved for no data");
            burn_values.push(id as f64);
            extents.push(lg.extent);
            geometries.push(lg.geometry);
        }

        BurnLayer {
            geometries,
            burn_values,
            extents,
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// True if at least one geometry envelope touches the extent
    pub fn touches(&self, extent: &Rect<f64>) -> bool {
        self.extents.iter().any(|e| extents_intersect(e, extent))
    }

    /// Indexes of the geometries whose envelope touches the extent, in burn order
    pub fn touching(&self, extent: &Rect<f64>) -> Vec<usize> {
        self.extents.iter().enumerate()
            .filter(|(_, e)| extents_intersect(e, extent))
            .map(|(i, _)| i)
            .collect()
    }

    fn rasterize_into(&self, ds: &mut gdal::Dataset, band_idx: isize, selected: &[usize]) -> gdal::errors::Result<()> {
        if selected.len() == self.geometries.len() {
            return rasterize(ds, &[band_idx], &self.geometries, &self.burn_values, None);
        }

        let geometries: Vec<Geometry> = selected.iter().map(|i| self.geometries[*i].clone()).collect();
        let burn_values: Vec<f64> = selected.iter().map(|i| self.burn_values[*i]).collect();

        rasterize(ds, &[band_idx], &geometries, &burn_values, None)
    }
}

/// Burns each layer into its own UInt32 band of an in memory raster covering the window.
///
/// Returns the cell values per layer, row major, window_size in (col, row) order.
/// A cell gets a value when its center is inside the geometry; later geometries overwrite earlier ones.
/// Only geometries whose envelope touches the window are handed to GDAL.
pub fn rasterize_window(
    grid: &GridSpec,
    window_offset: (usize, usize),
    window_size: (usize, usize),
    layers: &[&BurnLayer],
) -> Result<Vec<Vec<u32>>>
{
    let num_cells = window_size.0 * window_size.1;
    let window_extent = grid.window_extent(window_offset, window_size);

    let touching: Vec<Vec<usize>> = layers.iter().map(|l| l.touching(&window_extent)).collect();

    if touching.iter().all(|t| t.is_empty()) {
        return Ok(layers.iter().map(|_| vec![0; num_cells]).collect());
    }

    let drv = DriverManager::get_driver_by_name(MEM_DRIVER)?;

    let mut ds = drv.create_with_band_type::<u32, _>(
        "",
        window_size.0 as isize,
        window_size.1 as isize,
        layers.len() as isize,
    ).context("Creating in memory raster")?;

    ds.set_geo_transform(&grid.window_geo_transform(window_offset))?;

    let mut r = Vec::with_capacity(layers.len());

    for (layer_idx, layer) in layers.iter().enumerate() {
        let band_idx = layer_idx as isize + 1;

        if !touching[layer_idx].is_empty() {
            layer.rasterize_into(&mut ds, band_idx, &touching[layer_idx])
                .with_context(|| format!("Rasterizing band {} at window offset {:?}", band_idx, window_offset))?;
        }

        let buffer = ds.rasterband(band_idx)?.read_band_as::<u32>()?;
        r.push(buffer.data);
    }

    Ok(r)
}
