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
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use anyhow::{Result, anyhow, bail};
use itertools::Itertools;
use log::{debug, warn};
use geo_util::raster::{BurnLayer, GridSpec, rasterize_window};
use geo_util::util::{RasterChunkIterator, format_duration, print_remaining_time};
use geo_util::vector::{LabelledGeometry, area_by_label, union_extent};
use crate::area_table::{AreaRow, AreaTable};

#[derive(Debug, Clone, Copy)]
pub struct TabulateOptions {
    pub cell_size: f64,
    pub tile_size: usize,
    pub include_empty_zones: bool,
}

fn label_ids(geometries: &[LabelledGeometry]) -> Vec<String> {
    geometries.iter().map(|g| g.label.clone()).unique().sorted().collect()
}

/// Counts, on a grid snapped to the cell size over the zones extent, the cells of each class within each zone.
///
/// A cell belongs to a polygon when its center does, so a cell covered by several polygons
/// of the same layer is counted once.
pub fn tabulate_labelled_geometries(
    zones: Vec<LabelledGeometry>,
    zone_field: &str,
    classes: Vec<LabelledGeometry>,
    class_field: &str,
    options: &TabulateOptions,
) -> Result<AreaTable>
{
    if options.tile_size == 0 {
        bail!("Tile size must be > 0");
    }

    let extent = union_extent(zones.iter().map(|z| &z.extent))
        .ok_or_else(|| anyhow!("No zone polygons to tabulate"))?;

    let grid = GridSpec::snapped(&extent, options.cell_size)?;
    debug!("Tabulation grid {}", grid);

    let polygon_areas = area_by_label(&zones);
    let zone_labels = label_ids(&zones);
    let class_labels = label_ids(&classes);

    if class_labels.is_empty() {
        warn!("No class polygons, the area table will be empty");
    }

    //ids are 1 based, 0 is no data
    let zone_ids: HashMap<&str, u32> = zone_labels.iter().enumerate()
        .map(|(idx, l)| (l.as_str(), idx as u32 + 1))
        .collect();
    let class_ids: HashMap<&str, u32> = class_labels.iter().enumerate()
        .map(|(idx, l)| (l.as_str(), idx as u32 + 1))
        .collect();

    let zone_layer = BurnLayer::new(zones, |l| zone_ids[l]);
    let class_layer = BurnLayer::new(classes, |l| class_ids[l]);

    debug!("Burning {} zone polygons and {} class polygons", zone_layer.len(), class_layer.len());

    let num_classes = class_labels.len();
    //zone major
    let mut pair_counts = vec![0u64; zone_labels.len() * num_classes];
    let mut zone_counts = vec![0u64; zone_labels.len()];

    let now = Instant::now();
    let mut last_output = Instant::now();

    for window in RasterChunkIterator::new(grid.num_rows, grid.num_cols, options.tile_size) {
        let window_extent = grid.window_extent(window.window_offset, window.window_size);

        if !zone_layer.touches(&window_extent) {
            continue;
        }

        let bands = rasterize_window(&grid, window.window_offset, window.window_size,
                                     &[&zone_layer, &class_layer])?;

        for (zone_id, class_id) in bands[0].iter().zip(bands[1].iter()) {
            if *zone_id == 0 {
                continue;
            }

            let zone_idx = *zone_id as usize - 1;
            zone_counts[zone_idx] += 1;

            if *class_id == 0 {
                continue;
            }

            pair_counts[zone_idx * num_classes + *class_id as usize - 1] += 1;
        }

        if last_output.elapsed().as_secs() >= 1 {
            last_output = Instant::now();
            print_remaining_time(&now, window.current_step as u32, window.num_steps as u32);
        }
    }

    debug!("Tabulated {} cells in {}", grid.num_cells(), format_duration(now.elapsed()));

    let cell_area = grid.cell_area();
    let mut rows = Vec::new();

    for (zone_idx, zone) in zone_labels.iter().enumerate() {
        for (class_idx, class) in class_labels.iter().enumerate() {
            let count = pair_counts[zone_idx * num_classes + class_idx];

            if count == 0 && !options.include_empty_zones {
                continue;
            }

            rows.push(AreaRow::new(zone, class, count as f64 * cell_area));
        }
    }

    let zone_areas: BTreeMap<String, f64> = zone_labels.iter().zip(zone_counts.iter())
        .map(|(zone, count)| (zone.clone(), *count as f64 * cell_area))
        .collect();

    for (zone, rasterized_area) in zone_areas.iter() {
        debug!("Zone {} rasterized area {} polygon area {}", zone, rasterized_area,
               polygon_areas.get(zone).copied().unwrap_or_default());
    }

    Ok(AreaTable::new(zone_field, class_field, rows).with_zone_areas(zone_areas))
}
