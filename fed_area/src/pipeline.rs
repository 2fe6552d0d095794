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
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use geo_util::util::format_duration;
use crate::config::AnalysisConfig;
use crate::engine::{Extension, ExtensionGuard, GeoEngine, TabulateAreaRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub out_table: PathBuf,
    pub num_class_features: u64,
    pub num_zones: usize,
    pub num_classes: usize,
    pub num_rows: usize,
    pub total_area: f64,
}

/// Filters the parcels, tabulates their area per zone and writes the table.
///
/// The Spatial extension is held only for the duration of the call, whatever the outcome.
pub fn run_analysis<E: GeoEngine>(config: &AnalysisConfig, engine: &mut E) -> Result<AnalysisSummary> {
    let now = Instant::now();

    config.validate()?;

    let mut engine = ExtensionGuard::acquire(engine, Extension::Spatial)?;

    let parcels = config.parcels_input();
    let view = engine.make_feature_layer(&parcels, &config.view_name)
        .with_context(|| format!("Making feature layer {}", &config.view_name))?;

    let num_class_features = engine.feature_count(&view)?;
    if num_class_features == 0 {
        warn!("Feature layer {} is empty", &view.name);
    }

    let zones = config.zones_input();
    let table = engine.tabulate_area(&TabulateAreaRequest {
        zones: &zones,
        zone_field: &config.zone_field,
        classes: &view,
        class_field: &config.class_field,
        cell_size: config.cell_size,
        tile_size: config.tile_size,
        include_empty_zones: config.include_empty_zones,
    }).with_context(|| format!("Tabulating area of {} by {}", &view.name, &config.zone_field))?;

    for row in table.rows.iter() {
        match table.zone_areas.get(&row.zone) {
            Some(zone_area) if *zone_area > 0.0 => {
                debug!("{} {}: {} ({:.2}% of zone)", row.zone, row.class, row.area, 100.0 * row.area / zone_area);
            }
            _ => debug!("{} {}: {}", row.zone, row.class, row.area),
        }
    }

    let out_table = config.out_table_path();
    table.write(&out_table, config.layout)?;

    let summary = AnalysisSummary {
        out_table,
        num_class_features,
        num_zones: table.zones().len(),
        num_classes: table.classes().len(),
        num_rows: table.rows.len(),
        total_area: table.total_area(),
    };

    info!("Wrote {} rows ({} zones, {} classes, total area {}) to {:?} in {}",
          summary.num_rows, summary.num_zones, summary.num_classes, summary.total_area,
          &summary.out_table, format_duration(now.elapsed()));

    Ok(summary)
}
