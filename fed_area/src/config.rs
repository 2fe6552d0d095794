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
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, bail};
use log::warn;
use serde::{Deserialize, Serialize};
use geo_util::io::{AttributeFilter, InputOgrLayer};
use crate::area_table::TableLayout;

/// Everything the analysis needs.  Missing keys take the values of the PAD-US 3.0 federal fee analysis.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AnalysisConfig {
    /// Relative dataset and output paths are resolved against this directory
    pub workspace: PathBuf,

    /// PAD-US fee parcels, the filter keeps the federally owned ones
    pub parcels: InputOgrLayer,
    pub view_name: String,

    /// State boundaries
    pub zones: InputOgrLayer,
    pub zone_field: String,
    pub class_field: String,

    pub out_table: PathBuf,
    pub layout: TableLayout,

    //processing cell size, 30 m in the original analysis
    pub cell_size: f64,
    pub tile_size: usize,
    pub include_empty_zones: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            workspace: PathBuf::from("."),
            parcels: InputOgrLayer::new("raw-data/shapefile/PADUS3_0Fee.shp")
                .with_filter(AttributeFilter::new("Own_Type", "FED")),
            view_name: "padus_fed_fee".to_string(),
            zones: InputOgrLayer::new("raw-data/shapefile/US_state_2020.shp"),
            zone_field: "NAME".to_string(),
            class_field: "Own_Type".to_string(),
            out_table: PathBuf::from("derived-data/padus3_fed_area_by_state.dbf"),
            layout: TableLayout::Long,
            cell_size: 30.0,
            tile_size: 4096,
            include_empty_zones: true,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_to_string(path)
            .with_context(|| format!("Unable to read config {:?}", path))?;

        toml::from_str(&text)
            .with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.workspace.is_dir() {
            bail!("Workspace {:?} is not a directory", &self.workspace);
        }

        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            bail!("Cell size must be > 0, got {}", self.cell_size);
        }

        if self.tile_size == 0 {
            bail!("Tile size must be > 0");
        }

        for (key, value) in [
            ("view_name", &self.view_name),
            ("zone_field", &self.zone_field),
            ("class_field", &self.class_field),
            ("parcels.ogr_conn_str", &self.parcels.ogr_conn_str),
            ("zones.ogr_conn_str", &self.zones.ogr_conn_str),
        ].iter() {
            if value.trim().is_empty() {
                bail!("{} must not be empty", key);
            }
        }

        match self.parcels.filter.as_ref() {
            Some(filter) => {
                if filter.field.trim().is_empty() || filter.value.is_empty() {
                    bail!("parcels.filter needs a field and a value, got {}", filter);
                }
            }
            None => warn!("No filter on {}, every parcel is tabulated", &self.parcels),
        }

        Ok(())
    }

    /// Joins relative paths to the workspace
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.workspace.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn parcels_input(&self) -> InputOgrLayer {
        self.parcels.resolve(&self.workspace)
    }

    pub fn zones_input(&self) -> InputOgrLayer {
        self.zones.resolve(&self.workspace)
    }

    pub fn out_table_path(&self) -> PathBuf {
        self.resolve(&self.out_table)
    }
}
