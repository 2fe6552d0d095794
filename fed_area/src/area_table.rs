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
use std::collections::BTreeMap;
use std::fmt;
use std::fs::remove_file;
use std::path::Path;
use std::str::FromStr;
use anyhow::{Context, Result, bail};
use csv::WriterBuilder;
use gdal::DriverManager;
use gdal::vector::{Feature, LayerAccess};
use gdal::LayerOptions;
use gdal_sys::{OGRFieldType, OGRwkbGeometryType};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use geo_util::io::ensure_parent_dir;

pub const AREA_FIELD: &str = "AREA";
const DBF_DRIVER: &str = "ESRI Shapefile";

/// How the pairs are laid out in the output file
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TableLayout {
    /// zone, class, area; one row per pair
    Long,
    /// zone then one area column per class; one row per zone
    Wide,
}

impl Default for TableLayout {
    fn default() -> Self {
        TableLayout::Long
    }
}

impl FromStr for TableLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(TableLayout::Long),
            "wide" => Ok(TableLayout::Wide),
            _ => bail!("Unknown table layout {:?}, expected long or wide", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Dbf,
    Csv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "dbf" => Ok(TableFormat::Dbf),
            "csv" => Ok(TableFormat::Csv),
            _ => bail!("Unsupported output table {:?}, use a .dbf or .csv extension", path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaRow {
    pub zone: String,
    pub class: String,
    pub area: f64,
}

impl AreaRow {
    pub fn new(zone: &str, class: &str, area: f64) -> Self {
        AreaRow {
            zone: zone.to_string(),
            class: class.to_string(),
            area,
        }
    }
}

enum TableValue {
    Text(String),
    Area(f64),
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableValue::Text(s) => write!(f, "{}", s),
            TableValue::Area(a) => write!(f, "{}", a),
        }
    }
}

/// Area of each class within each zone
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTable {
    pub zone_field: String,
    pub class_field: String,
    /// Sorted by zone then class
    pub rows: Vec<AreaRow>,
    /// Rasterized area of each zone, the upper bound of any of its rows
    pub zone_areas: BTreeMap<String, f64>,
}

impl AreaTable {
    pub fn new(zone_field: &str, class_field: &str, rows: Vec<AreaRow>) -> Self {
        let rows = rows.into_iter()
            .sorted_by(|a, b| (&a.zone, &a.class).cmp(&(&b.zone, &b.class)))
            .collect();

        AreaTable {
            zone_field: zone_field.to_string(),
            class_field: class_field.to_string(),
            rows,
            zone_areas: BTreeMap::new(),
        }
    }

    pub fn with_zone_areas(mut self, zone_areas: BTreeMap<String, f64>) -> Self {
        self.zone_areas = zone_areas;
        self
    }

    pub fn zones(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.zone.as_str()).unique().collect()
    }

    pub fn classes(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.class.as_str()).unique().sorted().collect()
    }

    pub fn area(&self, zone: &str, class: &str) -> Option<f64> {
        self.rows.iter()
            .find(|r| r.zone == zone && r.class == class)
            .map(|r| r.area)
    }

    pub fn total_area(&self) -> f64 {
        self.rows.iter().map(|r| r.area).sum()
    }

    fn tabular(&self, layout: TableLayout) -> (Vec<String>, Vec<Vec<TableValue>>) {
        match layout {
            TableLayout::Long => {
                let header = vec![self.zone_field.clone(), self.class_field.clone(), AREA_FIELD.to_string()];
                let rows = self.rows.iter().map(|r| vec![
                    TableValue::Text(r.zone.clone()),
                    TableValue::Text(r.class.clone()),
                    TableValue::Area(r.area),
                ]).collect();

                (header, rows)
            }
            TableLayout::Wide => {
                let classes = self.classes();

                let mut header = vec![self.zone_field.clone()];
                header.extend(classes.iter().map(|c| c.to_string()));

                let rows = self.zones().into_iter().map(|zone| {
                    let mut row = vec![TableValue::Text(zone.to_string())];
                    row.extend(classes.iter().map(|c| TableValue::Area(self.area(zone, c).unwrap_or(0.))));
                    row
                }).collect();

                (header, rows)
            }
        }
    }

    /// Writes the table, replacing whatever is at `path`.  The extension picks the format.
    pub fn write(&self, path: &Path, layout: TableLayout) -> Result<()> {
        let format = TableFormat::from_path(path)?;

        ensure_parent_dir(path)?;

        if path.exists() {
            info!("Overwriting {:?}", path);
            remove_file(path).with_context(|| format!("Unable to remove {:?}", path))?;
        }

        let written = match format {
            TableFormat::Csv => self.write_csv(path, layout),
            TableFormat::Dbf => self.write_dbf(path, layout),
        };
        written.with_context(|| format!("Writing area table {:?}", path))?;

        debug!("Wrote {} rows to {:?}", self.rows.len(), path);

        Ok(())
    }

    fn write_csv(&self, path: &Path, layout: TableLayout) -> Result<()> {
        let (header, rows) = self.tabular(layout);

        let mut csv_writer = WriterBuilder::new().from_path(path)?;

        csv_writer.write_record(&header)?;

        for row in rows.iter() {
            csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
        }

        csv_writer.flush()?;

        Ok(())
    }

    /// Attribute only shapefile, ie just the .dbf
    fn write_dbf(&self, path: &Path, layout: TableLayout) -> Result<()> {
        let (header, rows) = self.tabular(layout);

        let layer_name = path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let driver = DriverManager::get_driver_by_name(DBF_DRIVER)?;
        let mut dataset = driver.create_vector_only(path)?;

        let layer = dataset.create_layer(LayerOptions {
            name: &layer_name,
            ty: OGRwkbGeometryType::wkbNone,
            ..Default::default()
        })?;

        let field_defs: Vec<(&str, OGRFieldType::Type)> = header.iter().enumerate()
            .map(|(idx, name)| {
                let is_text = match rows.first() {
                    Some(row) => matches!(row[idx], TableValue::Text(_)),
                    None => idx == 0 || (layout == TableLayout::Long && idx == 1),
                };
                (name.as_str(), if is_text { OGRFieldType::OFTString } else { OGRFieldType::OFTReal })
            })
            .collect();

        layer.create_defn_fields(&field_defs)?;

        //the driver shortens names to 10 characters and renames duplicates
        let stored_names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();

        if stored_names.len() != header.len() {
            bail!("Expected {} fields in {:?}, the driver created {}", header.len(), path, stored_names.len());
        }

        for (name, stored) in header.iter().zip(stored_names.iter()).filter(|(n, s)| n != s) {
            debug!("Field {} is stored as {}", name, stored);
        }

        for row in rows.iter() {
            let feature = Feature::new(layer.defn())?;

            for (name, value) in stored_names.iter().zip(row.iter()) {
                match value {
                    TableValue::Text(s) => feature.set_field_string(name, s)?,
                    TableValue::Area(a) => feature.set_field_double(name, *a)?,
                }
            }

            feature.create(&layer)?;
        }

        Ok(())
    }
}
