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
use std::fs::create_dir_all;
use std::path::PathBuf;
use anyhow::Result;
use gdal::DriverManager;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, LayerAccess};
use gdal::LayerOptions;
use gdal_sys::{OGRFieldType, OGRwkbGeometryType};
use uuid::Uuid;

/// UTM zone 11N, units are meters
pub const TEST_EPSG: u32 = 26911;

pub fn get_temp_filename(file_name: &str) -> PathBuf {
    [std::env::temp_dir(), PathBuf::from(Uuid::new_v4().to_string()), PathBuf::from(file_name)].iter().collect()
}

pub struct TestPolygon {
    pub id: String,
    /// None leaves the field unset
    pub value: Option<String>,
    pub wkt: String,
}

impl TestPolygon {
    pub fn new(id: &str, value: &str, wkt: &str) -> Self {
        TestPolygon {
            id: id.to_string(),
            value: Some(value.to_string()),
            wkt: wkt.to_string(),
        }
    }

    /// Axis aligned square, lower left corner at x,y
    pub fn square(id: &str, value: &str, x: f64, y: f64, side: f64) -> Self {
        Self::rectangle(id, value, x, y, side, side)
    }

    pub fn rectangle(id: &str, value: &str, x: f64, y: f64, width: f64, height: f64) -> Self {
        let wkt = format!("POLYGON (({x1} {y1},{x2} {y1},{x2} {y2},{x1} {y2},{x1} {y1}))",
                          x1 = x, y1 = y, x2 = x + width, y2 = y + height);
        Self::new(id, value, &wkt)
    }

    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }
}

/// Writes a polygon shapefile in a new temp directory with fields ID and `value_field`
pub fn create_test_polygons(file_name: &str, value_field: &str, polygons: &[TestPolygon]) -> Result<PathBuf> {
    create_test_polygons_with_epsg(file_name, value_field, polygons, TEST_EPSG)
}

pub fn create_test_polygons_with_epsg(file_name: &str, value_field: &str, polygons: &[TestPolygon], epsg: u32) -> Result<PathBuf> {
    create_test_polygons_with_srs(file_name, value_field, polygons, Some(epsg))
}

/// With `epsg` None the shapefile has no .prj
pub fn create_test_polygons_with_srs(file_name: &str, value_field: &str, polygons: &[TestPolygon], epsg: Option<u32>) -> Result<PathBuf> {
    let path = get_temp_filename(file_name);
    create_dir_all(path.parent().unwrap())?;

    let layer_name = path.file_stem().unwrap().to_string_lossy().into_owned();

    let driver = DriverManager::get_driver_by_name("ESRI Shapefile")?;
    let mut dataset = driver.create_vector_only(&path)?;
    let srs = epsg.map(SpatialRef::from_epsg).transpose()?;

    let mut layer = dataset.create_layer(LayerOptions {
        name: &layer_name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPolygon,
        ..Default::default()
    })?;

    layer.create_defn_fields(&[
        ("ID", OGRFieldType::OFTString),
        (value_field, OGRFieldType::OFTString),
    ])?;

    for p in polygons.iter() {
        let geometry = Geometry::from_wkt(&p.wkt)?;
        let id = FieldValue::StringValue(p.id.clone());

        match &p.value {
            Some(v) => layer.create_feature_fields(
                geometry,
                &["ID", value_field],
                &[id, FieldValue::StringValue(v.clone())],
            )?,
            None => layer.create_feature_fields(geometry, &["ID"], &[id])?,
        }
    }

    Ok(path)
}
