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
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use anyhow::{Context, Result, bail};
use gdal::Dataset;
use gdal::vector::{Layer, LayerAccess};

/// Keeps only the features where `field` equals `value`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AttributeFilter {
    pub field: String,
    pub value: String,
}

impl AttributeFilter {
    pub fn new(field: &str, value: &str) -> Self {
        AttributeFilter {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// OGR SQL where clause, ie "Own_Type" = 'FED'
    pub fn to_sql(&self) -> String {
        format!("\"{}\" = '{}'",
                self.field.replace('"', "\"\""),
                self.value.replace('\'', "''"))
    }
}

impl fmt::Display for AttributeFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputOgrLayer {
    //ogr layer name, if empty the dataset must have exactly 1 layer (like shapefiles)
    #[serde(default)]
    pub layer_name: String,

    pub ogr_conn_str: String,

    #[serde(default)]
    pub filter: Option<AttributeFilter>,
}

impl InputOgrLayer {
    pub fn new(ogr_conn_str: &str) -> Self {
        InputOgrLayer {
            ogr_conn_str: ogr_conn_str.to_string(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Relative connection strings are taken relative to `workspace`
    pub fn resolve(&self, workspace: &Path) -> Self {
        let conn_path = Path::new(&self.ogr_conn_str);
        let ogr_conn_str = if conn_path.is_relative() {
            workspace.join(conn_path).to_string_lossy().into_owned()
        } else {
            self.ogr_conn_str.clone()
        };

        InputOgrLayer {
            ogr_conn_str,
            ..self.clone()
        }
    }

    pub fn open_dataset(&self) -> Result<Dataset> {
        Dataset::open(&self.ogr_conn_str)
            .with_context(|| format!("Unable to open dataset {}", &self.ogr_conn_str))
    }

    /// Opens the layer, without applying the filter
    pub fn layer<'a>(&self, dataset: &'a Dataset) -> Result<Layer<'a>> {
        if !self.layer_name.is_empty() {
            return dataset.layer_by_name(&self.layer_name)
                .with_context(|| format!("No layer {} in dataset {}", &self.layer_name, &self.ogr_conn_str));
        }

        let layer_count = dataset.layer_count();

        if layer_count != 1 {
            bail!("No layer name and layer count is {} for dataset {}.  Must be 1 to know layer name", layer_count, &self.ogr_conn_str);
        }

        Ok(dataset.layer(0)?)
    }

    /// Opens the layer and applies the attribute filter, if any
    pub fn filtered_layer<'a>(&self, dataset: &'a Dataset) -> Result<Layer<'a>> {
        let mut layer = self.layer(dataset)?;

        if let Some(filter) = self.filter.as_ref() {
            ensure_field(&layer, &filter.field)
                .with_context(|| format!("Cannot filter {}", &self.ogr_conn_str))?;

            layer.set_attribute_filter(&filter.to_sql())
                .with_context(|| format!("Filter {} rejected for {}", filter, &self.ogr_conn_str))?;
        }

        Ok(layer)
    }
}

/// Fails if the layer has no attribute named `field`
pub fn ensure_field(layer: &Layer, field: &str) -> Result<()> {
    let field_names: Vec<String> = layer.defn().fields().map(|f| f.name()).collect();

    if !field_names.iter().any(|n| n == field) {
        bail!("Field {:?} not found in layer {}, available fields: {:?}", field, layer.name(), field_names);
    }

    Ok(())
}

impl fmt::Display for InputOgrLayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Layer: {:?} ogr conn: {}",
               self.layer_name,
               self.ogr_conn_str
        )?;

        if let Some(filter) = self.filter.as_ref() {
            write!(f, " where {}", filter)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod input_ogr_layers_tests {
    use super::*;
    use crate::vector::{create_test_polygons, TestPolygon};

    #[test]
    fn test_filter_sql() {
        let filter = AttributeFilter::new("Own_Type", "FED");
        assert_eq!(filter.to_sql(), "\"Own_Type\" = 'FED'");

        let filter = AttributeFilter::new("Name", "O'Brien");
        assert_eq!(filter.to_sql(), "\"Name\" = 'O''Brien'");
    }

    #[test]
    fn test_resolve() {
        let input = InputOgrLayer::new("raw-data/states.shp");
        let resolved = input.resolve(Path::new("/data"));
        assert_eq!(Path::new(&resolved.ogr_conn_str), Path::new("/data/raw-data/states.shp"));

        let input = InputOgrLayer::new("/abs/states.shp");
        assert_eq!(input.resolve(Path::new("/data")).ogr_conn_str, "/abs/states.shp");
    }

    #[test]
    fn test_filtered_layer() {
        let path = create_test_polygons("parcels.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 0., 0., 10.),
            TestPolygon::square("2", "STAT", 20., 0., 10.),
            TestPolygon::square("3", "FED", 40., 0., 10.),
        ]).unwrap();

        let input = InputOgrLayer::new(path.to_str().unwrap())
            .with_filter(AttributeFilter::new("Own_Type", "FED"));

        let dataset = input.open_dataset().unwrap();
        let layer = input.filtered_layer(&dataset).unwrap();

        assert_eq!(layer.feature_count(), 2);
    }

    #[test]
    fn test_missing_field() {
        let path = create_test_polygons("parcels.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 0., 0., 10.),
        ]).unwrap();

        let input = InputOgrLayer::new(path.to_str().unwrap())
            .with_filter(AttributeFilter::new("Owner", "FED"));

        let dataset = input.open_dataset().unwrap();

        assert!(input.filtered_layer(&dataset).is_err());
    }

    #[test]
    fn test_missing_dataset() {
        let input = InputOgrLayer::new("/does/not/exist.shp");
        assert!(input.open_dataset().is_err());
    }
}
