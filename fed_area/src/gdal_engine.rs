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
use std::collections::{HashMap, HashSet};
use anyhow::{Context, Result, anyhow, bail};
use gdal::DriverManager;
use gdal::vector::{Layer, LayerAccess};
use gdal::version::version_info;
use log::{debug, info, warn};
use geo_util::io::InputOgrLayer;
use geo_util::raster::MEM_DRIVER;
use geo_util::vector::read_labelled_geometries;
use crate::area_table::AreaTable;
use crate::engine::{Extension, FeatureLayer, GeoEngine, TabulateAreaRequest};
use crate::tabulate::{TabulateOptions, tabulate_labelled_geometries};

/// Drivers the Spatial extension needs: reading/writing shapefiles & dbf and in memory rasters
const SPATIAL_DRIVERS: [&str; 2] = [MEM_DRIVER, "ESRI Shapefile"];

/// GDAL/OGR backed session
#[derive(Default)]
pub struct GdalEngine {
    checked_out: HashSet<Extension>,
    views: HashMap<String, FeatureLayer>,
}

impl GdalEngine {
    pub fn new() -> Self {
        debug!("GDAL version: {}", version_info("--version"));

        Self::default()
    }

    fn require(&self, extension: Extension) -> Result<()> {
        if !self.checked_out.contains(&extension) {
            bail!("The {} extension is not checked out", extension);
        }

        Ok(())
    }
}

/// Both layers must share a coordinate system to be rasterized on the same grid
fn check_spatial_refs(zone_layer: &Layer, class_layer: &Layer) -> Result<()> {
    match (zone_layer.spatial_ref(), class_layer.spatial_ref()) {
        (Some(zone_srs), Some(class_srs)) => {
            if zone_srs != class_srs {
                bail!("Layers {} and {} have different coordinate systems ({} / {}), reproject one of them first",
                      zone_layer.name(), class_layer.name(),
                      zone_srs.name().unwrap_or_default(), class_srs.name().unwrap_or_default());
            }

            if zone_srs.is_geographic() {
                warn!("Layer {} has a geographic coordinate system, the cell size and areas are in degrees",
                      zone_layer.name());
            }
        }
        _ => {
            warn!("Layer {} or {} has no coordinate system, assuming they match",
                  zone_layer.name(), class_layer.name());
        }
    }

    Ok(())
}

impl GeoEngine for GdalEngine {
    fn check_out_extension(&mut self, extension: Extension) -> Result<()> {
        if self.checked_out.contains(&extension) {
            bail!("The {} extension is already checked out", extension);
        }

        match extension {
            Extension::Spatial => {
                for driver_name in SPATIAL_DRIVERS.iter() {
                    DriverManager::get_driver_by_name(driver_name)
                        .with_context(|| format!("The {} extension is unavailable, GDAL driver {} is missing", extension, driver_name))?;
                }
            }
        }

        self.checked_out.insert(extension);

        Ok(())
    }

    fn check_in_extension(&mut self, extension: Extension) -> Result<()> {
        if !self.checked_out.remove(&extension) {
            bail!("The {} extension was not checked out", extension);
        }

        Ok(())
    }

    fn make_feature_layer(&mut self, input: &InputOgrLayer, view_name: &str) -> Result<FeatureLayer> {
        //opening it here reports missing datasets and fields right away
        let dataset = input.open_dataset()?;
        let layer = input.filtered_layer(&dataset)?;

        info!("Feature layer {} over {}: {} features", view_name, input, layer.feature_count());

        let view = FeatureLayer {
            name: view_name.to_string(),
            source: input.clone(),
        };

        if self.views.insert(view_name.to_string(), view.clone()).is_some() {
            debug!("Replaced feature layer {}", view_name);
        }

        Ok(view)
    }

    fn feature_count(&self, view: &FeatureLayer) -> Result<u64> {
        let dataset = view.source.open_dataset()?;
        let layer = view.source.filtered_layer(&dataset)?;

        Ok(layer.feature_count())
    }

    fn tabulate_area(&mut self, request: &TabulateAreaRequest) -> Result<AreaTable> {
        self.require(Extension::Spatial)?;

        let view = self.views.get(&request.classes.name)
            .ok_or_else(|| anyhow!("No feature layer named {} in this session", &request.classes.name))?;

        let zone_dataset = request.zones.open_dataset()?;
        let mut zone_layer = request.zones.filtered_layer(&zone_dataset)?;

        let class_dataset = view.source.open_dataset()?;
        let mut class_layer = view.source.filtered_layer(&class_dataset)?;

        check_spatial_refs(&zone_layer, &class_layer)?;

        let zones = read_labelled_geometries(&mut zone_layer, request.zone_field)
            .with_context(|| format!("Reading zones from {}", request.zones))?;
        let classes = read_labelled_geometries(&mut class_layer, request.class_field)
            .with_context(|| format!("Reading classes from {}", &view.name))?;

        info!("Tabulating {} zone polygons against {} polygons of {} at cell size {}",
              zones.len(), classes.len(), &view.name, request.cell_size);

        tabulate_labelled_geometries(zones, request.zone_field, classes, request.class_field, &TabulateOptions {
            cell_size: request.cell_size,
            tile_size: request.tile_size,
            include_empty_zones: request.include_empty_zones,
        })
    }
}

#[cfg(test)]
mod gdal_engine_tests {
    use super::*;
    use std::collections::BTreeSet;
    use geo_util::io::AttributeFilter;
    use geo_util::vector::{TestPolygon, create_test_polygons, create_test_polygons_with_epsg, create_test_polygons_with_srs};
    use crate::area_table::AreaRow;

    fn states_input() -> InputOgrLayer {
        let path = create_test_polygons("US_state_2020.shp", "NAME", &[
            TestPolygon::square("1", "Idaho", 0., 0., 3000.),
            TestPolygon::square("2", "Nevada", 3000., 0., 3000.),
        ]).unwrap();

        InputOgrLayer::new(path.to_str().unwrap())
    }

    fn parcels_input() -> InputOgrLayer {
        let path = create_test_polygons("PADUS3_0Fee.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 300., 300., 300.),
            TestPolygon::square("2", "STAT", 3300., 300., 300.),
            TestPolygon::square("3", "FED", 900., 900., 300.),
            TestPolygon::rectangle("4", "FED", 1500., 300., 600., 300.),
            TestPolygon::square("5", "PVT", 4000., 1000., 600.),
        ]).unwrap();

        InputOgrLayer::new(path.to_str().unwrap())
            .with_filter(AttributeFilter::new("Own_Type", "FED"))
    }

    fn request<'a>(zones: &'a InputOgrLayer, view: &'a FeatureLayer) -> TabulateAreaRequest<'a> {
        TabulateAreaRequest {
            zones,
            zone_field: "NAME",
            classes: view,
            class_field: "Own_Type",
            cell_size: 30.,
            tile_size: 4096,
            include_empty_zones: true,
        }
    }

    #[test]
    fn test_check_out_twice() {
        let mut engine = GdalEngine::new();

        engine.check_out_extension(Extension::Spatial).unwrap();
        assert!(engine.check_out_extension(Extension::Spatial).is_err());

        engine.check_in_extension(Extension::Spatial).unwrap();
        assert!(engine.check_in_extension(Extension::Spatial).is_err());

        //available again
        engine.check_out_extension(Extension::Spatial).unwrap();
    }

    #[test]
    fn test_feature_layer_keeps_federal_rows() {
        let mut engine = GdalEngine::new();
        let parcels = parcels_input();

        let view = engine.make_feature_layer(&parcels, "padus_fed_fee").unwrap();
        assert_eq!(view.name, "padus_fed_fee");
        assert_eq!(engine.feature_count(&view).unwrap(), 3);

        let dataset = view.source.open_dataset().unwrap();
        let mut layer = view.source.filtered_layer(&dataset).unwrap();
        let ids: BTreeSet<String> = layer.features()
            .map(|f| f.field_as_string_by_name("ID").unwrap().unwrap())
            .collect();

        let expected: BTreeSet<String> = ["1", "3", "4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_feature_layer_bad_field() {
        let mut engine = GdalEngine::new();
        let mut parcels = parcels_input();
        parcels.filter = Some(AttributeFilter::new("Owner_Type", "FED"));

        assert!(engine.make_feature_layer(&parcels, "padus_fed_fee").is_err());
    }

    #[test]
    fn test_feature_layer_missing_dataset() {
        let mut engine = GdalEngine::new();
        let parcels = InputOgrLayer::new("/no/such/PADUS3_0Fee.shp");

        assert!(engine.make_feature_layer(&parcels, "padus_fed_fee").is_err());
    }

    #[test]
    fn test_tabulate_idaho_nevada() {
        let mut engine = GdalEngine::new();
        let zones = states_input();
        let view = engine.make_feature_layer(&parcels_input(), "padus_fed_fee").unwrap();

        engine.check_out_extension(Extension::Spatial).unwrap();
        let table = engine.tabulate_area(&request(&zones, &view)).unwrap();

        assert_eq!(table.zone_field, "NAME");
        assert_eq!(table.class_field, "Own_Type");
        assert_eq!(table.zones(), vec!["Idaho", "Nevada"]);
        assert_eq!(table.rows, vec![
            AreaRow::new("Idaho", "FED", 360000.),
            AreaRow::new("Nevada", "FED", 0.),
        ]);

        let without_empty = engine.tabulate_area(&TabulateAreaRequest {
            include_empty_zones: false,
            ..request(&zones, &view)
        }).unwrap();
        assert_eq!(without_empty.rows, vec![AreaRow::new("Idaho", "FED", 360000.)]);
    }

    #[test]
    fn test_tabulate_needs_extension() {
        let mut engine = GdalEngine::new();
        let zones = states_input();
        let view = engine.make_feature_layer(&parcels_input(), "padus_fed_fee").unwrap();

        assert!(engine.tabulate_area(&request(&zones, &view)).is_err());
    }

    #[test]
    fn test_tabulate_unknown_view() {
        let mut engine = GdalEngine::new();
        engine.check_out_extension(Extension::Spatial).unwrap();

        let zones = states_input();
        let view = FeatureLayer {
            name: "never_made".to_string(),
            source: parcels_input(),
        };

        assert!(engine.tabulate_area(&request(&zones, &view)).is_err());
    }

    #[test]
    fn test_tabulate_bad_zone_field() {
        let mut engine = GdalEngine::new();
        engine.check_out_extension(Extension::Spatial).unwrap();

        let zones = states_input();
        let view = engine.make_feature_layer(&parcels_input(), "padus_fed_fee").unwrap();

        assert!(engine.tabulate_area(&TabulateAreaRequest {
            zone_field: "STATE_NAME",
            ..request(&zones, &view)
        }).is_err());
    }

    #[test]
    fn test_tabulate_mismatched_coordinate_systems() {
        let mut engine = GdalEngine::new();
        engine.check_out_extension(Extension::Spatial).unwrap();

        let zones = states_input();

        //UTM 12N
        let path = create_test_polygons_with_epsg("parcels_12n.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 300., 300., 300.),
        ], 26912).unwrap();
        let parcels = InputOgrLayer::new(path.to_str().unwrap());

        let view = engine.make_feature_layer(&parcels, "padus_fed_fee").unwrap();

        assert!(engine.tabulate_area(&request(&zones, &view)).is_err());
    }

    fn check_inputs(zones: &InputOgrLayer, classes: &InputOgrLayer) -> Result<()> {
        let zone_dataset = zones.open_dataset()?;
        let class_dataset = classes.open_dataset()?;

        check_spatial_refs(&zones.layer(&zone_dataset)?, &classes.layer(&class_dataset)?)
    }

    #[test]
    fn test_check_spatial_refs() {
        let zones = states_input();
        let parcels = parcels_input();
        assert!(check_inputs(&zones, &parcels).is_ok());

        //no .prj, accepted with a warning
        let path = create_test_polygons_with_srs("parcels_no_srs.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 300., 300., 300.),
        ], None).unwrap();
        let no_srs = InputOgrLayer::new(path.to_str().unwrap());

        assert!(check_inputs(&zones, &no_srs).is_ok());
        assert!(check_inputs(&no_srs, &parcels).is_ok());

        let path = create_test_polygons_with_epsg("parcels_12n.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", 300., 300., 300.),
        ], 26912).unwrap();
        let utm_12n = InputOgrLayer::new(path.to_str().unwrap());

        assert!(check_inputs(&zones, &utm_12n).is_err());
    }

    #[test]
    fn test_tabulate_geographic_coordinates() {
        let mut engine = GdalEngine::new();
        engine.check_out_extension(Extension::Spatial).unwrap();

        let path = create_test_polygons_with_epsg("states_wgs84.shp", "NAME", &[
            TestPolygon::square("1", "Idaho", -117., 42., 1.),
        ], 4326).unwrap();
        let zones = InputOgrLayer::new(path.to_str().unwrap());

        let path = create_test_polygons_with_epsg("parcels_wgs84.shp", "Own_Type", &[
            TestPolygon::square("1", "FED", -116.5, 42.5, 0.25),
        ], 4326).unwrap();
        let parcels = InputOgrLayer::new(path.to_str().unwrap());

        assert!(check_inputs(&zones, &parcels).is_ok());

        let view = engine.make_feature_layer(&parcels, "padus_fed_fee").unwrap();

        //cell size in degrees
        let mut req = request(&zones, &view);
        req.cell_size = 0.05;

        let table = engine.tabulate_area(&req).unwrap();
        let area = table.area("Idaho", "FED").unwrap();

        assert!((area - 0.0625).abs() < 1e-9, "area {}", area);
    }
}
