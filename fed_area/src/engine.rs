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
use std::fmt;
use std::ops::{Deref, DerefMut};
use anyhow::Result;
use log::{debug, error};
use geo_util::io::InputOgrLayer;
use crate::area_table::AreaTable;

/// Licensed capability of the engine, must be checked out before use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Spatial,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Extension::Spatial => write!(f, "Spatial"),
        }
    }
}

/// Named, attribute filtered view over a vector dataset, registered in the engine session
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    pub name: String,
    pub source: InputOgrLayer,
}

pub struct TabulateAreaRequest<'a> {
    pub zones: &'a InputOgrLayer,
    pub zone_field: &'a str,
    pub classes: &'a FeatureLayer,
    pub class_field: &'a str,
    pub cell_size: f64,
    //max width/height in cells of the rasters burned at once
    pub tile_size: usize,
    //report zones overlapping nothing with an area of 0
    pub include_empty_zones: bool,
}

/// The geoprocessing operations the analysis needs
pub trait GeoEngine {
    fn check_out_extension(&mut self, extension: Extension) -> Result<()>;

    fn check_in_extension(&mut self, extension: Extension) -> Result<()>;

    /// Registers a view named `view_name` with the features of `input` passing its filter
    fn make_feature_layer(&mut self, input: &InputOgrLayer, view_name: &str) -> Result<FeatureLayer>;

    fn feature_count(&self, view: &FeatureLayer) -> Result<u64>;

    /// Area of each class within each zone, after rasterizing both at the cell size
    fn tabulate_area(&mut self, request: &TabulateAreaRequest) -> Result<AreaTable>;
}

/// Holds an extension for as long as it lives, checking it back in when dropped
pub struct ExtensionGuard<'a, E: GeoEngine> {
    engine: &'a mut E,
    extension: Extension,
}

impl<'a, E: GeoEngine> ExtensionGuard<'a, E> {
    pub fn acquire(engine: &'a mut E, extension: Extension) -> Result<Self> {
        engine.check_out_extension(extension)?;
        debug!("Checked out extension {}", extension);

        Ok(ExtensionGuard {
            engine,
            extension,
        })
    }
}

impl<'a, E: GeoEngine> Deref for ExtensionGuard<'a, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<'a, E: GeoEngine> DerefMut for ExtensionGuard<'a, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

impl<'a, E: GeoEngine> Drop for ExtensionGuard<'a, E> {
    fn drop(&mut self) {
        match self.engine.check_in_extension(self.extension) {
            Ok(()) => debug!("Checked in extension {}", self.extension),
            Err(e) => error!("Unable to check in extension {}: {:#}", self.extension, e),
        }
    }
}

#[cfg(test)]
pub(crate) mod engine_tests {
    use super::*;
    use anyhow::bail;
    use crate::area_table::AreaRow;

    /// Records every call, optionally failing some of them
    #[derive(Default)]
    pub struct RecordingEngine {
        pub calls: Vec<String>,
        pub checked_out: bool,
        pub fail_check_out: bool,
        pub fail_check_in: bool,
        pub fail_tabulate: bool,
    }

    impl GeoEngine for RecordingEngine {
        fn check_out_extension(&mut self, extension: Extension) -> Result<()> {
            self.calls.push(format!("check_out {}", extension));
            if self.fail_check_out {
                bail!("No license for {}", extension);
            }
            self.checked_out = true;
            Ok(())
        }

        fn check_in_extension(&mut self, extension: Extension) -> Result<()> {
            self.calls.push(format!("check_in {}", extension));
            self.checked_out = false;
            if self.fail_check_in {
                bail!("Check in refused");
            }
            Ok(())
        }

        fn make_feature_layer(&mut self, input: &InputOgrLayer, view_name: &str) -> Result<FeatureLayer> {
            self.calls.push(format!("make_feature_layer {}", view_name));
            Ok(FeatureLayer {
                name: view_name.to_string(),
                source: input.clone(),
            })
        }

        fn feature_count(&self, _view: &FeatureLayer) -> Result<u64> {
            Ok(3)
        }

        fn tabulate_area(&mut self, request: &TabulateAreaRequest) -> Result<AreaTable> {
            self.calls.push(format!("tabulate_area {}", request.classes.name));
            if self.fail_tabulate {
                bail!("Coordinate systems differ");
            }
            Ok(AreaTable::new(request.zone_field, request.class_field, vec![
                AreaRow::new("Idaho", "FED", 2700.),
                AreaRow::new("Nevada", "FED", 0.),
            ]))
        }
    }

    #[test]
    fn test_guard_checks_in_on_drop() {
        let mut engine = RecordingEngine::default();

        {
            let guard = ExtensionGuard::acquire(&mut engine, Extension::Spatial).unwrap();
            assert!(guard.checked_out);
        }

        assert!(!engine.checked_out);
        assert_eq!(engine.calls, vec!["check_out Spatial", "check_in Spatial"]);
    }

    #[test]
    fn test_guard_check_in_after_error() {
        let mut engine = RecordingEngine {
            fail_tabulate: true,
            ..Default::default()
        };

        let run = |engine: &mut RecordingEngine| -> Result<AreaTable> {
            let mut guard = ExtensionGuard::acquire(engine, Extension::Spatial)?;
            let zones = InputOgrLayer::new("states.shp");
            let view = guard.make_feature_layer(&InputOgrLayer::new("parcels.shp"), "fed")?;
            let request = TabulateAreaRequest {
                zones: &zones,
                zone_field: "NAME",
                classes: &view,
                class_field: "Own_Type",
                cell_size: 30.,
                tile_size: 16,
                include_empty_zones: true,
            };
            guard.tabulate_area(&request)
        };

        assert!(run(&mut engine).is_err());
        assert_eq!(engine.calls.last().unwrap(), "check_in Spatial");
        assert!(!engine.checked_out);
    }

    #[test]
    fn test_failed_check_out_does_not_check_in() {
        let mut engine = RecordingEngine {
            fail_check_out: true,
            ..Default::default()
        };

        assert!(ExtensionGuard::acquire(&mut engine, Extension::Spatial).is_err());
        assert_eq!(engine.calls, vec!["check_out Spatial"]);
    }

    #[test]
    fn test_failed_check_in_does_not_panic() {
        let mut engine = RecordingEngine {
            fail_check_in: true,
            ..Default::default()
        };

        {
            let _guard = ExtensionGuard::acquire(&mut engine, Extension::Spatial).unwrap();
        }

        assert_eq!(engine.calls.len(), 2);
    }
}
