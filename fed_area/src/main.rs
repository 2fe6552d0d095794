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
//! Area of federally owned land (PAD-US fee parcels, Own_Type = 'FED') within each US state.
//!
//! Datasets
//!   PAD-US 3.0 geodatabase: https://www.sciencebase.gov/catalog/item/61794fc2d34ea58c3c6f9f69
//!   US state boundaries (2020 TIGER/Line+): https://www.nhgis.org/
use std::path::PathBuf;
use anyhow::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use structopt::StructOpt;

use crate::area_table::TableLayout;
use crate::config::AnalysisConfig;
use crate::gdal_engine::GdalEngine;
use crate::pipeline::run_analysis;

mod area_table;
mod config;
mod engine;
mod gdal_engine;
mod pipeline;
mod tabulate;

#[derive(StructOpt)]
#[structopt(about="Tabulates the area of federally owned land by state")]
struct Cli {

    #[structopt(long, default_value = "Info")]
    log_level: LevelFilter,

    #[structopt(parse(from_os_str), long, help="TOML config, defaults to the PAD-US 3.0 federal fee analysis")]
    config: Option<PathBuf>,

    #[structopt(parse(from_os_str), long, help="Relative paths are resolved against this directory")]
    workspace: Option<PathBuf>,

    #[structopt(long, help="Cell size used to rasterize the polygons, in the units of their coordinate system")]
    cell_size: Option<f64>,

    #[structopt(parse(from_os_str), long, help="Output table, .dbf or .csv.  Overwritten if it exists")]
    out_table: Option<PathBuf>,

    #[structopt(long, help="long (zone, class, area) or wide (one column per class)")]
    layout: Option<TableLayout>,
}

impl Cli {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(workspace) = self.workspace.as_ref() {
            config.workspace = workspace.clone();
        }
        if let Some(cell_size) = self.cell_size {
            config.cell_size = cell_size;
        }
        if let Some(out_table) = self.out_table.as_ref() {
            config.out_table = out_table.clone();
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Cli::from_args();

    SimpleLogger::new().with_level(args.log_level).init()?;

    let config = args.analysis_config()?;

    let mut engine = GdalEngine::new();
    run_analysis(&config, &mut engine)?;

    Ok(())
}
