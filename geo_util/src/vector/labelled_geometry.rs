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
use gdal::vector::{Geometry, Layer, LayerAccess};
use geo::{Coord, Rect};
use log::warn;
use crate::io::ensure_field;

/// A polygon and the value of the attribute it is grouped by (zone name, ownership type, ...)
pub struct LabelledGeometry {
    pub label: String,
    pub geometry: Geometry,
    pub extent: Rect<f64>,
}

impl LabelledGeometry {
    pub fn new(label: String, geometry: Geometry) -> Self {
        let env = geometry.envelope();
        let extent = Rect::new(
            Coord { x: env.MinX, y: env.MinY },
            Coord { x: env.MaxX, y: env.MaxY },
        );

        LabelledGeometry {
            label,
            geometry,
            extent,
        }
    }
}

/// Reads every feature of the (possibly filtered) layer, labelled with `label_field`.
///
/// Features without a geometry or with a null label are skipped.
pub fn read_labelled_geometries(layer: &mut Layer, label_field: &str) -> Result<Vec<LabelledGeometry>> {
    ensure_field(layer, label_field)?;

    let layer_name = layer.name();
    let mut r = Vec::new();
    let mut num_skipped = 0;
    let mut num_null_labels = 0;

    for feature in layer.features() {
        let label = match feature.field_as_string_by_name(label_field)
            .with_context(|| format!("Reading {} from layer {}", label_field, &layer_name))? {
            Some(l) => l,
            None => {
                num_null_labels += 1;
                continue;
            }
        };

        let geometry = match feature.geometry() {
            Some(g) => g.clone(),
            None => {
                num_skipped += 1;
                continue;
            }
        };

        r.push(LabelledGeometry::new(label, geometry));
    }

    if num_skipped > 0 {
        warn!("Skipped {} features without geometry in layer {}", num_skipped, &layer_name);
    }

    if num_null_labels > 0 {
        warn!("Skipped {} features with a null {} in layer {}", num_null_labels, label_field, &layer_name);
    }

    Ok(r)
}

/// Smallest rectangle holding all the extents, None if there are none
pub fn union_extent<'a, I>(extents: I) -> Option<Rect<f64>>
where I: IntoIterator<Item=&'a Rect<f64>>
{
    extents.into_iter().fold(None, |acc: Option<Rect<f64>>, e| {
        match acc {
            None => Some(*e),
            Some(a) => Some(Rect::new(
                Coord { x: a.min().x.min(e.min().x), y: a.min().y.min(e.min().y) },
                Coord { x: a.max().x.max(e.max().x), y: a.max().y.max(e.max().y) },
            ))
        }
    })
}

/// True if the rectangles overlap or touch
pub fn extents_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x &&
        a.min().y <= b.max().y && b.min().y <= a.max().y
}
