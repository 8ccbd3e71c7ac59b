/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use geo::{Distance, Haversine, Point};
use uom::si::{f64::Length, length::{meter, mile}};

use crate::report::Report;

/// computes distances (in statute miles) of report positions from a fixed home location
#[derive(Debug,Clone)]
pub struct ProximityEvaluator {
    home: Point<f64>,
    max_distance: f64, // miles
}

impl ProximityEvaluator {
    pub fn new (home_latitude: f64, home_longitude: f64, max_distance: f64)->Self {
        ProximityEvaluator { home: Point::new( home_longitude, home_latitude), max_distance }
    }

    pub fn max_distance (&self)->f64 { self.max_distance }

    /// haversine distance from home in miles
    pub fn distance (&self, latitude: f64, longitude: f64)->f64 {
        let meters = Haversine::distance( self.home, Point::new( longitude, latitude));
        Length::new::<meter>( meters).get::<mile>()
    }

    /// distance of the report position from home, or None if the report has no (complete) position.
    /// The distance is attached to the report
    pub fn evaluate (&self, report: &mut Report)->Option<f64> {
        let (lat,lon) = report.position()?;
        let dist = self.distance( lat, lon);
        report.distance = Some(dist);
        Some(dist)
    }

    /// note the radius is inclusive
    pub fn is_within (&self, distance: f64)->bool {
        distance <= self.max_distance
    }
}
