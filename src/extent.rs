use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

const LL_EPSILON: f64 = 1e-11;

/// Geographic extent in EPSG:4326, ordered xmin, ymin, xmax, ymax.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Debug, Error)]
#[error("extent must be four comma-separated numbers: xmin,ymin,xmax,ymax")]
pub struct ParseExtentError;

impl FromStr for Extent {
    type Err = ParseExtentError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = string
            .split(',')
            .map(|part| part.trim().parse())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseExtentError)?;

        let [xmin, ymin, xmax, ymax] = values[..] else {
            return Err(ParseExtentError);
        };

        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }
}

impl Display for Extent {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{},{},{},{}",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

impl Extent {
    pub const fn bounds(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Extent grown by `degrees` on every side, used for the data extract so
    /// features crossing the map edge arrive complete.
    pub fn buffered(&self, degrees: f64) -> Self {
        Self {
            xmin: self.xmin - degrees,
            ymin: self.ymin - degrees,
            xmax: self.xmax + degrees,
            ymax: self.ymax + degrees,
        }
    }

    /// Snaps the extent outward to slippy-tile boundaries at `zoom` so tile
    /// clipping never cuts through the middle of a rendered tile. The far
    /// corner is nudged inward so an extent already on tile boundaries does
    /// not grow by another row and column.
    pub fn snap_to_tiles(&self, zoom: u8) -> Self {
        let (x1, y1) = tile_at(self.xmin, self.ymax, zoom);
        let (x2, y2) = tile_at(self.xmax - LL_EPSILON, self.ymin + LL_EPSILON, zoom);

        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));

        Self {
            xmin: tile_west(x1, zoom),
            ymin: tile_north(y2 + 1, zoom),
            xmax: tile_west(x2 + 1, zoom),
            ymax: tile_north(y1, zoom),
        }
    }
}

fn tile_at(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let n = f64::from(1u32 << zoom);

    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    let max = (1u32 << zoom) - 1;

    (
        (x as i64).clamp(0, i64::from(max)) as u32,
        (y as i64).clamp(0, i64::from(max)) as u32,
    )
}

fn tile_west(x: u32, zoom: u8) -> f64 {
    f64::from(x) / f64::from(1u32 << zoom) * 360.0 - 180.0
}

fn tile_north(y: u32, zoom: u8) -> f64 {
    let n = std::f64::consts::PI * (1.0 - 2.0 * f64::from(y) / f64::from(1u32 << zoom));

    n.sinh().atan().to_degrees()
}
